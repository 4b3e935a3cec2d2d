//! Print the firmware versions and clock of a mount. Pass a serial port
//! path to talk to real hardware; with no argument the simulator answers.

use nexstar::{socket::serial::NEXSTAR_BAUD, Celestron, Config};
use std::time::Duration;

fn main() -> nexstar::Result<()> {
    tracing_subscriber::fmt::init();

    let port = std::env::args().nth(1);
    let config = Config::default().debug(true).simulation(port.is_none());
    let port = port
        .map(|path| {
            serialport::new(path, NEXSTAR_BAUD)
                .timeout(Duration::from_secs(1))
                .open()
        })
        .transpose()?;

    let mut mount = Celestron::connect(port, config)?;
    mount.check_connection()?;

    match mount.get_firmware() {
        Ok(info) => println!("Firmware:\n{info:#?}"),
        Err(nexstar::Error::PartialAggregate { partial, source }) => {
            println!("Firmware (incomplete, {source}):\n{partial:#?}");
        }
        Err(e) => return Err(e),
    }

    let time = mount.get_utc_date_time()?;
    println!(
        "Clock: {} UTC (offset {:+}h, DST {})",
        time.utc, time.utc_offset, time.dst
    );

    let pos = mount.get_coords()?;
    println!("Pointing at RA {:.4}h DEC {:.4}°", pos.ra, pos.dec);

    Ok(())
}
