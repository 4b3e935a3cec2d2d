//! Jog each direction briefly at every rate, then goto a target and wait
//! for the slew to finish. Runs against the simulator unless a serial port
//! path is given.

use nexstar::{socket::serial::NEXSTAR_BAUD, Celestron, Config, Direction, SlewRate};
use std::time::Duration;
use strum::IntoEnumIterator;

/// Vega
const TARGET: (f64, f64) = (18.6156, 38.7837);

fn main() -> nexstar::Result<()> {
    tracing_subscriber::fmt::init();

    let port = std::env::args().nth(1);
    let simulated = port.is_none();
    let config = Config::default().simulation(simulated);
    let port = port
        .map(|path| {
            serialport::new(path, NEXSTAR_BAUD)
                .timeout(Duration::from_secs(1))
                .open()
        })
        .transpose()?;
    let mut mount = Celestron::connect(port, config)?;

    for direction in Direction::iter() {
        for rate in SlewRate::iter() {
            println!("Jog {direction:?} at {rate:?}");
            mount.start_motion(direction, rate)?;
            if !simulated {
                std::thread::sleep(Duration::from_millis(250));
            }
        }
        mount.stop_motion(direction)?;
    }

    println!("Goto RA {} DEC {}", TARGET.0, TARGET.1);
    mount.slew(TARGET.0, TARGET.1)?;
    while mount.is_slewing()? {
        let pos = mount.get_coords()?;
        println!("  at RA {:.4}h DEC {:.4}°", pos.ra, pos.dec);
        if !simulated {
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    let pos = mount.get_coords()?;
    println!("Arrived at RA {:.4}h DEC {:.4}°", pos.ra, pos.dec);
    Ok(())
}
