//! Driver for Celestron NexStar hand controllers over their serial
//! command protocol.
//!
//! Every operation is one blocking request/reply exchange on a [`Socket`],
//! which is either an already-open serial port or an in-process
//! [`Simulator`].
//!
//! ```
//! use nexstar::{Celestron, Config};
//!
//! let mut mount = Celestron::simulated(Config::default());
//! mount.simulator_mut().unwrap().set_ra(12.5);
//! let pos = mount.get_coords()?;
//! assert!((pos.ra - 12.5).abs() < 0.001);
//! # Ok::<(), nexstar::Error>(())
//! ```

pub use config::Config;
pub use coord::RaDec;
pub use error::{Error, ErrorKind, Result};
pub use motion::{Axis, Direction, SlewRate, TrackingMode};
pub use socket::{
    sim::{Fault, Simulator},
    Socket,
};
pub use system::{DeviceTime, FirmwareInfo, GpsStatus, Location, MountModel};

use chrono::NaiveDateTime;
use protocol::{DeviceId, Opcode, Packet, Reply, ReplyShape, MAX_FRAME_LEN, TERMINATOR};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub mod config;
pub mod coord;
mod error;
pub mod motion;
pub mod protocol;
pub mod socket;
pub mod system;

#[cfg(feature = "serial")]
pub use socket::serial::SerialSocket;

/// Longest reply frame, terminator included
const MAX_REPLY_LEN: usize = 16;

/// Pause between echo probes in a connection check
const PROBE_INTERVAL: Duration = Duration::from_millis(50);

/// Byte sent (and expected back) by the echo probe
const PROBE_BYTE: u8 = b'x';

/// Widest UTC offset, in hours, any time zone uses
const MAX_UTC_OFFSET: f64 = 14.0;

/// Handle to one hand controller. Holds the socket and the settings used
/// for every exchange on it; callers must not share a port between
/// handles.
#[derive(Debug)]
pub struct Celestron<S> {
    /// Link to the hand controller
    socket: S,
    /// Settings for this handle
    config: Config,
}

impl Celestron<Simulator> {
    /// A handle backed by a fresh [`Simulator`]
    pub fn simulated(config: Config) -> Self {
        Self::new(Simulator::new(), config)
    }
}

#[cfg(feature = "serial")]
impl Celestron<Box<dyn Socket>> {
    /// Pick the backend according to `config.simulation`: the simulator,
    /// or the provided port, which must already be open and configured
    pub fn connect(
        port: Option<Box<dyn serialport::SerialPort>>,
        config: Config,
    ) -> Result<Self> {
        let socket: Box<dyn Socket> = if config.simulation {
            Box::new(Simulator::new())
        } else {
            Box::new(SerialSocket::new(port.ok_or(Error::NoPort)?))
        };
        Ok(Self::new(socket, config))
    }
}

impl<S: Socket> Celestron<S> {
    pub fn new(socket: S, config: Config) -> Self {
        Self { socket, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Turn per-frame protocol logging on or off
    pub fn set_debug(&mut self, enable: bool) {
        self.config.debug = enable;
    }

    pub fn set_device_name(&mut self, name: impl Into<String>) {
        self.config.device_name = name.into();
    }

    /// Simulated mount state, if this handle talks to a simulator
    pub fn simulator_mut(&mut self) -> Option<&mut Simulator> {
        self.socket.simulator()
    }

    /// Release the socket
    pub fn into_socket(self) -> S {
        self.socket
    }

    /// Write one frame. Every failure up to the frame leaving is
    /// reported as a write-stage error, whatever its underlying cause.
    fn send(&mut self, pkt: &Packet) -> Result<()> {
        let mut buf = [0; MAX_FRAME_LEN];
        let frame = pkt
            .serialise(&mut buf)
            .map_err(|e| Error::Transmit(Box::new(e)))?;
        if self.config.debug {
            debug!(device = %self.config.device_name, ?frame, "send");
        }
        self.socket
            .clear_input()
            .map_err(|e| Error::Transmit(Box::new(e)))?;
        let written = self
            .socket
            .send(frame)
            .map_err(|e| Error::Transmit(Box::new(e)))?;
        if written != frame.len() {
            Err(Error::Write {
                written,
                len: frame.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Read one reply frame of the given shape, giving up once the
    /// configured timeout has elapsed
    fn recv(&mut self, shape: ReplyShape) -> Result<Reply> {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;
        let frame_len = shape.frame_len();
        let mut frame = Vec::with_capacity(frame_len);
        let mut buf = [0; MAX_REPLY_LEN];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout));
            }
            // text replies are read a byte at a time so nothing past the
            // terminator is consumed
            let want = match shape {
                ReplyShape::Fixed(_) => frame_len - frame.len(),
                ReplyShape::Terminated { .. } => 1,
            };
            let read = match self.socket.recv(&mut buf[..want.min(MAX_REPLY_LEN)], remaining)
            {
                Err(Error::Timeout(_)) => return Err(Error::Timeout(timeout)),
                read => read?,
            };
            frame.extend_from_slice(read);

            let done = match shape {
                ReplyShape::Fixed(_) => frame.len() >= frame_len,
                ReplyShape::Terminated { .. } => {
                    frame.last() == Some(&TERMINATOR) || frame.len() >= frame_len
                }
            };
            if done {
                break;
            }
        }

        if self.config.debug {
            debug!(device = %self.config.device_name, ?frame, "recv");
        }
        Reply::parse(&frame, shape)
    }

    /// One complete exchange: write the frame, then wait for its reply
    fn transact(&mut self, pkt: &Packet) -> Result<Reply> {
        let result = self.send(pkt).and_then(|()| self.recv(pkt.reply));
        if let Err(e) = &result {
            if self.config.debug {
                debug!(
                    device = %self.config.device_name,
                    opcode = ?pkt.opcode,
                    kind = ?e.kind(),
                    error = %e,
                    "transaction failed"
                );
            }
        }
        result
    }

    /// Exchange for commands whose only reply is a bare terminator
    fn command(&mut self, pkt: &Packet) -> Result<()> {
        self.transact(pkt)?.finish()
    }

    /// Check that the hand controller answers an echo probe, retrying
    /// up to `connection_attempts` times
    pub fn check_connection(&mut self) -> Result<()> {
        let attempts = self.config.connection_attempts.max(1);
        let mut last_err = Error::Framing("no probe sent");
        for attempt in 1..=attempts {
            let mut pkt = Packet::new(Opcode::Echo, ReplyShape::Terminated { max: 1 });
            pkt.push_u8(PROBE_BYTE);
            match self.transact(&pkt).and_then(|mut reply| {
                reply.expect_u8(PROBE_BYTE)?;
                reply.finish()
            }) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(
                        device = %self.config.device_name,
                        attempt,
                        error = %e,
                        "connection probe failed"
                    );
                    last_err = e;
                }
            }
            if attempt < attempts {
                std::thread::sleep(PROBE_INTERVAL);
            }
        }
        Err(last_err)
    }

    /// Query every firmware version along with the mount model. Queries
    /// run in order (version, model, GPS, RA, DEC); if one fails the
    /// fields filled so far are returned inside
    /// [`Error::PartialAggregate`].
    pub fn get_firmware(&mut self) -> Result<FirmwareInfo> {
        let mut info = FirmwareInfo::default();
        match self.fill_firmware(&mut info) {
            Ok(()) => Ok(info),
            Err(source) => {
                warn!(
                    device = %self.config.device_name,
                    error = %source,
                    "firmware query incomplete"
                );
                Err(Error::PartialAggregate {
                    partial: Box::new(info),
                    source: Box::new(source),
                })
            }
        }
    }

    fn fill_firmware(&mut self, info: &mut FirmwareInfo) -> Result<()> {
        info.version = self.get_version()?;
        let model = self.get_model()?;
        info.model_id = Some(model);
        info.model = MountModel::describe(model);
        info.gps_firmware = self.get_gps_firmware()?;
        info.ra_firmware = self.get_ra_firmware()?;
        info.dec_firmware = self.get_dec_firmware()?;
        Ok(())
    }

    /// Hand controller firmware version, as `major.minor`
    pub fn get_version(&mut self) -> Result<String> {
        let pkt = Packet::new(Opcode::GetVersion, ReplyShape::Fixed(2));
        self.transact(&pkt)?.read_version()
    }

    /// Raw mount model id; see [`MountModel`]
    pub fn get_model(&mut self) -> Result<u8> {
        let pkt = Packet::new(Opcode::GetModel, ReplyShape::Fixed(1));
        self.transact(&pkt)?.read_u8()
    }

    pub fn get_gps_firmware(&mut self) -> Result<String> {
        self.get_board_version(DeviceId::Gps)
    }

    pub fn get_ra_firmware(&mut self) -> Result<String> {
        self.get_board_version(DeviceId::RaMotor)
    }

    pub fn get_dec_firmware(&mut self) -> Result<String> {
        self.get_board_version(DeviceId::DecMotor)
    }

    fn get_board_version(&mut self, device: DeviceId) -> Result<String> {
        self.transact(&Packet::board_version(device))?.read_version()
    }

    /// Current pointing position
    pub fn get_coords(&mut self) -> Result<RaDec> {
        let pkt = Packet::new(Opcode::GetRaDec, ReplyShape::Terminated { max: 9 });
        let mut reply = self.transact(&pkt)?;
        let ra = reply.read_hex_u16()?;
        reply.expect_u8(b',')?;
        let dec = reply.read_hex_u16()?;
        reply.finish()?;
        Ok(RaDec::from_fractions(ra, dec))
    }

    /// Hand controller clock, converted to UTC
    pub fn get_utc_date_time(&mut self) -> Result<DeviceTime> {
        let pkt = Packet::new(Opcode::GetTime, ReplyShape::Fixed(8));
        let mut reply = self.transact(&pkt)?;
        let bytes = reply.read_array::<8>()?;
        DeviceTime::from_wire(bytes)
    }

    /// Start moving in `direction` at a fixed `rate` until stopped
    pub fn start_motion(&mut self, direction: Direction, rate: SlewRate) -> Result<()> {
        self.fixed_rate(direction, rate as u8)
    }

    /// Stop motion on the axis `direction` belongs to. Stopping an axis
    /// that isn't moving is not an error.
    pub fn stop_motion(&mut self, direction: Direction) -> Result<()> {
        self.fixed_rate(direction, 0)
    }

    fn fixed_rate(&mut self, direction: Direction, rate: u8) -> Result<()> {
        let pkt = Packet::passthrough(
            direction.axis().device(),
            direction.wire_byte(),
            &[rate],
            0,
        )?;
        self.command(&pkt)
    }

    /// Cancel any goto in progress. Succeeds whether or not the mount is
    /// moving.
    pub fn abort(&mut self) -> Result<()> {
        self.command(&Packet::new(Opcode::CancelGoto, ReplyShape::ACK))
    }

    /// Start a goto to `ra` hours, `dec` degrees
    pub fn slew(&mut self, ra: f64, dec: f64) -> Result<()> {
        self.command(&radec_packet(Opcode::GotoRaDec, ra, dec)?)
    }

    /// Tell the mount it is currently pointing at `ra`, `dec`
    pub fn sync(&mut self, ra: f64, dec: f64) -> Result<()> {
        self.command(&radec_packet(Opcode::SyncRaDec, ra, dec)?)
    }

    /// Whether a goto is in progress. A failed query is an error, never
    /// `false`.
    pub fn is_slewing(&mut self) -> Result<bool> {
        let pkt = Packet::new(Opcode::IsGotoInProgress, ReplyShape::Terminated { max: 1 });
        let mut reply = self.transact(&pkt)?;
        let slewing = reply.read_ascii_bool()?;
        reply.finish()?;
        Ok(slewing)
    }

    pub fn get_location(&mut self) -> Result<Location> {
        let pkt = Packet::new(Opcode::GetLocation, ReplyShape::Fixed(8));
        let mut reply = self.transact(&pkt)?;
        let bytes = reply.read_array::<8>()?;
        Ok(Location::from_wire(bytes))
    }

    pub fn set_location(&mut self, location: Location) -> Result<()> {
        let mut pkt = Packet::new(Opcode::SetLocation, ReplyShape::ACK);
        pkt.push_slice(&location.to_wire()?);
        self.command(&pkt)
    }

    /// Set the clock from a UTC instant and the local offset in hours.
    /// The controller only stores whole hours, so a fractional offset is
    /// truncated towards zero and the local time sent matches that.
    pub fn set_datetime(&mut self, utc: NaiveDateTime, utc_offset: f64) -> Result<()> {
        if !utc_offset.is_finite() || utc_offset.abs() > MAX_UTC_OFFSET {
            return Err(Error::InvalidArgument("UTC offset outside [-14, 14]"));
        }
        if utc_offset.fract() != 0.0 {
            warn!(
                device = %self.config.device_name,
                utc_offset,
                "fractional UTC offset truncated to whole hours"
            );
        }
        let time = DeviceTime {
            utc,
            utc_offset: utc_offset.trunc() as i8,
            dst: false,
        };
        let mut pkt = Packet::new(Opcode::SetTime, ReplyShape::ACK);
        pkt.push_slice(&time.to_wire()?);
        self.command(&pkt)
    }

    pub fn get_tracking_mode(&mut self) -> Result<TrackingMode> {
        let pkt = Packet::new(Opcode::GetTrackingMode, ReplyShape::Fixed(1));
        self.transact(&pkt)?.read_u8()?.try_into()
    }

    pub fn set_tracking_mode(&mut self, mode: TrackingMode) -> Result<()> {
        let mut pkt = Packet::new(Opcode::SetTrackingMode, ReplyShape::ACK);
        pkt.push_u8(mode as u8);
        self.command(&pkt)
    }
}

/// Goto/sync frame carrying a coordinate pair
fn radec_packet(opcode: Opcode, ra: f64, dec: f64) -> Result<Packet> {
    if !ra.is_finite() || !dec.is_finite() {
        return Err(Error::InvalidArgument("Coordinates must be finite"));
    }
    let mut pkt = Packet::new(opcode, ReplyShape::ACK);
    pkt.push_fraction_pair(coord::ra_fraction(ra), coord::dec_fraction(dec));
    Ok(pkt)
}
