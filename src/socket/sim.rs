//! In-process stand-in for a hand controller. Frames written to it are
//! decoded and answered from a simulated mount state, so the full command
//! catalogue can be exercised without hardware.

use super::Socket;
use crate::{
    coord,
    motion::{Axis, Direction, SlewRate, TrackingMode, DIR_NEGATIVE, DIR_POSITIVE},
    protocol::{DeviceId, Opcode, Reply, ReplyShape, TERMINATOR},
    system::{DeviceTime, GpsStatus, MountModel},
    Error, Result,
};
use chrono::Utc;
use std::{collections::VecDeque, time::Duration};
use tracing::trace;

/// Number of `L` polls a simulated goto reports as in progress
pub const DEFAULT_SETTLE_POLLS: u32 = 3;

/// Hand controller firmware version the simulator reports
const SIM_VERSION: (u8, u8) = (4, 21);
/// Firmware version reported by each simulated motor board
const SIM_MOTOR_VERSION: (u8, u8) = (7, 11);
/// Firmware version reported by the simulated GPS board
const SIM_GPS_VERSION: (u8, u8) = (1, 6);

/// Misbehaviour to inject when a frame matches a prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Accept the frame but never answer it
    Silent,
    /// Answer with these bytes instead of the normal reply
    Reply(Vec<u8>),
    /// Accept one byte fewer than offered and drop the frame
    ShortWrite,
}

/// Simulated mount. Replies are queued on `send` and handed out on
/// `recv`; an empty queue reads as a timeout.
#[derive(Debug)]
pub struct Simulator {
    ra: f64,
    dec: f64,
    slewing: bool,
    target: Option<(f64, f64)>,
    settle_polls: u32,
    polls_left: u32,
    gps: GpsStatus,
    slew_rate: SlewRate,
    ra_motion: Option<Direction>,
    dec_motion: Option<Direction>,
    tracking: TrackingMode,
    location: [u8; 8],
    clock: [u8; 8],
    model: u8,
    faults: Vec<(Vec<u8>, Fault)>,
    written: Vec<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        let clock = DeviceTime {
            utc: Utc::now().naive_utc(),
            utc_offset: 0,
            dst: false,
        };
        Self {
            ra: 0.0,
            dec: 90.0,
            slewing: false,
            target: None,
            settle_polls: DEFAULT_SETTLE_POLLS,
            polls_left: 0,
            gps: GpsStatus::default(),
            slew_rate: SlewRate::default(),
            ra_motion: None,
            dec_motion: None,
            tracking: TrackingMode::default(),
            location: [0; 8],
            // only fails past 2255
            clock: clock.to_wire().unwrap_or([0, 0, 0, 1, 1, 0, 0, 0]),
            model: MountModel::Avx as u8,
            faults: Vec::new(),
            written: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn set_gps_status(&mut self, status: GpsStatus) {
        trace!(?status, "sim gps status");
        self.gps = status;
    }

    pub fn set_slew_rate(&mut self, rate: SlewRate) {
        trace!(?rate, "sim slew rate");
        self.slew_rate = rate;
    }

    /// Force the goto-in-progress flag. Raising it without a target keeps
    /// the current position when the slew settles.
    pub fn set_slewing(&mut self, slewing: bool) {
        trace!(slewing, "sim slewing");
        self.slewing = slewing;
        self.polls_left = self.settle_polls;
        if !slewing {
            self.target = None;
        }
    }

    pub fn set_ra(&mut self, ra: f64) {
        trace!(ra, "sim ra");
        self.ra = ra;
    }

    pub fn set_dec(&mut self, dec: f64) {
        trace!(dec, "sim dec");
        self.dec = dec;
    }

    /// Number of `L` polls a goto reports as in progress before it
    /// completes. Zero means gotos only end when cancelled.
    pub fn set_settle_polls(&mut self, polls: u32) {
        self.settle_polls = polls;
    }

    pub fn set_model(&mut self, model: u8) {
        self.model = model;
    }

    /// Misbehave whenever a frame starting with `prefix` is written
    pub fn inject_fault(&mut self, prefix: impl Into<Vec<u8>>, fault: Fault) {
        self.faults.push((prefix.into(), fault));
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    pub const fn ra(&self) -> f64 {
        self.ra
    }

    pub const fn dec(&self) -> f64 {
        self.dec
    }

    pub const fn is_slewing(&self) -> bool {
        self.slewing
    }

    pub const fn gps_status(&self) -> GpsStatus {
        self.gps
    }

    pub const fn slew_rate(&self) -> SlewRate {
        self.slew_rate
    }

    pub const fn tracking_mode(&self) -> TrackingMode {
        self.tracking
    }

    /// Direction an axis is currently being jogged in, if any
    pub const fn motion(&self, axis: Axis) -> Option<Direction> {
        match axis {
            Axis::Ra => self.ra_motion,
            Axis::Dec => self.dec_motion,
        }
    }

    /// Every frame written so far, oldest first
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    fn fault_for(&self, frame: &[u8]) -> Option<Fault> {
        self.faults
            .iter()
            .find(|(prefix, _)| frame.starts_with(prefix))
            .map(|(_, fault)| fault.clone())
    }

    fn finish_slew(&mut self) {
        if let Some((ra, dec)) = self.target.take() {
            self.ra = ra;
            self.dec = dec;
        }
        self.slewing = false;
        trace!(ra = self.ra, dec = self.dec, "sim goto complete");
    }

    /// Decode one frame and build the reply a hand controller would
    /// send, or `None` if it would stay silent
    fn respond(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let (&opcode, args) = frame.split_first()?;
        let opcode = Opcode::try_from(opcode).ok()?;
        let mut reply = match opcode {
            Opcode::Echo => args.first().map(|&c| vec![c])?,
            Opcode::GetVersion => vec![SIM_VERSION.0, SIM_VERSION.1],
            Opcode::GetModel => vec![self.model],
            Opcode::Passthrough => self.passthrough(args)?,
            Opcode::GetRaDec => format!(
                "{:04X},{:04X}",
                coord::ra_fraction(self.ra),
                coord::dec_fraction(self.dec)
            )
            .into_bytes(),
            Opcode::GotoRaDec => {
                let (ra, dec) = parse_fraction_pair(args)?;
                self.target = Some((ra, dec));
                self.slewing = true;
                self.polls_left = self.settle_polls;
                trace!(ra, dec, "sim goto started");
                Vec::new()
            }
            Opcode::SyncRaDec => {
                let (ra, dec) = parse_fraction_pair(args)?;
                self.ra = ra;
                self.dec = dec;
                Vec::new()
            }
            Opcode::IsGotoInProgress => {
                let reply = vec![if self.slewing { b'1' } else { b'0' }];
                if self.slewing && self.settle_polls > 0 {
                    self.polls_left = self.polls_left.saturating_sub(1);
                    if self.polls_left == 0 {
                        self.finish_slew();
                    }
                }
                reply
            }
            Opcode::CancelGoto => {
                self.slewing = false;
                self.target = None;
                self.ra_motion = None;
                self.dec_motion = None;
                Vec::new()
            }
            Opcode::GetLocation => self.location.to_vec(),
            Opcode::SetLocation => {
                self.location = args.try_into().ok()?;
                Vec::new()
            }
            Opcode::GetTime => self.clock.to_vec(),
            Opcode::SetTime => {
                self.clock = args.try_into().ok()?;
                Vec::new()
            }
            Opcode::GetTrackingMode => vec![self.tracking as u8],
            Opcode::SetTrackingMode => {
                self.tracking = TrackingMode::try_from(*args.first()?).ok()?;
                Vec::new()
            }
        };
        reply.push(TERMINATOR);
        Some(reply)
    }

    fn passthrough(&mut self, args: &[u8]) -> Option<Vec<u8>> {
        let [len, device, command, a1, _, _, _reply_len] = *args else {
            return None;
        };
        let device = DeviceId::try_from(device).ok()?;
        match (len, device, command) {
            (1, DeviceId::Gps, _) if self.gps == GpsStatus::Off => None,
            (1, DeviceId::Gps, 0xFE) => Some(vec![SIM_GPS_VERSION.0, SIM_GPS_VERSION.1]),
            (1, DeviceId::RaMotor | DeviceId::DecMotor, 0xFE) => {
                Some(vec![SIM_MOTOR_VERSION.0, SIM_MOTOR_VERSION.1])
            }
            (2, DeviceId::RaMotor | DeviceId::DecMotor, DIR_POSITIVE | DIR_NEGATIVE) => {
                let axis = if device == DeviceId::RaMotor {
                    Axis::Ra
                } else {
                    Axis::Dec
                };
                let direction = match (axis, command) {
                    (Axis::Dec, DIR_POSITIVE) => Direction::North,
                    (Axis::Dec, _) => Direction::South,
                    (Axis::Ra, DIR_POSITIVE) => Direction::West,
                    (Axis::Ra, _) => Direction::East,
                };
                let motion = if a1 == 0 {
                    None
                } else {
                    self.slew_rate = SlewRate::try_from(a1).ok()?;
                    Some(direction)
                };
                trace!(?axis, ?motion, "sim motion");
                match axis {
                    Axis::Ra => self.ra_motion = motion,
                    Axis::Dec => self.dec_motion = motion,
                }
                Some(Vec::new())
            }
            _ => None,
        }
    }
}

/// Parse the `XXXX,YYYY` argument of goto and sync
fn parse_fraction_pair(args: &[u8]) -> Option<(f64, f64)> {
    let mut frame = args.to_vec();
    frame.push(TERMINATOR);
    let mut reply = Reply::parse(&frame, ReplyShape::Fixed(9)).ok()?;
    let ra = reply.read_hex_u16().ok()?;
    reply.expect_u8(b',').ok()?;
    let dec = reply.read_hex_u16().ok()?;
    Some((coord::ra_from_fraction(ra), coord::dec_from_fraction(dec)))
}

impl Socket for Simulator {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.written.push(data.to_vec());
        match self.fault_for(data) {
            Some(Fault::Silent) => {}
            Some(Fault::Reply(bytes)) => self.pending.extend(bytes),
            Some(Fault::ShortWrite) => return Ok(data.len().saturating_sub(1)),
            None => {
                if let Some(reply) = self.respond(data) {
                    self.pending.extend(reply);
                }
            }
        }
        Ok(data.len())
    }

    fn recv<'buf>(
        &mut self,
        buf: &'buf mut [u8],
        timeout: Duration,
    ) -> Result<&'buf [u8]> {
        if self.pending.is_empty() {
            return Err(Error::Timeout(timeout));
        }
        let len = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..len)) {
            *slot = byte;
        }
        Ok(&buf[..len])
    }

    fn clear_input(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn simulator(&mut self) -> Option<&mut Simulator> {
        Some(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn exchange(sim: &mut Simulator, frame: &[u8]) -> Vec<u8> {
        sim.send(frame).unwrap();
        let mut buf = [0; 32];
        sim.recv(&mut buf, Duration::ZERO)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    #[test]
    fn echo_and_version() {
        let mut sim = Simulator::new();
        assert_eq!(exchange(&mut sim, b"Kx"), b"x#");
        assert_eq!(exchange(&mut sim, b"V"), [4, 21, b'#']);
        assert_eq!(exchange(&mut sim, b"m"), [20, b'#']);
    }

    #[test]
    fn goto_settles_after_polls() {
        let mut sim = Simulator::new();
        sim.set_settle_polls(2);
        assert_eq!(exchange(&mut sim, b"R8000,2000"), b"#");
        assert!(sim.is_slewing());
        assert_eq!(exchange(&mut sim, b"L"), b"1#");
        assert_eq!(exchange(&mut sim, b"L"), b"1#");
        assert_eq!(exchange(&mut sim, b"L"), b"0#");
        assert_eq!(sim.ra(), 12.0);
        assert_eq!(sim.dec(), 45.0);
    }

    #[test]
    fn gps_off_stays_silent() {
        let mut sim = Simulator::new();
        let frame = [b'P', 1, 0xB0, 0xFE, 0, 0, 0, 2];
        assert_eq!(exchange(&mut sim, &frame), [1, 6, b'#']);
        sim.set_gps_status(GpsStatus::Off);
        assert!(exchange(&mut sim, &frame).is_empty());
    }

    #[test]
    fn jog_start_and_stop() {
        let mut sim = Simulator::new();
        assert_eq!(exchange(&mut sim, &[b'P', 2, 0x10, 0x25, 4, 0, 0, 0]), b"#");
        assert_eq!(sim.motion(Axis::Ra), Some(Direction::East));
        assert_eq!(sim.slew_rate(), SlewRate::Four);
        assert_eq!(exchange(&mut sim, &[b'P', 2, 0x10, 0x25, 0, 0, 0, 0]), b"#");
        assert_eq!(sim.motion(Axis::Ra), None);
    }

    #[test]
    fn faults_match_on_prefix() {
        let mut sim = Simulator::new();
        sim.inject_fault(*b"V", Fault::Reply(b"??".to_vec()));
        sim.inject_fault(*b"m", Fault::ShortWrite);
        assert_eq!(exchange(&mut sim, b"V"), b"??");
        assert_eq!(sim.send(b"m").unwrap(), 0);
        sim.clear_faults();
        assert_eq!(exchange(&mut sim, b"V"), [4, 21, b'#']);
        assert_eq!(sim.written().len(), 3);
    }

    #[test]
    fn unknown_opcode_ignored() {
        let mut sim = Simulator::new();
        assert!(exchange(&mut sim, b"Z").is_empty());
    }
}
