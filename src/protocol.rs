//! Command frames sent to the hand controller, and the replies it sends
//! back

use crate::{error::ErrWrap, Error, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::io::{Cursor, Write};

/// Every reply from the hand controller ends with this byte
pub const TERMINATOR: u8 = b'#';

/// Longest outbound frame: goto and sync carry nine bytes of hex after
/// the opcode
pub const MAX_FRAME_LEN: usize = 10;

/// Passthrough sub-command requesting a board's firmware version
const PASSTHROUGH_GET_VERSION: u8 = 0xFE;

/// Message opcodes, as listed in the NexStar communication protocol notes;
/// see methods in `lib.rs` for details
#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
#[repr(u8)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum Opcode {
    Echo = b'K',
    GetVersion = b'V',
    GetModel = b'm',
    Passthrough = b'P',
    GetRaDec = b'E',
    GotoRaDec = b'R',
    SyncRaDec = b'S',
    IsGotoInProgress = b'L',
    CancelGoto = b'M',
    GetLocation = b'w',
    SetLocation = b'W',
    GetTime = b'h',
    SetTime = b'H',
    GetTrackingMode = b't',
    SetTrackingMode = b'T',
}

impl TryFrom<u8> for Opcode {
    type Error = Error;
    fn try_from(code: u8) -> Result<Self> {
        Self::from_u8(code).ok_or(Error::Parse("Invalid opcode"))
    }
}

/// Boards on the hand controller's auxiliary bus that can be addressed by
/// passthrough commands
#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
#[repr(u8)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum DeviceId {
    RaMotor = 0x10,
    DecMotor = 0x11,
    Gps = 0xB0,
}

impl TryFrom<u8> for DeviceId {
    type Error = Error;
    fn try_from(code: u8) -> Result<Self> {
        Self::from_u8(code).ok_or(Error::Parse("Invalid device id"))
    }
}

/// How the reply to a command is delimited
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReplyShape {
    /// Exactly this many payload bytes, then the terminator. Binary
    /// payloads may themselves contain the terminator byte so they are
    /// never scanned for it.
    Fixed(usize),
    /// ASCII payload of at most `max` bytes, ending at the first
    /// terminator
    Terminated {
        #[allow(clippy::missing_docs_in_private_items)]
        max: usize,
    },
}

impl ReplyShape {
    /// Bare `#` acknowledgement
    pub const ACK: Self = Self::Fixed(0);

    /// Upper bound on the number of bytes in a complete reply
    pub const fn frame_len(self) -> usize {
        match self {
            Self::Fixed(len) | Self::Terminated { max: len } => len + 1,
        }
    }
}

/// An outbound command along with the shape of the reply it expects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Command byte
    pub opcode: Opcode,
    /// Argument bytes following the command byte
    pub data: Vec<u8>,
    /// Expected reply
    pub reply: ReplyShape,
}

impl Packet {
    pub fn new(opcode: Opcode, reply: ReplyShape) -> Self {
        Self {
            opcode,
            data: Vec::new(),
            reply,
        }
    }

    /// Passthrough command addressed to one of the auxiliary boards. The
    /// hand controller wants the argument count and the reply length
    /// spelled out in the frame.
    pub fn passthrough(
        device: DeviceId,
        command: u8,
        args: &[u8],
        reply_len: u8,
    ) -> Result<Self> {
        if args.len() > 3 {
            return Err(Error::InvalidArgument("Too many passthrough arguments"));
        }
        let mut pkt = Self::new(
            Opcode::Passthrough,
            ReplyShape::Fixed(usize::from(reply_len)),
        );
        // length counts the sub-command itself
        pkt.push_u8(u8::try_from(args.len())? + 1);
        pkt.push_u8(device as u8);
        pkt.push_u8(command);
        pkt.push_slice(args);
        pkt.data.resize(6, 0);
        pkt.push_u8(reply_len);
        Ok(pkt)
    }

    /// Two-byte firmware version query for an auxiliary board
    pub fn board_version(device: DeviceId) -> Self {
        Self {
            opcode: Opcode::Passthrough,
            data: vec![1, device as u8, PASSTHROUGH_GET_VERSION, 0, 0, 0, 2],
            reply: ReplyShape::Fixed(2),
        }
    }

    pub fn serialise<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8]> {
        let mut cur = Cursor::new(buf);

        cur.write_all(&[self.opcode as u8])?;
        cur.write_all(&self.data)?;

        let len = cur.position() as usize;
        let buf = cur.into_inner();
        Ok(&buf[..len])
    }

    pub fn push_u8(&mut self, val: u8) {
        self.data.push(val);
    }

    pub fn push_slice(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Push a pair of turn fractions as `XXXX,YYYY` upper-case hex
    pub fn push_fraction_pair(&mut self, first: u16, second: u16) {
        self.data
            .extend_from_slice(format!("{first:04X},{second:04X}").as_bytes());
    }
}

/// Payload of a reply with the terminator stripped, plus a read cursor
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reply {
    /// Payload bytes
    pub data: Vec<u8>,
    /// When parsing, current offset into the payload
    data_offset: usize,
}

impl Reply {
    /// Validate a complete frame against the expected shape and strip
    /// the terminator
    pub fn parse(frame: &[u8], shape: ReplyShape) -> Result<Self> {
        let (&last, payload) = frame
            .split_last()
            .ok_or(Error::Framing("empty reply"))?;
        if last != TERMINATOR {
            return Err(Error::Framing("missing terminator"));
        }
        match shape {
            ReplyShape::Fixed(len) if payload.len() != len => {
                return Err(Error::Framing("unexpected reply length"));
            }
            ReplyShape::Terminated { max } => {
                if payload.len() > max {
                    return Err(Error::Framing("reply too long"));
                }
                if payload.contains(&TERMINATOR) {
                    return Err(Error::Framing("stray terminator"));
                }
                if payload.is_empty() && max > 0 {
                    // a bare terminator where text was expected is how the
                    // controller refuses a query
                    return Err(Error::Framing("device refused query"));
                }
            }
            ReplyShape::Fixed(_) => {}
        }
        Ok(Self {
            data: payload.to_vec(),
            data_offset: 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.data_offset
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b0 = *self.data.get(self.data_offset).wrap()?;
        self.data_offset += 1;
        Ok(b0)
    }

    /// Read a single ASCII `0` or `1`
    pub fn read_ascii_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            b'0' => Ok(false),
            b'1' => Ok(true),
            _ => Err(Error::Framing("expected 0 or 1")),
        }
    }

    /// Read four ASCII hex digits
    pub fn read_hex_u16(&mut self) -> Result<u16> {
        let digits = self.read_slice(4)?;
        let digits =
            std::str::from_utf8(digits).map_err(|_| Error::Framing("non-ascii hex"))?;
        u16::from_str_radix(digits, 16).map_err(|_| Error::Framing("invalid hex"))
    }

    pub fn expect_u8(&mut self, expected: u8) -> Result<()> {
        if self.read_u8()? == expected {
            Ok(())
        } else {
            Err(Error::Framing("unexpected byte in reply"))
        }
    }

    /// Read a `major.minor` version pair
    pub fn read_version(&mut self) -> Result<String> {
        let major = self.read_u8()?;
        let minor = self.read_u8()?;
        Ok(format!("{major}.{minor}"))
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&[u8]> {
        if self.data_offset + len > self.data.len() {
            return Err(Error::Parse("Requested slice too long"));
        }

        let data = &self.data[self.data_offset..self.data_offset + len];
        self.data_offset += len;
        Ok(data)
    }

    /// Read exactly `N` bytes
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    /// Fail unless the whole payload has been consumed
    pub fn finish(&self) -> Result<()> {
        if self.remaining() == 0 {
            Ok(())
        } else {
            Err(Error::Framing("trailing bytes in reply"))
        }
    }
}
