#![allow(missing_docs, clippy::missing_docs_in_private_items)]

use crate::system::FirmwareInfo;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No serial port provided and simulation is disabled")]
    NoPort,

    #[cfg(feature = "serial")]
    #[error("serial port error")]
    Serial(#[from] serialport::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Failed to write frame ({written} of {len} bytes)")]
    Write { written: usize, len: usize },

    /// Anything that went wrong before the frame was fully handed to the
    /// transport. The source is boxed, so walking the chain yields a
    /// `Box<Error>`; see [`Error::inner`].
    #[error("Failed to send frame")]
    Transmit(#[source] Box<Error>),

    #[error("No reply terminator within {0:?}")]
    Timeout(Duration),

    #[error("Malformed reply: {0}")]
    Framing(&'static str),

    /// As with [`Error::Transmit`], the chained source is a `Box<Error>`
    #[error("Firmware query failed after partial results")]
    PartialAggregate {
        partial: Box<FirmwareInfo>,
        #[source]
        source: Box<Error>,
    },

    #[error("Parse error")]
    Parse(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Invalid charactors for string")]
    InvalidString(#[from] std::string::FromUtf8Error),

    #[error("Integer out of range for type")]
    IntOutOfRange(#[from] std::num::TryFromIntError),
}

/// Coarse classification of an [`Error`], for callers that only care about
/// which stage of a transaction went wrong
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The frame could not be handed to the transport in full
    TransportWrite,
    /// The transport reported a read error other than a timeout
    TransportRead,
    /// No terminator arrived within the read window
    ProtocolTimeout,
    /// The device answered with something that isn't a valid reply
    ProtocolFraming,
    /// A composite query failed partway through
    PartialAggregate,
    /// Arguments or configuration rejected before anything was sent
    InvalidArgument,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Write { .. } | Self::Transmit(_) => ErrorKind::TransportWrite,
            Self::Timeout(_) => ErrorKind::ProtocolTimeout,
            Self::Framing(_)
            | Self::Parse(_)
            | Self::InvalidString(_)
            | Self::IntOutOfRange(_) => ErrorKind::ProtocolFraming,
            Self::PartialAggregate { .. } => ErrorKind::PartialAggregate,
            Self::NoPort | Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Io(_) => ErrorKind::TransportRead,
            #[cfg(feature = "serial")]
            Self::Serial(_) => ErrorKind::TransportRead,
        }
    }

    /// The error a wrapping variant was raised for, if any
    pub fn inner(&self) -> Option<&Error> {
        match self {
            Self::Transmit(source) | Self::PartialAggregate { source, .. } => Some(&**source),
            _ => None,
        }
    }

    /// Error found by following a `source()` chain link that came from
    /// this crate, whether it was chained boxed or not
    pub fn from_source<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a Error> {
        err.downcast_ref::<Error>()
            .or_else(|| err.downcast_ref::<Box<Error>>().map(|b| &**b))
    }
}

/// Trait for converting an `Option<T>` into a `Result<T>`
pub trait ErrWrap<T> {
    /// Convert `self` into a `Result`
    fn wrap(self) -> Result<T>;
}

impl<T> ErrWrap<T> for Option<T> {
    fn wrap(self) -> Result<T> {
        self.ok_or(Error::Parse("Reached end of input"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_aggregate_keeps_inner_kind() {
        let err = Error::PartialAggregate {
            partial: Box::default(),
            source: Box::new(Error::Timeout(Duration::from_secs(1))),
        };
        assert_eq!(err.kind(), ErrorKind::PartialAggregate);
        let source = std::error::Error::source(&err).unwrap();
        let source = Error::from_source(source).unwrap();
        assert_eq!(source.kind(), ErrorKind::ProtocolTimeout);
        assert_eq!(err.inner().unwrap().kind(), ErrorKind::ProtocolTimeout);
    }

    #[test]
    fn transmit_is_write_stage() {
        let io = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert_eq!(Error::Io(io).kind(), ErrorKind::TransportRead);

        let io = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        let err = Error::Transmit(Box::new(Error::Io(io)));
        assert_eq!(err.kind(), ErrorKind::TransportWrite);
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(Error::from_source(source).unwrap().kind(), ErrorKind::TransportRead);
    }

    #[test]
    fn missing_port_is_configuration_error() {
        assert_eq!(Error::NoPort.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn wrap_none_is_parse_error() {
        let err = None::<u8>.wrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolFraming);
    }
}
