//! Handle communications over an already-open serial port

use serialport::{ClearBuffer, SerialPort};
use std::{
    io::{ErrorKind, Read, Write},
    time::Duration,
};

use super::Socket;
use crate::{Error, Result};

/// Baud rate the hand controller's serial port runs at
pub const NEXSTAR_BAUD: u32 = 9600;

/// A hand controller on a serial port. The port is expected to be opened
/// and configured (9600 8N1, no flow control) by the caller.
pub struct SerialSocket {
    /// Underlying serial port
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSocket")
            .field("port", &self.port.name())
            .finish()
    }
}

impl SerialSocket {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Give the port back to the caller
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl Socket for SerialSocket {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        let written = self.port.write(data)?;
        self.port.flush()?;
        Ok(written)
    }

    fn recv<'buf>(
        &mut self,
        buf: &'buf mut [u8],
        timeout: Duration,
    ) -> Result<&'buf [u8]> {
        self.port.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(read) => Ok(&buf[..read]),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(Error::Timeout(timeout)),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_input(&mut self) -> Result<()> {
        Ok(self.port.clear(ClearBuffer::Input)?)
    }
}
