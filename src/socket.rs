//! Abstraction over the link to the hand controller (a real serial port
//! or the in-process simulator) so the transaction engine is written once
//! and runs unchanged against either backend

use crate::Result;
use std::time::Duration;

#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;

use sim::Simulator;

/// Byte transport to a hand controller. Implementations neither open nor
/// configure the underlying link; they only move bytes over it.
pub trait Socket {
    /// Send the provided data over the socket, returning the number of
    /// bytes accepted
    fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Wait up to `timeout` for data and read it into the provided
    /// buffer, returning the subslice that was read into. Fails with
    /// [`Error::Timeout`](crate::Error::Timeout) if nothing arrives in
    /// time.
    fn recv<'buf>(
        &mut self,
        buf: &'buf mut [u8],
        timeout: Duration,
    ) -> Result<&'buf [u8]>;

    /// Throw away anything received but not yet read, so a late reply
    /// to an earlier exchange can't be taken for the next one
    fn clear_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// Simulated mount state, if this socket is a simulator
    fn simulator(&mut self) -> Option<&mut Simulator> {
        None
    }
}

impl<S: Socket + ?Sized> Socket for Box<S> {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn recv<'buf>(
        &mut self,
        buf: &'buf mut [u8],
        timeout: Duration,
    ) -> Result<&'buf [u8]> {
        (**self).recv(buf, timeout)
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }

    fn simulator(&mut self) -> Option<&mut Simulator> {
        (**self).simulator()
    }
}
