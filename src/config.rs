//! Per-handle settings

use std::time::Duration;

/// Name used in log output when none is configured
pub const DEFAULT_DEVICE_NAME: &str = "Celestron GPS";

/// How long a transaction waits for its reply terminator by default
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Echo probes `check_connection` sends before giving up, by default
pub const DEFAULT_CONNECTION_ATTEMPTS: u32 = 2;

/// Settings owned by one [`Celestron`](crate::Celestron) handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Name attached to every log event
    pub device_name: String,
    /// Log every frame sent and received
    pub debug: bool,
    /// Talk to an in-process simulator instead of the serial port
    pub simulation: bool,
    /// Read window of a single transaction
    pub timeout: Duration,
    /// Number of echo probes in a connection check
    pub connection_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            debug: false,
            simulation: false,
            timeout: DEFAULT_TIMEOUT,
            connection_attempts: DEFAULT_CONNECTION_ATTEMPTS,
        }
    }
}

impl Config {
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    #[must_use]
    pub fn debug(mut self, enable: bool) -> Self {
        self.debug = enable;
        self
    }

    #[must_use]
    pub fn simulation(mut self, enable: bool) -> Self {
        self.simulation = enable;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn connection_attempts(mut self, attempts: u32) -> Self {
        self.connection_attempts = attempts;
        self
    }
}
