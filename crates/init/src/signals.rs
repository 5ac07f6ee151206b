//! The two shutdown signals and what they select.

use std::fmt;

use nix::sys::reboot::RebootMode;
use nix::sys::signal::Signal;

/// What happens once every process is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    Restart,
    PowerOff,
}

impl ShutdownMode {
    /// Signals that start a shutdown, in mode order.
    pub const SIGNALS: [Signal; 2] = [Signal::SIGUSR1, Signal::SIGUSR2];

    /// `SIGUSR1` restarts, `SIGUSR2` powers off; nothing else shuts down.
    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::SIGUSR1 => Some(ShutdownMode::Restart),
            Signal::SIGUSR2 => Some(ShutdownMode::PowerOff),
            _ => None,
        }
    }

    pub fn signal(self) -> Signal {
        match self {
            ShutdownMode::Restart => Signal::SIGUSR1,
            ShutdownMode::PowerOff => Signal::SIGUSR2,
        }
    }

    pub fn reboot_mode(self) -> RebootMode {
        match self {
            ShutdownMode::Restart => RebootMode::RB_AUTOBOOT,
            ShutdownMode::PowerOff => RebootMode::RB_POWER_OFF,
        }
    }
}

impl fmt::Display for ShutdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownMode::Restart => f.write_str("restart"),
            ShutdownMode::PowerOff => f.write_str("power-off"),
        }
    }
}
