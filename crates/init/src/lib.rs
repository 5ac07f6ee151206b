//! First process for a small Linux system.
//!
//! Runs as PID 1 and owns the machine's lifetime:
//!
//! 1. Bootstrap: identity check, signal table, console line settings,
//!    session, `PATH`, accounting file, banner
//! 2. Run the init script once and wait for it
//! 3. Keep a login running on the console, respawning it when it exits
//! 4. On `SIGUSR1` (restart) or `SIGUSR2` (power-off): kill the login,
//!    terminate then kill every other process, and hand the machine back to
//!    the kernel
//!
//! Signals are never handled asynchronously. They are blocked and collected
//! by the supervise loop, which also reaps every zombie (including orphans
//! re-parented to PID 1).

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod linux;
mod pid1;
pub mod program;
pub mod shutdown;
pub mod signals;
mod spawn;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use config::InitConfig;
pub use error::{InitError, SpawnError};
pub use host::{ChildExit, Event, Host, Target};
pub use linux::LinuxHost;
pub use signals::ShutdownMode;
pub use supervisor::{State, Supervisor};
