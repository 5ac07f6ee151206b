//! Error types for the first process.

use std::path::PathBuf;

use nix::errno::Errno;
use nix::unistd::Pid;

use crate::signals::ShutdownMode;

/// Failures that end the supervisor's normal operation.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("must run as process 1, running as {pid}")]
    NotFirstProcess { pid: Pid },

    #[error("signal table: {0}")]
    SignalTable(Errno),

    #[error("waiting for events: {0}")]
    EventWait(Errno),

    #[error("{mode} request refused by kernel: {source}")]
    Reboot { mode: ShutdownMode, source: Errno },
}

/// A child could not be started.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    #[error("invalid program {}: contains NUL byte", path.display())]
    InvalidProgram { path: PathBuf },

    #[error("fork: {0}")]
    Fork(Errno),
}
