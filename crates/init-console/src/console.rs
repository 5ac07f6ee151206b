//! The console device.
//!
//! Never held open: every operation opens the device, acts, and closes it
//! again, so nothing here can pin the console or block the caller.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::sys::termios::{FlushArg, SetArg, tcflush, tcgetattr, tcsetattr};
use tracing::{debug, warn};

use crate::backoff::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::termios::{self, LineMode};

/// Prefix for every diagnostic line written by [`Console::log`].
pub const LOG_PREFIX: &str = "\rINIT: ";

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("open {} failed after {attempts} attempts: {source}", path.display())]
    Open {
        path: PathBuf,
        attempts: u32,
        source: std::io::Error,
    },

    #[error("restore blocking mode on {}: {source}", path.display())]
    Blocking {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Requested access for a console descriptor.
///
/// `O_NOCTTY` is always set: opening the console never makes it the
/// caller's controlling terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub nonblocking: bool,
}

impl Access {
    pub const READ_WRITE: Access = Access {
        read: true,
        write: true,
        nonblocking: false,
    };

    pub const WRITE_NONBLOCKING: Access = Access {
        read: false,
        write: true,
        nonblocking: true,
    };
}

#[derive(Debug, Clone)]
pub struct Console {
    path: PathBuf,
    retry: RetryPolicy,
}

impl Console {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retry: RetryPolicy::CONSOLE_OPEN,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self, access: Access) -> Result<File, ConsoleError> {
        self.open_with(access, &mut ThreadSleeper)
    }

    /// Open the console, forcing `O_NONBLOCK` for the open itself so a
    /// wedged line cannot hang us.
    ///
    /// Emits no tracing events: the log writer itself opens the console
    /// through here.
    ///
    /// Retries per the console's [`RetryPolicy`]. If `access` is blocking,
    /// `O_NONBLOCK` is cleared again once the descriptor exists.
    pub fn open_with(&self, access: Access, sleeper: &mut dyn Sleeper) -> Result<File, ConsoleError> {
        let mut options = OpenOptions::new();
        options
            .read(access.read)
            .write(access.write)
            .append(access.write)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK);

        let file = self
            .retry
            .run(sleeper, |_| options.open(&self.path))
            .map_err(|source| ConsoleError::Open {
                path: self.path.clone(),
                attempts: self.retry.max_attempts.max(1),
                source,
            })?;

        if !access.nonblocking {
            clear_nonblocking(&file).map_err(|source| ConsoleError::Blocking {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(file)
    }

    /// Put the line into the canonical configuration and drop any queued
    /// input and output. Failures are logged, never returned.
    pub fn configure_terminal(&self, mode: LineMode) {
        let tty = match self.open(Access::READ_WRITE) {
            Ok(tty) => tty,
            Err(e) => {
                warn!(error = %e, "can't open console!");
                return;
            }
        };

        let mut attrs = match tcgetattr(&tty) {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!(error = %e, "console attributes unavailable, starting from blank");
                termios::blank()
            }
        };
        termios::apply_canonical(&mut attrs, mode);

        if let Err(e) = tcsetattr(&tty, SetArg::TCSANOW, &attrs) {
            warn!(path = %self.path.display(), error = %e, "failed to set console attributes");
        }
        if let Err(e) = tcflush(&tty, FlushArg::TCIOFLUSH) {
            debug!(path = %self.path.display(), error = %e, "failed to flush console queues");
        }
    }

    /// Best-effort write. Dropped silently if the console cannot be opened.
    pub fn write_line(&self, text: &str) {
        self.write_line_with(text, &mut ThreadSleeper);
    }

    pub fn write_line_with(&self, text: &str, sleeper: &mut dyn Sleeper) {
        if let Ok(mut out) = self.open_with(Access::WRITE_NONBLOCKING, sleeper) {
            let _ = out.write_all(text.as_bytes());
        }
    }

    /// Write one `"\rINIT: <message>\r\n"` line.
    pub fn log(&self, message: &str) {
        self.write_line(&format!("{LOG_PREFIX}{message}\r\n"));
    }
}

fn clear_nonblocking(file: &File) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid open descriptor owned by `file`.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: as above; F_SETFL only changes status flags.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
