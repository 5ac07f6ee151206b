//! The supervisor's view of the kernel.
//!
//! Every process-global side effect goes through [`Host`], so the state
//! machine and shutdown sequence run unchanged against a recording fake.

use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::error::SpawnError;
use crate::program::Program;
use crate::signals::ShutdownMode;

/// A reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: Pid,
    /// Exit status, or 128 + signal number if it was killed.
    pub code: i32,
}

impl ChildExit {
    /// `None` for statuses that are not terminations (stopped, continued).
    pub fn from_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(pid, code) => Some(Self { pid, code }),
            WaitStatus::Signaled(pid, signal, _) => Some(Self {
                pid,
                code: 128 + signal as i32,
            }),
            _ => None,
        }
    }
}

/// What woke the supervise loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ChildExited(ChildExit),
    Shutdown(ShutdownMode),
    /// The requested timeout passed with nothing else happening.
    Timeout,
}

/// Recipient of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Process(Pid),
    /// Every process except the caller (`kill(-1, ...)`).
    AllOthers,
}

pub trait Host {
    fn process_id(&self) -> Pid;

    fn set_file_creation_mask(&mut self, mask: u32);

    /// Stop the kernel from printing its log to the console.
    fn disable_kernel_console_log(&mut self) -> Result<(), Errno>;

    /// Ignore every signal except `SIGCHLD` and the shutdown signals, which
    /// are held for [`Host::next_event`].
    fn install_signal_table(&mut self) -> Result<(), Errno>;

    fn close_standard_descriptors(&mut self);

    fn new_session(&mut self) -> Result<(), Errno>;

    /// Overwrite `PATH`.
    fn set_search_path(&mut self, value: &str);

    /// Start `program` as a session leader with the console as its
    /// controlling terminal and standard descriptors.
    fn spawn(&mut self, program: &Program) -> Result<Pid, SpawnError>;

    /// Block until `pid` exits; returns its [`ChildExit::code`].
    fn wait_for(&mut self, pid: Pid) -> Result<i32, Errno>;

    /// Block until a child exits, a shutdown signal arrives, or `timeout`
    /// passes. `None` waits forever.
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Event, Errno>;

    fn send_signal(&mut self, target: Target, signal: Signal) -> Result<(), Errno>;

    /// Flush filesystem buffers.
    fn sync(&mut self);

    fn pause(&mut self, duration: Duration);

    /// Let Ctrl-Alt-Del reboot the machine immediately.
    fn enable_reboot_key(&mut self) -> Result<(), Errno>;

    /// Restart or power off. Returns only if the kernel refused.
    fn reboot(&mut self, mode: ShutdownMode) -> Errno;

    fn now(&self) -> Instant;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_shell_convention() {
        let pid = Pid::from_raw(7);
        assert_eq!(
            ChildExit::from_status(WaitStatus::Exited(pid, 3)),
            Some(ChildExit { pid, code: 3 })
        );
        assert_eq!(
            ChildExit::from_status(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
            Some(ChildExit { pid, code: 137 })
        );
        assert_eq!(
            ChildExit::from_status(WaitStatus::Stopped(pid, Signal::SIGSTOP)),
            None
        );
    }
}
