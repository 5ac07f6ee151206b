//! [`Host`] backed by the running Linux kernel.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use init_console::Console;
use nix::errno::Errno;
use nix::sys::reboot::{reboot, set_cad_enabled};
use nix::sys::signal::{SigSet, Signal, kill};
use nix::sys::stat::{Mode, umask};
use nix::unistd::{Pid, getpid, setsid};

use crate::constants::SYSLOG_ACTION_CONSOLE_OFF;
use crate::error::SpawnError;
use crate::host::{ChildExit, Event, Host, Target};
use crate::pid1;
use crate::program::Program;
use crate::signals::ShutdownMode;
use crate::spawn;

pub struct LinuxHost {
    console: Console,
    /// Empty until [`Host::install_signal_table`] runs.
    watched: SigSet,
    /// Exits reaped but not yet handed out.
    exits: VecDeque<ChildExit>,
}

impl LinuxHost {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            watched: SigSet::empty(),
            exits: VecDeque::new(),
        }
    }
}

impl Host for LinuxHost {
    fn process_id(&self) -> Pid {
        getpid()
    }

    fn set_file_creation_mask(&mut self, mask: u32) {
        let _previous = umask(Mode::from_bits_truncate(mask));
    }

    fn disable_kernel_console_log(&mut self) -> Result<(), Errno> {
        // SAFETY: this action takes no buffer.
        let rc = unsafe { libc::klogctl(SYSLOG_ACTION_CONSOLE_OFF, std::ptr::null_mut(), 0) };
        Errno::result(rc).map(drop)
    }

    fn install_signal_table(&mut self) -> Result<(), Errno> {
        self.watched = pid1::install_signal_table()?;
        Ok(())
    }

    fn close_standard_descriptors(&mut self) {
        for fd in 0..=2 {
            // SAFETY: closing a possibly unopened descriptor only yields EBADF.
            unsafe {
                libc::close(fd);
            }
        }
    }

    fn new_session(&mut self) -> Result<(), Errno> {
        setsid().map(drop)
    }

    fn set_search_path(&mut self, value: &str) {
        // SAFETY: called during bootstrap; this process never starts threads.
        unsafe {
            std::env::set_var("PATH", value);
        }
    }

    fn spawn(&mut self, program: &Program) -> Result<Pid, SpawnError> {
        spawn::spawn_on_console(&self.console, program)
    }

    fn wait_for(&mut self, pid: Pid) -> Result<i32, Errno> {
        pid1::wait_blocking(pid)
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Event, Errno> {
        loop {
            if let Some(exit) = self.exits.pop_front() {
                return Ok(Event::ChildExited(exit));
            }
            match pid1::wait_signal(&self.watched, timeout)? {
                None => return Ok(Event::Timeout),
                Some(Signal::SIGCHLD) => self.exits.extend(pid1::reap_exits()),
                Some(signal) => {
                    if let Some(mode) = ShutdownMode::from_signal(signal) {
                        return Ok(Event::Shutdown(mode));
                    }
                }
            }
        }
    }

    fn send_signal(&mut self, target: Target, signal: Signal) -> Result<(), Errno> {
        let pid = match target {
            Target::Process(pid) => pid,
            Target::AllOthers => Pid::from_raw(-1),
        };
        kill(pid, signal)
    }

    fn sync(&mut self) {
        nix::unistd::sync();
    }

    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    fn enable_reboot_key(&mut self) -> Result<(), Errno> {
        set_cad_enabled(true)
    }

    fn reboot(&mut self, mode: ShutdownMode) -> Errno {
        match reboot(mode.reboot_mode()) {
            Ok(never) => match never {},
            Err(e) => e,
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
