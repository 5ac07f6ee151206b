//! Recording [`Host`] for unit tests.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use init_console::{Console, RetryPolicy};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::config::InitConfig;
use crate::error::SpawnError;
use crate::host::{ChildExit, Event, Host, Target};
use crate::program::{Program, Role};
use crate::signals::ShutdownMode;

/// Side effects, in order. Reading the pid is not one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Umask(u32),
    DisableKernelLog,
    InstallSignalTable,
    CloseStandardDescriptors,
    NewSession,
    SetSearchPath(String),
    Spawn(Role),
    WaitFor(Pid),
    NextEvent(Option<Duration>),
    Signal(Target, Signal),
    Sync,
    Pause(Duration),
    EnableRebootKey,
    Reboot(ShutdownMode),
}

pub struct FakeHost {
    pub pid: Pid,
    pub calls: Vec<Call>,
    /// Handed out by `next_event`; running dry is an `ENOMSG` error.
    pub events: VecDeque<Event>,
    /// Pid given to the next successful spawn.
    pub next_pid: i32,
    /// Init script spawns that fail with `EAGAIN` before one succeeds.
    pub failing_init_spawns: u32,
    /// Same, for the login.
    pub failing_login_spawns: u32,
    pub init_script_code: i32,
    /// Clock advance per non-timeout event.
    pub event_spacing: Duration,
    pub clock: Instant,
    pub signal_table_error: Option<Errno>,
    pub signal_error: Option<Errno>,
    pub reboot_key_error: Option<Errno>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub const REBOOT_REFUSED: Errno = Errno::EPERM;

    pub fn new() -> Self {
        Self::with_pid(1)
    }

    pub fn with_pid(pid: i32) -> Self {
        Self {
            pid: Pid::from_raw(pid),
            calls: Vec::new(),
            events: VecDeque::new(),
            next_pid: 100,
            failing_init_spawns: 0,
            failing_login_spawns: 0,
            init_script_code: 0,
            event_spacing: Duration::from_secs(60),
            clock: Instant::now(),
            signal_table_error: None,
            signal_error: None,
            reboot_key_error: None,
        }
    }

    pub fn script(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn spawned(&self) -> Vec<Role> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Spawn(role) => Some(*role),
                _ => None,
            })
            .collect()
    }
}

pub fn exited(pid: i32, code: i32) -> Event {
    Event::ChildExited(ChildExit {
        pid: Pid::from_raw(pid),
        code,
    })
}

/// Config with every path inside `dir` and a console that gives up at once.
pub fn test_config(dir: &Path) -> InitConfig {
    let console = dir.join("console");
    File::create(&console).ok();
    InitConfig {
        console: Console::new(console).with_retry(RetryPolicy {
            max_attempts: 1,
            delay: Duration::ZERO,
        }),
        accounting_file: dir.join("utmp"),
        ..InitConfig::default()
    }
}

impl Host for FakeHost {
    fn process_id(&self) -> Pid {
        self.pid
    }

    fn set_file_creation_mask(&mut self, mask: u32) {
        self.calls.push(Call::Umask(mask));
    }

    fn disable_kernel_console_log(&mut self) -> Result<(), Errno> {
        self.calls.push(Call::DisableKernelLog);
        Ok(())
    }

    fn install_signal_table(&mut self) -> Result<(), Errno> {
        self.calls.push(Call::InstallSignalTable);
        self.signal_table_error.map_or(Ok(()), Err)
    }

    fn close_standard_descriptors(&mut self) {
        self.calls.push(Call::CloseStandardDescriptors);
    }

    fn new_session(&mut self) -> Result<(), Errno> {
        self.calls.push(Call::NewSession);
        Ok(())
    }

    fn set_search_path(&mut self, value: &str) {
        self.calls.push(Call::SetSearchPath(value.to_string()));
    }

    fn spawn(&mut self, program: &Program) -> Result<Pid, SpawnError> {
        self.calls.push(Call::Spawn(program.role));
        let failures = match program.role {
            Role::InitScript => &mut self.failing_init_spawns,
            Role::Login => &mut self.failing_login_spawns,
        };
        if *failures > 0 {
            *failures -= 1;
            return Err(SpawnError::Fork(Errno::EAGAIN));
        }
        let pid = Pid::from_raw(self.next_pid);
        self.next_pid += 1;
        Ok(pid)
    }

    fn wait_for(&mut self, pid: Pid) -> Result<i32, Errno> {
        self.calls.push(Call::WaitFor(pid));
        Ok(self.init_script_code)
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Event, Errno> {
        self.calls.push(Call::NextEvent(timeout));
        let event = self.events.pop_front().ok_or(Errno::ENOMSG)?;
        self.clock += match event {
            Event::Timeout => timeout.unwrap_or_default(),
            _ => self.event_spacing,
        };
        Ok(event)
    }

    fn send_signal(&mut self, target: Target, signal: Signal) -> Result<(), Errno> {
        self.calls.push(Call::Signal(target, signal));
        self.signal_error.map_or(Ok(()), Err)
    }

    fn sync(&mut self) {
        self.calls.push(Call::Sync);
    }

    fn pause(&mut self, duration: Duration) {
        self.calls.push(Call::Pause(duration));
        self.clock += duration;
    }

    fn enable_reboot_key(&mut self) -> Result<(), Errno> {
        self.calls.push(Call::EnableRebootKey);
        self.reboot_key_error.map_or(Ok(()), Err)
    }

    fn reboot(&mut self, mode: ShutdownMode) -> Errno {
        self.calls.push(Call::Reboot(mode));
        Self::REBOOT_REFUSED
    }

    fn now(&self) -> Instant {
        self.clock
    }
}
