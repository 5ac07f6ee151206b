//! The first process's state machine.
//!
//! ```text
//! Bootstrap -> RunInitScript -> SuperviseLogin -> ShuttingDown
//! ```
//!
//! `ShuttingDown` is entered only from a shutdown signal and is never left.
//! The tracked login pid lives here and is only touched from this loop;
//! signals reach it as [`Event`]s, never through a handler.

use std::convert::Infallible;
use std::time::Instant;

use nix::unistd::Pid;
use tracing::{debug, error, info, warn};

use crate::bootstrap;
use crate::config::InitConfig;
use crate::error::InitError;
use crate::host::{ChildExit, Event, Host};
use crate::shutdown;
use crate::signals::ShutdownMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Bootstrap,
    RunInitScript,
    SuperviseLogin,
    ShuttingDown(ShutdownMode),
}

/// The respawned login child.
#[derive(Debug, Default)]
struct LoginSlot {
    pid: Option<Pid>,
    started: Option<Instant>,
    /// Consecutive exits shorter than the policy's stable runtime.
    fast_exits: u32,
    /// Set while the slot is empty and a spawn is scheduled.
    respawn_at: Option<Instant>,
}

pub struct Supervisor<H: Host> {
    host: H,
    config: InitConfig,
    state: State,
    login: LoginSlot,
}

impl<H: Host> Supervisor<H> {
    pub fn new(host: H, config: InitConfig) -> Self {
        Self {
            host,
            config,
            state: State::Bootstrap,
            login: LoginSlot::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Tracked login pid, if one is running.
    pub fn login_pid(&self) -> Option<Pid> {
        self.login.pid
    }

    /// Run the machine until it shuts down.
    ///
    /// Never returns `Ok`. An error either comes from bootstrap (the process
    /// is not PID 1, or signals could not be set up) or means the kernel
    /// refused the final restart/power-off request.
    pub fn run(&mut self) -> Result<Infallible, InitError> {
        bootstrap::run(&mut self.host, &self.config)?;

        self.enter(State::RunInitScript);
        self.run_init_script();

        self.enter(State::SuperviseLogin);
        let mode = self.supervise()?;

        self.enter(State::ShuttingDown(mode));
        let source = shutdown::execute(&mut self.host, self.login.pid, mode, &self.config.shutdown);
        Err(InitError::Reboot { mode, source })
    }

    fn enter(&mut self, state: State) {
        debug!(from = ?self.state, to = ?state, "state change");
        self.state = state;
    }

    /// Start the init script and wait for it. Its outcome is advisory.
    fn run_init_script(&mut self) {
        let pid = match self.host.spawn(&self.config.init_script) {
            Ok(pid) => pid,
            Err(e) => {
                warn!(error = %e, "can't start init script");
                return;
            }
        };
        match self.host.wait_for(pid) {
            Ok(0) => debug!(%pid, "init script finished"),
            Ok(code) => warn!(%pid, code, "sysinit error!"),
            Err(e) => warn!(%pid, error = %e, "lost track of init script"),
        }
    }

    /// Keep a login running until a shutdown signal arrives.
    fn supervise(&mut self) -> Result<ShutdownMode, InitError> {
        info!("starting login ...");
        self.spawn_login();

        loop {
            let timeout = self
                .login
                .respawn_at
                .map(|at| at.saturating_duration_since(self.host.now()));
            match self.host.next_event(timeout).map_err(InitError::EventWait)? {
                Event::Shutdown(mode) => return Ok(mode),
                Event::ChildExited(exit) => self.on_child_exit(exit),
                Event::Timeout => self.on_timeout(),
            }
        }
    }

    fn on_child_exit(&mut self, exit: ChildExit) {
        if self.login.pid != Some(exit.pid) {
            debug!(pid = %exit.pid, code = exit.code, "reaped");
            return;
        }

        let now = self.host.now();
        let policy = self.config.respawn;
        let ran_for = self
            .login
            .started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        self.login.pid = None;
        self.login.started = None;

        if ran_for < policy.min_stable_runtime {
            self.login.fast_exits += 1;
        } else {
            self.login.fast_exits = 0;
        }

        if policy.fast_exit_limit > 0 && self.login.fast_exits >= policy.fast_exit_limit {
            warn!(
                pid = %exit.pid,
                code = exit.code,
                delay_secs = policy.throttle_delay.as_secs(),
                "login respawning too fast, delaying"
            );
            self.login.fast_exits = 0;
            self.login.respawn_at = Some(now + policy.throttle_delay);
            return;
        }

        debug!(pid = %exit.pid, code = exit.code, "login exited");
        self.spawn_login();
    }

    fn on_timeout(&mut self) {
        if let Some(at) = self.login.respawn_at
            && self.host.now() >= at
        {
            self.spawn_login();
        }
    }

    /// Fill the login slot. On failure the slot stays empty and a retry is
    /// scheduled.
    fn spawn_login(&mut self) {
        let now = self.host.now();
        match self.host.spawn(&self.config.login) {
            Ok(pid) => {
                debug!(%pid, "login started");
                self.login.pid = Some(pid);
                self.login.started = Some(now);
                self.login.respawn_at = None;
            }
            Err(e) => {
                let delay = self.config.respawn.retry_delay;
                error!(error = %e, retry_secs = delay.as_secs(), "can't start login");
                self.login.respawn_at = Some(now + delay);
            }
        }
    }
}
