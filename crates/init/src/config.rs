//! Everything the supervisor needs to know, in one value.
//!
//! There is no configuration file; [`InitConfig::default`] is the system
//! layout. Tests build their own to point paths at temporary directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use init_console::{Console, LineMode};

use crate::constants;
use crate::program::Program;

#[derive(Debug, Clone)]
pub struct InitConfig {
    pub console: Console,
    pub line_mode: LineMode,
    pub search_path: String,
    pub umask: u32,
    pub accounting_file: PathBuf,
    pub banner: String,
    pub init_script: Program,
    pub login: Program,
    pub respawn: RespawnPolicy,
    pub shutdown: ShutdownTiming,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            console: Console::new(constants::CONSOLE),
            line_mode: LineMode::Standard,
            search_path: constants::PATH_DEFAULT.to_string(),
            umask: constants::UMASK,
            accounting_file: PathBuf::from(constants::UTMP),
            banner: constants::BANNER.to_string(),
            init_script: Program::init_script(
                Path::new(constants::SHELL),
                Path::new(constants::SYSINIT),
            ),
            login: Program::login(Path::new(constants::LOGIN)),
            respawn: RespawnPolicy::default(),
            shutdown: ShutdownTiming::default(),
        }
    }
}

/// How the login slot recovers from failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnPolicy {
    /// Delay before retrying a login that could not be forked.
    pub retry_delay: Duration,
    /// Exits sooner than this after spawn are fast exits.
    pub min_stable_runtime: Duration,
    /// Consecutive fast exits before the next spawn is delayed. Zero disables
    /// throttling.
    pub fast_exit_limit: u32,
    pub throttle_delay: Duration,
}

impl Default for RespawnPolicy {
    fn default() -> Self {
        Self {
            retry_delay: constants::SPAWN_RETRY_DELAY,
            min_stable_runtime: constants::MIN_STABLE_RUNTIME,
            fast_exit_limit: constants::FAST_EXIT_LIMIT,
            throttle_delay: constants::THROTTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTiming {
    pub login_grace: Duration,
    pub phase_pause: Duration,
}

impl Default for ShutdownTiming {
    fn default() -> Self {
        Self {
            login_grace: constants::LOGIN_KILL_GRACE,
            phase_pause: constants::SHUTDOWN_PHASE_PAUSE,
        }
    }
}
