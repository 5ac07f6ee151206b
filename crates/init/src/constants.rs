//! Fixed paths, timings and limits.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Console device.
pub const CONSOLE: &str = "/dev/console";

/// Interpreter for the init script.
pub const SHELL: &str = "/bin/bash";

/// One-time system initialization script.
pub const SYSINIT: &str = "/etc/sysinit";

/// Login program kept running on the console.
pub const LOGIN: &str = "/sbin/sulogin";

/// Login accounting records, emptied at boot.
pub const UTMP: &str = "/var/run/utmp";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// `PATH` for this process and everything it starts.
pub const PATH_DEFAULT: &str = "/sbin:/usr/sbin:/bin:/usr/bin";

/// File creation mask.
pub const UMASK: u32 = 0o022;

/// Permissions of the accounting file.
pub const UTMP_MODE: u32 = 0o644;

pub const BANNER: &str = "Welcome to \x1b[34m LFS-Linux\x1b[0m";

// ---------------------------------------------------------------------------
// Process identity and exit codes
// ---------------------------------------------------------------------------

/// The only pid allowed to run this program.
pub const FIRST_PID: i32 = 1;

/// Exit status of a child whose exec failed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// `klogctl` action that stops kernel messages going to the console.
pub const SYSLOG_ACTION_CONSOLE_OFF: i32 = 6;

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Pause after killing the login.
pub const LOGIN_KILL_GRACE: Duration = Duration::from_secs(1);

/// Pause after each broadcast signal.
pub const SHUTDOWN_PHASE_PAUSE: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Login respawn
// ---------------------------------------------------------------------------

/// Wait before retrying a login that could not be forked.
pub const SPAWN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A login that exits sooner than this counts as a fast exit.
pub const MIN_STABLE_RUNTIME: Duration = Duration::from_secs(2);

/// Consecutive fast exits tolerated before respawn is delayed.
pub const FAST_EXIT_LIMIT: u32 = 5;

/// Delay applied once the fast exit limit is hit.
pub const THROTTLE_DELAY: Duration = Duration::from_secs(10);
