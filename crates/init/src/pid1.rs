//! PID 1 signal handling and zombie reaping.
//!
//! No handler functions are installed. The signals the supervisor cares
//! about are blocked and collected synchronously with `sigtimedwait`, so all
//! shutdown logic runs on the normal call stack. Uses `sigaction` (not
//! `signal`) for reliable dispositions.

use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{SigSet, SigmaskHow, Signal, sigprocmask};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use crate::host::ChildExit;
use crate::signals::ShutdownMode;

/// Set the disposition of `sig` to `handler` (`SIG_IGN` or `SIG_DFL`).
fn set_disposition(sig: libc::c_int, handler: libc::sighandler_t) -> Result<(), Errno> {
    // SAFETY: zeroed sigaction is valid; we fill sa_sigaction only.
    let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
    sa.sa_sigaction = handler;
    // SAFETY: sa is properly initialized; invalid signal numbers fail with EINVAL.
    Errno::result(unsafe { libc::sigaction(sig, &sa, std::ptr::null_mut()) }).map(drop)
}

/// Signals delivered to the supervise loop instead of acted on by the kernel.
fn watched_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    for signal in ShutdownMode::SIGNALS {
        set.add(signal);
    }
    set
}

/// Ignore everything, then hold `SIGCHLD`, `SIGUSR1` and `SIGUSR2` for
/// [`wait_signal`].
///
/// The held signals get `SIG_DFL` rather than `SIG_IGN`: a blocked signal
/// whose disposition is ignore is discarded instead of queued.
pub fn install_signal_table() -> Result<SigSet, Errno> {
    for sig in 1..=libc::SIGRTMAX() {
        // SIGKILL, SIGSTOP and the libc-reserved realtime signals refuse.
        let _ = set_disposition(sig, libc::SIG_IGN);
    }

    let watched = watched_signals();
    for signal in watched.iter() {
        set_disposition(signal as libc::c_int, libc::SIG_DFL)?;
    }
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&watched), None)?;
    Ok(watched)
}

/// Undo [`install_signal_table`] in a freshly forked child.
///
/// Ignored dispositions and the blocked mask both survive `exec`.
pub fn reset_signal_table() {
    for sig in 1..=libc::SIGRTMAX() {
        let _ = set_disposition(sig, libc::SIG_DFL);
    }
    let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);
}

/// Take the next pending signal from `set`, blocking up to `timeout`.
///
/// Returns `None` on timeout. Retries on `EINTR`.
pub fn wait_signal(set: &SigSet, timeout: Option<Duration>) -> Result<Option<Signal>, Errno> {
    let timeout = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let timeout_ptr = timeout
        .as_ref()
        .map_or(std::ptr::null(), |ts| ts as *const libc::timespec);
    let raw: &libc::sigset_t = set.as_ref();

    loop {
        // SAFETY: raw is a valid sigset; a null siginfo is allowed; timeout_ptr
        // is null or points at `timeout`, which outlives the call.
        let signo = unsafe { libc::sigtimedwait(raw, std::ptr::null_mut(), timeout_ptr) };
        if signo >= 0 {
            return Signal::try_from(signo).map(Some);
        }
        match Errno::last() {
            Errno::EINTR => continue,
            Errno::EAGAIN => return Ok(None),
            e => return Err(e),
        }
    }
}

/// Block until a specific child exits and return its exit code.
///
/// Retries on `EINTR`. Other descendants exiting meanwhile stay zombies
/// until the next [`reap_exits`].
pub fn wait_blocking(pid: Pid) -> Result<i32, Errno> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(exit) = ChildExit::from_status(status) {
                    return Ok(exit.code);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Reap every child that has already terminated (non-blocking).
///
/// Calls `waitpid(-1, WNOHANG)` until nothing is left; orphans adopted by
/// PID 1 are collected here along with our own children.
pub fn reap_exits() -> Vec<ChildExit> {
    let mut exits = Vec::new();
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => exits.extend(ChildExit::from_status(status)),
            Err(Errno::EINTR) => continue,
            // ECHILD: no children at all
            Err(_) => break,
        }
    }
    exits
}
