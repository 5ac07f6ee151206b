//! Starting a child as a session leader on the console.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::os::fd::IntoRawFd;
use std::os::unix::ffi::OsStrExt;

use init_console::{Access, Console};
use nix::unistd::{ForkResult, Pid, execv, fork, setsid};

use crate::constants::EXEC_FAILURE_STATUS;
use crate::error::SpawnError;
use crate::pid1;
use crate::program::Program;

/// Fork and exec `program` in a new session that owns the console.
///
/// Arguments are converted before forking so the child only has to make
/// syscalls. If the exec fails the child reports it on the console and
/// exits with [`EXEC_FAILURE_STATUS`].
pub fn spawn_on_console(console: &Console, program: &Program) -> Result<Pid, SpawnError> {
    let invalid = || SpawnError::InvalidProgram {
        path: program.path.clone(),
    };
    let path = CString::new(program.path.as_os_str().as_bytes()).map_err(|_| invalid())?;
    let argv = program
        .args
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    // SAFETY: the supervisor never starts threads, so the child is a full
    // copy of a single-threaded process and may run arbitrary code.
    match unsafe { fork() }.map_err(SpawnError::Fork)? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => exec_on_console(console, &path, &argv),
    }
}

fn exec_on_console(console: &Console, path: &CStr, argv: &[CString]) -> ! {
    pid1::reset_signal_table();
    let _ = setsid();
    if let Ok(tty) = console.open(Access::READ_WRITE) {
        attach_console(tty);
    }

    let err = match execv(path, argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    console.log(&format!("can't execute {}: {err}", path.to_string_lossy()));

    // SAFETY: _exit() is the correct way to terminate a forked child.
    // std::process::exit() would run atexit handlers shared with the parent.
    unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
}

/// Make `tty` the controlling terminal and standard descriptors 0, 1, 2.
fn attach_console(tty: File) {
    let fd = tty.into_raw_fd();
    let steal: libc::c_int = 1;
    // SAFETY: fd is an open terminal we own. A non-zero argument takes the
    // terminal even if another session holds it.
    unsafe {
        libc::ioctl(fd, libc::TIOCSCTTY, steal);
    }
    for target in 0..=2 {
        // SAFETY: both descriptors are valid; dup2 onto itself is a no-op.
        unsafe {
            libc::dup2(fd, target);
        }
    }
    if fd > 2 {
        // SAFETY: fd is ours and no longer needed once duplicated.
        unsafe {
            libc::close(fd);
        }
    }
}
