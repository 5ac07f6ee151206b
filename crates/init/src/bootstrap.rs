//! One-time process and console setup, before any child is started.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::unistd::Pid;
use tracing::debug;

use crate::config::InitConfig;
use crate::constants::{FIRST_PID, UTMP_MODE};
use crate::error::InitError;
use crate::host::Host;

/// Prepare the process to supervise the machine.
///
/// The identity check comes first: if this is not PID 1 nothing else is
/// touched. Every later step is best-effort except the signal table.
pub fn run<H: Host>(host: &mut H, config: &InitConfig) -> Result<(), InitError> {
    let pid = host.process_id();
    if pid != Pid::from_raw(FIRST_PID) {
        return Err(InitError::NotFirstProcess { pid });
    }

    host.set_file_creation_mask(config.umask);
    if let Err(e) = host.disable_kernel_console_log() {
        debug!(error = %e, "klogctl failed");
    }
    host.install_signal_table().map_err(InitError::SignalTable)?;
    host.close_standard_descriptors();

    config.console.configure_terminal(config.line_mode);

    if let Err(e) = host.new_session() {
        debug!(error = %e, "setsid failed");
    }
    host.set_search_path(&config.search_path);
    reset_accounting_file(&config.accounting_file);

    config.console.log(&config.banner);
    Ok(())
}

/// Create or empty the login accounting file. Fails quietly while the
/// filesystem holding it is still read-only.
fn reset_accounting_file(path: &Path) {
    let result = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(UTMP_MODE)
        .open(path);
    if let Err(e) = result {
        debug!(path = %path.display(), error = %e, "accounting file not reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeHost, test_config};

    #[test]
    fn refuses_to_run_unless_first_process() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut host = FakeHost::with_pid(42);

        let err = run(&mut host, &config).unwrap_err();

        assert!(matches!(err, InitError::NotFirstProcess { pid } if pid.as_raw() == 42));
        assert!(host.calls.is_empty(), "{:?}", host.calls);
        assert_eq!(std::fs::read_to_string(config.console.path()).unwrap(), "");
        assert!(!config.accounting_file.exists());
    }

    #[test]
    fn performs_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut host = FakeHost::new();

        run(&mut host, &config).unwrap();

        assert_eq!(
            host.calls,
            [
                Call::Umask(0o022),
                Call::DisableKernelLog,
                Call::InstallSignalTable,
                Call::CloseStandardDescriptors,
                Call::NewSession,
                Call::SetSearchPath("/sbin:/usr/sbin:/bin:/usr/bin".into()),
            ]
        );
    }

    #[test]
    fn empties_accounting_file_and_greets_console() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::write(&config.accounting_file, b"stale session").unwrap();

        run(&mut FakeHost::new(), &config).unwrap();

        assert_eq!(std::fs::read(&config.accounting_file).unwrap(), b"");
        let console = std::fs::read_to_string(config.console.path()).unwrap();
        assert_eq!(console, "\rINIT: Welcome to \x1b[34m LFS-Linux\x1b[0m\r\n");
    }

    #[test]
    fn unwritable_accounting_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.accounting_file = dir.path().join("missing-dir").join("utmp");

        run(&mut FakeHost::new(), &config).unwrap();
        assert!(!config.accounting_file.exists());
    }

    #[test]
    fn signal_table_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut host = FakeHost::new();
        host.signal_table_error = Some(nix::errno::Errno::EINVAL);

        let err = run(&mut host, &config).unwrap_err();
        assert!(matches!(err, InitError::SignalTable(_)));
        assert_eq!(host.calls.last(), Some(&Call::InstallSignalTable));
    }
}
