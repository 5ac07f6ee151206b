//! Ordered teardown of every other process, ending in restart or power-off.

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::config::ShutdownTiming;
use crate::constants::FIRST_PID;
use crate::host::{Host, Target};
use crate::signals::ShutdownMode;

/// Shutdown steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    KillLogin,
    EnableRebootKey,
    TerminateAll,
    KillAll,
    SignalSelf,
}

impl Phase {
    pub const SEQUENCE: [Phase; 5] = [
        Phase::KillLogin,
        Phase::EnableRebootKey,
        Phase::TerminateAll,
        Phase::KillAll,
        Phase::SignalSelf,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::KillLogin => "kill-login",
            Phase::EnableRebootKey => "enable-reboot-key",
            Phase::TerminateAll => "terminate-all",
            Phase::KillAll => "kill-all",
            Phase::SignalSelf => "signal-self",
        };
        f.write_str(name)
    }
}

/// Run every phase, then ask the kernel to `mode`.
///
/// Called once, from the supervise loop; it never hands control back to it.
/// Returns only if the kernel refuses the request.
pub fn execute<H: Host>(
    host: &mut H,
    login: Option<Pid>,
    mode: ShutdownMode,
    timing: &ShutdownTiming,
) -> Errno {
    info!(%mode, "shutdown requested");
    for phase in Phase::SEQUENCE {
        debug!(%phase, "shutdown phase");
        run_phase(host, phase, login, timing);
    }
    host.reboot(mode)
}

fn run_phase<H: Host>(host: &mut H, phase: Phase, login: Option<Pid>, timing: &ShutdownTiming) {
    match phase {
        Phase::KillLogin => {
            match login {
                Some(pid) => signal(host, Target::Process(pid), Signal::SIGKILL),
                None => info!("no login running"),
            }
            host.pause(timing.login_grace);
        }
        Phase::EnableRebootKey => {
            if let Err(e) = host.enable_reboot_key() {
                warn!(error = %e, "failed to enable Ctrl-Alt-Del");
            }
        }
        Phase::TerminateAll => {
            info!("The system is going down NOW!");
            info!("Sending SIGTERM to all processes");
            broadcast(host, Signal::SIGTERM, timing);
        }
        Phase::KillAll => {
            info!("Sending SIGKILL to all processes");
            broadcast(host, Signal::SIGKILL, timing);
        }
        Phase::SignalSelf => {
            // SIGTERM is ignored by this process, so this does nothing. Left in
            // place until it is clear nothing relies on the extra signal.
            signal(host, Target::Process(Pid::from_raw(FIRST_PID)), Signal::SIGTERM);
        }
    }
}

fn broadcast<H: Host>(host: &mut H, sig: Signal, timing: &ShutdownTiming) {
    signal(host, Target::AllOthers, sig);
    host.sync();
    host.pause(timing.phase_pause);
}

/// `ESRCH` (nobody left to signal) is expected and not worth reporting.
fn signal<H: Host>(host: &mut H, target: Target, sig: Signal) {
    match host.send_signal(target, sig) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(?target, %sig, error = %e, "kill failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeHost};
    use std::time::Duration;

    fn timing() -> ShutdownTiming {
        ShutdownTiming {
            login_grace: Duration::from_secs(1),
            phase_pause: Duration::from_secs(2),
        }
    }

    #[test]
    fn runs_every_phase_in_order_then_reboots() {
        let mut host = FakeHost::new();
        let login = Pid::from_raw(101);

        let err = execute(&mut host, Some(login), ShutdownMode::PowerOff, &timing());

        assert_eq!(err, FakeHost::REBOOT_REFUSED);
        assert_eq!(
            host.calls,
            [
                Call::Signal(Target::Process(login), Signal::SIGKILL),
                Call::Pause(Duration::from_secs(1)),
                Call::EnableRebootKey,
                Call::Signal(Target::AllOthers, Signal::SIGTERM),
                Call::Sync,
                Call::Pause(Duration::from_secs(2)),
                Call::Signal(Target::AllOthers, Signal::SIGKILL),
                Call::Sync,
                Call::Pause(Duration::from_secs(2)),
                Call::Signal(Target::Process(Pid::from_raw(1)), Signal::SIGTERM),
                Call::Reboot(ShutdownMode::PowerOff),
            ]
        );
    }

    #[test]
    fn nothing_is_skipped_when_no_processes_remain() {
        let mut host = FakeHost::new();
        host.signal_error = Some(Errno::ESRCH);
        host.reboot_key_error = Some(Errno::EPERM);

        execute(&mut host, None, ShutdownMode::Restart, &timing());

        let broadcasts = host
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Signal(Target::AllOthers, _)))
            .count();
        assert_eq!(broadcasts, 2);
        assert_eq!(host.calls.iter().filter(|c| **c == Call::Sync).count(), 2);
        assert!(host.calls.contains(&Call::EnableRebootKey));
        assert_eq!(host.calls.first(), Some(&Call::Pause(Duration::from_secs(1))));
        assert_eq!(host.calls.last(), Some(&Call::Reboot(ShutdownMode::Restart)));
    }

    #[test]
    fn phases_have_stable_names() {
        let names: Vec<String> = Phase::SEQUENCE.iter().map(Phase::to_string).collect();
        assert_eq!(
            names,
            ["kill-login", "enable-reboot-key", "terminate-all", "kill-all", "signal-self"]
        );
    }
}
