use std::thread;

use init::{InitConfig, InitError, LinuxHost, Supervisor};
use tracing::error;

fn main() {
    let config = InitConfig::default();

    // The subscriber opens the console only when an event fires, and none
    // fires before the identity check.
    if let Err(e) = init_console::init_tracing(config.console.clone()) {
        eprintln!("init: logging unavailable: {e}");
    }

    let mut supervisor = Supervisor::new(LinuxHost::new(config.console.clone()), config);
    match supervisor.run() {
        Ok(never) => match never {},
        Err(e @ InitError::NotFirstProcess { .. }) => {
            eprintln!("init: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "init cannot continue");
            halt()
        }
    }
}

/// PID 1 exiting panics the kernel; stay resident instead.
fn halt() -> ! {
    loop {
        thread::park();
    }
}
