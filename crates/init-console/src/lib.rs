//! Console access for the first process.
//!
//! Bounded, non-blocking opens of the console device, the canonical line
//! configuration applied at boot, and best-effort diagnostic output (plain
//! writes and a `tracing` subscriber on top of them).

mod backoff;
mod console;
mod logging;
mod termios;

pub use backoff::{RetryPolicy, Sleeper, ThreadSleeper};
pub use console::{Access, Console, ConsoleError, LOG_PREFIX};
pub use logging::{ConsoleWriter, init_tracing, subscriber};
pub use termios::{LineMode, apply_canonical};
