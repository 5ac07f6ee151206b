//! Fixed-delay retry policy with an injectable sleeper.

use std::thread;
use std::time::Duration;

/// Pauses between attempts. Production code uses [`ThreadSleeper`]; tests
/// substitute a recorder so no real time passes.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Retry an operation a bounded number of times with a fixed delay between
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Five attempts, 10ms apart.
    pub const CONSOLE_OPEN: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_millis(10),
    };

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. The sleeper is called only
    /// between attempts, never after the last one. Returns the last error on
    /// exhaustion. A policy with `max_attempts == 0` still makes one attempt.
    pub fn run<T, E>(
        &self,
        sleeper: &mut dyn Sleeper,
        mut op: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<T, E> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(_) => {
                    sleeper.sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
