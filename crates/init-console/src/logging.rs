//! `tracing` output routed to the console.
//!
//! Each event is formatted into a buffer and written as a single
//! `"\rINIT: ..."` line when the writer is dropped, so one event costs one
//! open/write/close of the device. Events are lost if the console is gone.

use std::fmt;
use std::io;
use std::time::Instant;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::FormatTime;

use crate::console::Console;

/// Stamp for console lines: time since logging started, which is close to
/// boot uptime for the first process. Printed as `[mm:ss:mmm]`.
struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

/// Hands out one [`ConsoleLine`] per event.
#[derive(Debug, Clone)]
pub struct ConsoleWriter {
    console: Console,
}

impl ConsoleWriter {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine {
            console: self.console.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffer for a single formatted event.
pub struct ConsoleLine {
    console: Console,
    buf: Vec<u8>,
}

impl io::Write for ConsoleLine {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        self.console.log(text.trim_end());
    }
}

/// Subscriber writing INFO and above to `console`.
pub fn subscriber(console: Console) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_writer(ConsoleWriter::new(console))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .finish()
}

/// Install [`subscriber`] as the global default.
pub fn init_tracing(console: Console) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(subscriber(console))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn events_become_prefixed_console_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console");
        File::create(&path).unwrap();

        tracing::subscriber::with_default(subscriber(Console::new(&path)), || {
            tracing::warn!(status = 3, "init script failed");
            tracing::debug!("filtered out");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("\rINIT: ["), "{written:?}");
        assert!(written.contains("WARN"), "{written:?}");
        assert!(written.contains("init script failed status=3"), "{written:?}");
        assert!(!written.contains("filtered out"));
        assert!(written.ends_with("\r\n"));
        assert_eq!(written.matches("\rINIT: ").count(), 1);
    }

    #[test]
    fn missing_console_drops_events() {
        let dir = tempfile::tempdir().unwrap();
        let console = Console::new(dir.path().join("absent")).with_retry(
            crate::backoff::RetryPolicy {
                max_attempts: 1,
                delay: std::time::Duration::ZERO,
            },
        );
        tracing::subscriber::with_default(subscriber(console), || {
            tracing::error!("nowhere to go");
        });
        assert!(!dir.path().join("absent").exists());
    }
}
