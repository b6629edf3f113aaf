//! Single-line progress indicator.

use std::io::Write;
use std::time::Duration;

/// One cycle's progress, rendered as
/// `Rows: N, Uptime: Ns, Since write: Ns, Sleeping: N.NNs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressLine {
    pub rows: u64,
    pub uptime: Duration,
    pub since_write: Duration,
    pub sleeping: Duration,
}

impl std::fmt::Display for ProgressLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rows: {}, Uptime: {}s, Since write: {}s, Sleeping: {:.2}s",
            self.rows,
            self.uptime.as_secs(),
            self.since_write.as_secs(),
            self.sleeping.as_secs_f64()
        )
    }
}

impl ProgressLine {
    /// Overwrite the current terminal line.
    pub fn print(&self) {
        let mut stdout = std::io::stdout().lock();
        // Write failures are ignored.
        let _ = write!(stdout, "\r{}", self);
        let _ = stdout.flush();
    }

    /// Move past the progress line so later output starts clean.
    pub fn finish() {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout);
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_format() {
        let line = ProgressLine {
            rows: 42,
            uptime: Duration::from_millis(3_725_900),
            since_write: Duration::from_secs(12),
            sleeping: Duration::from_millis(7_456),
        };
        assert_eq!(
            line.to_string(),
            "Rows: 42, Uptime: 3725s, Since write: 12s, Sleeping: 7.46s"
        );
    }

    #[test]
    fn test_zero_sleep() {
        let line = ProgressLine {
            rows: 0,
            uptime: Duration::ZERO,
            since_write: Duration::ZERO,
            sleeping: Duration::ZERO,
        };
        assert!(line.to_string().ends_with("Sleeping: 0.00s"));
    }
}
