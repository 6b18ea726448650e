use std::io::Write;
use tracing::warn;

/// Sub-range of the global 0-100 scale owned by one pipeline phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub start: f64,
    pub end: f64,
}

impl ProgressRange {
    /// Background compositing
    pub const BACKGROUND: ProgressRange = ProgressRange { start: 0.0, end: 50.0 };
    /// Subtitle burn-in
    pub const FINAL: ProgressRange = ProgressRange { start: 75.0, end: 100.0 };

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Progress credited for one heartbeat line
    pub fn step(&self) -> f64 {
        (self.end - self.start) / 100.0
    }
}

/// Value the pipeline jumps to once transcription returns
pub const TRANSCRIBED: f64 = 75.0;

/// Owner of the pipeline's percentage.
///
/// `current` never decreases and a line is written only when its truncated
/// integer differs from the one written before it.
pub struct ProgressReporter {
    current: f64,
    last_reported: i64,
    reported: Vec<u8>,
    sink: Box<dyn Write + Send>,
}

impl ProgressReporter {
    /// Reporter printing to standard output
    pub fn new() -> Self {
        Self::with_sink(Box::new(std::io::stdout()))
    }

    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            current: 0.0,
            last_reported: -1,
            reported: Vec::new(),
            sink,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Percentages written so far, in order
    pub fn reported(&self) -> &[u8] {
        &self.reported
    }

    /// Move forward by `delta` without passing `ceiling`
    pub fn advance(&mut self, delta: f64, ceiling: f64) {
        let target = (self.current + delta).min(ceiling);
        self.update(target);
    }

    /// Jump straight to `value`; values below the current one are ignored
    pub fn set_absolute(&mut self, value: f64) {
        self.update(value);
    }

    fn update(&mut self, value: f64) {
        if value.is_nan() || value <= self.current {
            return;
        }
        self.current = value.min(100.0);

        let truncated = self.current.trunc() as i64;
        if truncated != self.last_reported {
            self.last_reported = truncated;
            self.reported.push(truncated as u8);
            if let Err(e) = writeln!(self.sink, "{}%", truncated).and_then(|_| self.sink.flush()) {
                warn!("Failed to write progress: {}", e);
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn silent() -> ProgressReporter {
        ProgressReporter::with_sink(Box::new(std::io::sink()))
    }

    #[test]
    fn test_prints_only_integer_changes() {
        let buffer = SharedBuffer::default();
        let mut reporter = ProgressReporter::with_sink(Box::new(buffer.clone()));

        for _ in 0..10 {
            reporter.advance(0.25, 50.0);
        }

        let printed = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(printed, "0%\n1%\n2%\n");
        assert_eq!(reporter.reported(), &[0, 1, 2]);
        assert_eq!(reporter.current(), 2.5);
    }

    #[test]
    fn test_advance_is_clamped_to_ceiling() {
        let mut reporter = silent();
        for _ in 0..500 {
            reporter.advance(ProgressRange::BACKGROUND.step(), ProgressRange::BACKGROUND.end);
        }
        assert_eq!(reporter.current(), 50.0);
        assert_eq!(*reporter.reported().last().unwrap(), 50);
    }

    #[test]
    fn test_never_moves_backwards() {
        let mut reporter = silent();
        reporter.set_absolute(60.0);
        reporter.set_absolute(40.0);
        reporter.advance(1.0, 30.0);
        assert_eq!(reporter.current(), 60.0);
        assert_eq!(reporter.reported(), &[60]);
    }

    #[test]
    fn test_reported_sequence_strictly_increases() {
        let mut reporter = silent();
        for _ in 0..73 {
            reporter.advance(ProgressRange::BACKGROUND.step(), ProgressRange::BACKGROUND.end);
        }
        reporter.set_absolute(TRANSCRIBED);
        for _ in 0..150 {
            reporter.advance(ProgressRange::FINAL.step(), ProgressRange::FINAL.end);
        }
        reporter.set_absolute(150.0);

        let reported = reporter.reported();
        assert!(reported.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(reported.iter().filter(|&&p| p == 100).count(), 1);
        assert_eq!(*reported.last().unwrap(), 100);
    }
}
