// Export progress channel

/// One progress update: overall percentage plus what is happening now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub phase: String,
}

/// Forwards updates to a caller-supplied sink, never letting the percentage go backwards.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a mut dyn FnMut(Progress),
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(Progress)) -> Self {
        Self { sink, last: 0 }
    }

    /// Reports `fraction` (0.0-1.0) of the overall work.
    pub(crate) fn report(&mut self, fraction: f64, phase: impl Into<String>) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8;
        self.last = self.last.max(percent);
        (self.sink)(Progress {
            percent: self.last,
            phase: phase.into(),
        });
    }

    /// Reports the `done`-th of `total` steps within the span `[start, end)`.
    pub(crate) fn step(&mut self, start: f64, end: f64, done: usize, total: usize, phase: String) {
        let within = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        self.report(start + (end - start) * within, phase);
    }

    pub(crate) fn finish(&mut self) {
        self.report(1.0, "done");
    }
}
