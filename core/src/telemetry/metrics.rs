use serde::Serialize;
use std::sync::Mutex;

/// Counters for the capture loop.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub batches: usize,
    pub capture_errors: usize,
    pub names_seen: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_batch(&self, names: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.batches += 1;
            metrics.names_seen += names;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.capture_errors += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            Metrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_accumulates_batches_and_errors() {
        let recorder = MetricsRecorder::new();
        recorder.record_batch(3);
        recorder.record_batch(2);
        recorder.record_error();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.names_seen, 5);
        assert_eq!(snapshot.capture_errors, 1);
    }
}
