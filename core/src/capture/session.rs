use crate::capture::source::CaptureSource;
use crate::matching::Matcher;
use crate::prelude::{CoreError, CoreResult, MatchResult};
use crate::presence::{BatchFilter, FilterConfig, PresenceDelta, PresenceTracker};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What a failed capture turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureErrorPolicy {
    /// Treat the tick as an empty batch (everyone present leaves).
    #[default]
    EmptyBatch,
    /// Leave presence untouched for this tick.
    SkipTick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    pub on_error: CaptureErrorPolicy,
    pub filter: FilterConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            on_error: CaptureErrorPolicy::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "capture interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Everything one capture tick produced.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    /// Names that survived the batch filter.
    pub batch: Vec<String>,
    pub delta: PresenceDelta,
    pub matches: BTreeMap<String, MatchResult>,
    pub capture_failed: bool,
}

/// Stop and pause controls shared with whoever drives the session.
#[derive(Debug, Clone, Default)]
pub struct CaptureHandle {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
}

impl CaptureHandle {
    /// Ends the loop once the batch in flight has been applied.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Applies a filtered batch to presence and matching state.
///
/// Clones share the matcher, tracker and metrics.
#[derive(Clone)]
pub struct BatchPipeline {
    matcher: Arc<Matcher>,
    tracker: Arc<PresenceTracker>,
    metrics: Arc<MetricsRecorder>,
    filter: BatchFilter,
}

impl BatchPipeline {
    pub fn new(
        matcher: Arc<Matcher>,
        tracker: Arc<PresenceTracker>,
        filter: FilterConfig,
    ) -> CoreResult<Self> {
        Ok(Self {
            matcher,
            tracker,
            metrics: Arc::new(MetricsRecorder::new()),
            filter: BatchFilter::new(filter)?,
        })
    }

    pub fn matcher(&self) -> &Arc<Matcher> {
        &self.matcher
    }

    pub fn tracker(&self) -> &Arc<PresenceTracker> {
        &self.tracker
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub fn apply<I, S>(&self, raw: I) -> TickReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch = self.filter.apply(raw);
        let delta = self.tracker.update(batch.iter().cloned());
        let matches = self.matcher.match_batch(&batch);
        self.metrics.record_batch(batch.len());

        TickReport {
            at: Utc::now(),
            batch,
            delta,
            matches,
            capture_failed: false,
        }
    }
}

/// Capture loop: pulls batches from a source at a fixed interval until stopped.
pub struct CaptureSession {
    source: Option<Box<dyn CaptureSource>>,
    pipeline: BatchPipeline,
    config: CaptureConfig,
    handle: CaptureHandle,
    logger: LogManager,
}

impl CaptureSession {
    pub fn new<S>(
        source: S,
        matcher: Arc<Matcher>,
        tracker: Arc<PresenceTracker>,
        config: CaptureConfig,
    ) -> CoreResult<Self>
    where
        S: CaptureSource + 'static,
    {
        let pipeline = BatchPipeline::new(matcher, tracker, config.filter.clone())?;
        Self::with_pipeline(source, pipeline, config)
    }

    /// Runs over an existing pipeline, so its owner sees the same state and metrics.
    pub fn with_pipeline<S>(source: S, pipeline: BatchPipeline, config: CaptureConfig) -> CoreResult<Self>
    where
        S: CaptureSource + 'static,
    {
        config.validate()?;
        Ok(Self {
            source: Some(Box::new(source)),
            pipeline,
            config,
            handle: CaptureHandle::default(),
            logger: LogManager::new("capture"),
        })
    }

    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }

    pub fn pipeline(&self) -> &BatchPipeline {
        &self.pipeline
    }

    /// Captures and applies one batch. `None` when a failed capture was skipped.
    pub async fn run_once(&mut self) -> CoreResult<Option<TickReport>> {
        let mut source = self
            .source
            .take()
            .ok_or_else(|| CoreError::Internal("capture source lost".into()))?;

        let (source, outcome) = tokio::task::spawn_blocking(move || {
            // a panicking source counts as a failed capture and stays usable
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.capture()))
                .unwrap_or_else(|_| Err(CoreError::Capture("capture source panicked".into())));
            (source, outcome)
        })
        .await
        .map_err(|err| CoreError::Internal(format!("capture task failed: {err}")))?;
        self.source = Some(source);

        match outcome {
            Ok(raw) => Ok(Some(self.pipeline.apply(&raw))),
            Err(err) => {
                self.pipeline.metrics().record_error();
                self.logger.warn(&format!("capture failed: {}", err));
                match self.config.on_error {
                    CaptureErrorPolicy::SkipTick => Ok(None),
                    CaptureErrorPolicy::EmptyBatch => {
                        let mut report = self.pipeline.apply(Vec::<String>::new());
                        report.capture_failed = true;
                        Ok(Some(report))
                    }
                }
            }
        }
    }

    /// Runs until the handle is stopped, forwarding each tick to `reports`.
    pub async fn run(&mut self, reports: Option<UnboundedSender<TickReport>>) -> CoreResult<()> {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.handle.cancel.clone();
        self.logger.record(&format!(
            "capture loop started ({} ms interval)",
            self.config.interval_ms
        ));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.handle.is_paused() {
                        continue;
                    }
                    if let Some(report) = self.run_once().await? {
                        if let Some(sender) = &reports {
                            if sender.send(report).is_err() {
                                self.logger.detail("tick report receiver dropped");
                            }
                        }
                    }
                }
            }
        }

        self.logger.record("capture loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::{FnSource, QueueSource};
    use crate::prelude::{MatchStatus, MatcherConfig};
    use tokio::sync::mpsc;

    fn shared_state() -> (Arc<Matcher>, Arc<PresenceTracker>) {
        let matcher = Matcher::new(MatcherConfig::default()).unwrap();
        matcher.load_text("1. Jahid\nFahad Akash 08\n3 Emon");
        (Arc::new(matcher), Arc::new(PresenceTracker::new()))
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            interval_ms: 5,
            ..CaptureConfig::default()
        }
    }

    #[tokio::test]
    async fn run_once_filters_tracks_and_matches() {
        let (matcher, tracker) = shared_state();
        let source = QueueSource::new(vec![vec!["Jahid", "Participants (3)", "Fahad Akash (Host, me)"]]);
        let mut session = CaptureSession::new(source, matcher.clone(), tracker.clone(), fast_config()).unwrap();

        let report = session.run_once().await.unwrap().unwrap();
        assert_eq!(report.batch, vec!["Jahid".to_string(), "Fahad Akash".to_string()]);
        assert_eq!(report.delta.joined.len(), 2);
        assert_eq!(report.matches["Fahad Akash"].status, MatchStatus::Matched);
        assert_eq!(matcher.get_statistics().total, 2);
        assert_eq!(session.pipeline().metrics().snapshot().batches, 1);
    }

    #[tokio::test]
    async fn failed_capture_degrades_to_empty_batch() {
        let (matcher, tracker) = shared_state();
        tracker.update(["Jahid"]);
        let source = FnSource(|| -> CoreResult<Vec<String>> {
            Err(CoreError::Capture("window vanished".into()))
        });
        let mut session = CaptureSession::new(source, matcher, tracker.clone(), fast_config()).unwrap();

        let report = session.run_once().await.unwrap().unwrap();
        assert!(report.capture_failed);
        assert!(report.delta.left.contains("Jahid"));
        assert!(tracker.current().is_empty());
        assert_eq!(session.pipeline().metrics().snapshot().capture_errors, 1);
    }

    #[tokio::test]
    async fn skip_policy_leaves_presence_alone() {
        let (matcher, tracker) = shared_state();
        tracker.update(["Jahid"]);
        let config = CaptureConfig {
            on_error: CaptureErrorPolicy::SkipTick,
            ..fast_config()
        };
        let source = FnSource(|| -> CoreResult<Vec<String>> { Err(CoreError::Capture("ocr crashed".into())) });
        let mut session = CaptureSession::new(source, matcher, tracker.clone(), config).unwrap();

        assert!(session.run_once().await.unwrap().is_none());
        assert!(tracker.current().contains("Jahid"));
    }

    #[tokio::test]
    async fn stop_ends_loop_between_batches() {
        let (matcher, tracker) = shared_state();
        let source = QueueSource::new(vec![vec!["Jahid"], vec!["Jahid", "Emon"], vec!["Emon"]]);
        let mut session = CaptureSession::new(source, matcher, tracker.clone(), fast_config()).unwrap();
        let handle = session.handle();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            session.run(Some(tx)).await.unwrap();
            session
        });

        let first = rx.recv().await.unwrap();
        assert!(first.delta.joined.contains("Jahid"));
        let second = rx.recv().await.unwrap();
        assert!(second.delta.joined.contains("Emon"));
        handle.stop();

        let session = task.await.unwrap();
        assert!(handle.is_stopped());
        assert!(session.pipeline().metrics().snapshot().batches >= 2);
    }

    #[tokio::test]
    async fn paused_session_skips_ticks() {
        let (matcher, tracker) = shared_state();
        let source = QueueSource::new(vec![vec!["Jahid"]]);
        let mut session = CaptureSession::new(source, matcher, tracker.clone(), fast_config()).unwrap();
        let handle = session.handle();
        handle.pause();

        let task = tokio::spawn(async move {
            session.run(None).await.unwrap();
            session
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop();

        let session = task.await.unwrap();
        assert_eq!(session.pipeline().metrics().snapshot().batches, 0);
        assert!(tracker.current().is_empty());
    }

    #[tokio::test]
    async fn panicking_source_is_treated_as_failed_capture() {
        let (matcher, tracker) = shared_state();
        let mut calls = 0;
        let source = FnSource(move || -> CoreResult<Vec<String>> {
            calls += 1;
            if calls == 1 {
                panic!("ocr engine crashed");
            }
            Ok(vec!["Jahid".to_string()])
        });
        let mut session = CaptureSession::new(source, matcher, tracker.clone(), fast_config()).unwrap();

        let first = session.run_once().await.unwrap().unwrap();
        assert!(first.capture_failed);
        let second = session.run_once().await.unwrap().unwrap();
        assert!(!second.capture_failed);
        assert!(tracker.current().contains("Jahid"));
        assert_eq!(session.pipeline().metrics().snapshot().capture_errors, 1);
    }

    #[tokio::test]
    async fn shared_pipeline_shares_metrics() {
        let (matcher, tracker) = shared_state();
        let pipeline = BatchPipeline::new(matcher, tracker, FilterConfig::default()).unwrap();
        let source = QueueSource::new(vec![vec!["Jahid"], vec!["Emon"]]);
        let mut session = CaptureSession::with_pipeline(source, pipeline.clone(), fast_config()).unwrap();

        session.run_once().await.unwrap();
        session.run_once().await.unwrap();
        assert_eq!(pipeline.metrics().snapshot().batches, 2);
        assert!(pipeline.tracker().current().contains("Emon"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let (matcher, tracker) = shared_state();
        let config = CaptureConfig {
            interval_ms: 0,
            ..CaptureConfig::default()
        };
        assert!(CaptureSession::new(QueueSource::default(), matcher, tracker, config).is_err());
    }
}
