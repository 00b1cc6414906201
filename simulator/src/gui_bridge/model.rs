use crate::workflow::runner::Runner;
use chrono::{DateTime, Utc};
use rollcore::matching::MatchStatistics;
use rollcore::telemetry::Metrics;
use serde::Serialize;

/// Live view served to dashboard clients.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardModel {
    pub course_code: Option<String>,
    pub roster_size: usize,
    pub present: Vec<String>,
    pub seen_total: usize,
    pub statistics: MatchStatistics,
    pub metrics: Metrics,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_joined: Vec<String>,
    pub last_left: Vec<String>,
}

impl DashboardModel {
    pub fn capture(runner: &Runner) -> Self {
        let snapshot = runner.tracker().get_snapshot();
        let last = runner.last_tick();

        Self {
            course_code: runner.config().course_code.clone(),
            roster_size: runner.matcher().roster().len(),
            present: snapshot.current.into_iter().collect(),
            seen_total: snapshot.history.len(),
            statistics: runner.matcher().get_statistics(),
            metrics: runner.pipeline().metrics().snapshot(),
            last_tick_at: last.as_ref().map(|tick| tick.at),
            last_joined: last
                .as_ref()
                .map(|tick| tick.delta.joined.iter().cloned().collect())
                .unwrap_or_default(),
            last_left: last
                .map(|tick| tick.delta.left.into_iter().collect())
                .unwrap_or_default(),
        }
    }
}
