use crate::telemetry::log::LogManager;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

/// Presence interval for one detected name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl PresenceRecord {
    pub fn is_present(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Names that arrived in / dropped out of the current set in one update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDelta {
    pub joined: BTreeSet<String>,
    pub left: BTreeSet<String>,
}

impl PresenceDelta {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Consistent copy of the tracker state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub current: BTreeSet<String>,
    pub history: BTreeMap<String, PresenceRecord>,
}

#[derive(Debug, Default)]
struct PresenceState {
    current: BTreeSet<String>,
    history: BTreeMap<String, PresenceRecord>,
    last_tick: Option<DateTime<Utc>>,
}

impl PresenceState {
    /// Timestamps never repeat or go backwards within one tracker.
    fn stamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(at);
        at
    }
}

/// Diffs successive batches of detected names into join/leave events.
///
/// Every operation takes the same lock, so readers never see a half-applied diff.
pub struct PresenceTracker {
    state: RwLock<PresenceState>,
    logger: LogManager,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PresenceState::default()),
            logger: LogManager::new("presence"),
        }
    }

    pub fn update<I, S>(&self, detected_names: I) -> PresenceDelta
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_at(detected_names, Utc::now())
    }

    /// Applies one batch using `now` as the event time.
    pub fn update_at<I, S>(&self, detected_names: I, now: DateTime<Utc>) -> PresenceDelta
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let new_set: BTreeSet<String> = detected_names.into_iter().map(Into::into).collect();
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let joined: BTreeSet<String> = new_set.difference(&state.current).cloned().collect();
        let left: BTreeSet<String> = state.current.difference(&new_set).cloned().collect();
        if joined.is_empty() && left.is_empty() {
            return PresenceDelta::default();
        }

        let at = state.stamp(now);
        for name in &joined {
            state.history.insert(
                name.clone(),
                PresenceRecord {
                    name: name.clone(),
                    joined_at: at,
                    left_at: None,
                },
            );
        }
        for name in &left {
            if let Some(record) = state.history.get_mut(name) {
                record.left_at = Some(at);
            }
        }
        state.current = new_set;
        drop(state);

        if !joined.is_empty() {
            self.logger
                .record(&format!("joined: {}", joined.iter().cloned().collect::<Vec<_>>().join(", ")));
        }
        if !left.is_empty() {
            self.logger
                .record(&format!("left: {}", left.iter().cloned().collect::<Vec<_>>().join(", ")));
        }

        PresenceDelta { joined, left }
    }

    pub fn get_snapshot(&self) -> PresenceSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        PresenceSnapshot {
            current: state.current.clone(),
            history: state.history.clone(),
        }
    }

    pub fn current(&self) -> BTreeSet<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Starts a fresh session.
    pub fn reset(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.current.clear();
        state.history.clear();
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}
