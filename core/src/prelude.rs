use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest accepted fuzzy threshold.
pub const MIN_THRESHOLD: u8 = 50;
/// Highest accepted fuzzy threshold.
pub const MAX_THRESHOLD: u8 = 100;

/// Matcher configuration shared by every matching strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum fuzzy score (50..=100) accepted by the name strategy.
    pub threshold: u8,
    /// Substring replacements for known OCR misreads, `wrong -> correct`.
    pub ocr_corrections: BTreeMap<String, String>,
    /// Words that disqualify a trailing-identifier match.
    pub reserved_words: Vec<String>,
    /// The name part of a trailing-identifier match must be longer than this.
    pub min_trailing_name_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        let ocr_corrections = [("Farhad", "Fahad"), ("Akas", "Akash")]
            .into_iter()
            .map(|(wrong, right)| (wrong.to_string(), right.to_string()))
            .collect();
        let reserved_words = [
            "participant",
            "meeting",
            "room",
            "group",
            "section",
            "level",
            "session",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            threshold: 75,
            ocr_corrections,
            reserved_words,
            min_trailing_name_len: 3,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> CoreResult<()> {
        validate_threshold(self.threshold)
    }
}

pub fn validate_threshold(threshold: u8) -> CoreResult<()> {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        Ok(())
    } else {
        Err(CoreError::InvalidConfig(format!(
            "threshold {} outside {}..={}",
            threshold, MIN_THRESHOLD, MAX_THRESHOLD
        )))
    }
}

/// Outcome class of a single match attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Unknown,
    NoRoster,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::Unknown => "unknown",
            MatchStatus::NoRoster => "no_roster",
        }
    }

    /// Title-cased label used by exports (`No_Roster`).
    pub fn title(&self) -> String {
        let mut out = String::with_capacity(self.as_str().len());
        let mut upper_next = true;
        for ch in self.as_str().chars() {
            if upper_next {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper_next = !ch.is_alphabetic();
        }
        out
    }
}

/// Which strategy resolved a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ListIdentifier,
    TrailingIdentifier,
    Fuzzy,
    FuzzyRaw,
}

/// Result of reconciling one detected string against the roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub detected_text: String,
    pub matched_name: Option<String>,
    pub identifier: Option<String>,
    pub confidence: f64,
    pub status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MatchStrategy>,
}

impl MatchResult {
    pub fn matched(
        detected_text: &str,
        name: &str,
        identifier: &str,
        confidence: f64,
        strategy: MatchStrategy,
    ) -> Self {
        Self {
            detected_text: detected_text.to_string(),
            matched_name: Some(name.to_string()),
            identifier: Some(identifier.to_string()),
            confidence,
            status: MatchStatus::Matched,
            strategy: Some(strategy),
        }
    }

    pub fn unknown(detected_text: &str) -> Self {
        Self::unresolved(detected_text, MatchStatus::Unknown)
    }

    pub fn no_roster(detected_text: &str) -> Self {
        Self::unresolved(detected_text, MatchStatus::NoRoster)
    }

    fn unresolved(detected_text: &str, status: MatchStatus) -> Self {
        Self {
            detected_text: detected_text.to_string(),
            matched_name: None,
            identifier: None,
            confidence: 0.0,
            status,
            strategy: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == MatchStatus::Matched
    }
}

/// Common error type for the roster, matcher and capture loop.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("roster source unreadable: {0}")]
    SourceUnreadable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("capture failure: {0}")]
    Capture(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_titles_follow_export_labels() {
        assert_eq!(MatchStatus::Matched.title(), "Matched");
        assert_eq!(MatchStatus::Unknown.title(), "Unknown");
        assert_eq!(MatchStatus::NoRoster.title(), "No_Roster");
    }

    #[test]
    fn threshold_validation_bounds() {
        assert!(validate_threshold(50).is_ok());
        assert!(validate_threshold(100).is_ok());
        assert!(validate_threshold(49).is_err());
        assert!(validate_threshold(101).is_err());
    }

    #[test]
    fn default_config_carries_reserved_words() {
        let cfg = MatcherConfig::default();
        assert_eq!(cfg.threshold, 75);
        assert!(cfg.reserved_words.iter().any(|w| w == "participant"));
        assert_eq!(cfg.ocr_corrections.get("Farhad").map(String::as_str), Some("Fahad"));
    }
}
