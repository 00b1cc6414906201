use crate::matching::normalize::Normalizer;
use crate::prelude::{CoreError, CoreResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const COUNT_PATTERN: &str = r"\(\s*\d+\s*\)";

/// Rules for dropping meeting chrome out of a raw capture batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Strings must be longer than this (in characters).
    pub min_len: usize,
    /// Strings must be shorter than this (in characters).
    pub max_len: usize,
    /// Strip `(Host, me)`-style annotations before tracking.
    pub strip_annotations: bool,
    /// Case-insensitive phrases that mark a string as UI chrome. A phrase only
    /// matches on word boundaries, so `Chat` drops `Chat (2)` but keeps `Chatterjee`.
    pub chrome_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let chrome_patterns = [
            "Unmute",
            "Start Video",
            "Stop Video",
            "Participants",
            "Participant (",
            "Chat",
            "Reactions",
            "Share Screen",
            "More",
            "Leave",
            "Speaker",
            "Gallery View",
            "Mute",
            "Turn off",
            "Invite",
            "Record",
            "Security",
            "upgrade your browser",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            min_len: 1,
            max_len: 50,
            strip_annotations: true,
            chrome_patterns,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// One alternation over every phrase; `\b` is only added on edges that are
/// word characters, so `Participant (` still anchors on its left edge.
fn chrome_regex(patterns: &[String]) -> CoreResult<Option<Regex>> {
    let alternatives: Vec<String> = patterns
        .iter()
        .map(|pattern| pattern.trim())
        .filter(|pattern| !pattern.is_empty())
        .map(|pattern| {
            let left = if pattern.starts_with(is_word_char) { r"\b" } else { "" };
            let right = if pattern.ends_with(is_word_char) { r"\b" } else { "" };
            format!("{}{}{}", left, regex::escape(pattern), right)
        })
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }

    Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))
        .map(Some)
        .map_err(|err| CoreError::InvalidConfig(format!("chrome patterns: {err}")))
}

/// Cleans a raw batch before it reaches the presence tracker.
#[derive(Debug, Clone)]
pub struct BatchFilter {
    config: FilterConfig,
    chrome: Option<Regex>,
    count: Regex,
    annotations: Normalizer,
}

impl BatchFilter {
    pub fn new(config: FilterConfig) -> CoreResult<Self> {
        if config.max_len <= config.min_len + 1 {
            return Err(CoreError::InvalidConfig(format!(
                "filter length window {}..{} admits nothing",
                config.min_len, config.max_len
            )));
        }
        let count = Regex::new(COUNT_PATTERN)
            .map_err(|err| CoreError::Internal(format!("count pattern: {err}")))?;
        let chrome = chrome_regex(&config.chrome_patterns)?;

        Ok(Self {
            config,
            chrome,
            count,
            annotations: Normalizer::new(&BTreeMap::new())?,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn clean(&self, raw: &str) -> Option<String> {
        let mut text = raw.trim().to_string();
        if self.config.strip_annotations {
            text = self
                .annotations
                .strip_annotations(&text)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
        }

        let len = text.chars().count();
        if len <= self.config.min_len || len >= self.config.max_len {
            return None;
        }
        if self.count.is_match(&text) {
            return None;
        }
        if self.chrome.as_ref().is_some_and(|chrome| chrome.is_match(&text)) {
            return None;
        }
        Some(text)
    }

    /// Cleaned names in first-seen order, without duplicates.
    pub fn apply<I, S>(&self, raw: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|name| self.clean(name.as_ref()))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }
}
