//! Cleanup of detected names before fuzzy comparison.
//!
//! Each step is a separate function; [`Normalizer::normalize`] runs them in order
//! (trim edge noise, drop pipes, strip host/me annotations, strip noise words,
//! collapse whitespace, apply OCR corrections, trim again) and repeats the whole
//! pass until the text stops changing.

use crate::prelude::{CoreError, CoreResult};
use regex::Regex;
use std::collections::BTreeMap;

/// Characters trimmed from both ends of a detected name, besides whitespace.
pub const EDGE_NOISE: &[char] = &[
    '|', '[', ']', '(', ')', '{', '}', '<', '>', '.', ',', ':', ';', '-', '_',
];

// `(Host, me)`, `(me`, `Host)` and a trailing `Host, me` without brackets.
const ANNOTATION_PATTERN: &str = r"(?i)\([^()]*?\b(?:host|me)\b[^()]*\)?|\b(?:host|me)\b(?:\s*,\s*(?:host|me)\b)*\s*(?:\)|$)";
const NOISE_WORD_PATTERN: &str = r"(?i)\b(?:gbr|ed|er|ft)\b";

/// Bound on the normalization fixpoint loop.
const MAX_PASSES: usize = 16;

pub fn trim_edges(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || EDGE_NOISE.contains(&c))
}

pub fn remove_pipes(text: &str) -> String {
    text.replace('|', "")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces `wrong` with `right`, except where the occurrence already sits
/// inside a `right` (so `Akas -> Akash` leaves `Akash` alone).
pub fn replace_outside(text: &str, wrong: &str, right: &str) -> String {
    if wrong.is_empty() || wrong == right {
        return text.to_string();
    }

    let covered: Vec<(usize, usize)> = if right.is_empty() {
        Vec::new()
    } else {
        text.match_indices(right)
            .map(|(start, found)| (start, start + found.len()))
            .collect()
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, found) in text.match_indices(wrong) {
        let end = start + found.len();
        if covered.iter().any(|&(s, e)| s <= start && end <= e) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(right);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// Compiled normalization pipeline.
#[derive(Debug, Clone)]
pub struct Normalizer {
    annotation: Regex,
    noise_words: Regex,
    corrections: Vec<(String, String)>,
}

impl Normalizer {
    pub fn new(corrections: &BTreeMap<String, String>) -> CoreResult<Self> {
        let annotation = Regex::new(ANNOTATION_PATTERN)
            .map_err(|err| CoreError::Internal(format!("annotation pattern: {err}")))?;
        let noise_words = Regex::new(NOISE_WORD_PATTERN)
            .map_err(|err| CoreError::Internal(format!("noise word pattern: {err}")))?;

        // longest misread first so overlapping entries resolve predictably
        let mut corrections: Vec<(String, String)> = corrections
            .iter()
            .filter(|(wrong, _)| !wrong.is_empty())
            .map(|(wrong, right)| (wrong.clone(), right.clone()))
            .collect();
        corrections.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            annotation,
            noise_words,
            corrections,
        })
    }

    pub fn strip_annotations(&self, text: &str) -> String {
        self.annotation.replace_all(text, " ").into_owned()
    }

    pub fn strip_noise_words(&self, text: &str) -> String {
        self.noise_words.replace_all(text, " ").into_owned()
    }

    pub fn apply_corrections(&self, text: &str) -> String {
        self.corrections
            .iter()
            .fold(text.to_string(), |acc, (wrong, right)| {
                replace_outside(&acc, wrong, right)
            })
    }

    fn pass(&self, text: &str) -> String {
        let text = remove_pipes(trim_edges(text));
        let text = self.strip_noise_words(&self.strip_annotations(&text));
        let text = self.apply_corrections(&collapse_whitespace(&text));
        trim_edges(&text).to_string()
    }

    /// Runs cleanup passes until one changes nothing, so the result is a fixpoint.
    pub fn normalize(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        // removing one token can expose another (`x me ED`, `Emon me, ft`)
        for _ in 0..MAX_PASSES {
            let next = self.pass(&text);
            if next == text {
                break;
            }
            text = next;
        }
        text
    }
}
