use crate::matching::normalize::Normalizer;
use crate::matching::similarity::token_sort_ratio;
use crate::matching::store::ResultStore;
use crate::prelude::{
    validate_threshold, CoreError, CoreResult, MatchResult, MatchStrategy, MatcherConfig,
};
use crate::roster::{Grid, Roster};
use crate::telemetry::log::LogManager;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Confidence reported for identifier-exact matches.
pub const IDENTIFIER_CONFIDENCE: f64 = 100.0;

const LIST_IDENTIFIER_PATTERN: &str = r"^(\d+)\.?\s+(.+)$";
const TRAILING_IDENTIFIER_PATTERN: &str = r"^(.*\S)\s+(\d+)$";

/// Stateless matching pipeline: identifier extraction, then fuzzy names.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    config: MatcherConfig,
    normalizer: Normalizer,
    list_identifier: Regex,
    trailing_identifier: Regex,
}

impl MatchEngine {
    pub fn new(config: MatcherConfig) -> CoreResult<Self> {
        config.validate()?;
        let normalizer = Normalizer::new(&config.ocr_corrections)?;
        let list_identifier = Regex::new(LIST_IDENTIFIER_PATTERN)
            .map_err(|err| CoreError::Internal(format!("list identifier pattern: {err}")))?;
        let trailing_identifier = Regex::new(TRAILING_IDENTIFIER_PATTERN)
            .map_err(|err| CoreError::Internal(format!("trailing identifier pattern: {err}")))?;

        Ok(Self {
            config,
            normalizer,
            list_identifier,
            trailing_identifier,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Resolves one detected string against `roster`.
    pub fn resolve(&self, roster: &Roster, detected_text: &str) -> MatchResult {
        if roster.is_empty() {
            return MatchResult::no_roster(detected_text);
        }

        let trimmed = detected_text.trim();
        if trimmed.is_empty() {
            return MatchResult::unknown(detected_text);
        }

        if let Some(result) = self.list_identifier_match(roster, detected_text, trimmed) {
            return result;
        }
        if let Some(result) = self.trailing_identifier_match(roster, detected_text, trimmed) {
            return result;
        }

        let normalized = self.normalize(trimmed);
        if let Some(result) = self.fuzzy_match(roster, detected_text, &normalized, MatchStrategy::Fuzzy) {
            return result;
        }
        if normalized != trimmed {
            if let Some(result) = self.fuzzy_match(roster, detected_text, trimmed, MatchStrategy::FuzzyRaw) {
                return result;
            }
        }

        MatchResult::unknown(detected_text)
    }

    fn list_identifier_match(
        &self,
        roster: &Roster,
        detected_text: &str,
        trimmed: &str,
    ) -> Option<MatchResult> {
        let captures = self.list_identifier.captures(trimmed)?;
        let identifier = captures.get(1)?.as_str();
        let name = roster.name_for(identifier)?;
        Some(MatchResult::matched(
            detected_text,
            name,
            identifier,
            IDENTIFIER_CONFIDENCE,
            MatchStrategy::ListIdentifier,
        ))
    }

    fn trailing_identifier_match(
        &self,
        roster: &Roster,
        detected_text: &str,
        trimmed: &str,
    ) -> Option<MatchResult> {
        let captures = self.trailing_identifier.captures(trimmed)?;
        let name_part = captures.get(1)?.as_str();
        let identifier = captures.get(2)?.as_str();

        if name_part.chars().count() <= self.config.min_trailing_name_len {
            return None;
        }
        let lowered = name_part.to_lowercase();
        if self
            .config
            .reserved_words
            .iter()
            .any(|word| !word.is_empty() && lowered.contains(&word.to_lowercase()))
        {
            return None;
        }

        let name = roster.name_for(identifier)?;
        Some(MatchResult::matched(
            detected_text,
            name,
            identifier,
            IDENTIFIER_CONFIDENCE,
            MatchStrategy::TrailingIdentifier,
        ))
    }

    /// Best-scoring roster name; earlier entries win ties.
    fn fuzzy_match(
        &self,
        roster: &Roster,
        detected_text: &str,
        candidate: &str,
        strategy: MatchStrategy,
    ) -> Option<MatchResult> {
        if candidate.is_empty() {
            return None;
        }

        let mut best: Option<(f64, usize)> = None;
        for (index, entry) in roster.entries().iter().enumerate() {
            let score = token_sort_ratio(candidate, &entry.canonical_name);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, index));
            }
        }

        let (score, index) = best?;
        if score < f64::from(self.config.threshold) {
            return None;
        }
        let entry = &roster.entries()[index];
        Some(MatchResult::matched(
            detected_text,
            &entry.canonical_name,
            &entry.identifier,
            score,
            strategy,
        ))
    }
}

/// Aggregate counts over the stored results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub total: usize,
    pub matched: usize,
    pub unknown: usize,
    pub match_rate: f64,
}

/// Flat export row for spreadsheet/CSV writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "Detected Name")]
    pub detected_name: String,
    #[serde(rename = "Matched Name")]
    pub matched_name: String,
    #[serde(rename = "Roll Number")]
    pub identifier: String,
    #[serde(rename = "Confidence")]
    pub confidence: String,
    #[serde(rename = "Status")]
    pub status: String,
}

/// One participant in the identifier-deduplicated attendance list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub identifier: String,
    pub name: String,
    pub confidence: f64,
    /// Every detected string that resolved to this identifier.
    pub detected: Vec<String>,
}

/// Orders identifiers numerically when both are integers, numbers first.
pub fn compare_identifiers(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Session matcher: owns the roster and the text-keyed result store.
///
/// The roster and engine are swapped as whole `Arc`s, so matching runs against
/// an immutable snapshot; the store lock is only held to persist results.
pub struct Matcher {
    roster: RwLock<Arc<Roster>>,
    engine: RwLock<Arc<MatchEngine>>,
    store: RwLock<ResultStore>,
    logger: LogManager,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> CoreResult<Self> {
        Ok(Self {
            roster: RwLock::new(Arc::new(Roster::new())),
            engine: RwLock::new(Arc::new(MatchEngine::new(config)?)),
            store: RwLock::new(ResultStore::default()),
            logger: LogManager::new("matcher"),
        })
    }

    pub fn with_roster(config: MatcherConfig, roster: Roster) -> CoreResult<Self> {
        let matcher = Self::new(config)?;
        matcher.replace_roster(roster);
        Ok(matcher)
    }

    pub fn replace_roster(&self, roster: Roster) -> usize {
        let count = roster.len();
        *write(&self.roster) = Arc::new(roster);
        count
    }

    pub fn load_lines<I, S>(&self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roster = Roster::new();
        let count = roster.load(lines);
        self.replace_roster(roster);
        count
    }

    pub fn load_text(&self, text: &str) -> usize {
        self.load_lines(text.lines())
    }

    /// A failed read leaves the matcher with no roster.
    pub fn load_reader<R: BufRead>(&self, reader: R) -> CoreResult<usize> {
        let mut roster = Roster::new();
        let outcome = roster.load_reader(reader);
        self.replace_roster(roster);
        outcome
    }

    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<usize> {
        let mut roster = Roster::new();
        let outcome = roster.load_file(path);
        if let Err(err) = &outcome {
            self.logger.warn(&format!("roster load failed: {}", err));
        }
        self.replace_roster(roster);
        outcome
    }

    pub fn load_table(&self, grid: &Grid) -> usize {
        let mut roster = Roster::new();
        let count = roster.load_table(grid);
        self.replace_roster(roster);
        count
    }

    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&read(&self.roster))
    }

    pub fn has_roster(&self) -> bool {
        !read(&self.roster).is_empty()
    }

    pub fn config(&self) -> MatcherConfig {
        read(&self.engine).config().clone()
    }

    pub fn threshold(&self) -> u8 {
        read(&self.engine).config().threshold
    }

    pub fn set_threshold(&self, threshold: u8) -> CoreResult<()> {
        validate_threshold(threshold)?;
        let mut config = self.config();
        config.threshold = threshold;
        self.set_config(config)
    }

    pub fn set_config(&self, config: MatcherConfig) -> CoreResult<()> {
        let engine = MatchEngine::new(config)?;
        *write(&self.engine) = Arc::new(engine);
        Ok(())
    }

    pub fn normalize(&self, raw: &str) -> String {
        read(&self.engine).normalize(raw)
    }

    /// Matches one string without recording it.
    pub fn match_name(&self, detected_text: &str) -> MatchResult {
        let roster = self.roster();
        let engine = Arc::clone(&read(&self.engine));
        engine.resolve(&roster, detected_text)
    }

    /// Matches every name and records each result under its raw input text.
    pub fn match_batch<I, S>(&self, names: I) -> BTreeMap<String, MatchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roster = self.roster();
        let engine = Arc::clone(&read(&self.engine));

        let results: Vec<MatchResult> = names
            .into_iter()
            .map(|name| engine.resolve(&roster, name.as_ref()))
            .collect();

        for result in &results {
            self.logger.detail(&format!(
                "{:?} -> {} ({:.1})",
                result.detected_text,
                result.matched_name.as_deref().unwrap_or("-"),
                result.confidence
            ));
        }

        {
            let mut store = write(&self.store);
            for result in &results {
                store.upsert(result.clone());
            }
        }

        results
            .into_iter()
            .map(|result| (result.detected_text.clone(), result))
            .collect()
    }

    pub fn result_for(&self, detected_text: &str) -> Option<MatchResult> {
        read(&self.store).get(detected_text).cloned()
    }

    /// Stored results in first-detection order.
    pub fn results(&self) -> Vec<MatchResult> {
        read(&self.store).iter().cloned().collect()
    }

    pub fn reset_results(&self) {
        write(&self.store).clear();
    }

    pub fn get_statistics(&self) -> MatchStatistics {
        let store = read(&self.store);
        let total = store.len();
        let matched = store.iter().filter(|result| result.is_matched()).count();
        let match_rate = if total > 0 {
            matched as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        MatchStatistics {
            total,
            matched,
            unknown: total - matched,
            match_rate,
        }
    }

    pub fn export(&self) -> Vec<ExportRecord> {
        read(&self.store)
            .iter()
            .map(|result| ExportRecord {
                detected_name: result.detected_text.clone(),
                matched_name: result
                    .matched_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                identifier: result
                    .identifier
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
                confidence: format!("{:.1}%", result.confidence),
                status: result.status.title(),
            })
            .collect()
    }

    /// Matched results folded by identifier, sorted by identifier.
    ///
    /// The store is keyed by detected text, so two OCR reads of one participant
    /// are two store entries; this pass is where they collapse into one.
    pub fn attendance(&self) -> Vec<AttendanceEntry> {
        let store = read(&self.store);
        let mut grouped: Vec<AttendanceEntry> = Vec::new();

        for result in store.iter().filter(|result| result.is_matched()) {
            let (Some(identifier), Some(name)) = (&result.identifier, &result.matched_name) else {
                continue;
            };
            match grouped.iter_mut().find(|entry| &entry.identifier == identifier) {
                Some(entry) => {
                    entry.detected.push(result.detected_text.clone());
                    if result.confidence > entry.confidence {
                        entry.confidence = result.confidence;
                        entry.name = name.clone();
                    }
                }
                None => grouped.push(AttendanceEntry {
                    identifier: identifier.clone(),
                    name: name.clone(),
                    confidence: result.confidence,
                    detected: vec![result.detected_text.clone()],
                }),
            }
        }

        grouped.sort_by(|a, b| compare_identifiers(&a.identifier, &b.identifier));
        grouped
    }
}
