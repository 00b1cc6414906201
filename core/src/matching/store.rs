use crate::prelude::MatchResult;
use std::collections::HashMap;

/// Match results keyed by detected text, kept in first-detection order.
/// Re-detecting a text overwrites its result in place.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    entries: Vec<MatchResult>,
    index: HashMap<String, usize>,
}

impl ResultStore {
    pub fn upsert(&mut self, result: MatchResult) {
        match self.index.get(&result.detected_text) {
            Some(&slot) => self.entries[slot] = result,
            None => {
                self.index
                    .insert(result.detected_text.clone(), self.entries.len());
                self.entries.push(result);
            }
        }
    }

    pub fn get(&self, detected_text: &str) -> Option<&MatchResult> {
        self.index
            .get(detected_text)
            .map(|&slot| &self.entries[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::MatchStrategy;

    #[test]
    fn upsert_overwrites_in_place() {
        let mut store = ResultStore::default();
        store.upsert(MatchResult::unknown("Jahid"));
        store.upsert(MatchResult::unknown("Emon"));
        store.upsert(MatchResult::matched("Jahid", "Jahid", "1", 100.0, MatchStrategy::Fuzzy));

        assert_eq!(store.len(), 2);
        let first = store.iter().next().unwrap();
        assert_eq!(first.detected_text, "Jahid");
        assert!(first.is_matched());
        assert!(!store.get("Emon").unwrap().is_matched());
    }
}
