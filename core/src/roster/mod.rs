//! Name/identifier roster loaded from line files or spreadsheet grids.

pub mod lines;
pub mod sheet;
pub mod table;

pub use lines::{parse_line, LineFormat};
pub use sheet::sheet_export_url;
pub use table::{Cell, Grid};

use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub canonical_name: String,
    pub identifier: String,
}

impl RosterEntry {
    pub fn new(canonical_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            identifier: identifier.into(),
        }
    }
}

/// Roster of known participants. Names are unique; identifiers map back to the
/// last name written for them.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    by_name: HashMap<String, usize>,
    by_identifier: HashMap<String, String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roster = Self::new();
        roster.load(lines);
        roster
    }

    /// Replaces the roster with the entries parsed from `lines`; returns how many
    /// lines produced an entry.
    pub fn load<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let logger = LogManager::new("roster");
        self.clear();

        let mut count = 0;
        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((entry, _)) => {
                    self.insert(entry);
                    count += 1;
                }
                None => logger.warn(&format!(
                    "skipping malformed roster line {}: {:?}",
                    index + 1,
                    line.trim()
                )),
            }
        }

        logger.record(&format!("loaded {} roster entries", count));
        count
    }

    /// Reads every line before touching the roster; a read failure leaves it empty.
    pub fn load_reader<R: BufRead>(&mut self, reader: R) -> CoreResult<usize> {
        match reader.lines().collect::<Result<Vec<_>, _>>() {
            Ok(lines) => Ok(self.load(lines)),
            Err(err) => {
                self.clear();
                Err(CoreError::SourceUnreadable(err.to_string()))
            }
        }
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> CoreResult<usize> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                self.clear();
                return Err(CoreError::SourceUnreadable(format!(
                    "{}: {}",
                    path.display(),
                    err
                )));
            }
        };
        self.load_reader(BufReader::new(file))
    }

    /// Replaces the roster with the rows of a spreadsheet grid.
    pub fn load_table(&mut self, grid: &Grid) -> usize {
        self.clear();
        let entries = table::parse_grid(grid);
        let count = entries.len();
        for entry in entries {
            self.insert(entry);
        }
        LogManager::new("roster").record(&format!("loaded {} roster entries from table", count));
        count
    }

    pub fn insert(&mut self, entry: RosterEntry) {
        if let Some(&index) = self.by_name.get(&entry.canonical_name) {
            let previous = std::mem::replace(&mut self.entries[index].identifier, entry.identifier.clone());
            if self.by_identifier.get(&previous) == Some(&entry.canonical_name) {
                self.by_identifier.remove(&previous);
            }
        } else {
            self.by_name
                .insert(entry.canonical_name.clone(), self.entries.len());
            self.entries.push(entry.clone());
        }
        self.by_identifier
            .insert(entry.identifier, entry.canonical_name);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
        self.by_identifier.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn identifier_for(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&index| self.entries[index].identifier.as_str())
    }

    pub fn name_for(&self, identifier: &str) -> Option<&str> {
        self.by_identifier.get(identifier).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn mixed_formats_load_three_entries() {
        let mut roster = Roster::new();
        let count = roster.load("1. Jahid\nFahad Akash 08\n3 Emon".lines());
        assert_eq!(count, 3);
        assert_eq!(roster.identifier_for("Jahid"), Some("1"));
        assert_eq!(roster.identifier_for("Fahad Akash"), Some("08"));
        assert_eq!(roster.identifier_for("Emon"), Some("3"));
        assert_eq!(roster.name_for("08"), Some("Fahad Akash"));
    }

    #[test]
    fn malformed_and_blank_lines_are_uncounted() {
        let mut roster = Roster::new();
        let count = roster.load(["", "Umme Hani Bithe", "   ", "Joy 35"]);
        assert_eq!(count, 1);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn reload_replaces_previous_entries() {
        let mut roster = Roster::from_lines(["Jahid 1", "Emon 3"]);
        roster.load(["Mitu 26"]);
        assert_eq!(roster.len(), 1);
        assert!(roster.identifier_for("Jahid").is_none());
        assert!(roster.name_for("3").is_none());
        assert_eq!(roster.name_for("26"), Some("Mitu"));
    }

    #[test]
    fn duplicates_resolve_last_write_wins() {
        let roster = Roster::from_lines(["Jahid 1", "Jahid 2", "Emon 3", "Mitu 3"]);
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.identifier_for("Jahid"), Some("2"));
        assert!(roster.name_for("1").is_none());
        assert_eq!(roster.name_for("3"), Some("Mitu"));
        assert_eq!(roster.identifier_for("Emon"), Some("3"));
    }

    #[test]
    fn load_file_reads_lines() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all("1. Jahid\nFahad Akash 08\n".as_bytes()).unwrap();
        let mut roster = Roster::new();
        assert_eq!(roster.load_file(temp.path()).unwrap(), 2);
    }

    #[test]
    fn unreadable_source_leaves_roster_empty() {
        let mut roster = Roster::from_lines(["Jahid 1"]);
        let err = roster
            .load_file("/definitely/not/a/roster.txt")
            .unwrap_err();
        assert!(matches!(err, CoreError::SourceUnreadable(_)));
        assert!(roster.is_empty());
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    #[test]
    fn read_error_mid_stream_clears_roster() {
        let mut roster = Roster::from_lines(["Jahid 1"]);
        let result = roster.load_reader(BufReader::new(FailingReader));
        assert!(result.is_err());
        assert!(roster.is_empty());
    }

    #[test]
    fn load_table_replaces_roster() {
        let mut roster = Roster::from_lines(["Jahid 1"]);
        let grid = Grid::from_delimited("Name,Roll\nEmon,3\n", ',');
        assert_eq!(roster.load_table(&grid), 1);
        assert!(roster.identifier_for("Jahid").is_none());
        assert_eq!(roster.identifier_for("Emon"), Some("3"));
    }
}
