use crate::matching::{AttendanceEntry, MatchStatistics, Matcher};
use crate::prelude::{CoreError, CoreResult};
use crate::presence::PresenceSnapshot;
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

/// Session summary assembled from the matcher store and presence history.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceReport {
    pub generated_at: DateTime<Local>,
    /// Absent when no roster was loaded.
    pub statistics: Option<MatchStatistics>,
    pub attendance: Vec<AttendanceEntry>,
    pub present_now: usize,
    pub seen_total: usize,
}

impl AttendanceReport {
    pub fn build(matcher: &Matcher, presence: &PresenceSnapshot) -> Self {
        Self::build_at(matcher, presence, Local::now())
    }

    pub fn build_at(matcher: &Matcher, presence: &PresenceSnapshot, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at,
            statistics: matcher.has_roster().then(|| matcher.get_statistics()),
            attendance: matcher.attendance(),
            present_now: presence.current.len(),
            seen_total: presence.history.len(),
        }
    }

    /// Unique integer identifiers in ascending order; non-numeric ones are left out.
    pub fn integer_rolls(&self) -> Vec<u64> {
        self.attendance
            .iter()
            .filter_map(|entry| entry.identifier.trim().parse::<u64>().ok())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Clipboard text handed to the course portal.
    pub fn roll_call(&self, date: NaiveDate, code: &str) -> String {
        let rolls = self
            .integer_rolls()
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "Date: {}\n\nCode: {}\n\nROLL:\n\n({})",
            date.format("%d.%m.%y"),
            code,
            rolls
        )
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| CoreError::Internal(format!("report serialization: {err}")))
    }

    pub fn render_text(&self) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{heavy}\nATTENDANCE REPORT\n{heavy}\n");
        let _ = writeln!(
            out,
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            out,
            "Present now: {}\nSeen this session: {}\n",
            self.present_now, self.seen_total
        );

        if let Some(stats) = &self.statistics {
            let _ = writeln!(out, "Total Detected: {}", stats.total);
            let _ = writeln!(out, "Matched: {}", stats.matched);
            let _ = writeln!(out, "Unknown: {}", stats.unknown);
            let _ = writeln!(out, "Match Rate: {:.1}%\n", stats.match_rate);
        }

        let _ = writeln!(out, "{light}\nATTENDANCE DETAILS\n{light}\n");
        for entry in &self.attendance {
            let _ = writeln!(out, "  • {:<30} Roll: {}", entry.name, entry.identifier);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::MatcherConfig;
    use crate::presence::PresenceTracker;

    fn session() -> (Matcher, PresenceTracker) {
        let matcher = Matcher::new(MatcherConfig::default()).unwrap();
        matcher.load_text("1. Jahid\nFahad Akash 08\n3 Emon\nGuest Speaker G1");
        let tracker = PresenceTracker::new();
        let names = ["Fahad Akash", "fahad akas", "Jahid", "Stranger Danger", "Guest Speaker"];
        tracker.update(names);
        matcher.match_batch(names);
        (matcher, tracker)
    }

    #[test]
    fn roll_call_lists_sorted_unique_integer_rolls() {
        let (matcher, tracker) = session();
        let report = AttendanceReport::build(&matcher, &tracker.get_snapshot());
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(report.integer_rolls(), vec![1, 8]);
        assert_eq!(
            report.roll_call(date, "CSE-101"),
            "Date: 09.03.24\n\nCode: CSE-101\n\nROLL:\n\n(1,8)"
        );
    }

    #[test]
    fn text_report_includes_statistics_and_details() {
        let (matcher, tracker) = session();
        let report = AttendanceReport::build(&matcher, &tracker.get_snapshot());
        let text = report.render_text();
        assert!(text.contains("Total Detected: 5"));
        assert!(text.contains("Matched: 4"));
        assert!(text.contains("Match Rate: 80.0%"));
        assert!(text.contains("Roll: 08"));
        assert!(text.contains("Present now: 5"));
        assert_eq!(text.matches("Fahad Akash").count(), 1);
    }

    #[test]
    fn statistics_omitted_without_roster() {
        let matcher = Matcher::new(MatcherConfig::default()).unwrap();
        matcher.match_batch(["Jahid"]);
        let report = AttendanceReport::build(&matcher, &PresenceSnapshot::default());
        assert!(report.statistics.is_none());
        assert!(report.attendance.is_empty());
        assert!(!report.render_text().contains("Total Detected"));
    }

    #[test]
    fn json_report_carries_attendance() {
        let (matcher, tracker) = session();
        let report = AttendanceReport::build(&matcher, &tracker.get_snapshot());
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["statistics"]["matched"], 4);
        assert_eq!(value["attendance"].as_array().unwrap().len(), 3);
        assert_eq!(value["present_now"], 5);
    }
}
