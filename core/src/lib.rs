//! Attendance core for online class meetings.
//!
//! Detected participant names are cleaned, diffed into join/leave events and
//! resolved against a class roster of canonical names and roll identifiers.

pub mod capture;
pub mod matching;
pub mod prelude;
pub mod presence;
pub mod report;
pub mod roster;
pub mod telemetry;

pub use matching::Matcher;
pub use prelude::{CoreError, CoreResult, MatchResult, MatchStatus, MatcherConfig};
pub use presence::PresenceTracker;
pub use report::AttendanceReport;
pub use roster::Roster;
