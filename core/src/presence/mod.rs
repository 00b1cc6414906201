pub mod filter;
pub mod tracker;

pub use filter::{BatchFilter, FilterConfig};
pub use tracker::{PresenceDelta, PresenceRecord, PresenceSnapshot, PresenceTracker};
