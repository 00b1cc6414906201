pub mod matcher;
pub mod normalize;
pub mod similarity;
pub mod store;

pub use matcher::{
    compare_identifiers, AttendanceEntry, ExportRecord, MatchEngine, MatchStatistics, Matcher,
};
pub use normalize::Normalizer;
pub use similarity::token_sort_ratio;
pub use store::ResultStore;
