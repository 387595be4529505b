// On-disk record types: one SampleRecord per window, one AggregateReport per merge

mod report;
mod sample;

pub use report::{AggregateReport, CollectionStats, HistoryEntry, RankedCollections};
pub use sample::{LEGACY_DURATION_SECS, SampleRecord, format_timestamp};
