// Aggregation run: load every sample, merge, replace the report file.
// Any bad sample aborts the run before the report is touched.

pub mod merge;

pub use merge::merge;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::StoreError;
use crate::sample_repo::{SampleRepo, write_json_atomic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// No sample files; no report written.
    NoSamples,
    Written {
        path: PathBuf,
        samples: u64,
        events: u64,
        collections: usize,
    },
}

#[instrument(skip(repo, now), fields(operation = "aggregate", samples_dir = %repo.dir().display()))]
pub fn run(
    repo: &SampleRepo,
    report_path: &Path,
    now: DateTime<Utc>,
) -> Result<AggregateOutcome, StoreError> {
    let records = repo.load_all()?;
    let Some(report) = merge(&records, now)? else {
        info!("no sample files found; report left untouched");
        return Ok(AggregateOutcome::NoSamples);
    };

    write_json_atomic(report_path, &report)?;
    info!(
        samples = report.total_samples,
        events = report.total_events,
        collections = report.collections.len(),
        path = %report_path.display(),
        "aggregate report written"
    );

    Ok(AggregateOutcome::Written {
        path: report_path.to_path_buf(),
        samples: report.total_samples,
        events: report.total_events,
        collections: report.collections.len(),
    })
}
