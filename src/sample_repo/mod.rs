// Flat-file sample storage. One JSON file per window, named
// sample_<YYYYMMDD>_<HHMMSS>.json so that name order is capture order.

mod atomic;

pub use atomic::{write_json_atomic, write_json_new};

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::models::SampleRecord;

const FILE_PREFIX: &str = "sample_";
const FILE_SUFFIX: &str = ".json";

pub fn sample_file_name(captured_at: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        FILE_PREFIX,
        captured_at.format("%Y%m%d_%H%M%S"),
        FILE_SUFFIX
    )
}

pub struct SampleRepo {
    dir: PathBuf,
}

impl SampleRepo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the record under its capture-time file name and returns the path.
    /// A second record captured in the same second fails with `StoreError::Exists`
    /// and leaves the first untouched.
    #[instrument(skip(self, record), fields(repo = "samples", operation = "save", total = record.total))]
    pub fn save(&self, record: &SampleRecord) -> Result<PathBuf, StoreError> {
        let captured_at = record.captured_at().map_err(|source| StoreError::Invalid {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.dir.join(sample_file_name(captured_at));
        write_json_new(&path, record)?;
        Ok(path)
    }

    /// Sample file paths in name (= chronological) order. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    pub fn load(path: &Path) -> Result<SampleRecord, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let record: SampleRecord =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        record.validate().map_err(|source| StoreError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(record)
    }

    /// Every sample in capture order. The first unreadable or invalid file aborts the load.
    #[instrument(skip(self), fields(repo = "samples", operation = "load_all"))]
    pub fn load_all(&self) -> Result<Vec<SampleRecord>, StoreError> {
        let paths = self.list()?;
        let mut out = Vec::with_capacity(paths.len());
        for path in &paths {
            out.push(Self::load(path)?);
        }
        debug!(samples_count = out.len(), "samples loaded");
        Ok(out)
    }
}
