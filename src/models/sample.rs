// One sampling window: capture time, requested duration, per-collection counts.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RecordError;

/// Records written before the duration was stored were all 60s windows.
pub const LEGACY_DURATION_SECS: f64 = 60.0;

fn default_duration_sec() -> f64 {
    LEGACY_DURATION_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub ts: String,
    #[serde(default = "default_duration_sec", with = "duration_secs")]
    pub duration_sec: f64,
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
}

impl SampleRecord {
    /// Builds a record whose `total` is derived from `counts`. A sum past `u64::MAX`
    /// saturates, which `validate` then rejects.
    pub fn new(captured_at: DateTime<Utc>, duration_sec: f64, counts: BTreeMap<String, u64>) -> Self {
        let total = counts
            .values()
            .fold(0u64, |acc, &c| acc.saturating_add(c));
        Self {
            ts: format_timestamp(captured_at),
            duration_sec,
            total,
            counts,
        }
    }

    pub fn captured_at(&self) -> Result<DateTime<Utc>, RecordError> {
        DateTime::parse_from_rfc3339(&self.ts)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| RecordError::Timestamp(self.ts.clone()))
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        self.captured_at()?;
        if !self.duration_sec.is_finite() {
            return Err(RecordError::Duration(self.duration_sec));
        }
        let sum = self
            .counts
            .values()
            .try_fold(0u64, |acc, &c| acc.checked_add(c))
            .ok_or(RecordError::Overflow)?;
        if sum != self.total {
            return Err(RecordError::TotalMismatch {
                total: self.total,
                sum,
            });
        }
        Ok(())
    }
}

/// RFC 3339, microseconds, explicit `+00:00`; sorts lexically in time order.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Whole-second durations round-trip as JSON integers, anything else as a float.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};

    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
            s.serialize_i64(*value as i64)
        } else {
            s.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        f64::deserialize(d)
    }
}
