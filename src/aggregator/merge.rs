// Pure merge: fold time-ordered sample records into ranked cumulative stats + history.
// Accumulation is checked; a sum past u64::MAX is an error, never a wrap.
// Rounding is display-only; accumulators always see raw counts.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::error::MergeError;
use crate::models::{
    AggregateReport, CollectionStats, HistoryEntry, RankedCollections, SampleRecord,
    format_timestamp,
};

const EPS_DECIMALS: i32 = 1;
const RATE_DECIMALS: i32 = 2;
const PCT_DECIMALS: i32 = 2;

#[derive(Debug)]
struct Running {
    count: u64,
    first_at: DateTime<Utc>,
    first_seen: String,
    last_at: DateTime<Utc>,
    last_seen: String,
}

/// Merges `records` (ascending capture time) into a report stamped `now`.
/// `Ok(None)` when there is nothing to merge. Every record is validated first;
/// first/last seen compare instants, so mixed UTC offsets still order correctly.
pub fn merge(
    records: &[SampleRecord],
    now: DateTime<Utc>,
) -> Result<Option<AggregateReport>, MergeError> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut total_events: u64 = 0;
    let mut running: HashMap<&str, Running> = HashMap::new();
    let mut history = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let captured_at = record
            .validate()
            .and_then(|()| record.captured_at())
            .map_err(|source| MergeError::Invalid {
                index,
                ts: record.ts.clone(),
                source,
            })?;

        total_events = total_events
            .checked_add(record.total)
            .ok_or(MergeError::TotalOverflow { index })?;
        history.push(history_entry(record));

        for (label, &count) in &record.counts {
            let entry = running.entry(label.as_str()).or_insert_with(|| Running {
                count: 0,
                first_at: captured_at,
                first_seen: record.ts.clone(),
                last_at: captured_at,
                last_seen: record.ts.clone(),
            });
            entry.count = entry
                .count
                .checked_add(count)
                .ok_or_else(|| MergeError::CountOverflow {
                    index,
                    label: label.clone(),
                })?;
            if captured_at < entry.first_at {
                entry.first_at = captured_at;
                entry.first_seen = record.ts.clone();
            }
            if captured_at > entry.last_at {
                entry.last_at = captured_at;
                entry.last_seen = record.ts.clone();
            }
        }
    }

    let mut ranked: Vec<(String, CollectionStats)> = running
        .into_iter()
        .map(|(label, r)| {
            let stats = CollectionStats {
                count: r.count,
                pct: percentage(r.count, total_events),
                first_seen: r.first_seen,
                last_seen: r.last_seen,
            };
            (label.to_owned(), stats)
        })
        .collect();
    // Ties rank alphabetically so output does not depend on hash order.
    ranked.sort_by(|(la, a), (lb, b)| b.count.cmp(&a.count).then_with(|| la.cmp(lb)));

    Ok(Some(AggregateReport {
        last_updated: format_timestamp(now),
        total_samples: records.len() as u64,
        total_events,
        collections: RankedCollections::new(ranked),
        history,
    }))
}

fn history_entry(record: &SampleRecord) -> HistoryEntry {
    let duration = record.duration_sec;
    let events_per_sec = round_to(rate(record.total, duration), EPS_DECIMALS);
    let counts_per_sec: BTreeMap<String, f64> = record
        .counts
        .iter()
        .map(|(label, &count)| (label.clone(), round_to(rate(count, duration), RATE_DECIMALS)))
        .collect();
    HistoryEntry {
        timestamp: record.ts.clone(),
        duration_sec: duration,
        total: record.total,
        events_per_sec,
        counts: record.counts.clone(),
        counts_per_sec,
    }
}

/// Events per second; 0 for an empty or negative window.
pub fn rate(count: u64, duration_sec: f64) -> f64 {
    if duration_sec > 0.0 {
        count as f64 / duration_sec
    } else {
        0.0
    }
}

/// Share of `total` in percent at two decimals; 0 when `total` is 0.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(count as f64 / total as f64 * 100.0, PCT_DECIMALS)
}

/// Half away from zero at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
