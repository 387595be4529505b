// Aggregate report: ranked cumulative stats per collection plus per-sample history.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use super::sample::duration_secs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub last_updated: String,
    pub total_samples: u64,
    pub total_events: u64,
    pub collections: RankedCollections,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub count: u64,
    pub pct: f64,
    pub first_seen: String,
    pub last_seen: String,
}

/// Per-sample summary with rates normalized by window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "ts")]
    pub timestamp: String,
    #[serde(with = "duration_secs")]
    pub duration_sec: f64,
    pub total: u64,
    #[serde(rename = "eps")]
    pub events_per_sec: f64,
    pub counts: BTreeMap<String, u64>,
    pub counts_per_sec: BTreeMap<String, f64>,
}

/// Label -> stats in rank order. Serialized as a JSON object whose key order is the rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedCollections(Vec<(String, CollectionStats)>);

impl RankedCollections {
    pub fn new(ranked: Vec<(String, CollectionStats)>) -> Self {
        Self(ranked)
    }

    pub fn get(&self, label: &str) -> Option<&CollectionStats> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CollectionStats)> {
        self.0.iter().map(|(l, s)| (l.as_str(), s))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RankedCollections {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_map(self.0.iter().map(|(l, stats)| (l, stats)))
    }
}

impl<'de> Deserialize<'de> for RankedCollections {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct RankedVisitor;

        impl<'de> Visitor<'de> for RankedVisitor {
            type Value = RankedCollections;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of collection label to stats")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, stats)) = map.next_entry::<String, CollectionStats>()? {
                    out.push((label, stats));
                }
                Ok(RankedCollections(out))
            }
        }

        d.deserialize_map(RankedVisitor)
    }
}
