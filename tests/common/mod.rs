// Shared test helpers

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use lexicon_stats::models::SampleRecord;
use std::collections::BTreeMap;
use tokio_tungstenite::tungstenite::Message;

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
}

pub fn record(captured_at: DateTime<Utc>, duration_sec: f64, counts: &[(&str, u64)]) -> SampleRecord {
    let counts: BTreeMap<String, u64> = counts.iter().map(|(l, c)| (l.to_string(), *c)).collect();
    SampleRecord::new(captured_at, duration_sec, counts)
}

pub fn commit(collection: &str) -> Message {
    Message::text(format!(
        r#"{{"did":"did:plc:abc","time_us":1,"kind":"commit","commit":{{"operation":"create","collection":"{collection}","rkey":"x"}}}}"#
    ))
}

pub fn identity() -> Message {
    Message::text(r#"{"did":"did:plc:abc","time_us":1,"kind":"identity","identity":{"handle":"a.test"}}"#.to_string())
}
