// Time-boxed Jetstream sampler: count commits per collection for one window.
// The only suspension point is the receive; its timeout is recomputed from the
// window start on every iteration so the wall-clock bound holds whatever the
// message cadence.

mod event;

pub use event::collection_label;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use std::collections::BTreeMap;
use tokio::time::{Duration, Instant, timeout};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, instrument};

use crate::config::FeedConfig;
use crate::error::SampleError;
use crate::models::SampleRecord;
use event::Frame;

/// Collection window: stop at `duration`, but let a receive run `grace` past it.
#[derive(Debug, Clone, Copy)]
pub struct CollectWindow {
    pub duration: Duration,
    pub grace: Duration,
}

impl CollectWindow {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            duration: Duration::from_secs(config.duration_secs),
            grace: Duration::from_millis(config.grace_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Window elapsed, or no message arrived before the deadline plus grace.
    Deadline,
    /// Feed closed mid-window; counts are a valid partial result.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
    pub stop: StopReason,
    pub elapsed: Duration,
}

/// Counts commit events from `feed` until the window closes or the feed does.
pub async fn collect<S>(feed: &mut S, window: CollectWindow) -> Result<Collection, SampleError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let start = Instant::now();
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut total: u64 = 0;

    let stop = loop {
        let elapsed = start.elapsed();
        if elapsed >= window.duration {
            break StopReason::Deadline;
        }
        let wait = window.duration - elapsed + window.grace;

        let msg = match timeout(wait, feed.next()).await {
            Err(_) => break StopReason::Deadline,
            Ok(None) => break StopReason::Disconnected,
            Ok(Some(Err(e))) if event::is_disconnect(&e) => {
                debug!(error = %e, "feed disconnected");
                break StopReason::Disconnected;
            }
            Ok(Some(Err(e))) => return Err(SampleError::Feed(Box::new(e))),
            Ok(Some(Ok(msg))) => msg,
        };

        match event::classify(msg)? {
            Frame::Commit(label) => {
                *counts.entry(label).or_insert(0) += 1;
                total += 1;
            }
            Frame::Ignored => {}
            Frame::Closed => break StopReason::Disconnected,
        }
    };

    Ok(Collection {
        counts,
        total,
        stop,
        elapsed: start.elapsed(),
    })
}

/// Subscribe URL with one `wantedCollections` parameter per configured filter.
pub fn subscribe_url(config: &FeedConfig) -> Result<url::Url, SampleError> {
    let mut url = url::Url::parse(&config.url).map_err(|e| SampleError::InvalidUrl {
        url: config.url.clone(),
        reason: e.to_string(),
    })?;
    if !config.wanted_collections.is_empty() {
        let mut query = url.query_pairs_mut();
        for collection in &config.wanted_collections {
            query.append_pair("wantedCollections", collection);
        }
    }
    Ok(url)
}

/// Connects, collects one window and stamps the record with the capture time.
#[instrument(skip(config), fields(operation = "sample", duration_secs = config.duration_secs))]
pub async fn sample(config: &FeedConfig) -> Result<SampleRecord, SampleError> {
    let url = subscribe_url(config)?;
    let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| SampleError::Connect(Box::new(e)))?;
    debug!(url = %url, "connected to feed");

    let collection = collect(&mut ws, CollectWindow::from_config(config)).await?;
    info!(
        total = collection.total,
        collections = collection.counts.len(),
        stop = ?collection.stop,
        elapsed_ms = collection.elapsed.as_millis() as u64,
        "window collected"
    );

    // Best effort; the window is already complete.
    if let Err(e) = ws.close(None).await {
        debug!(error = %e, "close after collection failed");
    }

    Ok(SampleRecord::new(
        Utc::now(),
        config.duration_secs as f64,
        collection.counts,
    ))
}
