// Sampler tests: deadline loop, disconnect tolerance, frame handling (paused tokio time)

mod common;

use common::{commit, identity};
use futures_util::{SinkExt, StreamExt, stream};
use lexicon_stats::config::FeedConfig;
use lexicon_stats::error::SampleError;
use lexicon_stats::sample_repo::SampleRepo;
use lexicon_stats::sampler::{
    CollectWindow, StopReason, collect, collection_label, sample, subscribe_url,
};
use tokio::net::TcpListener;
use tokio::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::{self, Message, error::ProtocolError};

type Item = Result<Message, tungstenite::Error>;

fn window(secs: u64) -> CollectWindow {
    CollectWindow {
        duration: Duration::from_secs(secs),
        grace: Duration::from_secs(1),
    }
}

#[tokio::test(start_paused = true)]
async fn immediate_close_yields_empty_collection() {
    let mut feed = stream::empty::<Item>();
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.total, 0);
    assert!(out.counts.is_empty());
    assert_eq!(out.stop, StopReason::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn counts_commits_and_ignores_other_frames() {
    let items: Vec<Item> = vec![
        Ok(commit("app.bsky.feed.post")),
        Ok(identity()),
        Ok(commit("app.bsky.feed.like")),
        Ok(Message::Ping(Default::default())),
        Ok(commit("app.bsky.feed.post")),
        Ok(Message::text(r#"{"kind":"commit","commit":{"operation":"delete"}}"#.to_string())),
        Ok(Message::text(r#"{"commit":{"collection":42}}"#.to_string())),
        Ok(Message::text("[1,2,3]".to_string())),
    ];
    let mut feed = stream::iter(items);
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.total, 3);
    assert_eq!(out.counts["app.bsky.feed.post"], 2);
    assert_eq!(out.counts["app.bsky.feed.like"], 1);
    assert_eq!(out.counts.values().sum::<u64>(), out.total);
    assert_eq!(out.stop, StopReason::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn binary_frames_are_decoded() {
    let payload = br#"{"commit":{"collection":"app.bsky.graph.follow"}}"#.to_vec();
    let mut feed = stream::iter(vec![Ok::<_, tungstenite::Error>(Message::binary(payload))]);
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.counts["app.bsky.graph.follow"], 1);
}

#[tokio::test(start_paused = true)]
async fn close_frame_ends_window_with_partial_counts() {
    let items: Vec<Item> = vec![
        Ok(commit("a")),
        Ok(Message::Close(None)),
        Ok(commit("never.counted")),
    ];
    let mut feed = stream::iter(items);
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.total, 1);
    assert!(!out.counts.contains_key("never.counted"));
    assert_eq!(out.stop, StopReason::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connection_reset_is_a_partial_result() {
    let items: Vec<Item> = vec![
        Ok(commit("a")),
        Ok(commit("b")),
        Err(tungstenite::Error::Protocol(
            ProtocolError::ResetWithoutClosingHandshake,
        )),
    ];
    let mut feed = stream::iter(items);
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.total, 2);
    assert_eq!(out.stop, StopReason::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connection_closed_error_is_a_partial_result() {
    let items: Vec<Item> = vec![Ok(commit("a")), Err(tungstenite::Error::ConnectionClosed)];
    let mut feed = stream::iter(items);
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.total, 1);
    assert_eq!(out.stop, StopReason::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn malformed_message_is_fatal() {
    let items: Vec<Item> = vec![Ok(commit("a")), Ok(Message::text("{not json".to_string()))];
    let mut feed = stream::iter(items);
    let err = collect(&mut feed, window(60)).await.unwrap_err();
    assert!(matches!(err, SampleError::Decode(_)));
}

#[tokio::test(start_paused = true)]
async fn non_disconnect_transport_error_is_fatal() {
    let items: Vec<Item> = vec![Err(tungstenite::Error::Protocol(
        ProtocolError::NonZeroReservedBits,
    ))];
    let mut feed = stream::iter(items);
    let err = collect(&mut feed, window(60)).await.unwrap_err();
    assert!(matches!(err, SampleError::Feed(_)));
}

#[tokio::test(start_paused = true)]
async fn silent_feed_stops_within_deadline_plus_grace() {
    let mut feed = stream::pending::<Item>();
    let start = Instant::now();
    let out = collect(&mut feed, window(60)).await.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(60), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(61), "elapsed {elapsed:?}");
    assert_eq!(out.total, 0);
    assert_eq!(out.stop, StopReason::Deadline);
}

#[tokio::test(start_paused = true)]
async fn steady_feed_stops_at_deadline() {
    // One commit every 10s, forever.
    let feed = stream::unfold((), |()| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Some((Ok::<_, tungstenite::Error>(commit("tick")), ()))
    });
    let mut feed = std::pin::pin!(feed);
    let start = Instant::now();
    let out = collect(&mut feed, window(60)).await.unwrap();
    let elapsed = start.elapsed();
    assert_eq!(out.stop, StopReason::Deadline);
    assert_eq!(out.counts["tick"], 6);
    assert!(elapsed >= Duration::from_secs(60));
    assert!(elapsed <= Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn late_gap_is_cut_by_grace() {
    // First message at 5s, then nothing until long after the window.
    let feed = stream::unfold(0u32, |n| async move {
        let delay = if n == 0 { 5 } else { 500 };
        tokio::time::sleep(Duration::from_secs(delay)).await;
        Some((Ok::<_, tungstenite::Error>(commit("late")), n + 1))
    });
    let mut feed = std::pin::pin!(feed);
    let start = Instant::now();
    let out = collect(&mut feed, window(60)).await.unwrap();
    assert_eq!(out.total, 1);
    assert_eq!(out.stop, StopReason::Deadline);
    assert!(start.elapsed() <= Duration::from_secs(61));
}

#[test]
fn collection_label_extracts_commit_collection() {
    let event: serde_json::Value =
        serde_json::from_str(r#"{"commit":{"collection":"app.bsky.feed.repost"}}"#).unwrap();
    assert_eq!(collection_label(&event), Some("app.bsky.feed.repost"));

    let event: serde_json::Value = serde_json::from_str(r#"{"account":{"active":true}}"#).unwrap();
    assert_eq!(collection_label(&event), None);
}

#[test]
fn subscribe_url_appends_wanted_collections() {
    let config = FeedConfig {
        wanted_collections: vec!["app.bsky.feed.post".into(), "app.bsky.feed.like".into()],
        ..FeedConfig::default()
    };
    let url = subscribe_url(&config).unwrap();
    assert_eq!(
        url.as_str(),
        "wss://jetstream2.us-east.bsky.network/subscribe?wantedCollections=app.bsky.feed.post&wantedCollections=app.bsky.feed.like"
    );

    let plain = subscribe_url(&FeedConfig::default()).unwrap();
    assert_eq!(plain.query(), None);
}

#[test]
fn subscribe_url_rejects_garbage() {
    let config = FeedConfig {
        url: "::nope".into(),
        ..FeedConfig::default()
    };
    assert!(matches!(
        subscribe_url(&config),
        Err(SampleError::InvalidUrl { .. })
    ));
}

/// Local feed that sends `frames`, then closes the socket. Returns its subscribe URL.
async fn serve_once(frames: Vec<Message>) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            let _ = ws.send(frame).await;
        }
        let _ = ws.close(None).await;
        while let Some(Ok(_)) = ws.next().await {}
    });
    (format!("ws://{addr}/subscribe"), handle)
}

#[tokio::test]
async fn sample_against_closing_feed_still_produces_record() {
    let (url, server) = serve_once(vec![]).await;
    let config = FeedConfig {
        url,
        duration_secs: 30,
        ..FeedConfig::default()
    };

    let record = sample(&config).await.unwrap();
    server.await.unwrap();

    assert_eq!(record.total, 0);
    assert!(record.counts.is_empty());
    assert_eq!(record.duration_sec, 30.0);
    assert!(record.validate().is_ok());

    let dir = tempfile::TempDir::new().unwrap();
    let path = SampleRepo::new(dir.path()).save(&record).unwrap();
    assert_eq!(SampleRepo::load(&path).unwrap(), record);
}

#[tokio::test]
async fn sample_counts_commits_before_feed_closes() {
    let (url, server) = serve_once(vec![
        commit("app.bsky.feed.post"),
        identity(),
        commit("app.bsky.feed.post"),
        commit("app.bsky.feed.like"),
    ])
    .await;
    let config = FeedConfig {
        url,
        duration_secs: 45,
        wanted_collections: vec!["app.bsky.feed.post".into(), "app.bsky.feed.like".into()],
        ..FeedConfig::default()
    };

    let record = sample(&config).await.unwrap();
    server.await.unwrap();

    assert_eq!(record.total, 3);
    assert_eq!(record.counts["app.bsky.feed.post"], 2);
    assert_eq!(record.counts["app.bsky.feed.like"], 1);
    assert_eq!(record.duration_sec, 45.0);
}

#[tokio::test]
async fn sample_with_malformed_frame_fails() {
    let (url, server) = serve_once(vec![Message::text("not json".to_string())]).await;
    let config = FeedConfig {
        url,
        ..FeedConfig::default()
    };

    let err = sample(&config).await.unwrap_err();
    assert!(matches!(err, SampleError::Decode(_)));
    drop(server);
}
