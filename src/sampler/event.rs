// Feed frame classification: which frames carry a countable commit.

use serde_json::Value;
use tokio_tungstenite::tungstenite::{self, Message, error::ProtocolError};

use crate::error::SampleError;

/// What one inbound frame means for the collection loop.
#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
    /// A commit event for this collection label.
    Commit(String),
    /// Valid but not countable (identity/account events, control frames).
    Ignored,
    /// Peer closed the socket.
    Closed,
}

pub(crate) fn classify(msg: Message) -> Result<Frame, SampleError> {
    match msg {
        Message::Text(text) => decode(text.as_bytes()),
        Message::Binary(bytes) => decode(&bytes),
        Message::Close(_) => Ok(Frame::Closed),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(Frame::Ignored),
    }
}

fn decode(payload: &[u8]) -> Result<Frame, SampleError> {
    let event: Value = serde_json::from_slice(payload)?;
    Ok(match collection_label(&event) {
        Some(label) => Frame::Commit(label.to_owned()),
        None => Frame::Ignored,
    })
}

/// `{"commit": {"collection": "<label>", ...}, ...}` -> `<label>`.
pub fn collection_label(event: &Value) -> Option<&str> {
    event.get("commit")?.get("collection")?.as_str()
}

/// Errors after which the socket is gone; the window ends with what it has.
pub(crate) fn is_disconnect(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}
