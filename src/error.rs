//! Crate error types (spec §7 taxa 1/2: transport/framing and protocol
//! errors). Application errors (taxon 3, `wamp.error.*`) are not modeled
//! here — they are ordinary outbound `Message::Error` values the
//! broker/dealer construct directly and send over the wire.

use thiserror::Error;

use crate::messages::URI;

/// Failure decoding one inbound WebSocket frame into a validated WAMP
/// message (C1/C2). Every variant here is an "offending message" per
/// spec §7: governed by the `drop-offending-messages` policy.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid uri: {0}")]
    InvalidUri(URI),

    #[error("binary frames are not supported on the wamp.2.json sub-protocol")]
    BinaryFrame,

    #[error("id {0} is out of the WAMP id range [1, 2^53)")]
    IdOutOfRange(u64),
}

/// Transport-level failure (C3): something went wrong moving bytes, as
/// opposed to something wrong with the bytes themselves.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("outbound queue is full, failing the connection")]
    OutboundOverflow,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Top-level router error: configuration/startup failures and anything
/// that should stop the whole process rather than one connection.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("failed to bind {0}")]
    Bind(String, #[source] std::io::Error),

    #[error("{0} is not a valid websocket path (must start with '/')")]
    InvalidPath(String),

    #[error("websocket upgrade failed: {0}")]
    Upgrade(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type RouterResult<T> = Result<T, RouterError>;
