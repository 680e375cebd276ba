use std::io;

use h1_proto::ParseError;

/// Errors produced by the HTTP client engine.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The peer closed the connection before the response completed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport I/O error (connect, read, or write).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// URL could not be parsed into scheme, authority, and path.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response violated HTTP/1.1 framing.
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// The per-request deadline expired.
    #[error("request timed out")]
    Timeout,

    /// The engine is draining; new requests are rejected.
    #[error("client shutting down")]
    ShuttingDown,

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    Config(&'static str),
}
