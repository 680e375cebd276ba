//! Error types for HTTP/1.1 response parsing.

/// Error type for HTTP/1.1 parsing operations.
///
/// Every variant is fatal to the connection that produced it: the response
/// stream is no longer at a known framing boundary once any of these occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Status line did not start with `HTTP/1.1` or `HTTP/1.0`.
    #[error("unsupported HTTP version")]
    BadVersion,

    /// Status code was not exactly three digits in 100..=599.
    #[error("malformed status code")]
    BadStatus,

    /// Header name contained a byte outside the HTTP token character class.
    #[error("malformed header name")]
    BadHeaderName,

    /// Header value contained a control byte other than HT.
    #[error("malformed header value")]
    BadHeaderValue,

    /// `Content-Length` value was not an unsigned integer.
    #[error("invalid content-length")]
    BadContentLength,

    /// Chunked framing violation (bad size line or missing chunk CRLF).
    #[error("malformed chunk framing")]
    BadChunk,

    /// Header block exceeded the configured growth limit.
    #[error("header block too large")]
    HeadersTooLarge,
}

/// Result of one incremental parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    /// Need more data to continue parsing. Parser state and any partial
    /// token are preserved for the next feed.
    Incomplete,

    /// Parsing finished; the buffer cursor sits just past the parsed item.
    Complete(T),
}

impl<T> Progress<T> {
    /// Returns true if more data is needed.
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Progress::Incomplete)
    }
}
