//! Per-request completion handler.

use bytes::Bytes;
use h1_proto::ResponseHead;

use crate::error::HttpError;

/// How the response body should be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// Read and drop the body.
    Discard,
    /// Accumulate the body into one contiguous buffer, delivered via
    /// `on_complete`. Bodies larger than the configured cap are drained
    /// and the response delivered with no body.
    #[default]
    Buffer,
    /// Deliver each decoded slice through `on_body_chunk` as it arrives,
    /// with a final empty slice marking completion.
    Stream,
}

/// Callbacks for one request/response exchange.
///
/// The engine calls `on_head` exactly once when the status line and
/// header block have been parsed; its return value selects the body
/// consumption mode for the rest of the exchange. `on_complete` is
/// always the final call, on success and on failure alike.
pub trait ResponseHandler {
    /// The response head is available. Choose how to consume the body.
    fn on_head(&mut self, head: &ResponseHead) -> BodyMode;

    /// A decoded body slice, in [`BodyMode::Stream`] only. The final
    /// call passes an empty slice.
    fn on_body_chunk(&mut self, chunk: &[u8]) {
        let _ = chunk;
    }

    /// The exchange finished. `Ok(Some(body))` for a buffered body,
    /// `Ok(None)` for discard/stream completion (and for an oversized
    /// buffered body), `Err` for a failure at any stage — including
    /// before `on_head` was ever called.
    fn on_complete(&mut self, outcome: Result<Option<Bytes>, HttpError>);
}
