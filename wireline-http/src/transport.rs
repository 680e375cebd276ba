//! Transport and connector capabilities consumed by the engine.
//!
//! Plaintext TCP and TLS are interchangeable implementations of one
//! contract; the engine contains no transport-specific branches. DNS
//! resolution, socket creation, and TLS client configuration all live
//! behind [`Connector`].

use std::io;

use crate::conn::ConnId;
use crate::pool::DomainKey;

/// Result of a non-blocking read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    /// `n > 0` bytes were transferred.
    Ready(usize),
    /// The operation would block; retry after the next readiness event.
    WouldBlock,
    /// The peer closed the stream (EOF on read, reset on write).
    Closed,
}

/// Progress of connection establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProgress {
    /// Still connecting (or mid TLS handshake); retry on readiness.
    Pending,
    /// The stream is ready for application data.
    Connected,
}

/// A non-blocking bidirectional byte stream.
///
/// Implementations must never block: operations that cannot progress
/// return [`IoStatus::WouldBlock`] / [`ConnectProgress::Pending`] and the
/// caller's event loop resumes the engine via
/// [`HttpClient::on_io_ready`](crate::HttpClient::on_io_ready).
pub trait Transport {
    /// Drive connection establishment. For TLS transports this covers
    /// the handshake; the engine will not write until `Connected`.
    fn poll_connect(&mut self) -> io::Result<ConnectProgress>;

    /// Read received bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<IoStatus>;

    /// Write bytes from `buf`. Partial writes are expected; the engine
    /// resumes from the unwritten suffix.
    fn write(&mut self, buf: &[u8]) -> io::Result<IoStatus>;

    /// Release the underlying stream. Idempotent.
    fn close(&mut self);
}

/// Creates transports for new pool connections.
///
/// The `ConnId` identifies the connection to the engine; the connector
/// should associate it with the transport's readiness source so that
/// events can be routed back through
/// [`HttpClient::on_io_ready`](crate::HttpClient::on_io_ready).
pub trait Connector {
    /// Begin establishing a transport to `key`. The returned transport
    /// may still be mid-connect; the engine polls it to completion.
    fn connect(&mut self, key: &DomainKey, id: ConnId) -> io::Result<Box<dyn Transport>>;
}
