//! Non-blocking HTTP/1.1 client engine with per-domain connection
//! pooling.
//!
//! Built on the sans-IO `h1-proto` parsing layer, this crate owns the
//! pieces between the wire protocol and the embedding event loop: the
//! domain-keyed connection pool with bounded concurrency and FIFO
//! request queueing, the per-connection state machine, and timer-driven
//! request deadlines and idle keepalive eviction.
//!
//! # Architecture
//!
//! The engine is cooperative and single-threaded. It performs no I/O of
//! its own: transports (plaintext TCP or TLS, interchangeable behind the
//! [`Transport`] trait) are created by a caller-supplied [`Connector`],
//! and deadlines are scheduled through a caller-supplied [`TimerDriver`].
//! Every operation that would block suspends the connection's state
//! machine; the event loop resumes it with
//! [`HttpClient::on_io_ready`] / [`HttpClient::on_timer`].
//!
//! Completion is delivered through a per-request [`ResponseHandler`]:
//! `on_head` picks one of three body consumption modes (discard,
//! buffer, stream), and `on_complete` always ends the exchange —
//! carrying the failure when the connection, protocol, or deadline did
//! not cooperate.
//!
//! # Pool behavior
//!
//! Connections are grouped per (host, port, tls) [`DomainKey`]. Each
//! domain is capped at `max_connections_per_domain` open connections;
//! excess requests queue FIFO and are handed freed connections in
//! submission order. A domain node is reclaimed deterministically when
//! its connection count and queue both reach zero.

pub mod client;
pub mod config;
pub mod conn;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod pool;
pub mod timer;
pub mod transport;

pub use client::{HttpClient, RequestBuilder};
pub use config::ClientConfig;
pub use conn::ConnId;
pub use error::HttpError;
pub use handler::{BodyMode, ResponseHandler};
pub use pool::DomainKey;
pub use timer::{TimerDriver, TimerHandle, TimerToken};
pub use transport::{ConnectProgress, Connector, IoStatus, Transport};

pub use h1_proto::{ParseError, Request, ResponseHead, Version};
