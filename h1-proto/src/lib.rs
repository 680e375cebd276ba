//! Sans-IO HTTP/1.1 client wire protocol.
//!
//! This crate implements the byte-level half of an HTTP/1.1 client:
//! request serialization and resumable response parsing. It performs no
//! I/O — callers feed received bytes into a [`RecvBuffer`] and drive the
//! parsers, which suspend with [`Progress::Incomplete`] whenever input
//! runs out and resume exactly where they stopped on the next feed.
//!
//! # Architecture
//!
//! - [`RecvBuffer`] — growable receive region with explicit consumed /
//!   unread / free cursors and bounded, compaction-first resizing.
//! - [`Request`] — request head construction and serialization.
//! - [`StatusLineParser`] / [`HeaderParser`] — incremental state machines
//!   producing a [`ResponseHead`].
//! - [`BodyReader`] — length-delimited or chunked payload decoding into a
//!   caller-supplied [`BodySink`].
//!
//! All parser positions are offsets or owned partial tokens, never
//! pointers into the buffer, so the buffer can be compacted or grown at
//! any suspension point.
//!
//! # Example
//!
//! ```
//! use h1_proto::{HeaderParser, Progress, RecvBuffer, ResponseHead, StatusLineParser};
//!
//! let mut buf = RecvBuffer::new(1024, 0);
//! let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
//! buf.space()[..wire.len()].copy_from_slice(wire);
//! buf.commit(wire.len());
//!
//! let mut status = StatusLineParser::new();
//! let Ok(Progress::Complete(line)) = status.parse(&mut buf) else {
//!     panic!("incomplete");
//! };
//! assert_eq!(line.status, 200);
//!
//! let mut head = ResponseHead { status: line.status, keep_alive: line.keep_alive, ..Default::default() };
//! let mut headers = HeaderParser::new(8192);
//! assert!(matches!(headers.parse(&mut buf, &mut head), Ok(Progress::Complete(()))));
//! assert_eq!(head.content_length, Some(5));
//! assert_eq!(buf.unread(), b"hello");
//! ```

mod body;
mod buffer;
mod error;
mod headers;
mod request;
mod status;

pub use body::{BodyReader, BodySink, ChunkedReader, LengthReader, SIZE_LINE_LOOKAHEAD};
pub use buffer::RecvBuffer;
pub use error::{ParseError, Progress};
pub use headers::{HeaderParser, ResponseHead};
pub use request::{Request, Version};
pub use status::{StatusLine, StatusLineParser};
