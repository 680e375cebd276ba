//! Response body framing: length-delimited and chunked transfer decoding.

use crate::buffer::RecvBuffer;
use crate::error::{ParseError, Progress};
use crate::headers::ResponseHead;

/// Receives decoded body bytes as they become available.
///
/// Framing is decoupled from consumption: the same readers serve
/// discard, buffer-to-memory, and streaming callers.
pub trait BodySink {
    /// Deliver a decoded slice of body payload. Never called with an
    /// empty slice by the readers themselves.
    fn data(&mut self, chunk: &[u8]);
}

/// Reader for `Content-Length`-delimited bodies.
pub struct LengthReader {
    remaining: u64,
}

impl LengthReader {
    /// Create a reader expecting exactly `len` payload bytes.
    pub fn new(len: u64) -> Self {
        Self { remaining: len }
    }

    /// Drain up to `remaining` unread bytes into the sink.
    ///
    /// Bytes past the declared length are left unread, positioned at the
    /// start of the next response for keepalive reuse.
    pub fn read(&mut self, buf: &mut RecvBuffer, sink: &mut dyn BodySink) -> Progress<()> {
        if self.remaining > 0 && !buf.is_empty() {
            let n = (buf.len() as u64).min(self.remaining) as usize;
            sink.data(&buf.unread()[..n]);
            buf.consume(n);
            self.remaining -= n as u64;
        }
        if self.remaining == 0 {
            Progress::Complete(())
        } else {
            Progress::Incomplete
        }
    }
}

/// Max bytes of a chunk size line: 16 hex digits plus CRLF.
pub const SIZE_LINE_LOOKAHEAD: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Awaiting a complete `<hex-size>\r\n` line.
    Size,
    /// Dispatching chunk payload, `remaining` bytes outstanding.
    Data { remaining: u64 },
    /// Awaiting the CRLF that closes a chunk's payload.
    DataEnd,
    /// Zero-size chunk seen; awaiting the final CRLF. Trailers are not
    /// supported and fail validation here.
    TrailerEnd,
    /// Terminal chunk fully consumed.
    Done,
}

/// Reader for `Transfer-Encoding: chunked` bodies (RFC 7230 §4.1).
///
/// Payload is dispatched to the sink incrementally as it arrives, but a
/// chunk's trailing CRLF is always validated as a single two-byte unit:
/// when only one of its bytes is buffered, that byte stays in the buffer
/// until its partner arrives.
pub struct ChunkedReader {
    state: ChunkState,
}

impl Default for ChunkedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedReader {
    /// Create a reader positioned at the first chunk's size line.
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
        }
    }

    /// Feed unread buffer data through the decoder.
    pub fn read(
        &mut self,
        buf: &mut RecvBuffer,
        sink: &mut dyn BodySink,
    ) -> Result<Progress<()>, ParseError> {
        loop {
            match self.state {
                ChunkState::Size => {
                    let unread = buf.unread();
                    let window = &unread[..unread.len().min(SIZE_LINE_LOOKAHEAD)];
                    let Some(nl) = window.iter().position(|&b| b == b'\n') else {
                        if unread.len() >= SIZE_LINE_LOOKAHEAD {
                            return Err(ParseError::BadChunk);
                        }
                        return Ok(Progress::Incomplete);
                    };
                    // Shortest valid line is "0\r\n": one digit, then CRLF.
                    if nl < 2 || window[nl - 1] != b'\r' {
                        return Err(ParseError::BadChunk);
                    }
                    let mut size: u64 = 0;
                    for &b in &window[..nl - 1] {
                        let digit = match b {
                            b'0'..=b'9' => u64::from(b - b'0'),
                            b'a'..=b'f' => u64::from(b - b'a' + 10),
                            b'A'..=b'F' => u64::from(b - b'A' + 10),
                            _ => return Err(ParseError::BadChunk),
                        };
                        size = size << 4 | digit;
                    }
                    buf.consume(nl + 1);
                    self.state = if size == 0 {
                        ChunkState::TrailerEnd
                    } else {
                        ChunkState::Data { remaining: size }
                    };
                }
                ChunkState::Data { remaining } => {
                    if buf.is_empty() {
                        return Ok(Progress::Incomplete);
                    }
                    let n = (buf.len() as u64).min(remaining) as usize;
                    sink.data(&buf.unread()[..n]);
                    buf.consume(n);
                    let remaining = remaining - n as u64;
                    if remaining == 0 {
                        self.state = ChunkState::DataEnd;
                    } else {
                        self.state = ChunkState::Data { remaining };
                        return Ok(Progress::Incomplete);
                    }
                }
                ChunkState::DataEnd => {
                    if buf.len() < 2 {
                        // A lone CR stays buffered; the pair is checked
                        // together on the next feed.
                        return Ok(Progress::Incomplete);
                    }
                    if &buf.unread()[..2] != b"\r\n" {
                        return Err(ParseError::BadChunk);
                    }
                    buf.consume(2);
                    self.state = ChunkState::Size;
                }
                ChunkState::TrailerEnd => {
                    if buf.len() < 2 {
                        return Ok(Progress::Incomplete);
                    }
                    if &buf.unread()[..2] != b"\r\n" {
                        return Err(ParseError::BadChunk);
                    }
                    buf.consume(2);
                    self.state = ChunkState::Done;
                    return Ok(Progress::Complete(()));
                }
                ChunkState::Done => return Ok(Progress::Complete(())),
            }
        }
    }
}

/// Body framing selected from a parsed response head.
pub enum BodyReader {
    /// No body: neither `Content-Length` nor chunked framing present.
    Empty,
    /// `Content-Length`-delimited body.
    Length(LengthReader),
    /// Chunked transfer encoding. Wins over `Content-Length` when both
    /// are present.
    Chunked(ChunkedReader),
}

impl BodyReader {
    /// Select framing for a response head.
    pub fn for_head(head: &ResponseHead) -> Self {
        if head.chunked {
            BodyReader::Chunked(ChunkedReader::new())
        } else if let Some(len) = head.content_length {
            BodyReader::Length(LengthReader::new(len))
        } else {
            BodyReader::Empty
        }
    }

    /// Feed unread buffer data through the selected framing.
    pub fn read(
        &mut self,
        buf: &mut RecvBuffer,
        sink: &mut dyn BodySink,
    ) -> Result<Progress<()>, ParseError> {
        match self {
            BodyReader::Empty => Ok(Progress::Complete(())),
            BodyReader::Length(r) => Ok(r.read(buf, sink)),
            BodyReader::Chunked(r) => r.read(buf, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Vec<u8>);

    impl BodySink for Collect {
        fn data(&mut self, chunk: &[u8]) {
            self.0.extend_from_slice(chunk);
        }
    }

    fn feed(buf: &mut RecvBuffer, data: &[u8]) {
        assert!(buf.ensure_space(data.len()));
        buf.space()[..data.len()].copy_from_slice(data);
        buf.commit(data.len());
    }

    // ── Length-delimited ────────────────────────────────────────────

    #[test]
    fn length_exact() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"hello");
        let mut sink = Collect(Vec::new());
        let mut reader = LengthReader::new(5);
        assert_eq!(reader.read(&mut buf, &mut sink), Progress::Complete(()));
        assert_eq!(sink.0, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn length_zero_completes_immediately() {
        let mut buf = RecvBuffer::new(64, 0);
        let mut sink = Collect(Vec::new());
        let mut reader = LengthReader::new(0);
        assert_eq!(reader.read(&mut buf, &mut sink), Progress::Complete(()));
        assert!(sink.0.is_empty());
    }

    #[test]
    fn length_leaves_next_response_unread() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"helloHTTP/1.1 204");
        let mut sink = Collect(Vec::new());
        let mut reader = LengthReader::new(5);
        assert_eq!(reader.read(&mut buf, &mut sink), Progress::Complete(()));
        assert_eq!(sink.0, b"hello");
        assert_eq!(buf.unread(), b"HTTP/1.1 204");
    }

    #[test]
    fn length_across_fragments() {
        let mut buf = RecvBuffer::new(64, 0);
        let mut sink = Collect(Vec::new());
        let mut reader = LengthReader::new(10);
        feed(&mut buf, b"hell");
        assert_eq!(reader.read(&mut buf, &mut sink), Progress::Incomplete);
        feed(&mut buf, b"o worl");
        assert_eq!(reader.read(&mut buf, &mut sink), Progress::Incomplete);
        feed(&mut buf, b"d!");
        assert_eq!(reader.read(&mut buf, &mut sink), Progress::Complete(()));
        assert_eq!(sink.0, b"hello worl");
        assert_eq!(buf.unread(), b"d!");
    }

    // ── Chunked ─────────────────────────────────────────────────────

    const WIKI: &[u8] = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";

    #[test]
    fn chunked_whole_message() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, WIKI);
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(reader.read(&mut buf, &mut sink), Ok(Progress::Complete(())));
        assert_eq!(sink.0, b"Wikipedia");
        assert!(buf.is_empty());
    }

    #[test]
    fn chunked_round_trip_at_every_split_point() {
        for split in 1..WIKI.len() {
            let mut buf = RecvBuffer::new(64, 0);
            let mut sink = Collect(Vec::new());
            let mut reader = ChunkedReader::new();

            feed(&mut buf, &WIKI[..split]);
            let first = reader.read(&mut buf, &mut sink).unwrap();
            assert!(first.is_incomplete(), "split {split} completed early");

            feed(&mut buf, &WIKI[split..]);
            let second = reader.read(&mut buf, &mut sink).unwrap();
            assert_eq!(second, Progress::Complete(()), "split {split}");
            assert_eq!(sink.0, b"Wikipedia", "split {split}");
        }
    }

    #[test]
    fn chunked_byte_at_a_time() {
        let mut buf = RecvBuffer::new(64, 0);
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        for (i, &b) in WIKI.iter().enumerate() {
            feed(&mut buf, &[b]);
            let progress = reader.read(&mut buf, &mut sink).unwrap();
            if i < WIKI.len() - 1 {
                assert!(progress.is_incomplete(), "byte {i}");
            } else {
                assert_eq!(progress, Progress::Complete(()));
            }
        }
        assert_eq!(sink.0, b"Wikipedia");
    }

    #[test]
    fn chunk_crlf_never_split_across_deliveries() {
        let mut buf = RecvBuffer::new(64, 0);
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();

        // Payload plus only the CR of the trailing CRLF.
        feed(&mut buf, b"4\r\nWiki\r");
        assert!(reader.read(&mut buf, &mut sink).unwrap().is_incomplete());
        assert_eq!(sink.0, b"Wiki");
        // The lone CR is preserved in the buffer, not consumed.
        assert_eq!(buf.unread(), b"\r");

        feed(&mut buf, b"\n0\r\n\r\n");
        assert_eq!(
            reader.read(&mut buf, &mut sink).unwrap(),
            Progress::Complete(())
        );
        assert_eq!(sink.0, b"Wiki");
    }

    #[test]
    fn chunked_empty_body() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"0\r\n\r\n");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(reader.read(&mut buf, &mut sink), Ok(Progress::Complete(())));
        assert!(sink.0.is_empty());
    }

    #[test]
    fn chunked_rejects_bad_hex() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"4g\r\nWiki\r\n");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(
            reader.read(&mut buf, &mut sink),
            Err(ParseError::BadChunk)
        );
    }

    #[test]
    fn chunked_bad_hex_at_any_split_point() {
        let bad: &[u8] = b"4\r\nWiki\r\nZZ\r\nmore\r\n0\r\n\r\n";
        for split in 1..bad.len() {
            let mut buf = RecvBuffer::new(64, 0);
            let mut sink = Collect(Vec::new());
            let mut reader = ChunkedReader::new();

            feed(&mut buf, &bad[..split]);
            let first = reader.read(&mut buf, &mut sink);
            if first.is_err() {
                continue;
            }
            feed(&mut buf, &bad[split..]);
            assert_eq!(
                reader.read(&mut buf, &mut sink),
                Err(ParseError::BadChunk),
                "split {split}"
            );
        }
    }

    #[test]
    fn chunked_rejects_missing_data_crlf() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"4\r\nWikiXX");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(
            reader.read(&mut buf, &mut sink),
            Err(ParseError::BadChunk)
        );
        // Payload was already dispatched; only the framing failed.
        assert_eq!(sink.0, b"Wiki");
    }

    #[test]
    fn chunked_rejects_bare_lf_size_line() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"4\nWiki\r\n");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(
            reader.read(&mut buf, &mut sink),
            Err(ParseError::BadChunk)
        );
    }

    #[test]
    fn chunked_rejects_oversized_size_line() {
        let mut buf = RecvBuffer::new(64, 0);
        // 18+ bytes without a newline exhausts the lookahead.
        feed(&mut buf, b"111111111111111111");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(
            reader.read(&mut buf, &mut sink),
            Err(ParseError::BadChunk)
        );
    }

    #[test]
    fn chunked_rejects_trailers() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"0\r\nX-Trailer: v\r\n\r\n");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(
            reader.read(&mut buf, &mut sink),
            Err(ParseError::BadChunk)
        );
    }

    #[test]
    fn chunked_max_size_line_accepted() {
        // 16 hex digits plus CRLF exactly fills the lookahead.
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"0000000000000004\r\nWiki\r\n0\r\n\r\n");
        let mut sink = Collect(Vec::new());
        let mut reader = ChunkedReader::new();
        assert_eq!(reader.read(&mut buf, &mut sink), Ok(Progress::Complete(())));
        assert_eq!(sink.0, b"Wiki");
    }

    // ── BodyReader dispatch ─────────────────────────────────────────

    #[test]
    fn framing_selection() {
        let head = ResponseHead {
            chunked: true,
            content_length: Some(10),
            ..ResponseHead::default()
        };
        assert!(matches!(BodyReader::for_head(&head), BodyReader::Chunked(_)));

        let head = ResponseHead {
            content_length: Some(10),
            ..ResponseHead::default()
        };
        assert!(matches!(BodyReader::for_head(&head), BodyReader::Length(_)));

        let head = ResponseHead::default();
        assert!(matches!(BodyReader::for_head(&head), BodyReader::Empty));
    }

    #[test]
    fn empty_framing_completes_without_reading() {
        let mut buf = RecvBuffer::new(64, 0);
        feed(&mut buf, b"leftover");
        let mut sink = Collect(Vec::new());
        let mut reader = BodyReader::Empty;
        assert_eq!(reader.read(&mut buf, &mut sink), Ok(Progress::Complete(())));
        assert!(sink.0.is_empty());
        assert_eq!(buf.unread(), b"leftover");
    }
}
