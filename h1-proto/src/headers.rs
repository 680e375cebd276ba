//! Resumable HTTP/1.1 header-block parser.

use std::mem;

use crate::buffer::RecvBuffer;
use crate::error::{ParseError, Progress};

/// Parsed response head: status line plus header block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHead {
    /// Status code from the status line.
    pub status: u16,
    /// Whether the connection may be reused after this exchange.
    /// Seeded from the HTTP version, updated by `Connection` headers.
    pub keep_alive: bool,
    /// All headers in wire order. Duplicates are preserved.
    pub headers: Vec<(String, String)>,
    /// First `Content-Length` value, if present and valid.
    pub content_length: Option<u64>,
    /// True when `Transfer-Encoding: chunked` was seen.
    pub chunked: bool,
    /// Index of the first `Content-Type` header in `headers`.
    pub content_type: Option<usize>,
}

impl ResponseHead {
    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Content-Type` value, if one was received.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type
            .and_then(|i| self.headers.get(i))
            .map(|(_, v)| v.as_str())
    }
}

/// RFC 7230 token characters, valid in header names.
static TOKEN: [bool; 256] = build_token_table();

const fn build_token_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut b = 0usize;
    while b < 256 {
        let c = b as u8;
        table[b] = c.is_ascii_alphanumeric()
            || matches!(
                c,
                b'!' | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'*'
                    | b'+'
                    | b'-'
                    | b'.'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'|'
                    | b'~'
            );
        b += 1;
    }
    table
}

/// Header values accept VCHAR, obs-text (>= 0x80), and HT. Every other
/// control byte is a protocol error.
#[inline]
fn is_value_byte(b: u8) -> bool {
    b == b'\t' || (b >= 0x20 && b != 0x7f)
}

#[derive(Debug, Clone, Copy)]
enum State {
    /// At the start of a line: header name, or the terminating blank line.
    Start,
    /// Accumulating a header name up to `:`.
    Name,
    /// Skipping spaces between `:` and the value.
    ValueLeadingSpace,
    /// Accumulating the value up to CR or LF.
    Value,
    /// Expecting the LF of a CRLF pair. `terminal` marks the blank line.
    LineFeed { terminal: bool },
}

/// Incremental header-block parser.
///
/// Partially received names and values are held in owned accumulators, so
/// buffer compaction or growth between feeds never invalidates parser
/// state. Total header-block size is bounded by `limit`; exceeding it is
/// a protocol error.
pub struct HeaderParser {
    state: State,
    name: String,
    value: Vec<u8>,
    limit: usize,
    total: usize,
}

impl HeaderParser {
    /// Create a parser accepting at most `limit` header-block bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            state: State::Start,
            name: String::new(),
            value: Vec::new(),
            limit,
            total: 0,
        }
    }

    /// Feed unread buffer data through the parser, appending parsed
    /// headers to `head`.
    pub fn parse(
        &mut self,
        buf: &mut RecvBuffer,
        head: &mut ResponseHead,
    ) -> Result<Progress<()>, ParseError> {
        loop {
            match self.state {
                State::Start => {
                    let Some(&b) = buf.unread().first() else {
                        return Ok(Progress::Incomplete);
                    };
                    match b {
                        b'\r' => {
                            self.advance(buf, 1)?;
                            self.state = State::LineFeed { terminal: true };
                        }
                        b'\n' => {
                            self.advance(buf, 1)?;
                            return Ok(Progress::Complete(()));
                        }
                        _ if TOKEN[b as usize] => self.state = State::Name,
                        _ => return Err(ParseError::BadHeaderName),
                    }
                }
                State::Name => {
                    let unread = buf.unread();
                    let end = unread.iter().position(|&b| !TOKEN[b as usize]);
                    match end {
                        Some(i) => {
                            if unread[i] != b':' {
                                return Err(ParseError::BadHeaderName);
                            }
                            self.name
                                .push_str(std::str::from_utf8(&unread[..i]).unwrap_or(""));
                            self.advance(buf, i + 1)?;
                            self.state = State::ValueLeadingSpace;
                        }
                        None => {
                            self.name
                                .push_str(std::str::from_utf8(unread).unwrap_or(""));
                            let n = unread.len();
                            self.advance(buf, n)?;
                            return Ok(Progress::Incomplete);
                        }
                    }
                }
                State::ValueLeadingSpace => {
                    let unread = buf.unread();
                    let skip = unread
                        .iter()
                        .position(|&b| b != b' ' && b != b'\t')
                        .unwrap_or(unread.len());
                    self.advance(buf, skip)?;
                    if buf.is_empty() {
                        return Ok(Progress::Incomplete);
                    }
                    self.state = State::Value;
                }
                State::Value => {
                    let unread = buf.unread();
                    let end = unread.iter().position(|&b| !is_value_byte(b));
                    match end {
                        Some(i) => {
                            let term = unread[i];
                            self.value.extend_from_slice(&unread[..i]);
                            self.advance(buf, i + 1)?;
                            match term {
                                b'\r' => {
                                    self.finish_header(head)?;
                                    self.state = State::LineFeed { terminal: false };
                                }
                                b'\n' => {
                                    self.finish_header(head)?;
                                    self.state = State::Start;
                                }
                                _ => return Err(ParseError::BadHeaderValue),
                            }
                        }
                        None => {
                            self.value.extend_from_slice(unread);
                            let n = unread.len();
                            self.advance(buf, n)?;
                            return Ok(Progress::Incomplete);
                        }
                    }
                }
                State::LineFeed { terminal } => {
                    let Some(&b) = buf.unread().first() else {
                        return Ok(Progress::Incomplete);
                    };
                    if b != b'\n' {
                        return Err(ParseError::BadHeaderName);
                    }
                    self.advance(buf, 1)?;
                    if terminal {
                        return Ok(Progress::Complete(()));
                    }
                    self.state = State::Start;
                }
            }
        }
    }

    /// Consume `n` bytes, charging them against the header-block limit.
    fn advance(&mut self, buf: &mut RecvBuffer, n: usize) -> Result<(), ParseError> {
        self.total += n;
        if self.total > self.limit {
            return Err(ParseError::HeadersTooLarge);
        }
        buf.consume(n);
        Ok(())
    }

    /// Record a completed header and apply recognized-header semantics.
    fn finish_header(&mut self, head: &mut ResponseHead) -> Result<(), ParseError> {
        let name = mem::take(&mut self.name);
        let value_bytes = mem::take(&mut self.value);
        let value = String::from_utf8_lossy(&value_bytes).into_owned();

        if name.eq_ignore_ascii_case("connection") {
            for token in value.split(',') {
                let token = token.trim();
                if token.eq_ignore_ascii_case("close") {
                    head.keep_alive = false;
                } else if token.eq_ignore_ascii_case("keep-alive") {
                    head.keep_alive = true;
                }
            }
        } else if name.eq_ignore_ascii_case("content-length") {
            // First occurrence wins; later duplicates are ignored.
            if head.content_length.is_none() {
                let parsed = value.parse::<u64>().map_err(|_| ParseError::BadContentLength)?;
                head.content_length = Some(parsed);
            }
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            if value.eq_ignore_ascii_case("chunked") {
                head.chunked = true;
            }
        } else if name.eq_ignore_ascii_case("content-type") && head.content_type.is_none() {
            head.content_type = Some(head.headers.len());
        }

        head.headers.push((name, value));
        Ok(())
    }
}
