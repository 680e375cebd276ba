//! Resumable HTTP/1.1 status-line parser.

use crate::buffer::RecvBuffer;
use crate::error::{ParseError, Progress};

/// Parsed response status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    /// Status code, 100..=599.
    pub status: u16,
    /// True for `HTTP/1.1`, false for `HTTP/1.0`.
    pub keep_alive: bool,
}

/// Fixed version prefix shared by both accepted versions.
const VERSION_PREFIX: &[u8] = b"HTTP/1.";

#[derive(Debug, Clone, Copy)]
enum State {
    /// Matching `HTTP/1.x SP` byte by byte; `matched` counts 0..=8.
    Version { matched: u8 },
    /// Accumulating the three status digits, then the separating space.
    Code,
    /// Discarding the reason phrase up to and including `\n`.
    Reason,
}

/// Incremental status-line parser.
///
/// Consumes bytes from the buffer as each token completes; on
/// [`Progress::Incomplete`] all partial token state (matched version
/// bytes, accumulated digits) is carried in the parser, so a resume
/// re-enters exactly where input ran out.
pub struct StatusLineParser {
    state: State,
    keep_alive: bool,
    code: u16,
    digits: u8,
}

impl Default for StatusLineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLineParser {
    /// Create a parser positioned at the start of a status line.
    pub fn new() -> Self {
        Self {
            state: State::Version { matched: 0 },
            keep_alive: false,
            code: 0,
            digits: 0,
        }
    }

    /// Feed unread buffer data through the parser.
    pub fn parse(&mut self, buf: &mut RecvBuffer) -> Result<Progress<StatusLine>, ParseError> {
        loop {
            match self.state {
                State::Version { matched } => {
                    let Some(&b) = buf.unread().first() else {
                        return Ok(Progress::Incomplete);
                    };
                    let idx = matched as usize;
                    if idx < VERSION_PREFIX.len() {
                        if b != VERSION_PREFIX[idx] {
                            return Err(ParseError::BadVersion);
                        }
                    } else if idx == VERSION_PREFIX.len() {
                        self.keep_alive = match b {
                            b'1' => true,
                            b'0' => false,
                            _ => return Err(ParseError::BadVersion),
                        };
                    } else {
                        // Exactly one space after the version token.
                        if b != b' ' {
                            return Err(ParseError::BadVersion);
                        }
                        buf.consume(1);
                        self.state = State::Code;
                        continue;
                    }
                    buf.consume(1);
                    self.state = State::Version { matched: matched + 1 };
                }
                State::Code => {
                    let Some(&b) = buf.unread().first() else {
                        return Ok(Progress::Incomplete);
                    };
                    if self.digits < 3 {
                        if !b.is_ascii_digit() {
                            return Err(ParseError::BadStatus);
                        }
                        self.code = self.code * 10 + u16::from(b - b'0');
                        self.digits += 1;
                        buf.consume(1);
                    } else {
                        // Exactly three digits, then exactly one space.
                        if b != b' ' {
                            return Err(ParseError::BadStatus);
                        }
                        if self.code < 100 || self.code > 599 {
                            return Err(ParseError::BadStatus);
                        }
                        buf.consume(1);
                        self.state = State::Reason;
                    }
                }
                State::Reason => {
                    // Reason phrase content is discarded; only its
                    // terminating newline matters.
                    match buf.unread().iter().position(|&b| b == b'\n') {
                        Some(i) => {
                            buf.consume(i + 1);
                            return Ok(Progress::Complete(StatusLine {
                                status: self.code,
                                keep_alive: self.keep_alive,
                            }));
                        }
                        None => {
                            let n = buf.len();
                            buf.consume(n);
                            return Ok(Progress::Incomplete);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buf: &mut RecvBuffer, data: &[u8]) {
        assert!(buf.ensure_space(data.len()));
        buf.space()[..data.len()].copy_from_slice(data);
        buf.commit(data.len());
    }

    fn parse_all(data: &[u8]) -> Result<Progress<StatusLine>, ParseError> {
        let mut buf = RecvBuffer::new(128, 0);
        feed(&mut buf, data);
        StatusLineParser::new().parse(&mut buf)
    }

    #[test]
    fn parse_ok_line() {
        let line = parse_all(b"HTTP/1.1 200 OK\r\n").unwrap();
        assert_eq!(
            line,
            Progress::Complete(StatusLine {
                status: 200,
                keep_alive: true
            })
        );
    }

    #[test]
    fn http10_disables_keepalive() {
        let line = parse_all(b"HTTP/1.0 404 Not Found\r\n").unwrap();
        assert_eq!(
            line,
            Progress::Complete(StatusLine {
                status: 404,
                keep_alive: false
            })
        );
    }

    #[test]
    fn resumes_at_every_split_point() {
        let data = b"HTTP/1.1 503 Service Unavailable\r\n";
        for split in 1..data.len() {
            let mut buf = RecvBuffer::new(128, 0);
            let mut parser = StatusLineParser::new();

            feed(&mut buf, &data[..split]);
            let first = parser.parse(&mut buf).unwrap();
            assert!(first.is_incomplete(), "split {split} completed early");

            feed(&mut buf, &data[split..]);
            let second = parser.parse(&mut buf).unwrap();
            assert_eq!(
                second,
                Progress::Complete(StatusLine {
                    status: 503,
                    keep_alive: true
                }),
                "split {split}"
            );
        }
    }

    #[test]
    fn byte_at_a_time() {
        let data = b"HTTP/1.1 204 No Content\r\n";
        let mut buf = RecvBuffer::new(128, 0);
        let mut parser = StatusLineParser::new();
        for (i, &b) in data.iter().enumerate() {
            feed(&mut buf, &[b]);
            let progress = parser.parse(&mut buf).unwrap();
            if i < data.len() - 1 {
                assert!(progress.is_incomplete());
            } else {
                assert_eq!(
                    progress,
                    Progress::Complete(StatusLine {
                        status: 204,
                        keep_alive: true
                    })
                );
            }
        }
    }

    #[test]
    fn rejects_unknown_version() {
        assert_eq!(parse_all(b"HTTP/2.0 200 OK\r\n"), Err(ParseError::BadVersion));
        assert_eq!(parse_all(b"HTTP/1.2 200 OK\r\n"), Err(ParseError::BadVersion));
        assert_eq!(parse_all(b"ICY 200 OK\r\n"), Err(ParseError::BadVersion));
    }

    #[test]
    fn rejects_bad_status_code() {
        assert_eq!(parse_all(b"HTTP/1.1 20x OK\r\n"), Err(ParseError::BadStatus));
        assert_eq!(parse_all(b"HTTP/1.1 099 Low\r\n"), Err(ParseError::BadStatus));
        assert_eq!(parse_all(b"HTTP/1.1 600 Too\r\n"), Err(ParseError::BadStatus));
        assert_eq!(parse_all(b"HTTP/1.1 2000 Hi\r\n"), Err(ParseError::BadStatus));
    }

    #[test]
    fn rejects_double_space() {
        assert_eq!(parse_all(b"HTTP/1.1  200 OK\r\n"), Err(ParseError::BadStatus));
    }

    #[test]
    fn leaves_trailing_data_unread() {
        let mut buf = RecvBuffer::new(128, 0);
        feed(&mut buf, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n");
        let mut parser = StatusLineParser::new();
        let progress = parser.parse(&mut buf).unwrap();
        assert!(!progress.is_incomplete());
        assert_eq!(buf.unread(), b"Content-Length: 0\r\n");
    }
}
