//! Connection state machine.
//!
//! One `Connection` owns one transport and one receive buffer and drives
//! a single exchange at a time through an explicit state enum. Every
//! state transition is a suspension point: `poll()` runs until the
//! transport would block, then returns and is re-entered on the next
//! readiness event.

use bytes::{Buf, BytesMut};
use h1_proto::{
    BodyReader, BodySink, HeaderParser, ParseError, Progress, RecvBuffer, Request, ResponseHead,
    StatusLineParser,
};

use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::handler::{BodyMode, ResponseHandler};
use crate::pool::DomainKey;
use crate::timer::{TimerHandle, TimerToken};
use crate::transport::{ConnectProgress, IoStatus, Transport};

/// Opaque connection identifier, used to route readiness events from the
/// caller's selector back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub(crate) usize);

/// Target free space for body reads; below this the buffer is compacted
/// or grown before reading.
const BODY_READ_SPACE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnState {
    /// Transport connect (and TLS handshake) in progress.
    Connecting,
    /// Request bytes being written; resumes from the unwritten suffix.
    Writing,
    /// Awaiting/parsing the status line.
    ReadStatus,
    /// Awaiting/parsing the header block.
    ReadHeaders,
    /// Consuming the response body.
    ReadBody,
    /// Exchange complete; available for reuse.
    Idle,
    /// Terminal. The engine removes the connection after observing this.
    Closed,
}

/// What a `poll()` pass concluded.
pub(crate) enum PollOutcome {
    /// Would block; waiting on transport readiness.
    Pending,
    /// Exchange finished; success callbacks have been delivered.
    Finished { reusable: bool },
    /// Exchange failed. The handler has NOT been notified: the engine
    /// releases the pool slot first, then delivers the failure, so the
    /// pending FIFO always makes progress before user code runs.
    Failed(HttpError),
    /// An idle connection saw EOF or unsolicited data; close silently.
    IdleClosed,
}

struct DiscardSink;

impl BodySink for DiscardSink {
    fn data(&mut self, _chunk: &[u8]) {}
}

/// Accumulates into a contiguous buffer up to a size cap; past the cap
/// the body is drained and the accumulation discarded.
struct BufferSink<'a> {
    dst: &'a mut BytesMut,
    limit: usize,
    overflow: &'a mut bool,
}

impl BodySink for BufferSink<'_> {
    fn data(&mut self, chunk: &[u8]) {
        if *self.overflow {
            return;
        }
        if self.dst.len() + chunk.len() > self.limit {
            *self.overflow = true;
            self.dst.clear();
            return;
        }
        self.dst.extend_from_slice(chunk);
    }
}

struct StreamSink<'a> {
    handler: &'a mut dyn ResponseHandler,
}

impl BodySink for StreamSink<'_> {
    fn data(&mut self, chunk: &[u8]) {
        self.handler.on_body_chunk(chunk);
    }
}

pub(crate) struct Connection {
    pub key: DomainKey,
    transport: Box<dyn Transport>,
    buf: RecvBuffer,
    state: ConnState,

    /// Unwritten request bytes.
    out: BytesMut,

    status: StatusLineParser,
    headers: HeaderParser,
    head: ResponseHead,
    body: BodyReader,
    body_mode: BodyMode,
    body_buf: BytesMut,
    body_overflow: bool,
    handler: Option<Box<dyn ResponseHandler>>,

    // Timer slots owned by the engine.
    pub deadline: Option<(TimerToken, TimerHandle)>,
    pub idle_timer: Option<(TimerToken, TimerHandle)>,
    pub reserved_dispatch: Option<TimerToken>,

    header_limit: usize,
    header_growth: u32,
    max_buffered_body: usize,
}

impl Connection {
    pub fn new(key: DomainKey, transport: Box<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            key,
            transport,
            buf: RecvBuffer::new(
                config.header_buffer_size,
                config.header_buffer_growth_limit,
            ),
            state: ConnState::Connecting,
            out: BytesMut::new(),
            status: StatusLineParser::new(),
            headers: HeaderParser::new(config.header_block_limit()),
            head: ResponseHead::default(),
            body: BodyReader::Empty,
            body_mode: BodyMode::Discard,
            body_buf: BytesMut::new(),
            body_overflow: false,
            handler: None,
            deadline: None,
            idle_timer: None,
            reserved_dispatch: None,
            header_limit: config.header_block_limit(),
            header_growth: config.header_buffer_growth_limit,
            max_buffered_body: config.max_buffered_body_bytes,
        }
    }

    /// Bind a new exchange to this connection and serialize the request.
    ///
    /// The receive buffer is *not* cleared: bytes left over from the
    /// previous exchange are the start of this response.
    pub fn begin(&mut self, request: Request, handler: Box<dyn ResponseHandler>) {
        self.out.clear();
        request.encode(&mut self.out);
        self.handler = Some(handler);
        self.status = StatusLineParser::new();
        self.headers = HeaderParser::new(self.header_limit);
        self.head = ResponseHead::default();
        self.body = BodyReader::Empty;
        self.body_mode = BodyMode::Discard;
        self.body_buf.clear();
        self.body_overflow = false;
        self.buf.reset_growth(self.header_growth);
        if self.state != ConnState::Connecting {
            self.state = ConnState::Writing;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == ConnState::Idle
    }

    pub fn close_transport(&mut self) {
        self.transport.close();
        self.state = ConnState::Closed;
    }

    /// Detach the exchange's handler (failure delivery happens after
    /// pool cleanup, in the engine).
    pub fn take_handler(&mut self) -> Option<Box<dyn ResponseHandler>> {
        self.handler.take()
    }

    /// Run the state machine until it would block or the exchange ends.
    pub fn poll(&mut self) -> PollOutcome {
        loop {
            match self.state {
                ConnState::Connecting => match self.transport.poll_connect() {
                    Ok(ConnectProgress::Pending) => return PollOutcome::Pending,
                    Ok(ConnectProgress::Connected) => self.state = ConnState::Writing,
                    Err(e) => return self.fail(HttpError::Io(e)),
                },
                ConnState::Writing => {
                    while !self.out.is_empty() {
                        match self.transport.write(&self.out) {
                            Ok(IoStatus::Ready(n)) => self.out.advance(n.min(self.out.len())),
                            Ok(IoStatus::WouldBlock) => return PollOutcome::Pending,
                            Ok(IoStatus::Closed) => {
                                return self.fail(HttpError::ConnectionClosed);
                            }
                            Err(e) => return self.fail(HttpError::Io(e)),
                        }
                    }
                    self.state = ConnState::ReadStatus;
                }
                ConnState::ReadStatus | ConnState::ReadHeaders | ConnState::ReadBody => {
                    // Parse what is already buffered before reading more.
                    match self.advance_parse() {
                        Ok(Some(outcome)) => return outcome,
                        Ok(None) => {}
                        Err(err) => return self.fail(err),
                    }
                    let want = match self.state {
                        ConnState::ReadBody => BODY_READ_SPACE,
                        _ => 1,
                    };
                    if self.buf.free() < want
                        && !self.buf.ensure_space(want)
                        && self.buf.free() == 0
                    {
                        return self.fail(ParseError::HeadersTooLarge.into());
                    }
                    match self.transport.read(self.buf.space()) {
                        Ok(IoStatus::Ready(n)) => self.buf.commit(n),
                        Ok(IoStatus::WouldBlock) => return PollOutcome::Pending,
                        Ok(IoStatus::Closed) => return self.fail(HttpError::ConnectionClosed),
                        Err(e) => return self.fail(HttpError::Io(e)),
                    }
                }
                ConnState::Idle => {
                    // A readiness event here means the server closed the
                    // connection or sent bytes we never asked for.
                    if self.buf.free() == 0 && !self.buf.ensure_space(1) {
                        return PollOutcome::IdleClosed;
                    }
                    return match self.transport.read(self.buf.space()) {
                        Ok(IoStatus::WouldBlock) => PollOutcome::Pending,
                        _ => PollOutcome::IdleClosed,
                    };
                }
                ConnState::Closed => return PollOutcome::Pending,
            }
        }
    }

    /// Run the parsers over buffered data. `Ok(Some(_))` ends the
    /// exchange, `Ok(None)` means more input is needed.
    fn advance_parse(&mut self) -> Result<Option<PollOutcome>, HttpError> {
        loop {
            match self.state {
                ConnState::ReadStatus => match self.status.parse(&mut self.buf)? {
                    Progress::Incomplete => return Ok(None),
                    Progress::Complete(line) => {
                        self.head.status = line.status;
                        self.head.keep_alive = line.keep_alive;
                        self.state = ConnState::ReadHeaders;
                    }
                },
                ConnState::ReadHeaders => {
                    match self.headers.parse(&mut self.buf, &mut self.head)? {
                        Progress::Incomplete => return Ok(None),
                        Progress::Complete(()) => {
                            let mode = match self.handler.as_mut() {
                                Some(h) => h.on_head(&self.head),
                                None => BodyMode::Discard,
                            };
                            self.body_mode = mode;
                            if mode == BodyMode::Buffer
                                && let Some(len) = self.head.content_length
                            {
                                if len > self.max_buffered_body as u64 {
                                    // Oversized: drain instead of buffering.
                                    self.body_overflow = true;
                                } else {
                                    self.body_buf.reserve(len as usize);
                                }
                            }
                            self.body = BodyReader::for_head(&self.head);
                            self.state = ConnState::ReadBody;
                        }
                    }
                }
                ConnState::ReadBody => {
                    let body = &mut self.body;
                    let buf = &mut self.buf;
                    let progress = match self.body_mode {
                        BodyMode::Discard => body.read(buf, &mut DiscardSink),
                        BodyMode::Buffer => {
                            let mut sink = BufferSink {
                                dst: &mut self.body_buf,
                                limit: self.max_buffered_body,
                                overflow: &mut self.body_overflow,
                            };
                            body.read(buf, &mut sink)
                        }
                        BodyMode::Stream => match self.handler.as_mut() {
                            Some(h) => {
                                let mut sink = StreamSink {
                                    handler: h.as_mut(),
                                };
                                body.read(buf, &mut sink)
                            }
                            None => body.read(buf, &mut DiscardSink),
                        },
                    };
                    match progress? {
                        Progress::Incomplete => return Ok(None),
                        Progress::Complete(()) => return Ok(Some(self.finish())),
                    }
                }
                _ => return Ok(None),
            }
        }
    }

    /// Deliver success callbacks and settle the connection's next state.
    fn finish(&mut self) -> PollOutcome {
        let reusable = self.head.keep_alive;
        if let Some(mut handler) = self.handler.take() {
            match self.body_mode {
                BodyMode::Stream => {
                    handler.on_body_chunk(&[]);
                    handler.on_complete(Ok(None));
                }
                BodyMode::Buffer => {
                    let body = if self.body_overflow {
                        None
                    } else {
                        Some(self.body_buf.split().freeze())
                    };
                    handler.on_complete(Ok(body));
                }
                BodyMode::Discard => handler.on_complete(Ok(None)),
            }
        }
        self.state = if reusable {
            ConnState::Idle
        } else {
            ConnState::Closed
        };
        PollOutcome::Finished { reusable }
    }

    /// Mark the connection dead; the engine delivers the failure after
    /// releasing the pool slot.
    fn fail(&mut self, err: HttpError) -> PollOutcome {
        self.state = ConnState::Closed;
        PollOutcome::Failed(err)
    }
}
