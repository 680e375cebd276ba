//! Top-level client engine: submission, pooling, and resume points.

use std::time::Duration;

use bytes::Bytes;
use h1_proto::Request;
use slab::Slab;

use crate::config::ClientConfig;
use crate::conn::{ConnId, Connection, PollOutcome};
use crate::error::HttpError;
use crate::handler::ResponseHandler;
use crate::metrics;
use crate::pool::{DomainKey, PendingTask, Pool};
use crate::timer::{TimerDriver, TimerHandle, TimerToken};
use crate::transport::Connector;

/// Why a timer was scheduled.
enum TimerPurpose {
    /// Per-exchange deadline.
    RequestDeadline(usize),
    /// Keepalive eviction for an idle connection.
    IdleExpiry(usize),
    /// Zero-delay continuation handing a freed connection to the next
    /// queued request.
    Dispatch {
        conn: usize,
        key: DomainKey,
        task: PendingTask,
    },
}

struct TimerEntry {
    purpose: TimerPurpose,
    handle: Option<TimerHandle>,
}

/// Non-blocking HTTP/1.1 client engine.
///
/// The engine never blocks: requests are submitted with a per-request
/// [`ResponseHandler`], and the embedding event loop resumes the engine
/// through [`on_io_ready`](HttpClient::on_io_ready) and
/// [`on_timer`](HttpClient::on_timer). All completion is delivered
/// asynchronously through the handler.
///
/// # Example
///
/// ```rust,ignore
/// let mut client = HttpClient::new(ClientConfig::default(), connector, timers)?;
///
/// client.get("http://example.com/api/data").submit(Box::new(MyHandler))?;
///
/// // event loop:
/// //   readiness on conn id  -> client.on_io_ready(id)
/// //   timer fires           -> client.on_timer(token)
/// ```
pub struct HttpClient {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    timer: Box<dyn TimerDriver>,
    conns: Slab<Connection>,
    timers: Slab<TimerEntry>,
    pool: Pool,
    draining: bool,
}

impl HttpClient {
    /// Create an engine over the given transport and timer capabilities.
    pub fn new(
        config: ClientConfig,
        connector: Box<dyn Connector>,
        timer: Box<dyn TimerDriver>,
    ) -> Result<Self, HttpError> {
        config.validate()?;
        Ok(Self {
            config,
            connector,
            timer,
            conns: Slab::new(),
            timers: Slab::new(),
            pool: Pool::new(),
            draining: false,
        })
    }

    // ── Submission ──────────────────────────────────────────────────

    /// Build a GET request from a URL.
    pub fn get(&mut self, url: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, "GET", url)
    }

    /// Build a POST request from a URL.
    pub fn post(&mut self, url: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, "POST", url)
    }

    /// Build a PUT request from a URL.
    pub fn put(&mut self, url: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, "PUT", url)
    }

    /// Build a DELETE request from a URL.
    pub fn delete(&mut self, url: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, "DELETE", url)
    }

    /// Submit a request to a domain.
    ///
    /// Admission order: reuse an idle connection, else open a new one
    /// while under the per-domain cap, else queue FIFO. Completion — and
    /// any failure — arrives through `handler`.
    pub fn submit(
        &mut self,
        key: DomainKey,
        request: Request,
        handler: Box<dyn ResponseHandler>,
    ) -> Result<(), HttpError> {
        if self.draining {
            return Err(HttpError::ShuttingDown);
        }
        metrics::REQUESTS_SUBMITTED.increment();
        let max = self.config.max_connections_per_domain;
        let node = self.pool.node_mut(&key);
        if let Some(id) = node.idle.pop_front() {
            self.start_on(id, request, handler);
        } else if node.active < max {
            node.active += 1;
            self.spawn_for_task(key, PendingTask { request, handler });
        } else {
            node.pending.push_back(PendingTask { request, handler });
            metrics::REQUESTS_QUEUED.increment();
        }
        Ok(())
    }

    // ── Resume points ───────────────────────────────────────────────

    /// Resume a connection after transport readiness.
    pub fn on_io_ready(&mut self, id: ConnId) {
        self.drive(id);
    }

    /// Deliver a fired timer deadline.
    pub fn on_timer(&mut self, token: TimerToken) {
        let Some(entry) = self.timers.try_remove(token.0) else {
            return;
        };
        match entry.purpose {
            TimerPurpose::RequestDeadline(c) => {
                let id = ConnId(c);
                if let Some(conn) = self.conns.get_mut(c) {
                    conn.deadline = None;
                    let handler = conn.take_handler();
                    metrics::REQUESTS_TIMED_OUT.increment();
                    metrics::REQUESTS_FAILED.increment();
                    self.close(id);
                    if let Some(mut handler) = handler {
                        handler.on_complete(Err(HttpError::Timeout));
                    }
                }
            }
            TimerPurpose::IdleExpiry(c) => {
                let id = ConnId(c);
                if let Some(conn) = self.conns.get_mut(c) {
                    conn.idle_timer = None;
                    metrics::IDLE_EXPIRED.increment();
                    self.close(id);
                }
            }
            TimerPurpose::Dispatch { conn, key, task } => {
                let id = ConnId(conn);
                match self.conns.get_mut(conn) {
                    Some(c) if c.is_idle() => {
                        c.reserved_dispatch = None;
                        let PendingTask { request, handler } = task;
                        c.begin(request, handler);
                        metrics::CONNECTIONS_REUSED.increment();
                        self.arm_deadline(id);
                        self.drive(id);
                    }
                    _ => {
                        // The reserved connection is gone; give the task
                        // a fresh slot or put it back at the queue head.
                        let max = self.config.max_connections_per_domain;
                        let node = self.pool.node_mut(&key);
                        if node.active < max {
                            node.active += 1;
                            self.spawn_for_task(key, task);
                        } else {
                            node.pending.push_front(task);
                        }
                    }
                }
            }
        }
    }

    // ── Teardown ────────────────────────────────────────────────────

    /// Mark the engine draining: reject new submissions, finish queued
    /// and in-flight work, and close connections as they free up.
    pub fn shutdown(&mut self) {
        self.draining = true;
        let idle: Vec<usize> = self
            .conns
            .iter()
            .filter(|(_, c)| c.is_idle() && c.reserved_dispatch.is_none())
            .map(|(k, _)| k)
            .collect();
        for k in idle {
            self.close(ConnId(k));
        }
    }

    /// True when every domain node has drained away.
    pub fn is_drained(&self) -> bool {
        self.pool.is_empty()
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Dispatch a request onto an existing idle connection.
    fn start_on(&mut self, id: ConnId, request: Request, handler: Box<dyn ResponseHandler>) {
        let idle = match self.conns.get_mut(id.0) {
            Some(conn) => conn.idle_timer.take(),
            None => return,
        };
        self.cancel_timer(idle);
        if let Some(conn) = self.conns.get_mut(id.0) {
            conn.begin(request, handler);
        }
        metrics::CONNECTIONS_REUSED.increment();
        self.arm_deadline(id);
        self.drive(id);
    }

    /// Open a connection for a task whose domain slot is already
    /// counted. A synchronous connect failure fails that task, releases
    /// the slot, and moves on to the next queued task, if any.
    fn spawn_for_task(&mut self, key: DomainKey, task: PendingTask) {
        let mut task = task;
        loop {
            let entry = self.conns.vacant_entry();
            let id = ConnId(entry.key());
            match self.connector.connect(&key, id) {
                Ok(transport) => {
                    let mut conn = Connection::new(key.clone(), transport, &self.config);
                    let PendingTask { request, handler } = task;
                    conn.begin(request, handler);
                    entry.insert(conn);
                    metrics::CONNECTIONS_OPENED.increment();
                    metrics::CONNECTIONS_ACTIVE.increment();
                    self.arm_deadline(id);
                    self.drive(id);
                    return;
                }
                Err(e) => {
                    metrics::REQUESTS_FAILED.increment();
                    let max = self.config.max_connections_per_domain;
                    let next = match self.pool.get_mut(&key) {
                        Some(node) => {
                            node.active -= 1;
                            if node.active < max {
                                if let Some(t) = node.pending.pop_front() {
                                    node.active += 1;
                                    Some(t)
                                } else {
                                    None
                                }
                            } else {
                                None
                            }
                        }
                        None => None,
                    };
                    if next.is_none() {
                        self.pool.remove_if_drained(&key);
                    }
                    // Slot released before the failure reaches user code.
                    task.handler.on_complete(Err(HttpError::Io(e)));
                    match next {
                        Some(t) => task = t,
                        None => return,
                    }
                }
            }
        }
    }

    /// Run a connection's state machine and act on the outcome.
    fn drive(&mut self, id: ConnId) {
        let outcome = match self.conns.get_mut(id.0) {
            Some(conn) => conn.poll(),
            None => return,
        };
        match outcome {
            PollOutcome::Pending => {}
            PollOutcome::Finished { reusable } => {
                metrics::REQUESTS_COMPLETED.increment();
                let deadline = match self.conns.get_mut(id.0) {
                    Some(conn) => conn.deadline.take(),
                    None => None,
                };
                self.cancel_timer(deadline);
                if reusable && !self.draining {
                    self.release(id);
                } else {
                    self.close(id);
                }
            }
            PollOutcome::Failed(err) => {
                metrics::REQUESTS_FAILED.increment();
                let handler = self
                    .conns
                    .get_mut(id.0)
                    .and_then(|conn| conn.take_handler());
                // Slot released (and one pending task woken) before the
                // failure reaches user code.
                self.close(id);
                if let Some(mut handler) = handler {
                    handler.on_complete(Err(err));
                }
            }
            PollOutcome::IdleClosed => self.close(id),
        }
    }

    /// Return a connection to its domain: direct handoff to the next
    /// queued request if one is waiting, otherwise the idle FIFO.
    fn release(&mut self, id: ConnId) {
        let key = match self.conns.get(id.0) {
            Some(conn) => conn.key.clone(),
            None => return,
        };
        let task = match self.pool.get_mut(&key) {
            Some(node) => node.pending.pop_front(),
            None => None,
        };
        match task {
            Some(task) => {
                // Handed off via a zero-delay continuation so that chains
                // of completions never deepen the call stack.
                let token = self.schedule(
                    Duration::ZERO,
                    TimerPurpose::Dispatch {
                        conn: id.0,
                        key,
                        task,
                    },
                );
                if let Some(conn) = self.conns.get_mut(id.0) {
                    conn.reserved_dispatch = Some(token);
                }
            }
            None => {
                if let Some(node) = self.pool.get_mut(&key) {
                    node.idle.push_back(id);
                }
                let after = self.config.idle_keepalive_timeout;
                let token = self.schedule(after, TimerPurpose::IdleExpiry(id.0));
                let handle = self.timers.get(token.0).and_then(|e| e.handle);
                if let (Some(conn), Some(handle)) = (self.conns.get_mut(id.0), handle) {
                    conn.idle_timer = Some((token, handle));
                }
            }
        }
    }

    /// Close a connection and release its domain slot, waking one queued
    /// task. Removes the domain node once fully drained.
    fn close(&mut self, id: ConnId) {
        let Some(mut conn) = self.conns.try_remove(id.0) else {
            return;
        };
        conn.close_transport();
        let deadline = conn.deadline.take();
        self.cancel_timer(deadline);
        let idle = conn.idle_timer.take();
        self.cancel_timer(idle);
        if let Some(token) = conn.reserved_dispatch.take()
            && let Some(entry) = self.timers.try_remove(token.0)
        {
            if let Some(handle) = entry.handle {
                self.timer.cancel(handle);
            }
            if let TimerPurpose::Dispatch { task, .. } = entry.purpose {
                self.pool.node_mut(&conn.key).pending.push_front(task);
            }
        }
        metrics::CONNECTIONS_CLOSED.increment();
        metrics::CONNECTIONS_ACTIVE.decrement();

        let key = conn.key.clone();
        let max = self.config.max_connections_per_domain;
        let next = match self.pool.get_mut(&key) {
            Some(node) => {
                node.active -= 1;
                node.idle.retain(|c| c.0 != id.0);
                if node.active < max {
                    if let Some(t) = node.pending.pop_front() {
                        node.active += 1;
                        Some(t)
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            None => None,
        };
        match next {
            Some(task) => self.spawn_for_task(key, task),
            None => {
                self.pool.remove_if_drained(&key);
            }
        }
    }

    /// Arm the per-exchange deadline on a connection.
    fn arm_deadline(&mut self, id: ConnId) {
        let after = self.config.request_timeout;
        let token = self.schedule(after, TimerPurpose::RequestDeadline(id.0));
        let handle = self.timers.get(token.0).and_then(|e| e.handle);
        if let (Some(conn), Some(handle)) = (self.conns.get_mut(id.0), handle) {
            conn.deadline = Some((token, handle));
        }
    }

    /// Insert a timer entry and schedule it with the driver.
    fn schedule(&mut self, after: Duration, purpose: TimerPurpose) -> TimerToken {
        let token = TimerToken(self.timers.insert(TimerEntry {
            purpose,
            handle: None,
        }));
        let handle = self.timer.schedule(after, token);
        if let Some(entry) = self.timers.get_mut(token.0) {
            entry.handle = Some(handle);
        }
        token
    }

    /// Cancel a (token, handle) timer slot, if armed.
    fn cancel_timer(&mut self, slot: Option<(TimerToken, TimerHandle)>) {
        if let Some((token, handle)) = slot {
            self.timers.try_remove(token.0);
            self.timer.cancel(handle);
        }
    }
}

/// Builder for submitting a request by URL.
pub struct RequestBuilder<'a> {
    client: &'a mut HttpClient,
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl<'a> RequestBuilder<'a> {
    fn new(client: &'a mut HttpClient, method: &str, url: &str) -> Self {
        Self {
            client,
            method: method.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Parse the URL and submit the request.
    pub fn submit(self, handler: Box<dyn ResponseHandler>) -> Result<(), HttpError> {
        let (key, path, authority) = parse_url(&self.url)?;
        let mut request = Request::new(&self.method, &path).host(&authority);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(body) = self.body {
            request = request.body(body);
        }
        self.client.submit(key, request, handler)
    }
}

/// Split an `http`/`https` URL into a domain key, path, and the
/// authority for the `Host` header.
fn parse_url(url: &str) -> Result<(DomainKey, String, String), HttpError> {
    let (tls, rest) = if let Some(rest) = url.strip_prefix("http://") {
        (false, rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        (true, rest)
    } else {
        return Err(HttpError::InvalidUrl(url.to_string()));
    };

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| HttpError::InvalidUrl(url.to_string()))?;
            (host, port)
        }
        None => (authority, if tls { 443 } else { 80 }),
    };
    if host.is_empty() {
        return Err(HttpError::InvalidUrl(url.to_string()));
    }

    Ok((
        DomainKey::new(host, port, tls),
        path.to_string(),
        authority.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_url() {
        let (key, path, authority) = parse_url("http://example.com/a/b?q=1").unwrap();
        assert_eq!(key, DomainKey::new("example.com", 80, false));
        assert_eq!(path, "/a/b?q=1");
        assert_eq!(authority, "example.com");
    }

    #[test]
    fn parse_tls_url_with_port() {
        let (key, path, authority) = parse_url("https://example.com:8443").unwrap();
        assert_eq!(key, DomainKey::new("example.com", 8443, true));
        assert_eq!(path, "/");
        assert_eq!(authority, "example.com:8443");
    }

    #[test]
    fn parse_default_tls_port() {
        let (key, _, _) = parse_url("https://example.com/").unwrap();
        assert_eq!(key.port, 443);
        assert!(key.tls);
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(matches!(
            parse_url("ftp://example.com/"),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_url("example.com/"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_empty_host() {
        assert!(matches!(
            parse_url("http:///path"),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_url("http://:8080/"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(matches!(
            parse_url("http://h:99999/"),
            Err(HttpError::InvalidUrl(_))
        ));
    }
}
