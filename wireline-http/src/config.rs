use std::time::Duration;

use crate::error::HttpError;

/// Configuration for the client engine.
#[derive(Clone)]
pub struct ClientConfig {
    /// Connection cap per (host, port, tls) domain. Requests beyond the
    /// cap queue FIFO on the domain.
    pub max_connections_per_domain: usize,
    /// Deadline for one full exchange, armed when the request is
    /// dispatched to a connection.
    pub request_timeout: Duration,
    /// How long an idle connection is kept for reuse before it is
    /// silently closed.
    pub idle_keepalive_timeout: Duration,
    /// Initial receive buffer capacity, and the step size for each
    /// bounded growth while parsing a header block.
    pub header_buffer_size: usize,
    /// Number of times the receive buffer may grow per exchange.
    pub header_buffer_growth_limit: u32,
    /// Cap for buffer-to-memory body reads. Larger bodies are drained
    /// and the response delivered with no body.
    pub max_buffered_body_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_connections_per_domain: 8,
            request_timeout: Duration::from_secs(30),
            idle_keepalive_timeout: Duration::from_secs(60),
            header_buffer_size: 4096,
            header_buffer_growth_limit: 4,
            max_buffered_body_bytes: 8 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// Validate configuration values. Returns an error if any value is
    /// out of range.
    pub fn validate(&self) -> Result<(), HttpError> {
        if self.max_connections_per_domain == 0 {
            return Err(HttpError::Config(
                "max_connections_per_domain must be > 0",
            ));
        }
        if self.header_buffer_size < 256 {
            return Err(HttpError::Config("header_buffer_size must be >= 256"));
        }
        if self.request_timeout.is_zero() {
            return Err(HttpError::Config("request_timeout must be > 0"));
        }
        if self.idle_keepalive_timeout.is_zero() {
            return Err(HttpError::Config("idle_keepalive_timeout must be > 0"));
        }
        if self.max_buffered_body_bytes == 0 {
            return Err(HttpError::Config("max_buffered_body_bytes must be > 0"));
        }
        Ok(())
    }

    /// Total header-block byte budget: the initial buffer plus every
    /// permitted growth step.
    pub(crate) fn header_block_limit(&self) -> usize {
        self.header_buffer_size * (self.header_buffer_growth_limit as usize + 1)
    }
}
