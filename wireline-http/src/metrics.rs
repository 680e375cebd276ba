//! Client engine metrics.
//!
//! Request and connection lifecycle counters, exposed for Prometheus
//! exposition when registered with an admin endpoint.

use metriken::{Counter, Gauge, metric};

// ── Requests ─────────────────────────────────────────────────────

#[metric(
    name = "wireline/requests/submitted",
    description = "Total requests submitted"
)]
pub static REQUESTS_SUBMITTED: Counter = Counter::new();

#[metric(
    name = "wireline/requests/queued",
    description = "Requests queued waiting for a free connection"
)]
pub static REQUESTS_QUEUED: Counter = Counter::new();

#[metric(
    name = "wireline/requests/completed",
    description = "Exchanges completed successfully"
)]
pub static REQUESTS_COMPLETED: Counter = Counter::new();

#[metric(
    name = "wireline/requests/failed",
    description = "Exchanges that failed at any stage"
)]
pub static REQUESTS_FAILED: Counter = Counter::new();

#[metric(
    name = "wireline/requests/timed_out",
    description = "Exchanges aborted by the request deadline"
)]
pub static REQUESTS_TIMED_OUT: Counter = Counter::new();

// ── Connections ──────────────────────────────────────────────────

#[metric(
    name = "wireline/connections/opened",
    description = "Total connections opened"
)]
pub static CONNECTIONS_OPENED: Counter = Counter::new();

#[metric(
    name = "wireline/connections/closed",
    description = "Total connections closed"
)]
pub static CONNECTIONS_CLOSED: Counter = Counter::new();

#[metric(
    name = "wireline/connections/reused",
    description = "Exchanges dispatched onto an existing connection"
)]
pub static CONNECTIONS_REUSED: Counter = Counter::new();

#[metric(
    name = "wireline/connections/idle_expired",
    description = "Idle connections evicted by the keepalive timer"
)]
pub static IDLE_EXPIRED: Counter = Counter::new();

#[metric(
    name = "wireline/connections/active",
    description = "Currently open connections"
)]
pub static CONNECTIONS_ACTIVE: Gauge = Gauge::new();
