//! Timer capability consumed by the engine.
//!
//! The engine schedules three kinds of deadlines: per-request timeouts,
//! idle keepalive eviction, and zero-delay continuations that hand a
//! freed connection to the next queued request without growing the call
//! stack.

use std::time::Duration;

/// Engine-issued identifier passed back via
/// [`HttpClient::on_timer`](crate::HttpClient::on_timer) when the
/// deadline fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub usize);

/// Driver-issued handle used to cancel a scheduled deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(pub u64);

/// Deadline scheduling contract.
///
/// A cancelled timer must not fire: the engine reuses token slots, so a
/// late delivery for a cancelled handle would be misrouted.
pub trait TimerDriver {
    /// Schedule `token` to be delivered after `after` elapses.
    /// `Duration::ZERO` requests a continuation on the next loop turn.
    fn schedule(&mut self, after: Duration, token: TimerToken) -> TimerHandle;

    /// Cancel a previously scheduled deadline.
    fn cancel(&mut self, handle: TimerHandle);
}
