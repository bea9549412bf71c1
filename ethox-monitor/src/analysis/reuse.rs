use crate::session::Connection;
use crate::time::{Duration, Instant};

/// Decides whether a packet of a known tuple begins a new flow.
///
/// When it does, the dispatcher removes the existing connection, with all its events, and builds
/// a new one with a new uid under the same key.
pub trait ReusePolicy {
    /// Check if the packet with `payload`, arriving at `now`, no longer belongs to `conn`.
    fn is_reuse(&self, conn: &Connection, now: Instant, payload: &[u8]) -> bool;
}

/// Never reuse, a tuple always belongs to the same connection until it is removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverReuse;

/// Reuse a tuple that was silent for longer than the duration.
#[derive(Debug, Clone, Copy)]
pub struct IdleReuse(pub Duration);

/// A function deciding about reuse.
///
/// For transports where reuse is visible in the payload, such as a new initial sequence number.
pub struct FnReuse<F>(pub F);

impl ReusePolicy for NeverReuse {
    fn is_reuse(&self, _: &Connection, _: Instant, _: &[u8]) -> bool {
        false
    }
}

impl ReusePolicy for IdleReuse {
    fn is_reuse(&self, conn: &Connection, now: Instant, _: &[u8]) -> bool {
        now.saturating_since(conn.state().last_time()) > self.0
    }
}

impl<F> ReusePolicy for FnReuse<F>
    where F: Fn(&Connection, Instant, &[u8]) -> bool
{
    fn is_reuse(&self, conn: &Connection, now: Instant, payload: &[u8]) -> bool {
        (self.0)(conn, now, payload)
    }
}
