//! Per-request context forwarded to every repository call.

use std::time::{Duration, Instant};

use super::TraceId;

/// Trace identifier and optional deadline for one request.
///
/// The orchestrator never enforces the deadline itself; it hands the context
/// to each repository call so adapters can bound their own I/O.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use entity_backend::domain::RequestContext;
///
/// let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
/// assert!(!ctx.is_expired());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    trace_id: TraceId,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create a context, reusing the trace identifier in scope if any.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: TraceId::current().unwrap_or_else(TraceId::generate),
            deadline: None,
        }
    }

    /// Create a context for an existing trace identifier.
    #[must_use]
    pub fn with_trace_id(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            deadline: None,
        }
    }

    /// Attach an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a deadline relative to now.
    ///
    /// A timeout too large to represent leaves the context unbounded.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Trace identifier for log and error correlation.
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Absolute deadline, if one was supplied.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
