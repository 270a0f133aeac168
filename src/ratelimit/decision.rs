//! Outcome of a rate limit check.

use std::time::Duration;

/// The result of checking one request against the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is within quota and has been recorded.
    Allow,
    /// The request is over quota. Nothing was recorded.
    Deny {
        /// How long until the oldest retained request leaves the window
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The advisory wait for a denied request, `None` when allowed.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Decision::Allow => None,
            Decision::Deny { retry_after } => Some(*retry_after),
        }
    }
}
