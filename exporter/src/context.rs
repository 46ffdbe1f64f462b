//! Per-cycle collection context.

use std::time::{Duration, Instant};

use crate::clients::ClientError;

/// Governs one collection cycle.
///
/// The context carries an optional deadline shared by every collector in the
/// cycle. Collectors check it before each external call; once it has passed
/// the call is treated as failed and the collector returns whatever its
/// partial-failure policy allows.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollectContext {
    deadline: Option<Instant>,
}

impl CollectContext {
    /// A context without a deadline.
    pub fn background() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Time left before the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }

    /// Returns `Err(ClientError::Cancelled)` once the deadline has passed.
    pub fn check(&self) -> Result<(), ClientError> {
        if self.is_cancelled() {
            Err(ClientError::Cancelled)
        } else {
            Ok(())
        }
    }
}
