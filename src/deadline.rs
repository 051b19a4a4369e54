//! Nested deadlines for request-scoped work.
//!
//! A [`Deadline`] is a cancellation token plus an absolute expiry instant.
//! Children derived with [`Deadline::child`] never outlive their parent: the
//! child's expiry is clamped to the parent's, and cancelling the parent
//! cancels every descendant. Siblings are independent of each other.
//!
//! No timer task is spawned per deadline. Timers only exist while someone is
//! waiting in [`Deadline::expired`] or [`Deadline::run`], so dropping a
//! deadline releases everything it owns.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a deadline stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Expiry {
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug)]
pub struct Deadline {
    label: &'static str,
    token: CancellationToken,
    expires_at: Instant,
}

impl Deadline {
    /// Starts a new tree with no parent.
    pub fn root(label: &'static str, budget: Duration) -> Self {
        Self::with_parent_token(label, &CancellationToken::new(), budget)
    }

    /// Starts a tree under an external cancellation signal, e.g. one that
    /// fires when the peer disconnects.
    pub fn with_parent_token(
        label: &'static str,
        parent: &CancellationToken,
        budget: Duration,
    ) -> Self {
        Self {
            label,
            token: parent.child_token(),
            expires_at: Instant::now() + budget,
        }
    }

    /// Derives a nested deadline that expires after `budget` or when this one
    /// does, whichever comes first.
    pub fn child(&self, label: &'static str, budget: Duration) -> Self {
        let own = Instant::now() + budget;
        let expires_at = own.min(self.expires_at);
        debug!(
            parent = self.label,
            child = label,
            budget_ms = budget.as_millis() as u64,
            effective_ms = expires_at.saturating_duration_since(Instant::now()).as_millis() as u64,
            "Derived child deadline"
        );
        Self {
            label,
            token: self.token.child_token(),
            expires_at,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check; explicit cancellation wins over the clock.
    pub fn check(&self) -> Result<(), Expiry> {
        if self.token.is_cancelled() {
            Err(Expiry::Cancelled)
        } else if Instant::now() >= self.expires_at {
            Err(Expiry::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    pub fn is_expired(&self) -> bool {
        self.check().is_err()
    }

    /// Waits until the deadline passes or the token (or an ancestor) is cancelled.
    pub async fn expired(&self) -> Expiry {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Expiry::Cancelled,
            _ = tokio::time::sleep_until(self.expires_at) => Expiry::DeadlineExceeded,
        }
    }

    /// Drives `fut` until it completes or the deadline fires. On expiry the
    /// future is dropped, which aborts whatever it had in flight.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Expiry>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            expiry = self.expired() => {
                debug!(deadline = self.label, %expiry, "Deadline fired before work completed");
                Err(expiry)
            }
            output = fut => Ok(output),
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
