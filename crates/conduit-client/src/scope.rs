use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};

/// Whole milliseconds, saturating
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Cancellation sources for one call
///
/// The deadline is armed once when the call starts and is shared by every
/// attempt, backoff sleep and body read, so retries never extend the
/// caller-visible time budget.
#[derive(Debug, Clone)]
pub(crate) struct CallScope {
    deadline: Instant,
    timeout: Duration,
    cancel: Option<CancellationToken>,
}

impl CallScope {
    pub(crate) fn start(timeout: Duration, cancel: Option<&CancellationToken>) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
            cancel: cancel.cloned(),
        }
    }

    /// Run `fut` until it finishes or either source fires
    ///
    /// Losing the race drops `fut`, which aborts whatever I/O it owned.
    /// Caller cancellation is checked first so an already-cancelled token
    /// never starts work.
    pub(crate) async fn guard<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Err(GatewayError::cancelled()),
            () = sleep_until(self.deadline) => Err(GatewayError::deadline(self.timeout)),
            out = fut => Ok(out),
        }
    }

    /// Fail if either source has already fired
    pub(crate) fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(GatewayError::cancelled());
        }
        if Instant::now() >= self.deadline {
            return Err(GatewayError::deadline(self.timeout));
        }
        Ok(())
    }

    /// Time left before the deadline
    pub(crate) fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
