//! Cancellation context threaded through every channel call
//!
//! The factory itself never times out or retries. It hands the caller's
//! context to the execute and query channels, which decide how to honour it.
//! [`Context::run`] is the helper channel implementations use for that.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a context refused to run a call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token with an optional deadline
///
/// Clones share the same cancellation state, so cancelling any clone cancels
/// them all. Both cancellation and the deadline interrupt a call in flight
/// when it is run through [`Context::run`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancellation: Arc<Cancellation>,
    deadline: Option<Instant>,
}

#[derive(Debug, Default)]
struct Cancellation {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancellation: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context sharing this one's cancellation, with a deadline
    /// no later than this one's
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            cancellation: Arc::clone(&self.cancellation),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every clone, waking calls in flight
    pub fn cancel(&self) {
        self.cancellation.cancelled.store(true, Ordering::SeqCst);
        self.cancellation.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        // Registered before the flag is read, so a concurrent cancel is not missed
        let notified = self.cancellation.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the context is cancelled or its deadline has passed
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `future` under this context
    ///
    /// The future is dropped as soon as the context is cancelled or its
    /// deadline passes.
    pub async fn run<F, T>(&self, future: F) -> Result<T, ContextError>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, future)
                    .await
                    .map_err(|_| ContextError::DeadlineExceeded),
                None => Ok(future.await),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ContextError::Cancelled),
            result = bounded => result,
        }
    }
}
