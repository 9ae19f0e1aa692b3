//! RequestContext - Cancellation and deadlines
//!
//! Every storage operation takes a context. An operation observes it on entry
//! and, for backends that do I/O, races the I/O against it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{StorageError, StorageResult};

/// Cancellation token plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Tie this context to an external cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Expire `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Expire at `deadline`. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// The underlying cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail if the context is already cancelled or expired.
    ///
    /// # Errors
    /// Returns `Cancelled` or `DeadlineExceeded`.
    pub fn check(&self) -> StorageResult<()> {
        if self.token.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(StorageError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `fut` unless the context is cancelled or expires first.
    ///
    /// The future is dropped on cancellation; a dropped database transaction
    /// rolls back.
    ///
    /// # Errors
    /// Returns the future's error, `Cancelled`, or `DeadlineExceeded`.
    pub async fn run<F, T>(&self, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(StorageError::Cancelled),
            () = deadline => Err(StorageError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let cx = RequestContext::background();
        assert!(cx.check().is_ok());
        assert!(cx.deadline().is_none());
    }

    #[test]
    fn test_cancelled_context_fails_check() {
        let cx = RequestContext::background();
        cx.cancel();
        assert_eq!(cx.check(), Err(StorageError::Cancelled));
    }

    #[test]
    fn test_clone_shares_cancellation() {
        let cx = RequestContext::background();
        let clone = cx.clone();
        cx.cancel();
        assert_eq!(clone.check(), Err(StorageError::Cancelled));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_expired() {
        let cx = RequestContext::background().with_timeout(Duration::ZERO);
        assert_eq!(cx.check(), Err(StorageError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let cx = RequestContext::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(cx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_run_completes() {
        let cx = RequestContext::background();
        let result = cx.run(async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let cx = RequestContext::background().with_timeout(Duration::from_millis(50));
        let result: StorageResult<()> = cx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(StorageError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_run_observes_cancellation_mid_flight() {
        let cx = RequestContext::background();
        let canceller = cx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result: StorageResult<()> = cx
            .run(async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(StorageError::Cancelled));
    }
}
