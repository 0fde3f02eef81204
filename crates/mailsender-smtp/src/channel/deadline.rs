//! Racing operations against an optional deadline.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Result of racing an operation against its deadline.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation finished in time.
    Ok(T),
    /// The deadline fired first; the operation was dropped.
    TimedOut(Duration),
    /// The operation failed in time.
    Failed(Error),
}

impl<T> Outcome<T> {
    /// Converts into a `Result`, mapping a missed deadline to [`Error::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or [`Error::Timeout`].
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::TimedOut(limit) => Err(Error::Timeout(limit)),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Treats a zero deadline as "no deadline".
#[must_use]
pub fn effective(deadline: Option<Duration>) -> Option<Duration> {
    deadline.filter(|limit| !limit.is_zero())
}

/// Runs `action`, giving up once `deadline` elapses.
///
/// A missing or zero deadline waits indefinitely. When the deadline wins,
/// the action is dropped at its current suspension point.
pub async fn race<T, F>(deadline: Option<Duration>, action: F) -> Outcome<T>
where
    F: Future<Output = Result<T>>,
{
    let result = match effective(deadline) {
        Some(limit) => match tokio::time::timeout(limit, action).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(?limit, "Command has timed out");
                return Outcome::TimedOut(limit);
            }
        },
        None => action.await,
    };

    match result {
        Ok(value) => Outcome::Ok(value),
        Err(e) => Outcome::Failed(e),
    }
}

/// [`race`], flattened into a `Result`.
///
/// # Errors
///
/// Returns the action's error, or [`Error::Timeout`] if the deadline fired.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, action: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    race(deadline, action).await.into_result()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn finishes_before_deadline() {
        let outcome = race(Some(Duration::from_secs(5)), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(7)
        })
        .await;
        assert!(matches!(outcome, Outcome::Ok(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_first() {
        let outcome = race(Some(Duration::from_secs(1)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(outcome, Outcome::TimedOut(limit) if limit == Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_waits_indefinitely() {
        let result = with_deadline(Some(Duration::ZERO), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("done")
        })
        .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn failure_is_passed_through() {
        let result: Result<()> = with_deadline(None, async { Err(Error::ConnectionClosed) }).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_error() {
        let result: Result<()> = with_deadline(
            Some(Duration::from_millis(10)),
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
