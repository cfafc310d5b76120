//! Bounded timeouts and the single-retry policy for collaborator calls
//!
//! A timeout is a transient failure. Transient failures get one immediate
//! retry; permanent failures are returned as-is.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

/// Outcome of a call plus how many times it was attempted
#[derive(Debug, Clone, PartialEq)]
pub struct CallReport<T> {
    pub result: Result<T, SourceError>,
    pub calls: u32,
}

/// Run `fut` with a deadline, mapping elapsed time to `SourceError::Transient`
pub async fn with_timeout<T, Fut>(timeout: Duration, fut: Fut) -> Result<T, SourceError>
where
    Fut: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Transient(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Call `op` with a timeout, retrying once on a transient failure
pub async fn call_with_retry<T, F, Fut>(timeout: Duration, mut op: F) -> CallReport<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    match with_timeout(timeout, op()).await {
        Err(SourceError::Transient(_)) => CallReport {
            result: with_timeout(timeout, op()).await,
            calls: 2,
        },
        result => CallReport { result, calls: 1 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_retried_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let report = call_with_retry(Duration::from_secs(1), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SourceError::Transient("503".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(report.result, Ok(7));
        assert_eq!(report.calls, 2);
    }

    #[tokio::test]
    async fn test_permanent_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let report: CallReport<u32> = call_with_retry(Duration::from_secs(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::Permanent("401".to_string()))
        })
        .await;

        assert!(matches!(report.result, Err(SourceError::Permanent(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_transient() {
        let report: CallReport<u32> = call_with_retry(Duration::from_millis(50), || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(1)
        })
        .await;

        assert_eq!(report.calls, 2);
        assert!(matches!(report.result, Err(SourceError::Transient(_))));
    }
}
