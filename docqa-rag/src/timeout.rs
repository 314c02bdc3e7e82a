//! Deadlines for external model calls.

use std::future::Future;
use std::time::Duration;

use tracing::error;

use crate::error::{RagError, Result};

/// Await `future`, failing with [`RagError::TimeoutError`] once `timeout`
/// elapses. `None` waits indefinitely.
pub(crate) async fn with_timeout<T, F>(
    operation: &str,
    timeout: Option<Duration>,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(timeout) = timeout else {
        return future.await;
    };
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            error!(operation, ?timeout, "external model call timed out");
            Err(RagError::TimeoutError { operation: operation.to_string(), timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_future_times_out() {
        let result: Result<()> = with_timeout("embedding", Some(Duration::from_secs(1)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RagError::TimeoutError { ref operation, .. }) if operation == "embedding"));
    }

    #[tokio::test]
    async fn no_timeout_passes_result_through() {
        let result = with_timeout("generation", None, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
