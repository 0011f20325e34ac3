use crate::error::EmbeddingError;
use async_trait::async_trait;

/// Turns query text into a fixed-dimension vector.
///
/// Implementations must be deterministic for a given text and model. A failure
/// is reported as an error, never as an empty vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Encode a single text
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of the vectors produced by [`EmbeddingProvider::encode`]
    fn dimension(&self) -> usize;
}

/// Run CPU-bound encoder work on the blocking thread pool.
///
/// The returned future yields while the work runs, so callers can race it
/// against a timeout or a cancellation token. Dropping the future does not
/// stop the work; its result is discarded.
pub async fn run_blocking<F, T>(work: F) -> Result<T, EmbeddingError>
where
    F: FnOnce() -> Result<T, EmbeddingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EmbeddingError::Other(format!("encoder task join failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_work_can_be_timed_out() {
        let start = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            run_blocking(|| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(vec![1.0_f32])
            }),
        )
        .await;

        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_blocking_work_result_is_returned() {
        let vector = run_blocking(|| Ok(vec![0.5_f32, 0.25])).await.unwrap();
        assert_eq!(vector, vec![0.5, 0.25]);
    }

    #[tokio::test]
    async fn test_panicking_work_is_an_error() {
        let result: Result<Vec<f32>, _> = run_blocking(|| panic!("model crashed")).await;
        assert!(matches!(result, Err(EmbeddingError::Other(_))));
    }
}
