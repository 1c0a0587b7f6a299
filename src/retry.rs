use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::AgentError;

/// Bounded exponential backoff, matching the Kubernetes client default
/// (4 attempts, 10ms initial delay, factor 5).
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub steps: u32,
    pub initial: Duration,
    pub factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            steps: 4,
            initial: Duration::from_millis(10),
            factor: 5.0,
        }
    }
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial.mul_f64(self.factor.powi(attempt as i32))
    }
}

/// Runs `op` until it succeeds, fails with a non-conflict error, or the
/// backoff is exhausted. Only conflict errors are retried.
pub async fn retry_on_conflict<T, F, Fut>(backoff: Backoff, mut op: F) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_conflict() && attempt + 1 < backoff.steps => {
                let delay = backoff.delay(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "conflict listing nodes, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conflict() -> AgentError {
        AgentError::ListNodes(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "the object has been modified".to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        }))
    }

    fn fast() -> Backoff {
        Backoff {
            steps: 4,
            initial: Duration::from_millis(1),
            factor: 1.0,
        }
    }

    #[test]
    fn test_default_delays() {
        let b = Backoff::default();
        assert_eq!(b.delay(0), Duration::from_millis(10));
        assert_eq!(b.delay(1), Duration::from_millis(50));
        assert_eq!(b.delay(2), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_retries_conflicts_then_succeeds() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = retry_on_conflict(fast(), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_steps() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), _> = retry_on_conflict(fast(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), _> = retry_on_conflict(fast(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AgentError::NoReadyNodes)
        })
        .await;

        assert!(matches!(result, Err(AgentError::NoReadyNodes)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
