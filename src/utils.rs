use crate::error::{AppError, AppResult};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task;

pub async fn run_blocking<F, T>(func: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(func).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn acquire_semaphore<'a>(
    semaphore: &'a Semaphore,
    context: &str,
) -> AppResult<SemaphorePermit<'a>> {
    semaphore
        .acquire()
        .await
        .map_err(|e| AppError::SemaphoreAcquire(format!("Failed for '{}': {}", context, e)))
}

/// `base * 2^attempt`, attempt counted from zero.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

pub fn per_second(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(250));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let delay = backoff_delay(Duration::from_secs(1), 64);
        assert!(delay >= Duration::from_secs(1 << 31));
    }

    #[test]
    fn rate_is_zero_without_elapsed_time() {
        assert_eq!(per_second(10, Duration::ZERO), 0.0);
        assert_eq!(per_second(10, Duration::from_secs(2)), 5.0);
    }
}
