//! Retry with exponential backoff for transient relay failures.

use std::time::Duration;

use tracing::debug;

use crate::error::RelayError;
use crate::settings::ValidatedRelayConfig;

/// Calculates the delay for exponential backoff.
///
/// delay = `base_delay` × (`backoff_factor` ^ `attempt`)
fn calculate_backoff_delay(
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: u32,
) -> Duration {
    let delay = base_delay
        .checked_mul(backoff_factor.saturating_pow(attempt))
        .unwrap_or(max_delay);

    delay.min(max_delay)
}

/// Retries an async operation with exponential backoff.
///
/// Errors for which [`RelayError::is_retryable`] holds are retried up to
/// `max_retry_attempts` times; any other error is returned immediately.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "`attempt` is bounded by `max_retry_attempts`"
)]
pub async fn retry_with_backoff<F, Fut, T>(
    config: &ValidatedRelayConfig,
    mut operation: F,
) -> Result<T, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if attempt < config.max_retry_attempts && error.is_retryable() => {
                let delay = calculate_backoff_delay(
                    attempt,
                    config.initial_retry_delay,
                    config.max_retry_delay,
                    config.backoff_factor,
                );
                debug!(attempt, ?delay, %error, "Retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use zkb_ledger::LedgerError;

    use super::*;
    use crate::settings::RelayConfig;

    fn test_config() -> ValidatedRelayConfig {
        RelayConfig {
            max_retry_attempts: 3,
            initial_retry_delay_ms: 1,
            max_retry_delay_ms: 10,
            backoff_factor: 2,
            ..RelayConfig::default()
        }
        .validate()
        .expect("valid config")
    }

    fn unavailable() -> RelayError {
        RelayError::Transient("peer unavailable".to_owned())
    }

    #[test]
    fn backoff_grows_and_caps() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_secs(10);

        // 100, 200, 400, 800
        for i in 0..4 {
            let expected = initial.saturating_mul(2_u32.saturating_pow(i));
            assert_eq!(calculate_backoff_delay(i, initial, max, 2), expected);
        }
        assert_eq!(calculate_backoff_delay(10, initial, max, 2), max);
        assert_eq!(
            calculate_backoff_delay(u32::MAX, Duration::from_secs(1000), max, 2),
            max
        );
        assert_eq!(
            calculate_backoff_delay(5, Duration::ZERO, max, 2),
            Duration::ZERO
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let config = test_config();
        let mut call_count = 0_u32;

        let result: Result<u32, RelayError> = retry_with_backoff(&config, || {
            call_count += 1;
            async { Err(unavailable()) }
        })
        .await;

        assert!(result.is_err_and(|e| e.is_retryable()));
        assert_eq!(call_count, 4); // 1 initial + 3 retries
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let config = test_config();
        let mut call_count = 0_u32;

        let result: Result<u32, RelayError> = retry_with_backoff(&config, || {
            call_count += 1;
            async { Err(RelayError::Rejected(LedgerError::InvalidProof)) }
        })
        .await;

        assert!(matches!(
            result,
            Err(RelayError::Rejected(LedgerError::InvalidProof))
        ));
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn succeeds_on_last_retry() {
        let config = test_config();
        let mut call_count = 0_u32;

        let result = retry_with_backoff(&config, || {
            let count = call_count;
            call_count += 1;
            async move {
                if count < 3 {
                    Err(unavailable())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(call_count, 4);
    }
}
