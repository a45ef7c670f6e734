//! Retry policy: exponential backoff with jitter for transient service
//! failures.
//!
//! HTTP 429 / 5xx errors from AI APIs are transient and frequent. The
//! backoff sequence doubles per attempt (500 ms → 1 s → 2 s with the
//! defaults) and each delay is jittered so independent runs that hit a
//! rate limit together do not retry in lockstep against a recovering
//! endpoint. A server-specified `Retry-After` overrides the computed
//! delay, clamped to the configured maximum.

use crate::error::ServiceError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Backoff parameters for one client's retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Jitter factor in `0.0..=1.0`; each delay is perturbed by up to
    /// ±(factor × delay).
    pub jitter: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// Exponential: `initial × 2^(attempt-1)`, capped at `max_backoff_ms`,
    /// then jittered within ±(jitter × delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self
            .initial_backoff_ms
            .saturating_mul(1u64 << (attempt - 1).min(16));
        let capped = base.min(self.max_backoff_ms);

        let jittered = if self.jitter > 0.0 && capped > 0 {
            let range = (capped as f64 * f64::from(self.jitter)) as u64;
            let offset = random_u32() as u64 % (range * 2 + 1);
            capped.saturating_sub(range).saturating_add(offset)
        } else {
            capped
        };

        Duration::from_millis(jittered)
    }

    /// The delay actually used before retry `attempt`: the server's
    /// `Retry-After` hint when present (clamped to the maximum), otherwise
    /// the computed backoff.
    pub fn delay_before(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        match server_hint {
            Some(hint) => hint.min(Duration::from_millis(self.max_backoff_ms)),
            None => self.delay_for_attempt(attempt),
        }
    }
}

/// Outcome of [`call_with_retry`]: the value plus how many attempts it
/// took, or the final error plus how many attempts were made.
pub(crate) type RetryOutcome<T> = Result<(T, u32), (ServiceError, u32)>;

/// Drive `op` under the policy.
///
/// Transient failures are retried with backoff; a non-retryable failure
/// returns immediately. Either way the attempt count comes back with the
/// result so callers can report it.
pub(crate) async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_err: Option<ServiceError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let hint = last_err.as_ref().and_then(|e| e.retry_after);
            let delay = policy.delay_before(attempt, hint);
            warn!(
                "{label}: retry {attempt}/{} after {}ms",
                policy.max_retries,
                delay.as_millis()
            );
            sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(e) if !e.is_retryable() => {
                warn!("{label}: permanent failure, not retrying — {e}");
                return Err((e, attempt + 1));
            }
            Err(e) => {
                warn!("{label}: attempt {} failed — {e}", attempt + 1);
                last_err = Some(e);
            }
        }
    }

    let err = last_err.expect("at least one attempt was made");
    Err((err, policy.max_retries + 1))
}

/// Pseudo-random source for jitter. A thread-local xorshift is plenty —
/// the values only need to decorrelate concurrent retry loops.
fn random_u32() -> u32 {
    use std::cell::Cell;
    use std::time::SystemTime;

    thread_local! {
        static STATE: Cell<u32> = Cell::new(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.subsec_nanos() | 1)
                .unwrap_or(0x9E37_79B9)
        );
    }

    STATE.with(|state| {
        let mut x = state.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state.set(x);
        x
    })
}
