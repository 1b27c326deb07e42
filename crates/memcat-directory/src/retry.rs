//! Backoff policy for member directory requests.
//!
//! A request is resent only when it never produced a response: the
//! connection failed or the client timed out. Any HTTP status, including
//! 5xx, goes back to the caller unchanged, and so do errors raised while
//! building the request.

use std::future::Future;
use std::time::Duration;

/// How many times to resend and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    /// Resends after the first attempt.
    pub retries: u32,
    /// Wait before the first resend. Doubles for each later one.
    pub initial: Duration,
    /// Upper bound on any single wait.
    pub ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 3,
            initial: Duration::from_millis(250),
            ceiling: Duration::from_secs(2),
        }
    }
}

impl Backoff {
    /// Wait before resend number `n` (zero-based).
    pub(crate) fn wait_before(&self, n: u32) -> Duration {
        let factor = 1u32.checked_shl(n).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.ceiling)
    }
}

fn never_answered(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Run `send` until it yields a response, the error is not a transport
/// failure, or the policy's resends are used up.
pub(crate) async fn send_with_backoff<F, Fut>(
    policy: Backoff,
    endpoint: &str,
    send: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut resends = 0;
    loop {
        match send().await {
            Err(e) if resends < policy.retries && never_answered(&e) => {
                let wait = policy.wait_before(resends);
                resends += 1;
                tracing::warn!(
                    endpoint,
                    resend = resends,
                    of = policy.retries,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "member directory unreachable, resending"
                );
                tokio::time::sleep(wait).await;
            }
            outcome => return outcome,
        }
    }
}
