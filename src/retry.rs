use log::warn;
use std::future::Future;
use std::time::Duration;

/// How many times to run an operation and how long to wait between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Runs `op` until it succeeds, fails with an error `retry_on` rejects, or the
/// policy's attempts are used up. The last error is returned in the latter case.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut, P>(policy: RetryPolicy, retry_on: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && retry_on(&e) => {
                warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
