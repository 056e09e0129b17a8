//! Dial retry/backoff for the connection-establishment phase, the one
//! recoverable-locally failure in the error handling design: the dialing
//! side retries up to a configured attempt count with a fixed backoff.
//! Once the handshake completes, every later phase is one-shot.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use pprl_types::PprlError;

/// Retries `connect` up to `attempts` times, sleeping `backoff` between
/// tries. Returns the first success, or wraps the last failure as
/// [`PprlError::IoFailed`] once `attempts` is exhausted.
pub async fn connect_with_retry<F, Fut, T, E>(
    attempts: u32,
    backoff: Duration,
    mut connect: F,
) -> Result<T, PprlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(attempt, attempts, "dial attempt failed: {err}");
                last_err = Some(err.to_string());
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    Err(PprlError::io_failed(format!(
        "failed to connect after {attempts} attempts: {}",
        last_err.unwrap_or_default()
    )))
}
