//! Polling wait with an upper bound.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::Result;

/// Polls `probe` every `poll` until it yields `Some`, or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. Probe errors end the wait immediately so
/// callers can react to a dead session.
pub async fn wait_until<T, F, Fut>(timeout: Duration, poll: Duration, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(poll.min(deadline - now)).await;
    }
}
