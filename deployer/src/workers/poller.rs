//! Polling worker for completion checks

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rpc_models::Action;
use tracing::{debug, info, warn};

use crate::clients::RequestContext;
use crate::errors::DeployError;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Something whose action can be polled to completion
#[async_trait]
pub trait CompletionCheck: Send {
    /// Value returned by the handler that started the action
    type Handle: Send + Sync;

    async fn check_complete(
        &mut self,
        ctx: &RequestContext,
        action: Action,
        handle: Option<&Self::Handle>,
    ) -> Result<bool, DeployError>;
}

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Give up after waiting this long
    pub timeout: Duration,

    /// Grow the interval between checks instead of polling at a fixed rate
    pub backoff: Option<CooldownOptions>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3600),
            backoff: None,
        }
    }
}

impl Options {
    fn delay(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Some(backoff) => calc_exp_backoff(backoff, attempt),
            None => self.interval,
        }
    }
}

/// Re-run the completion check until it reports done, fails or times out
///
/// Returns the number of checks made.
pub async fn poll_until_complete<T, S, F>(
    options: &Options,
    target: &mut T,
    ctx: &RequestContext,
    action: Action,
    handle: Option<&T::Handle>,
    sleep_fn: S,
) -> Result<u32, DeployError>
where
    T: CompletionCheck,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut waited = Duration::ZERO;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match target.check_complete(ctx, action, handle).await {
            Ok(true) => {
                info!("{} complete after {} checks", action, attempt);
                return Ok(attempt);
            }
            Ok(false) => {
                debug!("{} not complete yet (check {})", action, attempt);
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                return Err(e);
            }
        }

        if waited >= options.timeout {
            return Err(DeployError::Timeout(format!(
                "{} did not complete within {}s",
                action,
                options.timeout.as_secs()
            )));
        }

        let delay = options.delay(attempt - 1);
        sleep_fn(delay).await;
        waited += delay;
    }
}
