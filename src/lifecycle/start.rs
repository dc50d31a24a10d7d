// ABOUTME: Start confirmation poll.
// ABOUTME: Re-inspects a started container until it runs or the policy's deadline passes.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use crate::runtime::ContainerOps;
use crate::types::ContainerId;

use super::error::{GatewayResultExt, LifecycleError};

/// How long and how often to wait for a started container to report `running`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartPolicy {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Multiplier applied to the interval after every poll.
    #[serde(default = "default_backoff")]
    pub backoff: f64,

    #[serde(default = "default_max_interval", with = "humantime_serde")]
    pub max_interval: Duration,
}

fn default_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff() -> f64 {
    1.0
}

fn default_max_interval() -> Duration {
    Duration::from_secs(2)
}

impl Default for StartPolicy {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            backoff: default_backoff(),
            max_interval: default_max_interval(),
        }
    }
}

impl StartPolicy {
    /// Never shorter than `current`, never longer than `max_interval` unless
    /// `current` already is.
    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff <= 1.0 {
            return current;
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .map_or(self.max_interval, |d| d.min(self.max_interval))
            .max(current)
    }
}

/// Poll until the container is running.
///
/// Dropping the returned future cancels the wait.
///
/// # Errors
///
/// Returns `LifecycleError::StartTimeout` if the deadline passes first, or the
/// inspect failure if the container cannot be inspected.
pub async fn wait_until_running<R: ContainerOps + ?Sized>(
    runtime: &R,
    id: &ContainerId,
    policy: &StartPolicy,
) -> Result<(), LifecycleError> {
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut interval = policy.interval;

    loop {
        let info = runtime.inspect_container(id).await.during("inspect")?;
        if info.state.is_running() {
            tracing::debug!(container = %id.short(), waited = ?started.elapsed(), "container running");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(LifecycleError::StartTimeout {
                container: id.clone(),
                waited: now - started,
            });
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = policy.next_interval(interval);
    }
}
