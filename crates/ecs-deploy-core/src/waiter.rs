//! Service stability wait
//!
//! Polls the registry at a fixed interval until the service settles or the
//! attempt budget runs out. There is no cancellation token: callers that need
//! to give up early wrap the future in their own timeout, knowing the service
//! update has already happened either way.

use crate::error::{DeployError, ProviderError, Result};
use crate::model::StabilityStatus;
use crate::provider::ServiceRegistry;
use std::time::Duration;
use tokio::time::sleep;

/// Stability polling settings
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Maximum number of polls
    pub max_attempts: u32,

    /// Pause between two polls
    pub interval: Duration,
}

impl WaitConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Wait until `application` in `environment` reports a steady state.
///
/// `on_poll` sees every poll result with its 1-based attempt number. Returns
/// the number of polls it took. Transport errors count as unsuccessful
/// attempts; a service that disappears aborts the wait.
pub async fn wait_for_stability<F>(
    registry: &dyn ServiceRegistry,
    environment: &str,
    application: &str,
    config: &WaitConfig,
    mut on_poll: F,
) -> Result<u32>
where
    F: FnMut(u32, &StabilityStatus) + Send,
{
    for attempt in 1..=config.max_attempts {
        match registry.poll_stability(environment, application).await {
            Ok(status) => {
                on_poll(attempt, &status);
                if status.is_stable() {
                    return Ok(attempt);
                }
            }
            Err(ProviderError::NotFound(reason)) => {
                tracing::warn!(%environment, %application, %reason, "service vanished while waiting");
                return Err(DeployError::ServiceNotFound {
                    application: application.to_string(),
                    environment: environment.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "stability poll failed");
            }
        }

        if attempt < config.max_attempts {
            sleep(config.interval).await;
        }
    }

    Err(DeployError::StabilityTimeout {
        service: application.to_string(),
        attempts: config.max_attempts,
    })
}
