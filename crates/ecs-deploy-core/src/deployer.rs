//! Deployment facade
//!
//! Drives one request through the state machine in [`crate::state`]:
//! record the version, locate the service, fetch and mutate its task
//! definition, report the diff, then register, update and optionally wait.

use crate::diff::{self, ChangeRecord};
use crate::error::{DeployError, Result};
use crate::fetch;
use crate::model::{ServiceRecord, StabilityStatus, TaskTemplate};
use crate::mutate::{self, Mutation};
use crate::provider::{MetricsStore, ParameterStore, ServiceRegistry};
use crate::publish;
use crate::request::{DeploymentRequest, DeploymentResult};
use crate::reservation;
use crate::state::DeployState;
use crate::waiter::{self, WaitConfig};
use std::sync::Arc;
use std::time::Duration;

/// Description stored with the desired version when the caller gives none.
/// The command line uses it as its own default; Lambda events bring theirs.
pub const DEFAULT_DESCRIPTION: &str = "Desired version set by ecs-deploy CLI";

/// Receives progress from a running deployment
pub trait DeployObserver: Send + Sync {
    fn on_transition(&self, _from: DeployState, _to: DeployState) {}

    /// Called once with the diff between current and desired task definition
    fn on_diff(&self, _records: &[ChangeRecord]) {}

    fn on_poll(&self, _attempt: u32, _max_attempts: u32, _status: &StabilityStatus) {}
}

/// Reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DeployObserver for TracingObserver {
    fn on_transition(&self, from: DeployState, to: DeployState) {
        tracing::debug!(%from, %to, "deployment state changed");
    }

    fn on_diff(&self, records: &[ChangeRecord]) {
        for record in records {
            tracing::info!("{}", record);
        }
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, status: &StabilityStatus) {
        tracing::info!(attempt, max_attempts, %status, "waiting for service to stabilize");
    }
}

/// Tracks the current state of one deployment and rejects illegal moves
struct Run<'a> {
    state: DeployState,
    observer: &'a dyn DeployObserver,
}

impl<'a> Run<'a> {
    fn new(observer: &'a dyn DeployObserver) -> Self {
        Self {
            state: DeployState::Idle,
            observer,
        }
    }

    fn advance(&mut self, next: DeployState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(DeployError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.observer.on_transition(self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Runs deployments against injected collaborators.
///
/// Clients are handed in already configured (credentials resolved, region
/// set); the deployer never creates or shares clients on its own.
pub struct Deployer {
    registry: Arc<dyn ServiceRegistry>,
    parameters: Arc<dyn ParameterStore>,
    metrics: Option<Arc<dyn MetricsStore>>,
    observer: Arc<dyn DeployObserver>,
    poll_interval: Duration,
    reservation_window: Duration,
}

impl Deployer {
    pub fn new(registry: Arc<dyn ServiceRegistry>, parameters: Arc<dyn ParameterStore>) -> Self {
        Self {
            registry,
            parameters,
            metrics: None,
            observer: Arc::new(TracingObserver),
            poll_interval: WaitConfig::DEFAULT_INTERVAL,
            reservation_window: reservation::DEFAULT_WINDOW,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsStore>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DeployObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reservation_window(mut self, window: Duration) -> Self {
        self.reservation_window = window;
        self
    }

    /// Run `request` to completion.
    ///
    /// A `StabilityTimeout` is only ever returned after the service has been
    /// updated; the rollout was started but its health is unconfirmed.
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentResult> {
        request.validate()?;
        if request.auto_size_memory && !request.restart {
            self.metrics_store()?;
        }

        let mut run = Run::new(self.observer.as_ref());
        let outcome = if request.restart {
            tracing::info!(
                application = %request.application,
                environment = %request.environment,
                "redeploying current task definition"
            );
            self.restart(request, &mut run).await
        } else {
            tracing::info!(
                application = %request.application,
                version = %request.version,
                environment = %request.environment,
                dry_run = request.dry_run,
                "deploying"
            );
            self.ship(request, &mut run).await
        };

        match &outcome {
            Err(e) => tracing::debug!(
                state = %run.state,
                service_updated = run.state.has_updated_service(),
                error = %e,
                "deployment stopped"
            ),
            Ok(_) if run.state.is_terminal() => {
                tracing::debug!(state = %run.state, "deployment finished")
            }
            Ok(_) => tracing::debug!(state = %run.state, "deployment invoked"),
        }
        outcome
    }

    /// Recommended memory reservation for the service's task family
    pub async fn estimate(&self, environment: &str, application: &str) -> Result<i32> {
        let metrics = self.metrics_store()?;
        let service = fetch::locate_service(self.registry.as_ref(), environment, application).await?;
        let current = fetch::fetch_current_template(self.registry.as_ref(), &service).await?;

        reservation::estimate_reservation(
            metrics.as_ref(),
            environment,
            &current.family,
            self.reservation_window,
        )
        .await
    }

    async fn ship(&self, request: &DeploymentRequest, run: &mut Run<'_>) -> Result<DeploymentResult> {
        if !request.dry_run {
            self.record_version(request).await?;
            run.advance(DeployState::VersionRecorded)?;
        }

        let service = fetch::locate_service(
            self.registry.as_ref(),
            &request.environment,
            &request.application,
        )
        .await?;
        run.advance(DeployState::ServiceLocated)?;

        let current = fetch::fetch_current_template(self.registry.as_ref(), &service).await?;
        run.advance(DeployState::TemplateFetched)?;

        let desired = self.desired_template(request, &current).await?;
        run.advance(DeployState::TemplateMutated)?;

        let changes = diff::diff_templates(&current, &desired);
        self.observer.on_diff(&changes);
        run.advance(DeployState::Diffed)?;

        if request.dry_run {
            run.advance(DeployState::DryRunExit)?;
            return Ok(DeploymentResult::not_invoked(&service));
        }

        let template_ref = publish::register_template(self.registry.as_ref(), &desired).await?;
        run.advance(DeployState::Registered)?;

        let updated = publish::update_service(self.registry.as_ref(), &service, &template_ref).await?;
        run.advance(DeployState::ServiceUpdated)?;

        self.finish(request, run, &updated).await
    }

    async fn restart(&self, request: &DeploymentRequest, run: &mut Run<'_>) -> Result<DeploymentResult> {
        let service = fetch::locate_service(
            self.registry.as_ref(),
            &request.environment,
            &request.application,
        )
        .await?;
        run.advance(DeployState::ServiceLocated)?;

        if request.dry_run {
            run.advance(DeployState::DryRunExit)?;
            return Ok(DeploymentResult::not_invoked(&service));
        }

        let updated = publish::restart_service(self.registry.as_ref(), &service).await?;
        run.advance(DeployState::ServiceUpdated)?;

        self.finish(request, run, &updated).await
    }

    async fn finish(
        &self,
        request: &DeploymentRequest,
        run: &mut Run<'_>,
        updated: &ServiceRecord,
    ) -> Result<DeploymentResult> {
        let result = DeploymentResult::invoked(updated);
        if !request.wait {
            return Ok(result);
        }

        run.advance(DeployState::Stabilizing)?;
        let config = WaitConfig::new(request.max_attempts).with_interval(self.poll_interval);
        let observer = self.observer.as_ref();
        let waited = waiter::wait_for_stability(
            self.registry.as_ref(),
            &request.environment,
            &request.application,
            &config,
            |attempt, status| observer.on_poll(attempt, config.max_attempts, status),
        )
        .await;

        match waited {
            Ok(_) => {
                run.advance(DeployState::Stable)?;
                Ok(result)
            }
            Err(e @ DeployError::StabilityTimeout { .. }) => {
                tracing::warn!(
                    task_definition = %result.task_definition,
                    "service updated but rollout health is unconfirmed"
                );
                run.advance(DeployState::TimedOut)?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn record_version(&self, request: &DeploymentRequest) -> Result<()> {
        let path = request.version_parameter_path();
        let description = request.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION);

        self.parameters
            .put(&path, &request.version, description)
            .await
            .map_err(|e| DeployError::VersionRecordFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(%path, version = %request.version, "recorded desired version");
        Ok(())
    }

    async fn desired_template(
        &self,
        request: &DeploymentRequest,
        current: &TaskTemplate,
    ) -> Result<TaskTemplate> {
        let mut mutation = Mutation::new(request.version.clone());

        if request.refresh_secrets {
            let prefix = request.effective_secrets_prefix();
            let secrets = mutate::load_secrets(self.parameters.as_ref(), &prefix).await?;
            mutation = mutation.with_secrets(secrets);
        }

        if request.auto_size_memory {
            let metrics = self.metrics_store()?;
            let reservation = reservation::estimate_reservation(
                metrics.as_ref(),
                &request.environment,
                &current.family,
                self.reservation_window,
            )
            .await?;

            if reservation > 0 {
                mutation = mutation.with_memory_reservation(reservation);
            } else {
                tracing::warn!(
                    family = %current.family,
                    "no memory usage recorded, keeping the current reservation"
                );
            }
        }

        mutate::mutate_template(current, &mutation)
    }

    fn metrics_store(&self) -> Result<&Arc<dyn MetricsStore>> {
        self.metrics.as_ref().ok_or_else(|| {
            DeployError::InvalidRequest("memory sizing needs a metrics store".to_string())
        })
    }
}
