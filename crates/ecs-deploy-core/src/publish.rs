//! Task definition registration and service update

use crate::error::{DeployError, Result};
use crate::model::{ServiceRecord, ServiceUpdate, TaskTemplate};
use crate::provider::ServiceRegistry;

/// Register `desired` as a new revision.
///
/// On failure nothing has changed on the live service.
pub async fn register_template(
    registry: &dyn ServiceRegistry,
    desired: &TaskTemplate,
) -> Result<String> {
    let template_ref = registry
        .register(desired)
        .await
        .map_err(|e| DeployError::RegistrationFailed(e.to_string()))?;

    tracing::info!(family = %desired.family, task_definition = %template_ref, "registered task definition");
    Ok(template_ref)
}

/// Point `current` at `template_ref` and force a new rollout.
///
/// On failure the registered revision is left behind unused.
pub async fn update_service(
    registry: &dyn ServiceRegistry,
    current: &ServiceRecord,
    template_ref: &str,
) -> Result<ServiceRecord> {
    apply_update(registry, &ServiceUpdate::rollout(current, template_ref)).await
}

/// Force a new rollout of the task definition `current` already runs.
pub async fn restart_service(
    registry: &dyn ServiceRegistry,
    current: &ServiceRecord,
) -> Result<ServiceRecord> {
    apply_update(registry, &ServiceUpdate::restart(current)).await
}

async fn apply_update(registry: &dyn ServiceRegistry, update: &ServiceUpdate) -> Result<ServiceRecord> {
    let updated = registry
        .update_service(update)
        .await
        .map_err(|e| DeployError::ServiceUpdateFailed(e.to_string()))?;

    tracing::info!(
        service = %updated.service_ref,
        task_definition = %updated.template_ref,
        "service updated"
    );
    Ok(updated)
}
