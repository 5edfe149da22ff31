//! Service and task definition lookup

use crate::error::{DeployError, ProviderError, Result};
use crate::model::{ServiceRecord, TaskTemplate};
use crate::provider::ServiceRegistry;

/// Locate the one service named `application` in cluster `environment`.
pub async fn locate_service(
    registry: &dyn ServiceRegistry,
    environment: &str,
    application: &str,
) -> Result<ServiceRecord> {
    let not_found = || DeployError::ServiceNotFound {
        application: application.to_string(),
        environment: environment.to_string(),
    };

    let service = match registry.locate(environment, application).await {
        Ok(service) => service,
        Err(ProviderError::NotFound(reason)) => {
            tracing::warn!(%environment, %application, %reason, "service lookup failed");
            return Err(not_found());
        }
        Err(e) => return Err(DeployError::RegistryUnavailable(e.to_string())),
    };

    if service.is_inactive() {
        tracing::warn!(%environment, %application, "service is inactive");
        return Err(not_found());
    }

    tracing::debug!(
        service = %service.service_ref,
        task_definition = %service.template_ref,
        "located service"
    );
    Ok(service)
}

/// Read the task definition `service` currently runs.
pub async fn fetch_current_template(
    registry: &dyn ServiceRegistry,
    service: &ServiceRecord,
) -> Result<TaskTemplate> {
    let template = registry
        .fetch_template(&service.template_ref)
        .await
        .map_err(|e| {
            DeployError::RegistryUnavailable(format!(
                "unable to read task definition {}: {}",
                service.template_ref, e
            ))
        })?;

    tracing::debug!(
        family = %template.family,
        revision = template.revision,
        containers = template.containers.len(),
        "fetched task definition"
    );
    Ok(template)
}
