//! Lambda entry point
//!
//! The binary serves `DeploymentRequest` events when it runs inside the
//! Lambda runtime. Each event resolves its own credentials, so a `Role` in the
//! event is honoured per invocation.

use ecs_deploy_aws::AwsClients;
use ecs_deploy_core::{DeployError, Deployer, DeploymentRequest, DeploymentResult};
use lambda_runtime::{Error, LambdaEvent, service_fn};

/// Set by the Lambda runtime in every function container
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Description recorded when the event carries none
pub const LAMBDA_DESCRIPTION: &str = "desired version set by lambda ecs-deploy";

pub fn is_lambda_environment() -> bool {
    std::env::var_os(RUNTIME_API_ENV).is_some()
}

pub async fn run() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle)).await
}

/// Validate an event and fill in the Lambda defaults
pub fn prepare(mut request: DeploymentRequest) -> Result<DeploymentRequest, DeployError> {
    request.validate()?;

    let blank = request
        .description
        .as_deref()
        .is_none_or(|d| d.trim().is_empty());
    if blank {
        request.description = Some(LAMBDA_DESCRIPTION.to_string());
    }
    Ok(request)
}

async fn handle(event: LambdaEvent<DeploymentRequest>) -> Result<DeploymentResult, Error> {
    let request = prepare(event.payload)?;
    tracing::info!(
        request_id = %event.context.request_id,
        application = %request.application,
        version = %request.version,
        environment = %request.environment,
        "processing deployment request"
    );

    let clients = AwsClients::connect(None, request.role.as_deref()).await?;
    let deployer = Deployer::new(clients.registry.clone(), clients.parameters.clone())
        .with_metrics(clients.metrics.clone());

    let result = deployer.deploy(&request).await?;
    tracing::info!(
        invoked = result.successfully_invoked,
        task_definition = %result.task_definition,
        "deployment finished"
    );
    Ok(result)
}
