//! AWS collaborators for ecs-deploy
//!
//! Implements the `ecs-deploy-core` provider traits on top of the AWS SDK:
//!
//! - [`EcsServiceRegistry`]: services and task definitions (ECS)
//! - [`SsmParameterStore`]: desired versions and secrets (SSM Parameter Store)
//! - [`CloudWatchMetrics`]: Container Insights memory usage (CloudWatch)
//!
//! # Example
//!
//! ```ignore
//! use ecs_deploy_aws::AwsClients;
//! use ecs_deploy_core::{Deployer, DeploymentRequest};
//!
//! let clients = AwsClients::connect(Some("us-east-1"), None).await?;
//! let deployer = Deployer::new(clients.registry.clone(), clients.parameters.clone())
//!     .with_metrics(clients.metrics.clone());
//!
//! let result = deployer
//!     .deploy(&DeploymentRequest::new("web", "2.0", "prod"))
//!     .await?;
//! ```

pub mod cloudwatch;
pub mod credentials;
pub mod ecs;
pub mod error;
pub mod ssm;

pub use cloudwatch::CloudWatchMetrics;
pub use credentials::resolve_sdk_config;
pub use ecs::EcsServiceRegistry;
pub use error::{AwsError, Result};
pub use ssm::SsmParameterStore;

use aws_config::SdkConfig;
use std::sync::Arc;

/// One client per AWS service, all sharing the same credentials
#[derive(Clone)]
pub struct AwsClients {
    pub registry: Arc<EcsServiceRegistry>,
    pub parameters: Arc<SsmParameterStore>,
    pub metrics: Arc<CloudWatchMetrics>,
}

impl AwsClients {
    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            registry: Arc::new(EcsServiceRegistry::new(config)),
            parameters: Arc::new(SsmParameterStore::new(config)),
            metrics: Arc::new(CloudWatchMetrics::new(config)),
        }
    }

    /// Resolve credentials (assuming `role` if given) and build every client.
    pub async fn connect(region: Option<&str>, role: Option<&str>) -> Result<Self> {
        let config = resolve_sdk_config(region, role).await?;
        Ok(Self::from_config(&config))
    }
}
