//! Collaborator traits
//!
//! The deployment engine only talks to the outside world through these
//! traits. The AWS implementations live in `ecs-deploy-aws`; tests use
//! in-memory fakes.

use crate::error::ProviderResult;
use crate::model::{ServiceRecord, ServiceUpdate, StabilityStatus, TaskTemplate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Container orchestration registry (services and task definitions)
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Find the service `application` in cluster `environment`
    async fn locate(&self, environment: &str, application: &str) -> ProviderResult<ServiceRecord>;

    /// Read a registered task definition
    async fn fetch_template(&self, template_ref: &str) -> ProviderResult<TaskTemplate>;

    /// Register `template` as a new revision and return its reference.
    /// Registration is append-only; earlier revisions stay available.
    async fn register(&self, template: &TaskTemplate) -> ProviderResult<String>;

    /// Apply `update` and return the service as it stands afterwards
    async fn update_service(&self, update: &ServiceUpdate) -> ProviderResult<ServiceRecord>;

    /// Check once whether the service has settled
    async fn poll_stability(
        &self,
        environment: &str,
        application: &str,
    ) -> ProviderResult<StabilityStatus>;
}

/// Hierarchical key/value store holding versions and secrets
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Write a plain string parameter, overwriting any existing value
    async fn put(&self, path: &str, value: &str, description: &str) -> ProviderResult<()>;

    /// Read one page of the parameters directly under `path`
    async fn list_page(&self, path: &str, next_token: Option<String>)
    -> ProviderResult<ParameterPage>;
}

/// Time series store used by the reservation estimator
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Per-period maximum of a metric over the query window
    async fn query_maximum(&self, query: &MetricQuery) -> ProviderResult<Vec<MetricPoint>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub parameters: Vec<Parameter>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Full path, e.g. `/prod/web/DB_PASS`
    pub name: String,
    /// Locator the orchestrator resolves at container start
    pub arn: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
        }
    }

    /// Last path segment of the parameter name
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<(String, String)>,
    /// Unit the values are reported in, e.g. `Megabytes`
    pub unit: Option<String>,
    /// Aggregation period
    pub period: Duration,
    /// How far back to look
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}
