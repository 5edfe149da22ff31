//! Service and task definition model
//!
//! These are provider-neutral views of the ECS objects a deployment touches.
//! Only the fields the deployment reads or writes are modelled; adapters keep
//! everything else intact when they talk to the real API.

use serde::{Deserialize, Serialize};

/// Live service as reported by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Cluster reference (ARN)
    pub cluster_ref: String,

    /// Service reference (ARN)
    pub service_ref: String,

    /// Short service name
    pub service_name: String,

    /// Task definition the service currently runs
    pub template_ref: String,

    /// Desired number of running tasks
    pub desired_count: i32,

    /// Rolling update settings
    pub deployment_configuration: Option<DeploymentConfiguration>,

    /// awsvpc network settings
    pub network_configuration: Option<NetworkConfiguration>,

    /// Fargate platform version
    pub platform_version: Option<String>,

    /// Health check grace period in seconds; `None` and `Some(0)` both mean unset
    pub health_check_grace_period: Option<i32>,

    /// Lifecycle status (`ACTIVE`, `DRAINING`, `INACTIVE`)
    pub status: String,
}

impl ServiceRecord {
    /// Grace period worth carrying into an update.
    ///
    /// Zero is how the platform reports "never configured", so it is dropped
    /// instead of being written back as an explicit zero.
    pub fn configured_grace_period(&self) -> Option<i32> {
        self.health_check_grace_period.filter(|seconds| *seconds != 0)
    }

    pub fn is_inactive(&self) -> bool {
        self.status.eq_ignore_ascii_case("INACTIVE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentConfiguration {
    pub maximum_percent: Option<i32>,
    pub minimum_healthy_percent: Option<i32>,
    pub circuit_breaker: Option<CircuitBreaker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub enable: bool,
    pub rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: Option<bool>,
}

/// Task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Task definition family
    pub family: String,

    /// Revision within the family (0 for a template that is not registered yet)
    pub revision: i32,

    /// Own reference; `None` until the template has been registered
    pub template_ref: Option<String>,

    /// Reference of the registered template this one was derived from
    pub derived_from: Option<String>,

    /// Task-level CPU units
    pub cpu: Option<String>,

    /// Task-level memory (MiB)
    pub memory: Option<String>,

    /// Container definitions; the first one is the application container
    pub containers: Vec<ContainerSpec>,
}

impl TaskTemplate {
    /// Name used when reporting on this template
    pub fn display_name(&self) -> String {
        match &self.template_ref {
            Some(reference) => reference.clone(),
            None => format!("{} (unregistered)", self.family),
        }
    }

    /// The application container; any further containers are sidecars
    pub fn primary_container(&self) -> Option<&ContainerSpec> {
        self.containers.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,

    /// `repository[:tag]`
    pub image: String,

    pub cpu: i32,

    /// Hard memory limit (MiB)
    pub memory: Option<i32>,

    /// Soft memory limit (MiB)
    pub memory_reservation: Option<i32>,

    pub secrets: Vec<SecretReference>,
}

impl ContainerSpec {
    pub fn secret(&self, name: &str) -> Option<&SecretReference> {
        self.secrets.iter().find(|s| s.name == name)
    }
}

/// Container-visible name bound to an externally resolved secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretReference {
    pub name: String,
    /// Opaque locator (parameter ARN) resolved at container start
    pub value_from: String,
}

impl SecretReference {
    pub fn new(name: impl Into<String>, value_from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_from: value_from.into(),
        }
    }
}

/// Fields sent when pointing a service at a task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub cluster_ref: String,
    pub service_ref: String,

    /// `None` keeps the task definition the service already runs
    pub template_ref: Option<String>,

    pub desired_count: Option<i32>,
    pub deployment_configuration: Option<DeploymentConfiguration>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub platform_version: Option<String>,
    pub health_check_grace_period: Option<i32>,
    pub force_new_deployment: bool,
}

impl ServiceUpdate {
    /// Roll the service onto `template_ref`, carrying every other attribute
    /// over from `current` unchanged.
    pub fn rollout(current: &ServiceRecord, template_ref: impl Into<String>) -> Self {
        Self {
            cluster_ref: current.cluster_ref.clone(),
            service_ref: current.service_ref.clone(),
            template_ref: Some(template_ref.into()),
            desired_count: Some(current.desired_count),
            deployment_configuration: current.deployment_configuration.clone(),
            network_configuration: current.network_configuration.clone(),
            platform_version: current.platform_version.clone(),
            health_check_grace_period: current.configured_grace_period(),
            force_new_deployment: true,
        }
    }

    /// Force a fresh rollout of whatever the service runs today.
    pub fn restart(current: &ServiceRecord) -> Self {
        Self {
            cluster_ref: current.cluster_ref.clone(),
            service_ref: current.service_ref.clone(),
            template_ref: None,
            desired_count: None,
            deployment_configuration: None,
            network_configuration: None,
            platform_version: None,
            health_check_grace_period: None,
            force_new_deployment: true,
        }
    }
}

/// Result of a single stability poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityStatus {
    /// Running count matches desired count and only one deployment remains
    Stable,
    /// Rollout still in progress
    NotYet {
        running: i32,
        desired: i32,
        deployments: usize,
    },
}

impl StabilityStatus {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityStatus::Stable)
    }
}

impl std::fmt::Display for StabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StabilityStatus::Stable => write!(f, "stable"),
            StabilityStatus::NotYet {
                running,
                desired,
                deployments,
            } => write!(
                f,
                "{}/{} running, {} deployment(s) in flight",
                running, desired, deployments
            ),
        }
    }
}
