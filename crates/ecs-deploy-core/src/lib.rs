//! ecs-deploy core
//!
//! Provider-neutral deployment engine: pins a desired image version,
//! derives a new task definition revision from the one a service runs,
//! reports the difference and rolls the service onto it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │        ecs-deploy CLI  /  Lambda handler         │
//! └─────────────────┬───────────────────────────────┘
//!                   │ DeploymentRequest
//! ┌─────────────────▼───────────────────────────────┐
//! │                ecs-deploy-core                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Deployer (state machine + observer)     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────┐ ┌────────┐ ┌──────┐ ┌──────────┐    │
//! │  │ fetch  │ │ mutate │ │ diff │ │ publish  │    │
//! │  └────────┘ └────────┘ └──────┘ └──────────┘    │
//! │  ┌──────────┐ ┌──────────────┐                  │
//! │  │  waiter  │ │ reservation  │                  │
//! │  └──────────┘ └──────────────┘                  │
//! └───────┬─────────────────┬──────────────┬────────┘
//!         │                 │              │
//! ┌───────▼───────┐ ┌───────▼──────┐ ┌─────▼────────┐
//! │ServiceRegistry│ │ParameterStore│ │ MetricsStore │
//! │     (ECS)     │ │    (SSM)     │ │ (CloudWatch) │
//! └───────────────┘ └──────────────┘ └──────────────┘
//! ```

pub mod deployer;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod model;
pub mod mutate;
pub mod provider;
pub mod publish;
pub mod request;
pub mod reservation;
pub mod state;
pub mod waiter;

// Re-exports
pub use deployer::{DEFAULT_DESCRIPTION, DeployObserver, Deployer, TracingObserver};
pub use diff::{Change, ChangeKind, ChangeRecord, DiffSummary, diff_templates};
pub use error::{DeployError, ProviderError, ProviderResult, Result};
pub use model::{
    CircuitBreaker, ContainerSpec, DeploymentConfiguration, NetworkConfiguration,
    SecretReference, ServiceRecord, ServiceUpdate, StabilityStatus, TaskTemplate,
};
pub use provider::{
    MetricPoint, MetricQuery, MetricsStore, Parameter, ParameterPage, ParameterStore,
    ServiceRegistry,
};
pub use request::{DEFAULT_MAX_ATTEMPTS, DeploymentRequest, DeploymentResult};
pub use state::DeployState;
pub use waiter::WaitConfig;
