//! Deployment error types

use crate::state::DeployState;
use thiserror::Error;

/// Errors surfaced by a deployment.
///
/// After `RegistrationFailed` the live service is untouched. After
/// `ServiceUpdateFailed` a registered but unused task definition remains.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unable to find service {application} in cluster {environment}")]
    ServiceNotFound {
        application: String,
        environment: String,
    },

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Task definition does not match the requested change: {0}")]
    AmbiguousTemplate(String),

    #[error("Secret lookup under {prefix} failed: {message}")]
    SecretLookupFailed { prefix: String, message: String },

    #[error("Failed to record desired version at {path}: {message}")]
    VersionRecordFailed { path: String, message: String },

    #[error("Memory reservation estimate failed: {0}")]
    EstimationFailed(String),

    #[error("Task definition registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Service update failed: {0}")]
    ServiceUpdateFailed(String),

    #[error("Service {service} did not reach a stable state after {attempts} attempts")]
    StabilityTimeout { service: String, attempts: u32 },

    #[error("Illegal deployment state transition: {from} -> {to}")]
    InvalidTransition { from: DeployState, to: DeployState },
}

impl DeployError {
    /// Process exit code used by the CLI for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::InvalidRequest(_) => 2,
            DeployError::StabilityTimeout { .. } => 3,
            _ => 1,
        }
    }
}

/// Errors returned by the collaborator traits in [`crate::provider`].
///
/// Adapters only say what happened at the transport level; the deployment
/// steps decide which [`DeployError`] that becomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, DeployError>;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
