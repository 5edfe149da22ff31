//! Deployment request and result types
//!
//! Both serialize with PascalCase keys, which is the event shape the Lambda
//! entry point accepts and returns.

use crate::error::{DeployError, Result};
use crate::model::ServiceRecord;
use serde::{Deserialize, Serialize};

/// Default number of stability polls (15s apart, roughly ten minutes)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 40;

/// Desired state of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeploymentRequest {
    /// Service name as it exists in ECS
    pub application: String,

    /// Image tag to roll out
    pub version: String,

    /// Cluster name
    pub environment: String,

    /// Context recorded alongside the desired version
    pub description: Option<String>,

    /// IAM role to assume before touching any AWS resource
    pub role: Option<String>,

    /// Stability polls before giving up
    pub max_attempts: u32,

    /// Rebuild the application container's secrets from the parameter store
    pub refresh_secrets: bool,

    /// Parameter path to read secrets from; defaults to `/<environment>/<application>`
    pub secrets_prefix: Option<String>,

    /// Show the change without applying it
    pub dry_run: bool,

    /// Force a new rollout of the current task definition without a version bump
    pub restart: bool,

    /// Wait for the service to reach a steady state after the update
    pub wait: bool,

    /// Set the application container's memory reservation from recorded usage
    pub auto_size_memory: bool,
}

impl Default for DeploymentRequest {
    fn default() -> Self {
        Self {
            application: String::new(),
            version: String::new(),
            environment: String::new(),
            description: None,
            role: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            refresh_secrets: false,
            secrets_prefix: None,
            dry_run: false,
            restart: false,
            wait: false,
            auto_size_memory: false,
        }
    }
}

impl DeploymentRequest {
    pub fn new(
        application: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
            environment: environment.into(),
            ..Default::default()
        }
    }

    /// Redeploy request for the task definition a service already runs
    pub fn restart(application: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            environment: environment.into(),
            restart: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.application.trim().is_empty() {
            missing.push("Application");
        }
        if !self.restart && self.version.trim().is_empty() {
            missing.push("Version");
        }
        if self.environment.trim().is_empty() {
            missing.push("Environment");
        }
        if !missing.is_empty() {
            return Err(DeployError::InvalidRequest(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        if self.wait && !self.dry_run && self.max_attempts == 0 {
            return Err(DeployError::InvalidRequest(
                "MaxAttempts must be at least 1 when waiting for stability".to_string(),
            ));
        }

        Ok(())
    }

    /// Parameter store path holding the desired version
    pub fn version_parameter_path(&self) -> String {
        format!("/{}/{}/VERSION", self.environment, self.application)
    }

    /// Path secrets are read from. An explicit prefix replaces the default
    /// outright; the two are never combined.
    pub fn effective_secrets_prefix(&self) -> String {
        match self.secrets_prefix.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => format!("/{}/{}", self.environment, self.application),
        }
    }
}

/// Outcome handed back to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentResult {
    /// Whether a rollout was actually started
    pub successfully_invoked: bool,

    /// Set when nothing was applied because the request was a dry run
    pub dry_run: bool,

    pub cluster_arn: String,
    pub service_arn: String,
    pub service_name: String,

    /// Task definition bound to the service after this invocation
    pub task_definition: String,
}

impl DeploymentResult {
    pub fn invoked(service: &ServiceRecord) -> Self {
        Self {
            successfully_invoked: true,
            dry_run: false,
            cluster_arn: service.cluster_ref.clone(),
            service_arn: service.service_ref.clone(),
            service_name: service.service_name.clone(),
            task_definition: service.template_ref.clone(),
        }
    }

    pub fn not_invoked(service: &ServiceRecord) -> Self {
        Self {
            successfully_invoked: false,
            dry_run: true,
            ..Self::invoked(service)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_fields() {
        let err = DeploymentRequest::new("", "1.0", "prod").validate().unwrap_err();
        assert!(matches!(err, DeployError::InvalidRequest(_)));

        let err = DeploymentRequest::new("web", " ", "").validate().unwrap_err();
        match err {
            DeployError::InvalidRequest(msg) => {
                assert!(msg.contains("Version"));
                assert!(msg.contains("Environment"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(DeploymentRequest::new("web", "1.0", "prod").validate().is_ok());
    }

    #[test]
    fn test_restart_does_not_need_version() {
        assert!(DeploymentRequest::restart("web", "prod").validate().is_ok());
        assert!(DeploymentRequest::restart("web", "").validate().is_err());
    }

    #[test]
    fn test_waiting_needs_attempts() {
        let mut request = DeploymentRequest::new("web", "1.0", "prod");
        request.wait = true;
        request.max_attempts = 0;
        assert!(request.validate().is_err());

        request.wait = false;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_secrets_prefix_override_replaces_default() {
        let mut request = DeploymentRequest::new("web", "1.0", "prod");
        assert_eq!(request.effective_secrets_prefix(), "/prod/web");

        request.secrets_prefix = Some("/shared/web-secrets".to_string());
        assert_eq!(request.effective_secrets_prefix(), "/shared/web-secrets");

        request.secrets_prefix = Some("  ".to_string());
        assert_eq!(request.effective_secrets_prefix(), "/prod/web");
    }

    #[test]
    fn test_request_from_lambda_event() {
        let request: DeploymentRequest = serde_json::from_str(
            r#"{"Application":"web","Version":"2.0","Environment":"prod","RefreshSecrets":true}"#,
        )
        .unwrap();

        assert_eq!(request.application, "web");
        assert!(request.refresh_secrets);
        assert_eq!(request.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(!request.dry_run);
        assert_eq!(request.version_parameter_path(), "/prod/web/VERSION");
    }

    #[test]
    fn test_result_keys() {
        let result = DeploymentResult {
            successfully_invoked: true,
            task_definition: "web:8".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["SuccessfullyInvoked"], true);
        assert_eq!(json["TaskDefinition"], "web:8");
        assert_eq!(json["DryRun"], false);
    }
}
