//! Shared SDK configuration
//!
//! Credentials are resolved once per invocation. When a role is given it is
//! assumed through STS here, and every client built from the returned
//! configuration uses the assumed credentials.

use crate::error::{AwsError, Result};
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};

const SESSION_NAME: &str = "ecs-deploy";

/// Load the default credential chain, optionally pinned to `region` and
/// wrapped in an assumed `role`.
pub async fn resolve_sdk_config(region: Option<&str>, role: Option<&str>) -> Result<SdkConfig> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    let base = loader.load().await;

    let Some(region) = base.region().cloned() else {
        return Err(AwsError::MissingRegion);
    };

    let Some(role) = role.map(str::trim).filter(|r| !r.is_empty()) else {
        tracing::debug!(%region, "using default credential chain");
        return Ok(base);
    };

    if !role.starts_with("arn:") {
        return Err(AwsError::AssumeRoleFailed {
            role: role.to_string(),
            message: "role must be an IAM role ARN".to_string(),
        });
    }

    let provider = AssumeRoleProvider::builder(role)
        .session_name(SESSION_NAME)
        .configure(&base)
        .build()
        .await;

    tracing::debug!(%region, %role, "assuming role");
    Ok(aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .credentials_provider(provider)
        .load()
        .await)
}
