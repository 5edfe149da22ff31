//! AWS adapter error types

use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use ecs_deploy_core::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("No AWS region configured. Pass --region or set AWS_REGION")]
    MissingRegion,

    #[error("Failed to assume role {role}: {message}")]
    AssumeRoleFailed { role: String, message: String },
}

pub type Result<T> = std::result::Result<T, AwsError>;

/// Error codes that mean the addressed resource does not exist
const NOT_FOUND_CODES: &[&str] = &[
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "ServiceNotActiveException",
    "ParameterNotFound",
    "ResourceNotFoundException",
];

/// Error codes that mean the request itself was refused
const REJECTED_CODES: &[&str] = &[
    "ClientException",
    "InvalidParameterException",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "ValidationException",
    "ValidationError",
    "InvalidParameterValue",
    "ParameterLimitExceeded",
    "TooManyUpdates",
];

/// Map an AWS error code onto the collaborator error taxonomy
pub(crate) fn classify_code(code: Option<&str>, message: String) -> ProviderError {
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => ProviderError::NotFound(message),
        Some(code) if REJECTED_CODES.contains(&code) => ProviderError::Rejected(message),
        // throttling, 5xx, timeouts and dispatch failures
        _ => ProviderError::Unavailable(message),
    }
}

/// Convert an SDK error from `operation` into a [`ProviderError`].
pub(crate) fn from_sdk<E, R>(operation: &str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    let message = format!("{}: {}", operation, DisplayErrorContext(&err));
    tracing::debug!(%operation, code = ?code, "AWS call failed");
    classify_code(code.as_deref(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_code() {
        assert!(matches!(
            classify_code(Some("ClusterNotFoundException"), "x".into()),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            classify_code(Some("ClientException"), "x".into()),
            ProviderError::Rejected(_)
        ));
        assert!(matches!(
            classify_code(Some("ThrottlingException"), "x".into()),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            classify_code(None, "timeout".into()),
            ProviderError::Unavailable(_)
        ));
    }
}
