//! Provider error classification
//!
//! Providers return `anyhow::Error`; cleanup needs to know whether a failure
//! means "already gone" or something else. Classification walks the error
//! chain for typed errors (our own, AWS SDK error codes, Kubernetes API
//! statuses) and only falls back to the message text when none is present.

use thiserror::Error;

/// Provider error categories for cleanup logic
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource was not found (safe to skip in cleanup)
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    /// A provider command or API call failed
    ///
    /// Never reclassified from its message: a failed `terraform destroy`
    /// quoting an AWS `*.NotFound` code for some sub-resource is still a
    /// failed destroy.
    #[error("{message}")]
    Other {
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    /// Create a not-found error for a resource
    pub fn not_found(resource_type: &'static str, resource_id: impl Into<String>) -> Self {
        ProviderError::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

/// Error codes meaning the top-level resource does not exist
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException"];

/// Classify a provider error by its code.
pub fn classify_error_code(code: Option<&str>, message: Option<&str>) -> ProviderError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ProviderError::NotFound {
            resource_type: "resource",
            resource_id: message,
        },
        _ => ProviderError::Other {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an `anyhow::Error` by walking its cause chain.
pub fn classify_anyhow_error(error: &anyhow::Error) -> ProviderError {
    use aws_sdk_eks::error::ProvideErrorMetadata;

    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<ProviderError>() {
            return match e {
                ProviderError::NotFound {
                    resource_type,
                    resource_id,
                } => ProviderError::NotFound {
                    resource_type,
                    resource_id: resource_id.clone(),
                },
                ProviderError::Other { code, message } => ProviderError::Other {
                    code: code.clone(),
                    message: message.clone(),
                },
            };
        }
        if let Some(e) = cause.downcast_ref::<aws_sdk_eks::error::SdkError<
            aws_sdk_eks::operation::describe_cluster::DescribeClusterError,
        >>() {
            let meta = ProvideErrorMetadata::meta(e);
            return classify_error_code(meta.code(), meta.message());
        }
        if let Some(kube::Error::Api(response)) = cause.downcast_ref::<kube::Error>() {
            return match response.code {
                404 => ProviderError::NotFound {
                    resource_type: "kubernetes object",
                    resource_id: response.message.clone(),
                },
                _ => ProviderError::Other {
                    code: Some(response.reason.clone()),
                    message: response.message.clone(),
                },
            };
        }
    }

    // Fallback for untyped errors: a known code at the head of the chain
    let message = error.to_string();
    if let Some(code) = NOT_FOUND_CODES.iter().find(|c| message.starts_with(*c)) {
        return classify_error_code(Some(code), Some(&message));
    }

    ProviderError::Other {
        code: None,
        message,
    }
}

/// Check whether an error means the resource is already gone.
pub fn is_not_found(error: &anyhow::Error) -> bool {
    classify_anyhow_error(error).is_not_found()
}
