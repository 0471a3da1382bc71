//! Sanity checks on what `apply` reported back

use crate::provider::ProvisionedCluster;
use thiserror::Error;

/// A provisioned-cluster output that does not look right
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("cluster endpoint is empty")]
    EmptyEndpoint,

    #[error("cluster endpoint is not HTTPS: {0}")]
    EndpointNotHttps(String),

    #[error("cluster endpoint {endpoint} does not contain {suffix}")]
    UnexpectedEndpoint { endpoint: String, suffix: String },

    #[error("cluster CA data is empty")]
    EmptyCaData,

    #[error("cluster name mismatch: expected {expected}, got {actual}")]
    NameMismatch { expected: String, actual: String },

    #[error("cluster version should start with 1., got {0}")]
    UnexpectedVersion(String),
}

/// Check the outputs of a successful apply.
///
/// `endpoint_suffix` is matched anywhere in the endpoint; `None` skips it.
pub fn check_outputs(
    cluster: &ProvisionedCluster,
    expected_name: &str,
    endpoint_suffix: Option<&str>,
) -> Result<(), OutputError> {
    if cluster.endpoint.is_empty() {
        return Err(OutputError::EmptyEndpoint);
    }
    if !cluster.endpoint.starts_with("https://") {
        return Err(OutputError::EndpointNotHttps(cluster.endpoint.clone()));
    }
    if let Some(suffix) = endpoint_suffix
        && !cluster.endpoint.contains(suffix)
    {
        return Err(OutputError::UnexpectedEndpoint {
            endpoint: cluster.endpoint.clone(),
            suffix: suffix.to_string(),
        });
    }
    if cluster.certificate_authority_data.is_empty() {
        return Err(OutputError::EmptyCaData);
    }
    if cluster.name != expected_name {
        return Err(OutputError::NameMismatch {
            expected: expected_name.to_string(),
            actual: cluster.name.clone(),
        });
    }
    if !cluster.version.starts_with("1.") {
        return Err(OutputError::UnexpectedVersion(cluster.version.clone()));
    }
    Ok(())
}
