//! Configuration validation errors
//!
//! One variant per violated constraint, carrying the offending value so
//! callers can match on the kind instead of parsing messages.

use thiserror::Error;

/// A constraint on the cluster configuration that did not hold
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Cluster name is the empty string
    #[error("cluster name cannot be empty")]
    EmptyName,

    /// Cluster name is longer than the EKS limit
    #[error("cluster name cannot exceed {max} characters, got {0}", max = crate::defaults::MAX_CLUSTER_NAME_LEN)]
    NameTooLong(usize),

    /// Cluster name has characters outside `[A-Za-z0-9-]` or starts with a hyphen
    #[error(
        "cluster name must contain only alphanumeric characters and hyphens, \
         and must start with a letter or number, got: {0}"
    )]
    InvalidNameFormat(String),

    /// Kubernetes version is the empty string
    #[error("kubernetes version cannot be empty")]
    EmptyVersion,

    /// Kubernetes version is not of the form `1.XX`
    #[error("kubernetes version must be in format 1.XX (e.g., 1.29), got: {0}")]
    InvalidVersionFormat(String),

    /// Fewer subnets than the caller requires
    #[error("at least {need} subnets required for high availability, got {have}")]
    InsufficientSubnets { have: usize, need: usize },

    /// A subnet ID is empty or whitespace-only
    #[error("subnet at index {index} is empty")]
    EmptySubnet { index: usize },

    /// Tag map is absent altogether (an empty map is fine)
    #[error("tags map cannot be nil")]
    NilTagMap,

    /// A required tag key is missing
    #[error("required tag '{0}' is missing")]
    MissingRequiredTag(String),

    /// No instance types given
    #[error("at least one instance type must be specified")]
    NoInstanceTypes,

    /// Instance type is not of the form `family.size`
    #[error("invalid instance type format: {0}")]
    InvalidInstanceType(String),

    /// Node group minimum is negative
    #[error("min size cannot be negative, got {0}")]
    NegativeMinSize(i32),

    /// Node group maximum is below its minimum
    #[error("max size ({max}) cannot be less than min size ({min})")]
    MaxLessThanMin { min: i32, max: i32 },

    /// Desired node count is below the minimum
    #[error("desired size ({desired}) cannot be less than min size ({min})")]
    DesiredBelowMin { desired: i32, min: i32 },

    /// Desired node count is above the maximum
    #[error("desired size ({desired}) cannot exceed max size ({max})")]
    DesiredAboveMax { desired: i32, max: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ValidationError::EmptyName.to_string(),
            "cluster name cannot be empty"
        );
        assert_eq!(
            ValidationError::NameTooLong(101).to_string(),
            "cluster name cannot exceed 100 characters, got 101"
        );
        assert_eq!(
            ValidationError::InsufficientSubnets { have: 1, need: 2 }.to_string(),
            "at least 2 subnets required for high availability, got 1"
        );
        assert_eq!(
            ValidationError::MissingRequiredTag("Owner".to_string()).to_string(),
            "required tag 'Owner' is missing"
        );
        assert_eq!(
            ValidationError::DesiredAboveMax { desired: 5, max: 3 }.to_string(),
            "desired size (5) cannot exceed max size (3)"
        );
    }
}
