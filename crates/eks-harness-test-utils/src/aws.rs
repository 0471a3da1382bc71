//! AWS test utilities
//!
//! Provides region detection and unique names for AWS integration tests.

use eks_harness_common::defaults::{DEFAULT_NAME_PREFIX, DEFAULT_REGION};
use eks_harness_common::unique_cluster_name;
use std::path::PathBuf;
use uuid::Uuid;

/// Environment variable pointing at the Terraform module for e2e tests
pub const TERRAFORM_DIR_ENV: &str = "EKS_HARNESS_TERRAFORM_DIR";

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-west-1
///
/// # Example
///
/// ```
/// use eks_harness_test_utils::aws::get_test_region;
///
/// let region = get_test_region();
/// assert!(!region.is_empty());
/// ```
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| DEFAULT_REGION.to_string())
}

/// Generate a unique run ID for test resources.
///
/// A UUIDv7, so ids sort by creation time and never collide between
/// concurrently started test processes.
pub fn test_run_id() -> String {
    Uuid::now_v7().to_string()
}

/// Generate a unique cluster name for a test.
///
/// # Example
///
/// ```
/// use eks_harness_test_utils::aws::test_cluster_name;
///
/// let name = test_cluster_name();
/// assert!(name.starts_with("terratest-"));
/// ```
pub fn test_cluster_name() -> String {
    unique_cluster_name(DEFAULT_NAME_PREFIX)
}

/// Terraform module directory for e2e tests, if configured
pub fn test_terraform_dir() -> Option<PathBuf> {
    std::env::var_os(TERRAFORM_DIR_ENV).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eks_harness_common::validate_name;

    #[test]
    fn test_get_test_region_default() {
        let original_region = std::env::var("AWS_REGION").ok();
        let original_default = std::env::var("AWS_DEFAULT_REGION").ok();

        // SAFETY: only this test touches these variables
        unsafe {
            std::env::remove_var("AWS_REGION");
            std::env::remove_var("AWS_DEFAULT_REGION");
        }

        let region = get_test_region();
        assert_eq!(region, "us-west-1");

        unsafe {
            if let Some(r) = original_region {
                std::env::set_var("AWS_REGION", r);
            }
            if let Some(r) = original_default {
                std::env::set_var("AWS_DEFAULT_REGION", r);
            }
        }
    }

    #[test]
    fn test_run_id_format() {
        let run_id = test_run_id();
        let parsed = Uuid::parse_str(&run_id).expect("Should be a valid UUID");
        assert_eq!(parsed.get_version_num(), 7);
        assert_ne!(test_run_id(), run_id);
    }

    #[test]
    fn test_cluster_names_unique_and_valid() {
        let a = test_cluster_name();
        let b = test_cluster_name();
        assert_ne!(a, b);
        assert_eq!(validate_name(&a), Ok(()));
    }
}
