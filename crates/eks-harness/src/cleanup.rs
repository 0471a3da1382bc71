//! Single-resource cleanup shared by explicit teardown and the drop executor
//!
//! A resource that is already gone counts as cleaned up, so running cleanup
//! twice is harmless.

use crate::provider::{ProvisioningProvider, WorkloadProvider, is_not_found};
use crate::resource_guard::ResourceId;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Result of a single resource cleanup operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CleanupResult {
    /// Resource was successfully deleted
    Deleted,
    /// Resource was already deleted (not found)
    AlreadyDeleted,
    /// Cleanup failed with error
    Failed,
}

/// A cleanup that failed for a reason other than "already gone"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to clean up {resource}: {message}")]
pub struct TeardownError {
    /// Human-readable resource description
    pub resource: String,
    /// Rendered provider error chain
    pub message: String,
}

/// Outcome of tearing down a run's resources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Every resource attempted, in the order attempted
    pub results: Vec<(ResourceId, CleanupResult)>,
    /// Failures, for reporting alongside the run outcome
    pub errors: Vec<TeardownError>,
}

impl TeardownReport {
    /// Record the outcome for one resource
    pub fn record(&mut self, resource: &ResourceId, outcome: Result<CleanupResult, TeardownError>) {
        match outcome {
            Ok(result) => self.results.push((resource.clone(), result)),
            Err(e) => {
                self.results.push((resource.clone(), CleanupResult::Failed));
                self.errors.push(e);
            }
        }
    }

    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Outcome recorded for a resource, if it was attempted
    pub fn result_for(&self, resource: &ResourceId) -> Option<CleanupResult> {
        self.results
            .iter()
            .find(|(r, _)| r == resource)
            .map(|(_, result)| *result)
    }
}

/// Delete one resource, treating "not found" as already deleted.
pub async fn delete_resource<P, W>(
    provisioner: &P,
    workload: &W,
    resource: &ResourceId,
) -> Result<CleanupResult, TeardownError>
where
    P: ProvisioningProvider + ?Sized,
    W: WorkloadProvider + ?Sized,
{
    let result = match resource {
        ResourceId::Probe(probe) => workload.delete_probe(probe).await,
        ResourceId::Cluster(name) => provisioner.destroy(name).await,
    };

    match result {
        Ok(()) => {
            info!(resource = %resource.description(), "Deleted");
            Ok(CleanupResult::Deleted)
        }
        Err(e) if is_not_found(&e) => {
            debug!(resource = %resource.description(), "Resource already deleted");
            Ok(CleanupResult::AlreadyDeleted)
        }
        Err(e) => {
            warn!(resource = %resource.description(), error = ?e, "Cleanup failed");
            Err(TeardownError {
                resource: resource.description(),
                message: format!("{e:#}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvisioningProvider, MockWorkloadProvider, ProbeId, ProviderError};
    use anyhow::Context;

    fn probe() -> ProbeId {
        ProbeId {
            cluster: "c1".to_string(),
            namespace: "default".to_string(),
            name: "terratest-pod-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deleted() {
        let mut provisioner = MockProvisioningProvider::new();
        provisioner
            .expect_destroy()
            .withf(|name| name == "c1")
            .times(1)
            .returning(|_| Ok(()));
        let workload = MockWorkloadProvider::new();

        let result =
            delete_resource(&provisioner, &workload, &ResourceId::Cluster("c1".into())).await;
        assert_eq!(result, Ok(CleanupResult::Deleted));
    }

    #[tokio::test]
    async fn test_not_found_is_already_deleted() {
        let provisioner = MockProvisioningProvider::new();
        let mut workload = MockWorkloadProvider::new();
        workload
            .expect_delete_probe()
            .times(1)
            .returning(|p| Err(ProviderError::not_found("pod", p.name.clone()).into()));

        let result = delete_resource(&provisioner, &workload, &ResourceId::Probe(probe())).await;
        assert_eq!(result, Ok(CleanupResult::AlreadyDeleted));
    }

    #[tokio::test]
    async fn test_other_errors_fail() {
        let mut provisioner = MockProvisioningProvider::new();
        provisioner
            .expect_destroy()
            .returning(|_| Err(anyhow::anyhow!("state lock held")));
        let workload = MockWorkloadProvider::new();

        let err = delete_resource(&provisioner, &workload, &ResourceId::Cluster("c1".into()))
            .await
            .unwrap_err();
        assert_eq!(err.resource, "cluster c1");
        assert!(err.message.contains("state lock held"));
    }

    #[tokio::test]
    async fn test_failed_destroy_mentioning_not_found_is_reported() {
        let mut provisioner = MockProvisioningProvider::new();
        provisioner.expect_destroy().times(1).returning(|_| {
            let failed: anyhow::Result<()> = Err(anyhow::anyhow!(
                "terraform destroy exited with code 1:\n\
                 Error: deleting EC2 VPC (vpc-0abc): DependencyViolation: \
                 has dependencies and cannot be deleted\n\
                 InvalidNetworkInterfaceID.NotFound: eni-0def does not exist"
            ));
            failed.context("terraform destroy failed")
        });
        let workload = MockWorkloadProvider::new();

        let err = delete_resource(&provisioner, &workload, &ResourceId::Cluster("c1".into()))
            .await
            .unwrap_err();
        assert!(err.message.contains("DependencyViolation"));
    }

    #[test]
    fn test_report_records_failures() {
        let mut report = TeardownReport::default();
        let cluster = ResourceId::Cluster("c1".into());
        report.record(
            &ResourceId::Probe(probe()),
            Ok(CleanupResult::AlreadyDeleted),
        );
        report.record(
            &cluster,
            Err(TeardownError {
                resource: "cluster c1".into(),
                message: "boom".into(),
            }),
        );

        assert!(!report.is_clean());
        assert_eq!(report.result_for(&cluster), Some(CleanupResult::Failed));
        assert_eq!(report.results.len(), 2);
    }
}
