//! Provider capabilities the harness drives
//!
//! The harness never talks to AWS or Kubernetes directly. It calls into a
//! [`ProvisioningProvider`] (create/describe/destroy a cluster) and a
//! [`WorkloadProvider`] (nodes and a probe pod on that cluster). Real
//! implementations live in [`crate::terraform`] and [`crate::workload`];
//! tests substitute mocks or scripted fakes.

pub mod error;

pub use error::{ProviderError, classify_anyhow_error, is_not_found};

use anyhow::Result;
use async_trait::async_trait;
use eks_harness_common::ClusterConfig;

/// EKS cluster status as reported by `DescribeCluster`
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ClusterStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Failed,
    Pending,
    /// Any status string this crate does not know about
    #[strum(default)]
    Unknown(String),
}

impl ClusterStatus {
    /// Parse a status string; unknown values are kept verbatim.
    pub fn parse(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|_| ClusterStatus::Unknown(s.to_string()))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ClusterStatus::Active)
    }
}

/// Kubernetes pod phase of the probe workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum ProbePhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl ProbePhase {
    /// Parse a pod phase; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or(ProbePhase::Unknown)
    }
}

/// A provisioned cluster as returned by [`ProvisioningProvider::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedCluster {
    /// Cluster name reported by the provider
    pub name: String,
    /// API server endpoint (https URL)
    pub endpoint: String,
    /// Base64-encoded cluster CA certificate
    pub certificate_authority_data: String,
    /// Kubernetes version reported by the provider
    pub version: String,
    /// Status at the time `apply` returned
    pub status: ClusterStatus,
}

/// Handle to a probe workload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeId {
    /// Cluster the probe runs on
    pub cluster: String,
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for ProbeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.cluster, self.namespace, self.name)
    }
}

/// Cluster lifecycle operations.
///
/// `destroy` on a cluster that no longer exists should either succeed or
/// fail with an error that [`is_not_found`] recognises.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProvisioningProvider: Send + Sync {
    /// Create (or converge) the cluster described by `config`
    async fn apply(&self, config: &ClusterConfig) -> Result<ProvisionedCluster>;

    /// Current status of the named cluster
    async fn describe(&self, name: &str) -> Result<ClusterStatus>;

    /// Destroy the named cluster and everything provisioned with it
    async fn destroy(&self, name: &str) -> Result<()>;
}

/// Workload operations against a provisioned cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkloadProvider: Send + Sync {
    /// Number of nodes reporting `Ready=True`
    async fn ready_node_count(&self, cluster: &ProvisionedCluster) -> Result<usize>;

    /// Choose the identity of the next probe without creating anything.
    ///
    /// The harness registers cleanup for this id before calling
    /// [`create_probe`](Self::create_probe), so the name must be unique.
    fn probe_id(&self, cluster: &ProvisionedCluster) -> ProbeId;

    /// Start the probe workload `probe` on the cluster
    async fn create_probe(&self, cluster: &ProvisionedCluster, probe: &ProbeId) -> Result<()>;

    /// Current phase of a probe
    async fn get_probe_status(&self, probe: &ProbeId) -> Result<ProbePhase>;

    /// Delete a probe
    async fn delete_probe(&self, probe: &ProbeId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_status_parse() {
        assert_eq!(ClusterStatus::parse("ACTIVE"), ClusterStatus::Active);
        assert_eq!(ClusterStatus::parse("active"), ClusterStatus::Active);
        assert_eq!(ClusterStatus::parse("CREATING"), ClusterStatus::Creating);
        assert_eq!(
            ClusterStatus::parse("REBOOTING"),
            ClusterStatus::Unknown("REBOOTING".to_string())
        );
        assert!(ClusterStatus::Active.is_active());
        assert!(!ClusterStatus::Creating.is_active());
        assert_eq!(ClusterStatus::Deleting.to_string(), "DELETING");
    }

    #[test]
    fn test_probe_phase_parse() {
        assert_eq!(ProbePhase::parse("Running"), ProbePhase::Running);
        assert_eq!(ProbePhase::parse("Pending"), ProbePhase::Pending);
        assert_eq!(ProbePhase::parse("Evicted"), ProbePhase::Unknown);
        assert_eq!(ProbePhase::Succeeded.to_string(), "Succeeded");
    }

    #[test]
    fn test_probe_id_display() {
        let probe = ProbeId {
            cluster: "c1".to_string(),
            namespace: "default".to_string(),
            name: "terratest-pod-abc".to_string(),
        };
        assert_eq!(probe.to_string(), "c1/default/terratest-pod-abc");
    }
}
