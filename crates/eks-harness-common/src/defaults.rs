//! Default configuration values shared across eks-harness crates
//!
//! Poll defaults mirror the CI pipeline the harness replaced: 20 attempts
//! spaced 30 seconds apart, i.e. a 10 minute ceiling per phase.

/// Longest cluster name EKS accepts
pub const MAX_CLUSTER_NAME_LEN: usize = 100;

/// Default minimum subnet count (two AZs for high availability)
pub const DEFAULT_MIN_SUBNETS: usize = 2;

/// Default delay between poll attempts, in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default number of poll attempts per phase
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default wall-clock limit for a whole run, in seconds (30 minutes)
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 1800;

/// Time an interrupted terraform gets to persist state before it is killed
pub const DEFAULT_INTERRUPT_GRACE_SECS: u64 = 300;

/// Default Kubernetes version for new clusters
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.29";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-west-1";

/// Default environment tag value for harness-created clusters
pub const DEFAULT_ENVIRONMENT: &str = "terratest";

/// Default prefix for generated cluster and probe names
pub const DEFAULT_NAME_PREFIX: &str = "terratest";

/// Default namespace for the probe workload
pub const DEFAULT_PROBE_NAMESPACE: &str = "default";

/// Suffix every EKS API endpoint carries
pub const EKS_ENDPOINT_SUFFIX: &str = ".eks.amazonaws.com";

// Serde default functions for struct field defaults

/// Returns the default Kubernetes version
pub fn default_kubernetes_version() -> String {
    DEFAULT_KUBERNETES_VERSION.to_string()
}
