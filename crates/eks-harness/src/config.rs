//! Configuration types for the harness

use crate::wait::PollConfig;
use anyhow::{Context, Result};
use eks_harness_common::defaults::{
    DEFAULT_INTERRUPT_GRACE_SECS, DEFAULT_NAME_PREFIX, DEFAULT_PROBE_NAMESPACE,
    DEFAULT_RUN_TIMEOUT_SECS, EKS_ENDPOINT_SUFFIX,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use eks_harness_common::{ClusterConfig, NodeGroupSize, ValidationPolicy, unique_cluster_name};

/// Everything the harness needs besides the providers
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Parameters for the subnet and tag checks
    pub validation: ValidationPolicy,
    /// Wait for the cluster to report ACTIVE
    pub cluster_poll: PollConfig,
    /// Wait for at least one Ready node
    pub node_poll: PollConfig,
    /// Wait for the probe pod to run
    pub probe_poll: PollConfig,
    /// Substring every endpoint must contain; `None` skips the check
    pub endpoint_suffix: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            validation: ValidationPolicy::default(),
            cluster_poll: PollConfig::default(),
            node_poll: PollConfig::default(),
            probe_poll: PollConfig::default(),
            endpoint_suffix: Some(EKS_ENDPOINT_SUFFIX.to_string()),
        }
    }
}

impl HarnessConfig {
    /// Use the same poll budget for every phase
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.cluster_poll = poll;
        self.node_poll = poll;
        self.probe_poll = poll;
        self
    }

    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_endpoint_suffix(mut self, suffix: Option<String>) -> Self {
        self.endpoint_suffix = suffix;
        self
    }

    /// Upper bound on time spent polling across all phases
    pub fn worst_case_wait(&self) -> Duration {
        self.cluster_poll.worst_case_wait()
            + self.node_poll.worst_case_wait()
            + self.probe_poll.worst_case_wait()
    }
}

/// AWS infrastructure configuration
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Terraform invocation settings
#[derive(Debug, Clone)]
pub struct TerraformConfig {
    /// Directory holding the root module
    pub module_dir: PathBuf,
    /// Terraform executable
    pub binary: String,
    /// Limit for a single terraform command
    pub command_timeout: Duration,
    /// Time an interrupted command gets to save state; also how long
    /// destroy waits for the state lock such a command still holds
    pub interrupt_grace: Duration,
}

impl TerraformConfig {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            binary: "terraform".to_string(),
            command_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            interrupt_grace: Duration::from_secs(DEFAULT_INTERRUPT_GRACE_SECS),
        }
    }
}

/// Probe workload settings
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Namespace the probe pod is created in
    pub namespace: String,
    /// Pod name prefix, also used as the `app` label
    pub name_prefix: String,
    /// Container image
    pub image: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_PROBE_NAMESPACE.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            image: "nginx:alpine".to_string(),
        }
    }
}

/// Configuration for one `run` invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cluster: ClusterConfig,
    pub aws: AwsConfig,
    pub terraform: TerraformConfig,
    pub probe: ProbeConfig,
    pub harness: HarnessConfig,
    /// Environment name passed to the module and tagged on resources
    pub environment: String,
    /// Wall-clock limit for the whole run, teardown excluded
    pub timeout: Duration,
}

/// Load a cluster configuration from a JSON file.
///
/// Only parsing happens here; validation is the harness's job so that an
/// absent `tags` map is still reported as such.
pub fn load_cluster_config(path: &Path) -> Result<ClusterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cluster configuration {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_cluster_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "name": "c1",
                "version": "1.29",
                "subnets": ["subnet-a", "subnet-b"],
                "instance_types": ["t3.medium"],
                "node_group": {{"min_size": 1, "max_size": 3, "desired_size": 2}}
            }}"#
        )
        .unwrap();

        let config = load_cluster_config(file.path()).unwrap();
        assert_eq!(config.name, "c1");
        assert_eq!(config.tags, None);
        assert_eq!(config.node_group, NodeGroupSize::new(1, 3, 2));
    }

    #[test]
    fn test_load_cluster_config_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "c1", "flavour": "spicy"}}"#).unwrap();

        let err = load_cluster_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_harness_config_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.cluster_poll.delay, Duration::from_secs(30));
        assert_eq!(config.node_poll.max_attempts, 20);
        assert_eq!(config.endpoint_suffix.as_deref(), Some(".eks.amazonaws.com"));
        assert_eq!(config.validation.min_subnets, 2);
    }

    #[test]
    fn test_with_poll() {
        let poll = PollConfig::new(Duration::from_millis(5), 3);
        let config = HarnessConfig::default().with_poll(poll);
        assert_eq!(config.cluster_poll, poll);
        assert_eq!(config.node_poll, poll);
        assert_eq!(config.probe_poll, poll);
        assert_eq!(config.worst_case_wait(), Duration::from_millis(30));
    }
}
