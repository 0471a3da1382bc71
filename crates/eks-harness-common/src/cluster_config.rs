//! The cluster configuration record handed to a provisioning provider
//!
//! Built from CLI flags or a JSON file right before a provisioning attempt,
//! validated once, and dropped when the attempt returns.

use crate::defaults::{DEFAULT_MIN_SUBNETS, default_kubernetes_version};
use crate::error::ValidationError;
use crate::validation::{
    validate_instance_types, validate_name, validate_node_group_size, validate_subnets,
    validate_tags, validate_version,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node group sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroupSize {
    pub min_size: i32,
    pub max_size: i32,
    pub desired_size: i32,
}

impl NodeGroupSize {
    pub fn new(min_size: i32, max_size: i32, desired_size: i32) -> Self {
        Self {
            min_size,
            max_size,
            desired_size,
        }
    }
}

/// Cluster configuration for one provisioning attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// EKS cluster name
    pub name: String,

    /// Kubernetes version (`1.XX`)
    #[serde(default = "default_kubernetes_version")]
    pub version: String,

    /// Subnet IDs for the control plane and node group
    #[serde(default)]
    pub subnets: Vec<String>,

    /// Resource tags; `None` means the map was never provided
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,

    /// EC2 instance types for the node group
    pub instance_types: Vec<String>,

    /// Node group sizing
    pub node_group: NodeGroupSize,
}

/// Caller-supplied parameters for the checks that need them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Minimum number of subnets
    pub min_subnets: usize,
    /// Tag keys that must be present
    pub required_tags: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_subnets: DEFAULT_MIN_SUBNETS,
            required_tags: Vec::new(),
        }
    }
}

impl ClusterConfig {
    /// Run every field check, failing on the first violation.
    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_version(&self.version)?;
        validate_subnets(&self.subnets, policy.min_subnets)?;
        validate_tags(self.tags.as_ref(), &policy.required_tags)?;
        validate_instance_types(&self.instance_types)?;
        validate_node_group_size(
            self.node_group.min_size,
            self.node_group.max_size,
            self.node_group.desired_size,
        )
    }
}
