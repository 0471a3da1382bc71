//! eks-harness-common - Cluster configuration record and validators
//!
//! This crate holds the checks every cluster configuration must pass before
//! any infrastructure is touched. It has no AWS or Kubernetes dependencies so
//! it can be used by anything that builds a configuration.
//!
//! ## Modules
//!
//! - [`cluster_config`]: The configuration record and its composed validation
//! - [`defaults`]: Default configuration values
//! - [`error`]: Structured validation errors
//! - [`names`]: Collision-free generated names
//! - [`tags`]: Tag constants and tag-set merging
//! - [`validation`]: Independent per-field checks

pub mod cluster_config;
pub mod defaults;
pub mod error;
pub mod names;
pub mod tags;
pub mod validation;

// Re-export commonly used types
pub use cluster_config::{ClusterConfig, NodeGroupSize, ValidationPolicy};
pub use error::ValidationError;
pub use names::unique_cluster_name;
pub use tags::merge_tags;
pub use validation::{
    validate_instance_types, validate_name, validate_node_group_size, validate_subnets,
    validate_tags, validate_version,
};
