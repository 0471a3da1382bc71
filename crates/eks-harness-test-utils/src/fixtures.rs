//! Known-good cluster configurations

use eks_harness_common::{ClusterConfig, NodeGroupSize};
use std::collections::HashMap;

/// A configuration that passes every check under the default policy
pub fn valid_cluster_config(name: &str) -> ClusterConfig {
    ClusterConfig {
        name: name.to_string(),
        version: "1.29".to_string(),
        subnets: vec!["subnet-0a1b2c3d".to_string(), "subnet-4e5f6a7b".to_string()],
        tags: Some(HashMap::from([(
            "Environment".to_string(),
            "terratest".to_string(),
        )])),
        instance_types: vec!["t3.medium".to_string()],
        node_group: NodeGroupSize::new(1, 3, 2),
    }
}
