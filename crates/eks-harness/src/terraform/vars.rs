//! Terraform variable files for per-cluster workspaces

use anyhow::{Context, Result};
use eks_harness_common::ClusterConfig;
use eks_harness_common::defaults::DEFAULT_KUBERNETES_VERSION;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Input variables of the EKS module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerraformVars {
    pub cluster_name: String,
    pub cluster_version: String,
    pub aws_region: String,
    pub environment: String,
    /// Omitted when empty so the module creates its own VPC
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub node_instance_types: Vec<String>,
    pub node_min_size: i32,
    pub node_max_size: i32,
    pub node_desired_size: i32,
}

impl TerraformVars {
    pub fn from_cluster(config: &ClusterConfig, region: &str, environment: &str) -> Self {
        Self {
            cluster_name: config.name.clone(),
            cluster_version: config.version.clone(),
            aws_region: region.to_string(),
            environment: environment.to_string(),
            subnet_ids: config.subnets.clone(),
            tags: config
                .tags
                .iter()
                .flatten()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            node_instance_types: config.instance_types.clone(),
            node_min_size: config.node_group.min_size,
            node_max_size: config.node_group.max_size,
            node_desired_size: config.node_group.desired_size,
        }
    }

    /// Minimal variables for destroying a cluster whose var file is gone
    pub fn for_destroy(name: &str, region: &str, environment: &str) -> Self {
        Self {
            cluster_name: name.to_string(),
            cluster_version: DEFAULT_KUBERNETES_VERSION.to_string(),
            aws_region: region.to_string(),
            environment: environment.to_string(),
            subnet_ids: Vec::new(),
            tags: BTreeMap::new(),
            node_instance_types: vec!["t3.medium".to_string()],
            node_min_size: 1,
            node_max_size: 3,
            node_desired_size: 2,
        }
    }

    /// Atomically write the variables as a `.tfvars.json` file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .with_context(|| format!("{} has no parent directory", path.display()))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut file, self).context("Failed to serialize variables")?;
        file.flush()?;
        file.persist(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eks_harness_common::NodeGroupSize;
    use std::collections::HashMap;

    fn config() -> ClusterConfig {
        ClusterConfig {
            name: "terratest-abc".to_string(),
            version: "1.29".to_string(),
            subnets: Vec::new(),
            tags: Some(HashMap::from([("Team".to_string(), "platform".to_string())])),
            instance_types: vec!["t3.medium".to_string()],
            node_group: NodeGroupSize::new(1, 3, 2),
        }
    }

    #[test]
    fn test_var_file_json() {
        let vars = TerraformVars::from_cluster(&config(), "us-west-1", "terratest");
        let json = serde_json::to_value(&vars).unwrap();

        assert_eq!(json["cluster_name"], "terratest-abc");
        assert_eq!(json["aws_region"], "us-west-1");
        assert_eq!(json["environment"], "terratest");
        assert_eq!(json["node_instance_types"][0], "t3.medium");
        assert_eq!(json["node_desired_size"], 2);
        assert_eq!(json["tags"]["Team"], "platform");
        // Module creates its own VPC when no subnets are given
        assert!(json.get("subnet_ids").is_none());
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars").join("c1.tfvars.json");
        let vars = TerraformVars::for_destroy("c1", "us-west-1", "terratest");

        vars.write_to(&path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["cluster_name"], "c1");
    }
}
