//! EKS cluster lookups

use crate::aws::context::AwsContext;
use crate::provider::ClusterStatus;
use anyhow::{Context, Result};
use aws_sdk_eks::Client;
use tracing::debug;

/// What `DescribeCluster` reports about a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EksClusterInfo {
    pub name: String,
    pub status: ClusterStatus,
    pub endpoint: Option<String>,
    pub certificate_authority_data: Option<String>,
    pub version: Option<String>,
}

/// EKS client for cluster status checks
#[derive(Clone)]
pub struct EksClient {
    client: Client,
}

impl EksClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.eks_client(),
        }
    }

    /// Describe a cluster. A missing cluster surfaces as
    /// `ResourceNotFoundException` in the error chain.
    pub async fn describe_cluster(&self, name: &str) -> Result<EksClusterInfo> {
        let resp = self
            .client
            .describe_cluster()
            .name(name)
            .send()
            .await
            .with_context(|| format!("DescribeCluster failed for {name}"))?;

        let cluster = resp
            .cluster()
            .with_context(|| format!("DescribeCluster returned no cluster for {name}"))?;

        let status = cluster
            .status()
            .map(|s| ClusterStatus::parse(s.as_str()))
            .unwrap_or_else(|| ClusterStatus::Unknown(String::new()));
        debug!(cluster = %name, status = %status, "Described cluster");

        Ok(EksClusterInfo {
            name: cluster.name().unwrap_or(name).to_string(),
            status,
            endpoint: cluster.endpoint().map(str::to_string),
            certificate_authority_data: cluster
                .certificate_authority()
                .and_then(|ca| ca.data())
                .map(str::to_string),
            version: cluster.version().map(str::to_string),
        })
    }

    /// Current status of a cluster
    pub async fn cluster_status(&self, name: &str) -> Result<ClusterStatus> {
        Ok(self.describe_cluster(name).await?.status)
    }
}
