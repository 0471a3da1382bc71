//! Kubeconfig for a freshly provisioned EKS cluster
//!
//! Authentication goes through `aws eks get-token`, the same exec plugin
//! `aws eks update-kubeconfig` writes, so no static token is stored.

use anyhow::{Context, Result};
use kube::config::Kubeconfig;
use serde_json::json;

const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// Kubeconfig document for `cluster`, as JSON
pub fn kubeconfig_value(
    cluster: &str,
    endpoint: &str,
    certificate_authority_data: &str,
    region: &str,
    profile: Option<&str>,
) -> serde_json::Value {
    let env: Vec<serde_json::Value> = profile
        .map(|p| json!({"name": "AWS_PROFILE", "value": p}))
        .into_iter()
        .collect();

    json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": cluster,
            "cluster": {
                "server": endpoint,
                "certificate-authority-data": certificate_authority_data,
            },
        }],
        "contexts": [{
            "name": cluster,
            "context": {"cluster": cluster, "user": cluster},
        }],
        "current-context": cluster,
        "users": [{
            "name": cluster,
            "user": {
                "exec": {
                    "apiVersion": EXEC_API_VERSION,
                    "command": "aws",
                    "args": ["eks", "get-token", "--cluster-name", cluster, "--region", region],
                    "env": env,
                },
            },
        }],
    })
}

/// Parsed kubeconfig for `cluster`
pub fn kubeconfig(
    cluster: &str,
    endpoint: &str,
    certificate_authority_data: &str,
    region: &str,
    profile: Option<&str>,
) -> Result<Kubeconfig> {
    let value = kubeconfig_value(cluster, endpoint, certificate_authority_data, region, profile);
    serde_json::from_value(value)
        .with_context(|| format!("Failed to build kubeconfig for cluster {cluster}"))
}
