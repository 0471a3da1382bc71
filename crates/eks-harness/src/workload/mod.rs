//! Kubernetes workload provider
//!
//! Talks to a provisioned cluster through kube-rs: counts Ready nodes and
//! manages the probe pod. One client is built per cluster from the apply
//! outputs and cached for the later status and delete calls.

pub mod kubeconfig;
pub mod probe;

use crate::aws::AwsContext;
use crate::config::ProbeConfig;
use crate::provider::{ProbeId, ProbePhase, ProviderError, ProvisionedCluster, WorkloadProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Number of nodes whose `Ready` condition is `True`
pub fn count_ready_nodes(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .filter(|node| {
            node.status
                .as_ref()
                .and_then(|s| s.conditions.as_ref())
                .is_some_and(|conditions| {
                    conditions
                        .iter()
                        .any(|c| c.type_ == "Ready" && c.status == "True")
                })
        })
        .count()
}

/// Workload provider backed by the Kubernetes API of each cluster
pub struct KubeWorkloadProvider {
    region: String,
    profile: Option<String>,
    probe: ProbeConfig,
    clients: Mutex<HashMap<String, Client>>,
}

impl KubeWorkloadProvider {
    pub fn new(aws: &AwsContext, probe: ProbeConfig) -> Self {
        Self {
            region: aws.region().to_string(),
            profile: aws.profile().map(str::to_string),
            probe,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn cached_client(&self, cluster: &str) -> Option<Client> {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cluster)
            .cloned()
    }

    /// Client for `cluster`, built on first use
    async fn client_for(&self, cluster: &ProvisionedCluster) -> Result<Client> {
        if let Some(client) = self.cached_client(&cluster.name) {
            return Ok(client);
        }

        let kubeconfig = kubeconfig::kubeconfig(
            &cluster.name,
            &cluster.endpoint,
            &cluster.certificate_authority_data,
            &self.region,
            self.profile.as_deref(),
        )?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("Failed to load kubeconfig for {}", cluster.name))?;
        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create kube client for {}", cluster.name))?;

        debug!(cluster = %cluster.name, "Created kube client");
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cluster.name.clone(), client.clone());
        Ok(client)
    }

    /// Client for the cluster a probe runs on. A cluster this provider never
    /// connected to cannot have a probe, so that is reported as not found.
    fn client_for_probe(&self, probe: &ProbeId) -> Result<Client> {
        self.cached_client(&probe.cluster)
            .ok_or_else(|| ProviderError::not_found("pod", probe.to_string()).into())
    }
}

#[async_trait]
impl WorkloadProvider for KubeWorkloadProvider {
    async fn ready_node_count(&self, cluster: &ProvisionedCluster) -> Result<usize> {
        let nodes: Api<Node> = Api::all(self.client_for(cluster).await?);
        let list = nodes
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;

        let ready = count_ready_nodes(&list.items);
        debug!(cluster = %cluster.name, total = list.items.len(), ready, "Listed nodes");
        Ok(ready)
    }

    fn probe_id(&self, cluster: &ProvisionedCluster) -> ProbeId {
        ProbeId {
            cluster: cluster.name.clone(),
            namespace: self.probe.namespace.clone(),
            name: probe::probe_name(&self.probe.name_prefix),
        }
    }

    async fn create_probe(&self, cluster: &ProvisionedCluster, probe: &ProbeId) -> Result<()> {
        let client = self.client_for(cluster).await?;
        let pod = probe::probe_pod(&probe.name, &self.probe);

        let pods: Api<Pod> = Api::namespaced(client, &probe.namespace);
        pods.create(&PostParams::default(), &pod)
            .await
            .with_context(|| format!("Failed to create probe pod {probe}"))?;
        info!(cluster = %cluster.name, pod = %probe.name, "Created probe pod");
        Ok(())
    }

    async fn get_probe_status(&self, probe: &ProbeId) -> Result<ProbePhase> {
        let pods: Api<Pod> = Api::namespaced(self.client_for_probe(probe)?, &probe.namespace);
        let pod = pods
            .get(&probe.name)
            .await
            .with_context(|| format!("Failed to get probe pod {probe}"))?;

        Ok(pod
            .status
            .and_then(|s| s.phase)
            .map_or(ProbePhase::Unknown, |phase| ProbePhase::parse(&phase)))
    }

    async fn delete_probe(&self, probe: &ProbeId) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client_for_probe(probe)?, &probe.namespace);
        pods.delete(&probe.name, &DeleteParams::default())
            .await
            .with_context(|| format!("Failed to delete probe pod {probe}"))?;
        Ok(())
    }
}
