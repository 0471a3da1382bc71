//! Scripted in-memory providers for harness integration tests
//!
//! Both fakes append to a shared [`EventLog`] so tests can assert on the
//! order of provider calls across the two of them.

#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use eks_harness::provider::{
    ClusterStatus, ProbeId, ProbePhase, ProviderError, ProvisionedCluster, ProvisioningProvider,
    WorkloadProvider,
};
use eks_harness_common::ClusterConfig;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of provider calls, e.g. `"destroy:c1"`
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Provisioning provider whose clusters become ACTIVE on a given describe call
pub struct ScriptedProvisioner {
    log: EventLog,
    /// 1-based describe call, counted across clusters, that first reports ACTIVE
    active_on: usize,
    apply_error: Option<String>,
    destroy_error: Option<String>,
    describe_delay: Duration,
    describe_calls: AtomicUsize,
    clusters: Mutex<HashSet<String>>,
}

impl ScriptedProvisioner {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            active_on: 1,
            apply_error: None,
            destroy_error: None,
            describe_delay: Duration::ZERO,
            describe_calls: AtomicUsize::new(0),
            clusters: Mutex::new(HashSet::new()),
        }
    }

    /// Report CREATING until describe call `n`; `usize::MAX` never activates
    pub fn active_on(mut self, n: usize) -> Self {
        self.active_on = n;
        self
    }

    /// Make every describe call take `delay` before answering
    pub fn slow_describe(mut self, delay: Duration) -> Self {
        self.describe_delay = delay;
        self
    }

    pub fn failing_apply(mut self, message: &str) -> Self {
        self.apply_error = Some(message.to_string());
        self
    }

    pub fn failing_destroy(mut self, message: &str) -> Self {
        self.destroy_error = Some(message.to_string());
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.clusters.lock().unwrap().contains(name)
    }
}

#[async_trait]
impl ProvisioningProvider for ScriptedProvisioner {
    async fn apply(&self, config: &ClusterConfig) -> Result<ProvisionedCluster> {
        self.log.push(format!("apply:{}", config.name));
        self.clusters.lock().unwrap().insert(config.name.clone());
        if let Some(message) = &self.apply_error {
            bail!("{message}");
        }
        Ok(ProvisionedCluster {
            name: config.name.clone(),
            endpoint: format!("https://{}.gr7.us-west-1.eks.amazonaws.com", config.name),
            certificate_authority_data: "LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0t".to_string(),
            version: config.version.clone(),
            status: ClusterStatus::Creating,
        })
    }

    async fn describe(&self, name: &str) -> Result<ClusterStatus> {
        let call = self.describe_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.push(format!("describe:{name}"));
        tokio::time::sleep(self.describe_delay).await;
        if !self.exists(name) {
            return Err(ProviderError::not_found("cluster", name).into());
        }
        Ok(if call >= self.active_on {
            ClusterStatus::Active
        } else {
            ClusterStatus::Creating
        })
    }

    async fn destroy(&self, name: &str) -> Result<()> {
        self.log.push(format!("destroy:{name}"));
        if let Some(message) = &self.destroy_error {
            bail!("{message}");
        }
        if !self.clusters.lock().unwrap().remove(name) {
            return Err(ProviderError::not_found("cluster", name).into());
        }
        Ok(())
    }
}

/// Workload provider with a fixed node count and a scripted probe
pub struct ScriptedWorkload {
    log: EventLog,
    ready_nodes: usize,
    /// Probe phase once it has been polled this many times
    running_after: usize,
    create_delay: Duration,
    status_calls: AtomicUsize,
    probes: Mutex<HashSet<ProbeId>>,
    next_probe: AtomicUsize,
}

impl ScriptedWorkload {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ready_nodes: 2,
            running_after: 1,
            create_delay: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            probes: Mutex::new(HashSet::new()),
            next_probe: AtomicUsize::new(0),
        }
    }

    pub fn ready_nodes(mut self, n: usize) -> Self {
        self.ready_nodes = n;
        self
    }

    /// Report Pending until status call `n`; `usize::MAX` never runs
    pub fn running_after(mut self, n: usize) -> Self {
        self.running_after = n;
        self
    }

    /// Pods exist as soon as create is called, but the call only returns
    /// after `delay`
    pub fn slow_create(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn live_probes(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkloadProvider for ScriptedWorkload {
    async fn ready_node_count(&self, cluster: &ProvisionedCluster) -> Result<usize> {
        self.log.push(format!("nodes:{}", cluster.name));
        Ok(self.ready_nodes)
    }

    fn probe_id(&self, cluster: &ProvisionedCluster) -> ProbeId {
        let n = self.next_probe.fetch_add(1, Ordering::SeqCst);
        ProbeId {
            cluster: cluster.name.clone(),
            namespace: "default".to_string(),
            name: format!("terratest-probe-{n}"),
        }
    }

    async fn create_probe(&self, _cluster: &ProvisionedCluster, probe: &ProbeId) -> Result<()> {
        self.log.push(format!("create_probe:{probe}"));
        self.probes.lock().unwrap().insert(probe.clone());
        tokio::time::sleep(self.create_delay).await;
        Ok(())
    }

    async fn get_probe_status(&self, probe: &ProbeId) -> Result<ProbePhase> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(if !self.probes.lock().unwrap().contains(probe) {
            ProbePhase::Unknown
        } else if call >= self.running_after {
            ProbePhase::Running
        } else {
            ProbePhase::Pending
        })
    }

    async fn delete_probe(&self, probe: &ProbeId) -> Result<()> {
        self.log.push(format!("delete_probe:{probe}"));
        if !self.probes.lock().unwrap().remove(probe) {
            return Err(ProviderError::not_found("pod", probe.to_string()).into());
        }
        Ok(())
    }
}

/// Poll budget with near-zero delay
pub fn fast_poll(max_attempts: u32) -> eks_harness::wait::PollConfig {
    eks_harness::wait::PollConfig::new(Duration::from_millis(1), max_attempts)
}

/// Poll budget slow enough that an outer timeout always fires first
pub fn slow_poll() -> eks_harness::wait::PollConfig {
    eks_harness::wait::PollConfig::new(Duration::from_secs(60), 100)
}
