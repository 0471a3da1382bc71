//! Successful run summary

use super::phase::Phase;
use crate::cleanup::TeardownReport;
use crate::provider::{ProbePhase, ProvisionedCluster};

/// What a successful run observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Outputs reported by `apply`
    pub cluster: ProvisionedCluster,
    /// Ready nodes seen when the node phase completed
    pub ready_nodes: usize,
    /// Probe phase that satisfied the workload check
    pub probe_phase: ProbePhase,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
    /// Teardown outcome; failures here do not fail the run
    pub teardown: TeardownReport,
}
