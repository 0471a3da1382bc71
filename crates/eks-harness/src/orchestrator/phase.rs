//! Run phases and the trace of phases a run passed through

use tracing::info;

/// State of a harness run
///
/// ```text
/// INIT -> APPLYING -> (APPLY_FAILED | APPLIED)
/// APPLIED -> POLLING_CLUSTER -> (CLUSTER_ACTIVE | CLUSTER_TIMEOUT)
/// CLUSTER_ACTIVE -> POLLING_NODES -> (NODES_READY | NODE_TIMEOUT)
/// NODES_READY -> PROBING_WORKLOAD -> (WORKLOAD_OK | WORKLOAD_TIMEOUT)
/// any -> TEARDOWN -> DONE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Init,
    Applying,
    ApplyFailed,
    Applied,
    PollingCluster,
    ClusterActive,
    ClusterTimeout,
    PollingNodes,
    NodesReady,
    NodeTimeout,
    ProbingWorkload,
    WorkloadOk,
    WorkloadTimeout,
    Teardown,
    Done,
}

impl Phase {
    /// Phase entered when a polling phase exhausts its attempts
    pub fn timeout_phase(self) -> Option<Phase> {
        match self {
            Phase::PollingCluster => Some(Phase::ClusterTimeout),
            Phase::PollingNodes => Some(Phase::NodeTimeout),
            Phase::ProbingWorkload => Some(Phase::WorkloadTimeout),
            _ => None,
        }
    }
}

/// Ordered record of the phases a run entered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTrace {
    cluster: String,
    phases: Vec<Phase>,
}

impl PhaseTrace {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            phases: Vec::new(),
        }
    }

    /// Record entry into `phase`
    pub fn enter(&mut self, phase: Phase) {
        info!(cluster = %self.cluster, phase = %phase, "Entering phase");
        self.phases.push(phase);
    }

    /// Most recently entered phase
    pub fn current(&self) -> Option<Phase> {
        self.phases.last().copied()
    }

    pub fn into_phases(self) -> Vec<Phase> {
        self.phases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Phase::ClusterActive.to_string(), "CLUSTER_ACTIVE");
        assert_eq!(Phase::ProbingWorkload.as_ref(), "PROBING_WORKLOAD");
    }

    #[test]
    fn test_timeout_phases() {
        assert_eq!(
            Phase::PollingCluster.timeout_phase(),
            Some(Phase::ClusterTimeout)
        );
        assert_eq!(Phase::PollingNodes.timeout_phase(), Some(Phase::NodeTimeout));
        assert_eq!(
            Phase::ProbingWorkload.timeout_phase(),
            Some(Phase::WorkloadTimeout)
        );
        assert_eq!(Phase::Applying.timeout_phase(), None);
    }

    #[test]
    fn test_trace() {
        let mut trace = PhaseTrace::new("c1");
        assert_eq!(trace.current(), None);
        trace.enter(Phase::Init);
        trace.enter(Phase::Applying);
        assert_eq!(trace.current(), Some(Phase::Applying));
        assert_eq!(trace.into_phases(), vec![Phase::Init, Phase::Applying]);
    }
}
