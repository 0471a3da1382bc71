//! Harness run orchestration
//!
//! A run validates its configuration, applies it, waits for the cluster, its
//! nodes and a probe workload, and then tears everything down. Teardown runs
//! on every exit path that returns. If the run future is dropped instead (an
//! outer timeout, an aborted task), the resource guards hand whatever is
//! still alive to the background cleanup executor.

mod error;
mod outputs;
mod phase;
mod report;

pub use error::{HarnessError, RunFailure};
pub use outputs::{OutputError, check_outputs};
pub use phase::{Phase, PhaseTrace};
pub use report::RunReport;

use crate::cleanup::{TeardownReport, delete_resource};
use crate::config::HarnessConfig;
use crate::provider::{ProbePhase, ProvisionedCluster, ProvisioningProvider, WorkloadProvider};
use crate::resource_guard::{
    ResourceGuard, ResourceGuardBuilder, ResourceId, ResourceRegistry, create_cleanup_system,
};
use crate::wait::{PollConfig, PollError, Readiness, poll_until_ready};
use eks_harness_common::ClusterConfig;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What the polling phases observed on the way to success
struct Observed {
    cluster: ProvisionedCluster,
    ready_nodes: usize,
    probe_phase: ProbePhase,
}

/// Guards for everything a run has created so far
struct RunGuards {
    cluster: ResourceGuard,
    probe: Option<ResourceGuard>,
}

/// Drives provisioning test runs against a pair of providers
///
/// Construction spawns the cleanup executor, so it must happen inside a
/// tokio runtime. Call [`finish`](Self::finish) when done to collect what
/// the executor cleaned up on behalf of dropped runs.
pub struct Harness<P, W> {
    provisioner: Arc<P>,
    workload: Arc<W>,
    config: HarnessConfig,
    registry: ResourceRegistry,
    cleanup_task: JoinHandle<TeardownReport>,
}

impl<P, W> Harness<P, W>
where
    P: ProvisioningProvider + 'static,
    W: WorkloadProvider + 'static,
{
    pub fn new(provisioner: P, workload: W, config: HarnessConfig) -> Self {
        Self::with_shared(Arc::new(provisioner), Arc::new(workload), config)
    }

    /// Create a harness over providers the caller keeps handles to
    pub fn with_shared(provisioner: Arc<P>, workload: Arc<W>, config: HarnessConfig) -> Self {
        let (registry, executor) = create_cleanup_system(provisioner.clone(), workload.clone());
        let cleanup_task = tokio::spawn(executor.run());

        Self {
            provisioner,
            workload,
            config,
            registry,
            cleanup_task,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Resources created by in-flight runs that have not been torn down yet
    pub fn tracked_resources(&self) -> Vec<ResourceId> {
        self.registry
            .all_resources()
            .into_iter()
            .map(|(resource, _)| resource)
            .collect()
    }

    /// Execute one provisioning test run.
    ///
    /// Validation failures return before any provider call. Every other
    /// failure, and success, goes through teardown first; teardown problems
    /// are reported next to the outcome and never replace it.
    pub async fn run(
        &self,
        cluster: &ClusterConfig,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunFailure> {
        let mut trace = PhaseTrace::new(cluster.name.clone());
        trace.enter(Phase::Init);

        if let Err(e) = cluster.validate(&self.config.validation) {
            warn!(cluster = %cluster.name, error = %e, "Configuration rejected, nothing provisioned");
            trace.enter(Phase::Teardown);
            trace.enter(Phase::Done);
            return Err(RunFailure {
                error: e.into(),
                teardown: TeardownReport::default(),
                phases: trace.into_phases(),
            });
        }

        let builder = ResourceGuardBuilder::new(self.registry.clone(), cluster.name.clone());
        let mut guards = RunGuards {
            cluster: builder.cluster(),
            probe: None,
        };

        let outcome = self
            .drive(cluster, cancel, &builder, &mut guards, &mut trace)
            .await;
        if let Err(e) = &outcome {
            error!(
                cluster = %cluster.name,
                phase = ?trace.current(),
                error = %e,
                "Run failed, tearing down"
            );
        }

        trace.enter(Phase::Teardown);
        let teardown = self.teardown(guards).await;
        trace.enter(Phase::Done);

        match outcome {
            Ok(observed) => Ok(RunReport {
                cluster: observed.cluster,
                ready_nodes: observed.ready_nodes,
                probe_phase: observed.probe_phase,
                phases: trace.into_phases(),
                teardown,
            }),
            Err(error) => Err(RunFailure {
                error,
                teardown,
                phases: trace.into_phases(),
            }),
        }
    }

    async fn drive(
        &self,
        config: &ClusterConfig,
        cancel: &CancellationToken,
        builder: &ResourceGuardBuilder,
        guards: &mut RunGuards,
        trace: &mut PhaseTrace,
    ) -> Result<Observed, HarnessError> {
        let name = config.name.as_str();
        let provisioner = &*self.provisioner;
        let workload = &*self.workload;

        trace.enter(Phase::Applying);
        let cluster = match cancellable(cancel, Phase::Applying, provisioner.apply(config)).await? {
            Ok(cluster) => cluster,
            Err(e) => {
                trace.enter(Phase::ApplyFailed);
                return Err(HarnessError::Apply(e));
            }
        };
        trace.enter(Phase::Applied);
        check_outputs(&cluster, name, self.config.endpoint_suffix.as_deref())?;
        info!(
            cluster = %name,
            endpoint = %cluster.endpoint,
            version = %cluster.version,
            "Cluster applied"
        );

        trace.enter(Phase::PollingCluster);
        wait_for(
            trace,
            Phase::PollingCluster,
            &self.config.cluster_poll,
            cancel,
            &format!("cluster {name} to become ACTIVE"),
            || async move {
                let status = provisioner.describe(name).await?;
                Ok(if status.is_active() {
                    Readiness::Ready(())
                } else {
                    Readiness::NotReady(format!("cluster status is {status}"))
                })
            },
        )
        .await?;
        trace.enter(Phase::ClusterActive);

        trace.enter(Phase::PollingNodes);
        let cluster_ref = &cluster;
        let ready_nodes = wait_for(
            trace,
            Phase::PollingNodes,
            &self.config.node_poll,
            cancel,
            &format!("nodes of {name} to become Ready"),
            || async move {
                let ready = workload.ready_node_count(cluster_ref).await?;
                Ok(if ready > 0 {
                    Readiness::Ready(ready)
                } else {
                    Readiness::NotReady("no nodes are ready yet".to_string())
                })
            },
        )
        .await?;
        trace.enter(Phase::NodesReady);
        info!(cluster = %name, ready_nodes, "Nodes ready");

        trace.enter(Phase::ProbingWorkload);
        let probe = workload.probe_id(&cluster);
        guards.probe = Some(builder.probe(&probe));
        cancellable(
            cancel,
            Phase::ProbingWorkload,
            workload.create_probe(&cluster, &probe),
        )
        .await?
        .map_err(HarnessError::ProbeCreate)?;

        let probe_ref = &probe;
        let probe_phase = wait_for(
            trace,
            Phase::ProbingWorkload,
            &self.config.probe_poll,
            cancel,
            &format!("probe {probe} to run"),
            || async move {
                let phase = workload.get_probe_status(probe_ref).await?;
                Ok(if phase == ProbePhase::Running {
                    Readiness::Ready(phase)
                } else {
                    Readiness::NotReady(format!("probe phase is {phase}"))
                })
            },
        )
        .await?;
        trace.enter(Phase::WorkloadOk);
        info!(cluster = %name, probe = %probe, "Probe workload running");

        Ok(Observed {
            cluster,
            ready_nodes,
            probe_phase,
        })
    }

    /// Delete the probe, then the cluster. Each guard is detached after its
    /// attempt whatever the outcome, so teardown happens once per run.
    async fn teardown(&self, guards: RunGuards) -> TeardownReport {
        let mut report = TeardownReport::default();
        if let Some(probe) = guards.probe {
            self.release(probe, &mut report).await;
        }
        self.release(guards.cluster, &mut report).await;
        report
    }

    async fn release(&self, guard: ResourceGuard, report: &mut TeardownReport) {
        let outcome =
            delete_resource(&*self.provisioner, &*self.workload, guard.resource_id()).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "Teardown step failed, continuing");
        }
        report.record(guard.resource_id(), outcome);
        guard.detach();
    }

    /// Destroy a cluster outside of a run.
    ///
    /// Safe to repeat: a cluster that is already gone is reported as
    /// already deleted rather than as a failure.
    pub async fn destroy_cluster(&self, name: &str) -> TeardownReport {
        let guard = ResourceGuardBuilder::new(self.registry.clone(), name).cluster();
        let mut report = TeardownReport::default();
        self.release(guard, &mut report).await;
        report
    }

    /// Stop the cleanup executor and return what it cleaned up for dropped runs
    pub async fn finish(self) -> TeardownReport {
        self.registry.shutdown();
        match self.cleanup_task.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Cleanup executor task failed");
                TeardownReport::default()
            }
        }
    }
}

/// Run `fut` unless `cancel` fires first
async fn cancellable<T>(
    cancel: &CancellationToken,
    phase: Phase,
    fut: impl Future<Output = T>,
) -> Result<T, HarnessError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HarnessError::Cancelled { phase }),
        out = fut => Ok(out),
    }
}

/// Poll a phase's ready condition, recording the timeout phase on exhaustion
async fn wait_for<T, F, Fut>(
    trace: &mut PhaseTrace,
    phase: Phase,
    poll: &PollConfig,
    cancel: &CancellationToken,
    what: &str,
    check: F,
) -> Result<T, HarnessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Readiness<T>>>,
{
    match poll_until_ready(poll, Some(cancel), check, what).await {
        Ok(value) => Ok(value),
        Err(PollError::Cancelled { .. }) => Err(HarnessError::Cancelled { phase }),
        Err(source) => {
            if let Some(timeout) = phase.timeout_phase() {
                trace.enter(timeout);
            }
            Err(HarnessError::Poll { phase, source })
        }
    }
}
