//! Background cleanup executor for dropped resources

use super::registry::{CleanupMessage, ResourceRegistry};
use super::types::{ResourceId, ResourceMeta};
use crate::cleanup::{TeardownReport, delete_resource};
use crate::provider::{ProvisioningProvider, WorkloadProvider};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Item in the cleanup queue with priority
struct CleanupItem {
    resource: ResourceId,
    meta: ResourceMeta,
}

impl PartialEq for CleanupItem {
    fn eq(&self, other: &Self) -> bool {
        self.resource.cleanup_priority() == other.resource.cleanup_priority()
    }
}

impl Eq for CleanupItem {}

impl PartialOrd for CleanupItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CleanupItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order: lower priority number = higher priority = process first
        other
            .resource
            .cleanup_priority()
            .cmp(&self.resource.cleanup_priority())
    }
}

/// Background task that cleans up resources whose guards were dropped
///
/// Resources are received via channel and cleaned up in dependency order
/// (probes before clusters).
pub struct CleanupExecutor<P, W> {
    rx: mpsc::UnboundedReceiver<CleanupMessage>,
    provisioner: Arc<P>,
    workload: Arc<W>,
}

impl<P, W> CleanupExecutor<P, W>
where
    P: ProvisioningProvider,
    W: WorkloadProvider,
{
    /// Create a new cleanup executor
    pub fn new(
        rx: mpsc::UnboundedReceiver<CleanupMessage>,
        provisioner: Arc<P>,
        workload: Arc<W>,
    ) -> Self {
        Self {
            rx,
            provisioner,
            workload,
        }
    }

    /// Run the cleanup executor (spawned as a background task)
    ///
    /// Processes cleanup messages until it receives a Shutdown message or
    /// every sender is gone, then drains what is still queued. Returns the
    /// outcome of every cleanup it attempted.
    pub async fn run(mut self) -> TeardownReport {
        let mut pending: BinaryHeap<CleanupItem> = BinaryHeap::new();
        let mut report = TeardownReport::default();

        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    match msg {
                        Some(CleanupMessage::ResourceDropped { resource, meta }) => {
                            debug!(resource = %resource.description(), "Queued for cleanup");
                            pending.push(CleanupItem { resource, meta });
                        }
                        Some(CleanupMessage::Shutdown) | None => {
                            info!("Cleanup executor shutting down");
                            break;
                        }
                    }
                }
                // Process pending items when channel is quiet (batch processing)
                _ = tokio::time::sleep(Duration::from_millis(100)), if !pending.is_empty() => {
                    self.process_pending(&mut pending, &mut report).await;
                }
            }
        }

        // Anything dropped before shutdown was requested
        while let Ok(CleanupMessage::ResourceDropped { resource, meta }) = self.rx.try_recv() {
            pending.push(CleanupItem { resource, meta });
        }

        if !pending.is_empty() {
            info!(count = pending.len(), "Processing remaining cleanup items");
            self.process_pending(&mut pending, &mut report).await;
        }

        report
    }

    async fn process_pending(
        &self,
        pending: &mut BinaryHeap<CleanupItem>,
        report: &mut TeardownReport,
    ) {
        while let Some(item) = pending.pop() {
            info!(
                resource = %item.resource.description(),
                cluster = %item.meta.cluster,
                tracked_secs = item.meta.age().num_seconds(),
                "Cleaning up dropped resource"
            );
            let outcome =
                delete_resource(&*self.provisioner, &*self.workload, &item.resource).await;
            if let Err(e) = &outcome {
                error!(
                    resource = %item.resource.description(),
                    cluster = %item.meta.cluster,
                    error = %e,
                    "Failed to clean up dropped resource"
                );
            }
            report.record(&item.resource, outcome);
        }
    }
}

/// Create a registry and executor pair
///
/// Returns the registry (for use by guards) and the executor (to be spawned).
pub fn create_cleanup_system<P, W>(
    provisioner: Arc<P>,
    workload: Arc<W>,
) -> (ResourceRegistry, CleanupExecutor<P, W>)
where
    P: ProvisioningProvider,
    W: WorkloadProvider,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let registry = ResourceRegistry::new(tx);
    let executor = CleanupExecutor::new(rx, provisioner, workload);
    (registry, executor)
}
