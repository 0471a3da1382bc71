//! RAII guard for harness-created resources

use super::registry::ResourceRegistry;
use super::types::{ResourceId, ResourceMeta};

/// RAII guard that tracks a provisioned resource
///
/// When dropped while still armed, the resource is sent to the cleanup
/// executor for deletion. Explicit teardown deletes the resource itself and
/// then calls [`detach`](Self::detach).
///
/// # Example
///
/// ```ignore
/// let builder = ResourceGuardBuilder::new(registry, "my-cluster");
///
/// // Register before the call that creates the cluster
/// let guard = builder.cluster();
/// provisioner.apply(&config).await?;
///
/// // If this future is dropped here, the executor destroys the cluster
///
/// provisioner.destroy("my-cluster").await?;
/// guard.detach(); // No further cleanup
/// ```
#[must_use = "dropping a guard immediately schedules its resource for cleanup"]
pub struct ResourceGuard {
    /// Resource identifier for cleanup
    resource_id: ResourceId,
    /// Metadata for cleanup
    meta: ResourceMeta,
    /// Registry to notify on drop
    registry: ResourceRegistry,
    /// Whether drop should still trigger cleanup
    armed: bool,
}

impl ResourceGuard {
    /// Create a new guard (internal - use `ResourceGuardBuilder`)
    pub(crate) fn new(resource_id: ResourceId, meta: ResourceMeta, registry: ResourceRegistry) -> Self {
        registry.register(resource_id.clone(), meta.clone());

        Self {
            resource_id,
            meta,
            registry,
            armed: true,
        }
    }

    /// Get the resource ID
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// Get the resource metadata
    pub fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    /// Detach from registry without triggering cleanup
    ///
    /// Use once the resource has been cleaned up explicitly (successfully
    /// or not).
    pub fn detach(mut self) {
        self.armed = false;
        self.registry.release(&self.resource_id);
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        if self.armed {
            self.registry
                .on_drop(self.resource_id.clone(), self.meta.clone());
        }
    }
}
