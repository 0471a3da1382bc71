//! Thread-safe registry of resources that still need cleanup

use super::types::{ResourceId, ResourceMeta};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Message sent to the cleanup executor
#[derive(Debug)]
pub enum CleanupMessage {
    /// A guard was dropped while still armed - the resource needs cleanup
    ResourceDropped {
        resource: ResourceId,
        meta: ResourceMeta,
    },
    /// Request the executor to shut down gracefully
    Shutdown,
}

/// Registry of live resources whose cleanup has not happened yet
///
/// Resources are registered before the call that creates them. If the guard
/// is dropped without being detached (for example because the run future was
/// dropped by an outer timeout) the resource is sent to the cleanup executor.
#[derive(Clone)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Currently tracked resources
    resources: Mutex<HashMap<ResourceId, ResourceMeta>>,
    /// Channel to send cleanup requests to the executor
    cleanup_tx: mpsc::UnboundedSender<CleanupMessage>,
}

impl ResourceRegistry {
    /// Create a new registry with a cleanup channel
    pub fn new(cleanup_tx: mpsc::UnboundedSender<CleanupMessage>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                resources: Mutex::new(HashMap::new()),
                cleanup_tx,
            }),
        }
    }

    fn resources(&self) -> MutexGuard<'_, HashMap<ResourceId, ResourceMeta>> {
        self.inner
            .resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a resource for tracking
    pub fn register(&self, resource: ResourceId, meta: ResourceMeta) {
        self.resources().insert(resource, meta);
    }

    /// Stop tracking a resource without triggering cleanup
    ///
    /// Returns the metadata if the resource was tracked.
    pub fn release(&self, resource: &ResourceId) -> Option<ResourceMeta> {
        self.resources().remove(resource)
    }

    /// Called when a guard is dropped while still armed
    ///
    /// Removes the resource from tracking and sends it to the cleanup executor.
    pub fn on_drop(&self, resource: ResourceId, meta: ResourceMeta) {
        self.resources().remove(&resource);

        // Executor may already have shut down
        let _ = self
            .inner
            .cleanup_tx
            .send(CleanupMessage::ResourceDropped { resource, meta });
    }

    /// Get all currently tracked resources
    pub fn all_resources(&self) -> Vec<(ResourceId, ResourceMeta)> {
        self.resources()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Get the count of currently tracked resources
    pub fn len(&self) -> usize {
        self.resources().len()
    }

    /// Check if there are no tracked resources
    pub fn is_empty(&self) -> bool {
        self.resources().is_empty()
    }

    /// Request the cleanup executor to shut down
    pub fn shutdown(&self) {
        let _ = self.inner.cleanup_tx.send(CleanupMessage::Shutdown);
    }
}
