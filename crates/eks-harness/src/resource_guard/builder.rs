//! Builder for creating resource guards with consistent metadata

use super::guard::ResourceGuard;
use super::registry::ResourceRegistry;
use super::types::{ResourceId, ResourceMeta};
use crate::provider::ProbeId;

/// Builder for creating resource guards for one cluster's resources
pub struct ResourceGuardBuilder {
    registry: ResourceRegistry,
    cluster: String,
}

impl ResourceGuardBuilder {
    /// Create a new builder for the resources of `cluster`
    pub fn new(registry: ResourceRegistry, cluster: impl Into<String>) -> Self {
        Self {
            registry,
            cluster: cluster.into(),
        }
    }

    fn meta(&self) -> ResourceMeta {
        ResourceMeta::new(self.cluster.clone())
    }

    /// Guard the cluster itself
    pub fn cluster(&self) -> ResourceGuard {
        ResourceGuard::new(
            ResourceId::Cluster(self.cluster.clone()),
            self.meta(),
            self.registry.clone(),
        )
    }

    /// Guard a probe workload
    pub fn probe(&self, probe: &ProbeId) -> ResourceGuard {
        ResourceGuard::new(
            ResourceId::Probe(probe.clone()),
            self.meta(),
            self.registry.clone(),
        )
    }
}
