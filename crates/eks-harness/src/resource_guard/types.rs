//! Core types for resource tracking and cleanup

use crate::provider::ProbeId;
use chrono::{DateTime, Utc};

/// Identifies a harness-created resource for tracking and cleanup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// Probe workload (deleted before its cluster)
    Probe(ProbeId),
    /// Provisioned cluster, by name
    Cluster(String),
}

impl ResourceId {
    /// Get cleanup priority (lower = cleanup first)
    ///
    /// Probes run on the cluster, so they go before it.
    pub fn cleanup_priority(&self) -> u8 {
        match self {
            ResourceId::Probe(_) => 0,
            ResourceId::Cluster(_) => 1,
        }
    }

    /// Get a human-readable description for logging
    pub fn description(&self) -> String {
        match self {
            ResourceId::Probe(probe) => format!("probe {}", probe),
            ResourceId::Cluster(name) => format!("cluster {}", name),
        }
    }
}

/// Metadata about a tracked resource
#[derive(Debug, Clone)]
pub struct ResourceMeta {
    /// Cluster the resource belongs to
    pub cluster: String,
    /// When tracking started
    pub created_at: DateTime<Utc>,
}

impl ResourceMeta {
    /// Create new metadata for a resource being created now
    pub fn new(cluster: String) -> Self {
        Self {
            cluster,
            created_at: Utc::now(),
        }
    }

    /// How long the resource has been tracked
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
