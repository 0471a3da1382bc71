//! RAII-style resource guards for harness-created resources
//!
//! Provides cleanup of clusters and probes when a run is abandoned
//! (its future dropped) before explicit teardown could run.

mod builder;
mod executor;
mod guard;
mod registry;
pub mod types;

pub use builder::ResourceGuardBuilder;
pub use executor::{CleanupExecutor, create_cleanup_system};
pub use guard::ResourceGuard;
pub use registry::{CleanupMessage, ResourceRegistry};
pub use types::{ResourceId, ResourceMeta};
