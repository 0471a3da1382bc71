//! AWS client modules for the harness
//!
//! - context: shared SDK configuration
//! - eks: cluster status lookups for the provisioning provider

pub mod context;
pub mod eks;

pub use context::AwsContext;
pub use eks::{EksClient, EksClusterInfo};
