//! Shared test utilities for eks-harness
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique test names
//! - [`fixtures`]: Known-good cluster configurations

pub mod aws;
pub mod fixtures;

// Re-export commonly used items
pub use aws::{get_test_region, test_cluster_name, test_run_id, test_terraform_dir};
pub use fixtures::valid_cluster_config;
