//! eks-harness - EKS provisioning test harness
//!
//! This crate drives a provisioning test run against a cluster: apply the
//! configuration, wait for the cluster, its nodes and a probe workload, and
//! tear everything down on every exit path.
//!
//! The harness only depends on the [`provider`] traits. [`terraform`] and
//! [`workload`] hold the real implementations used by the binary.

pub mod aws;
pub mod cleanup;
pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod resource_guard;
pub mod terraform;
pub mod wait;
pub mod workload;

pub use orchestrator::{Harness, HarnessError, Phase, RunFailure, RunReport};
