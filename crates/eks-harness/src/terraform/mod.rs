//! Terraform-backed provisioning provider
//!
//! Each cluster lives in its own Terraform workspace inside the shared module
//! directory, with its variables in `.eks-harness/<cluster>.tfvars.json`.
//! Apply converges the workspace and reads the module outputs; destroy tears
//! the workspace down and deletes it. A cluster whose workspace does not
//! exist is reported as not found.

pub mod command;
pub mod outputs;
pub mod vars;

pub use command::{CommandOutput, TerraformCli};
pub use outputs::ClusterOutputs;
pub use vars::TerraformVars;

use crate::aws::{AwsContext, EksClient};
use crate::config::TerraformConfig;
use crate::provider::{ClusterStatus, ProviderError, ProvisionedCluster, ProvisioningProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use eks_harness_common::ClusterConfig;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Directory under the module holding per-cluster variable files
const VAR_FILE_DIR: &str = ".eks-harness";

/// Workspace terraform falls back to; never deleted
const DEFAULT_WORKSPACE: &str = "default";

/// Parse `terraform workspace list` output into workspace names
pub fn parse_workspace_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// `-lock-timeout` argument covering `grace`
pub fn lock_timeout_arg(grace: Duration) -> String {
    format!("-lock-timeout={}s", grace.as_secs())
}

/// Provisioning provider that drives the EKS Terraform module
pub struct TerraformProvider {
    cli: TerraformCli,
    eks: EksClient,
    region: String,
    environment: String,
    /// `-lock-timeout` for destroy, so it outlasts an interrupted apply
    lock_timeout: String,
    /// Serializes commands that touch the module's `.terraform` directory
    /// (init and workspace management)
    module_lock: Mutex<()>,
}

impl TerraformProvider {
    pub fn new(config: &TerraformConfig, aws: &AwsContext, environment: impl Into<String>) -> Self {
        Self {
            cli: TerraformCli::new(
                config.binary.clone(),
                config.module_dir.clone(),
                config.command_timeout,
            )
            .with_interrupt_grace(config.interrupt_grace),
            eks: EksClient::from_context(aws),
            region: aws.region().to_string(),
            environment: environment.into(),
            lock_timeout: lock_timeout_arg(config.interrupt_grace),
            module_lock: Mutex::new(()),
        }
    }

    fn var_file(&self, cluster: &str) -> PathBuf {
        self.cli
            .module_dir()
            .join(VAR_FILE_DIR)
            .join(format!("{cluster}.tfvars.json"))
    }

    async fn list_workspaces(&self) -> Result<Vec<String>> {
        let output = self.cli.run_checked(&["workspace", "list"], None).await?;
        Ok(parse_workspace_list(&output.stdout))
    }

    /// Initialise the module and create the cluster's workspace
    async fn prepare_workspace(&self, cluster: &str) -> Result<()> {
        let _lock = self.module_lock.lock().await;

        self.cli
            .run_checked(&["init", "-input=false", "-no-color"], None)
            .await
            .context("terraform init failed")?;

        if self.list_workspaces().await?.iter().any(|w| w == cluster) {
            info!(cluster = %cluster, "Reusing existing terraform workspace");
            return Ok(());
        }
        self.cli
            .run_checked(&["workspace", "new", "-no-color", cluster], None)
            .await
            .with_context(|| format!("Failed to create terraform workspace {cluster}"))?;
        Ok(())
    }

    async fn delete_workspace(&self, cluster: &str) -> Result<()> {
        let _lock = self.module_lock.lock().await;

        // The workspace being deleted cannot be the selected one
        self.cli
            .run_checked(&["workspace", "select", "-no-color", DEFAULT_WORKSPACE], None)
            .await?;
        self.cli
            .run_checked(&["workspace", "delete", "-no-color", cluster], None)
            .await
            .with_context(|| format!("Failed to delete terraform workspace {cluster}"))?;
        Ok(())
    }
}

#[async_trait]
impl ProvisioningProvider for TerraformProvider {
    async fn apply(&self, config: &ClusterConfig) -> Result<ProvisionedCluster> {
        let name = config.name.as_str();
        let var_file = self.var_file(name);
        TerraformVars::from_cluster(config, &self.region, &self.environment)
            .write_to(&var_file)?;

        self.prepare_workspace(name).await?;

        let var_arg = format!("-var-file={}", var_file.display());
        self.cli
            .run_checked(
                &["apply", "-auto-approve", "-input=false", "-no-color", &var_arg],
                Some(name),
            )
            .await
            .context("terraform apply failed")?;

        let output = self
            .cli
            .run_checked(&["output", "-json", "-no-color"], Some(name))
            .await?;
        let outputs = ClusterOutputs::parse(&output.stdout)?;

        let status = match self.eks.cluster_status(&outputs.cluster_name).await {
            Ok(status) => status,
            Err(e) => {
                warn!(cluster = %name, error = ?e, "Could not describe freshly applied cluster");
                ClusterStatus::Unknown(String::new())
            }
        };
        info!(cluster = %name, status = %status, "terraform apply complete");

        Ok(ProvisionedCluster {
            name: outputs.cluster_name,
            endpoint: outputs.endpoint,
            certificate_authority_data: outputs.certificate_authority_data,
            version: outputs.cluster_version,
            status,
        })
    }

    async fn describe(&self, name: &str) -> Result<ClusterStatus> {
        self.eks.cluster_status(name).await
    }

    async fn destroy(&self, name: &str) -> Result<()> {
        if !self.list_workspaces().await?.iter().any(|w| w == name) {
            return Err(ProviderError::not_found("terraform workspace", name).into());
        }

        let var_file = self.var_file(name);
        if !var_file.exists() {
            warn!(cluster = %name, "Variable file missing, destroying with defaults");
            TerraformVars::for_destroy(name, &self.region, &self.environment)
                .write_to(&var_file)?;
        }

        let var_arg = format!("-var-file={}", var_file.display());
        self.cli
            .run_checked(
                &[
                    "destroy",
                    "-auto-approve",
                    "-input=false",
                    "-no-color",
                    &self.lock_timeout,
                    &var_arg,
                ],
                Some(name),
            )
            .await
            .context("terraform destroy failed")?;

        self.delete_workspace(name).await?;
        if let Err(e) = std::fs::remove_file(&var_file) {
            warn!(path = %var_file.display(), error = %e, "Failed to remove variable file");
        }
        info!(cluster = %name, "terraform destroy complete");
        Ok(())
    }
}
