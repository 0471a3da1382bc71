//! eks-harness: validate EKS cluster configurations and run provisioning tests
//!
//! `run` provisions a uniquely named cluster through Terraform, waits for it
//! to become usable, schedules a probe pod, and always tears it down again.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eks_harness::aws::AwsContext;
use eks_harness::config::{
    AwsConfig, ClusterConfig, HarnessConfig, NodeGroupSize, ProbeConfig, RunConfig,
    TerraformConfig, ValidationPolicy, load_cluster_config, unique_cluster_name,
};
use eks_harness::terraform::TerraformProvider;
use eks_harness::wait::PollConfig;
use eks_harness::workload::KubeWorkloadProvider;
use eks_harness::{Harness, RunReport};
use eks_harness_common::defaults::{
    DEFAULT_ENVIRONMENT, DEFAULT_KUBERNETES_VERSION, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_SUBNETS,
    DEFAULT_NAME_PREFIX, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROBE_NAMESPACE, DEFAULT_REGION,
    DEFAULT_RUN_TIMEOUT_SECS,
};
use eks_harness_common::tags::default_tags;
use eks_harness_common::merge_tags;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "eks-harness")]
#[command(about = "EKS cluster configuration checks and provisioning tests")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Arguments for the run command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Directory of the Terraform root module
    #[arg(long)]
    terraform_dir: PathBuf,

    /// JSON cluster configuration; replaces the cluster flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prefix for the generated cluster and probe names
    #[arg(long, default_value = DEFAULT_NAME_PREFIX)]
    name_prefix: String,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS profile name (overrides default credential resolution)
    #[arg(long, env = "AWS_PROFILE")]
    aws_profile: Option<String>,

    /// Environment name passed to the module and tagged on resources
    #[arg(long, default_value = DEFAULT_ENVIRONMENT)]
    environment: String,

    /// Kubernetes version
    #[arg(long, default_value = DEFAULT_KUBERNETES_VERSION)]
    kubernetes_version: String,

    /// Comma-separated node instance types
    #[arg(long, value_delimiter = ',', default_value = "t3.medium")]
    instance_types: Vec<String>,

    /// Subnet ID (repeatable); without any the module creates its own VPC
    #[arg(long = "subnet")]
    subnets: Vec<String>,

    /// Extra tag as KEY=VALUE (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    #[arg(long, default_value_t = 1)]
    min_size: i32,

    #[arg(long, default_value_t = 3)]
    max_size: i32,

    #[arg(long, default_value_t = 2)]
    desired_size: i32,

    /// Minimum number of subnets the configuration must list
    #[arg(long, default_value_t = 0)]
    min_subnets: usize,

    /// Tag key that must be present (repeatable)
    #[arg(long = "required-tag")]
    required_tags: Vec<String>,

    /// Seconds between readiness checks
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,

    /// Readiness checks per phase before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Wall-clock limit for the run in seconds; teardown runs after it
    #[arg(long, default_value_t = DEFAULT_RUN_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Namespace for the probe pod
    #[arg(long, default_value = DEFAULT_PROBE_NAMESPACE)]
    namespace: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a cluster configuration file without touching any infrastructure
    Validate {
        /// JSON cluster configuration
        #[arg(long)]
        config: PathBuf,

        /// Minimum number of subnets
        #[arg(long, default_value_t = DEFAULT_MIN_SUBNETS)]
        min_subnets: usize,

        /// Tag key that must be present (repeatable)
        #[arg(long = "required-tag")]
        required_tags: Vec<String>,
    },

    /// Provision a cluster, check it works, and tear it down
    Run(Box<RunArgs>),

    /// Tear down a cluster left behind by an earlier run
    Destroy {
        /// Directory of the Terraform root module
        #[arg(long)]
        terraform_dir: PathBuf,

        /// Name of the cluster (and its Terraform workspace)
        #[arg(long)]
        cluster_name: String,

        /// AWS region
        #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
        region: String,

        /// AWS profile name
        #[arg(long, env = "AWS_PROFILE")]
        aws_profile: Option<String>,

        /// Environment name the cluster was created with
        #[arg(long, default_value = DEFAULT_ENVIRONMENT)]
        environment: String,
    },
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    Ok((key.to_string(), value.to_string()))
}

impl RunArgs {
    /// Configuration file if given, otherwise one built from the flags.
    /// Standard tags are merged under whatever tags the configuration has.
    fn cluster_config(&self) -> Result<ClusterConfig> {
        let mut cluster = match &self.config {
            Some(path) => load_cluster_config(path)?,
            None => {
                let custom: HashMap<String, String> = self.tags.iter().cloned().collect();
                ClusterConfig {
                    name: unique_cluster_name(&self.name_prefix),
                    version: self.kubernetes_version.clone(),
                    subnets: self.subnets.clone(),
                    tags: Some(custom),
                    instance_types: self.instance_types.clone(),
                    node_group: NodeGroupSize::new(self.min_size, self.max_size, self.desired_size),
                }
            }
        };

        // An absent map stays absent so validation can reject it
        if let Some(custom) = &cluster.tags {
            let defaults = default_tags(&self.environment, &cluster.name);
            cluster.tags = Some(merge_tags(Some(&defaults), Some(custom)));
        }
        Ok(cluster)
    }

    fn into_run_config(self) -> Result<RunConfig> {
        let cluster = self.cluster_config()?;
        let poll = PollConfig::new(Duration::from_secs(self.poll_interval_secs), self.max_attempts);
        let harness = HarnessConfig::default()
            .with_poll(poll)
            .with_validation(ValidationPolicy {
                min_subnets: self.min_subnets,
                required_tags: self.required_tags,
            });

        Ok(RunConfig {
            cluster,
            aws: AwsConfig {
                region: self.region,
                aws_profile: self.aws_profile,
            },
            terraform: TerraformConfig::new(self.terraform_dir),
            probe: ProbeConfig {
                namespace: self.namespace,
                name_prefix: self.name_prefix,
                ..Default::default()
            },
            harness,
            environment: self.environment,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?),
        )
        .init();

    match args.command {
        Command::Validate {
            config,
            min_subnets,
            required_tags,
        } => handle_validate(config, min_subnets, required_tags),
        Command::Run(run_args) => handle_run((*run_args).into_run_config()?).await,
        Command::Destroy {
            terraform_dir,
            cluster_name,
            region,
            aws_profile,
            environment,
        } => {
            handle_destroy(
                terraform_dir,
                &cluster_name,
                &region,
                aws_profile.as_deref(),
                environment,
            )
            .await
        }
    }
}

fn handle_validate(config: PathBuf, min_subnets: usize, required_tags: Vec<String>) -> Result<()> {
    let cluster = load_cluster_config(&config)?;
    let policy = ValidationPolicy {
        min_subnets,
        required_tags,
    };
    cluster
        .validate(&policy)
        .with_context(|| format!("{} is not a valid cluster configuration", config.display()))?;
    println!("ok");
    Ok(())
}

async fn handle_run(config: RunConfig) -> Result<()> {
    if let Some(profile) = &config.aws.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    info!(
        cluster = %config.cluster.name,
        region = %config.aws.region,
        module = %config.terraform.module_dir.display(),
        instance_types = ?config.cluster.instance_types,
        timeout_secs = config.timeout.as_secs(),
        worst_case_poll_secs = config.harness.worst_case_wait().as_secs(),
        "Starting provisioning test run"
    );

    let aws = AwsContext::new(&config.aws.region, config.aws.aws_profile.as_deref()).await;
    let provisioner = TerraformProvider::new(&config.terraform, &aws, config.environment.clone());
    let workload = KubeWorkloadProvider::new(&aws, config.probe.clone());
    let harness = Harness::new(provisioner, workload, config.harness.clone());

    // Timeout and Ctrl-C both cancel; the run still tears down before returning
    let cancel = CancellationToken::new();
    let watchdog = {
        let cancel = cancel.clone();
        let timeout = config.timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    warn!(timeout_secs = timeout.as_secs(), "Run timed out, cancelling");
                }
                result = tokio::signal::ctrl_c() => {
                    if result.is_err() {
                        return;
                    }
                    warn!("Interrupted, cancelling run");
                }
            }
            cancel.cancel();
        })
    };

    let outcome = harness.run(&config.cluster, &cancel).await;
    watchdog.abort();

    let dropped = harness.finish().await;
    if !dropped.is_clean() {
        warn!(errors = dropped.errors.len(), "Background cleanup reported failures");
    }

    match outcome {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(failure) => {
            println!(
                "phases: {}",
                failure
                    .phases
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
            Err(failure.into())
        }
    }
}

fn print_report(report: &RunReport) {
    println!("cluster:     {}", report.cluster.name);
    println!("endpoint:    {}", report.cluster.endpoint);
    println!("version:     {}", report.cluster.version);
    println!("ready nodes: {}", report.ready_nodes);
    println!("probe:       {}", report.probe_phase);
    println!(
        "phases:      {}",
        report
            .phases
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    for (resource, result) in &report.teardown.results {
        println!("teardown:    {} {}", resource.description(), result);
    }
    for error in &report.teardown.errors {
        warn!(error = %error, "Teardown failed after a successful run");
    }
}

async fn handle_destroy(
    terraform_dir: PathBuf,
    cluster_name: &str,
    region: &str,
    aws_profile: Option<&str>,
    environment: String,
) -> Result<()> {
    let aws = AwsContext::new(region, aws_profile).await;
    let provisioner =
        TerraformProvider::new(&TerraformConfig::new(terraform_dir), &aws, environment);
    let workload = KubeWorkloadProvider::new(&aws, ProbeConfig::default());
    let harness = Harness::new(provisioner, workload, HarnessConfig::default());

    let report = harness.destroy_cluster(cluster_name).await;
    harness.finish().await;

    for (resource, result) in &report.results {
        println!("{} {}", resource.description(), result);
    }
    match report.errors.into_iter().next() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
