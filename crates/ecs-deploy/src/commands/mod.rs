pub mod estimate;
pub mod restart;
pub mod ship;

use crate::output::{ConsoleObserver, DiffObserver};
use clap::Args;
use colored::Colorize;
use ecs_deploy_aws::AwsClients;
use ecs_deploy_config::Settings;
use ecs_deploy_core::{DEFAULT_MAX_ATTEMPTS, Deployer, DeploymentResult};
use std::sync::Arc;

/// Service a command acts on
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Application (ECS service) name
    #[arg(short, long, env = "ECS_DEPLOY_APPLICATION")]
    pub application: String,

    /// Target environment (ECS cluster name)
    #[arg(short, long, env = "ECS_DEPLOY_ENVIRONMENT")]
    pub environment: String,

    /// IAM role ARN to assume before touching any AWS resource
    #[arg(short, long, env = "ECS_DEPLOY_ROLE")]
    pub role: Option<String>,
}

/// Rollout options shared by ship and restart
#[derive(Args, Debug)]
pub struct RolloutArgs {
    /// Stability polls (15 seconds apart) before giving up [default: 40]
    #[arg(long, env = "ECS_DEPLOY_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Update the service and exit without waiting for a stable state
    #[arg(short = 'w', long)]
    pub no_wait: bool,

    /// Print the result as JSON instead of progress output
    #[arg(long)]
    pub json: bool,
}

/// Settings shared by every command
pub struct Context {
    pub settings: Settings,
    pub region: Option<String>,
}

impl Context {
    pub fn new(settings: Settings, region: Option<String>) -> Self {
        Self { settings, region }
    }

    pub fn role(&self, flag: Option<String>) -> Option<String> {
        self.settings.role_or(flag)
    }

    pub fn max_attempts(&self, flag: Option<u32>) -> u32 {
        self.settings.max_attempts_or(flag, DEFAULT_MAX_ATTEMPTS)
    }

    /// Resolve credentials once and build every AWS client from them
    pub async fn clients(&self, role: Option<&str>) -> anyhow::Result<AwsClients> {
        let region = self.settings.region_or(self.region.clone());
        let clients = AwsClients::connect(region.as_deref(), role).await?;
        Ok(clients)
    }

    /// With `json` set progress stays off stdout; the diff still goes to stderr
    pub fn deployer(&self, clients: &AwsClients, json: bool) -> Deployer {
        let deployer = Deployer::new(clients.registry.clone(), clients.parameters.clone())
            .with_metrics(clients.metrics.clone());

        if json {
            deployer.with_observer(Arc::new(DiffObserver))
        } else {
            deployer.with_observer(Arc::new(ConsoleObserver))
        }
    }
}

/// Print `result` as JSON or as a one-line summary
pub fn print_result(result: &DeploymentResult, json: bool, summary: &str) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.dry_run {
        println!("{}", "Dry run complete, nothing was changed".yellow());
    } else if result.successfully_invoked {
        println!("{}", summary.green().bold());
        println!("  task definition: {}", result.task_definition.cyan());
    } else {
        println!("{}", "Nothing was deployed".yellow());
    }
    Ok(())
}
