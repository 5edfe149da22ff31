use super::{Context, RolloutArgs, TargetArgs, print_result};
use clap::Args;
use colored::Colorize;
use ecs_deploy_core::{DEFAULT_DESCRIPTION, DeploymentRequest};

#[derive(Args, Debug)]
pub struct ShipArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Desired version (image tag) of the application
    #[arg(short, long)]
    pub version: String,

    /// Context recorded alongside the desired version
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub rollout: RolloutArgs,

    /// Rebuild the container secrets from the parameter store
    #[arg(long)]
    pub refresh_secrets: bool,

    /// Parameter path to read secrets from [default: /<environment>/<application>]
    #[arg(long, requires = "refresh_secrets")]
    pub secrets_prefix: Option<String>,

    /// Show the task definition changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Size the memory reservation from recorded usage
    #[arg(long)]
    pub auto_size_memory: bool,
}

impl ShipArgs {
    fn into_request(self, context: &Context) -> DeploymentRequest {
        let mut request = DeploymentRequest::new(
            self.target.application,
            self.version,
            self.target.environment,
        );
        request.description = Some(
            context
                .settings
                .description_or(self.description, DEFAULT_DESCRIPTION),
        );
        request.role = context.role(self.target.role);
        request.max_attempts = context.max_attempts(self.rollout.max_attempts);
        request.wait = !self.rollout.no_wait;
        request.refresh_secrets = self.refresh_secrets;
        request.secrets_prefix = self.secrets_prefix;
        request.dry_run = self.dry_run;
        request.auto_size_memory = self.auto_size_memory;
        request
    }
}

pub async fn handle(context: &Context, args: ShipArgs) -> anyhow::Result<()> {
    let json = args.rollout.json;
    let request = args.into_request(context);
    request.validate()?;

    if !json {
        println!(
            "{}",
            format!(
                "Deploying {}@{} to {}",
                request.application, request.version, request.environment
            )
            .blue()
            .bold()
        );
    }

    let clients = context.clients(request.role.as_deref()).await?;
    let result = context.deployer(&clients, json).deploy(&request).await?;

    let summary = if request.wait {
        format!(
            "{}@{} successfully updated in {}",
            request.application, request.version, request.environment
        )
    } else {
        format!(
            "{}@{} rollout started in {}",
            request.application, request.version, request.environment
        )
    };
    print_result(&result, json, &summary)
}
