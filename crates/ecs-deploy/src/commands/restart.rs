use super::{Context, RolloutArgs, TargetArgs, print_result};
use clap::Args;
use colored::Colorize;
use ecs_deploy_core::DeploymentRequest;

#[derive(Args, Debug)]
pub struct RestartArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub rollout: RolloutArgs,
}

pub async fn handle(context: &Context, args: RestartArgs) -> anyhow::Result<()> {
    let json = args.rollout.json;
    let mut request = DeploymentRequest::restart(args.target.application, args.target.environment);
    request.role = context.role(args.target.role);
    request.max_attempts = context.max_attempts(args.rollout.max_attempts);
    request.wait = !args.rollout.no_wait;
    request.validate()?;

    if !json {
        println!(
            "{}",
            format!(
                "Redeploying {} in {}",
                request.application, request.environment
            )
            .blue()
            .bold()
        );
    }

    let clients = context.clients(request.role.as_deref()).await?;
    let result = context.deployer(&clients, json).deploy(&request).await?;

    let summary = format!(
        "{} successfully restarted in {}",
        request.application, request.environment
    );
    print_result(&result, json, &summary)
}
