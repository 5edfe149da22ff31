mod commands;
mod lambda;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use ecs_deploy_core::DeployError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecs-deploy")]
#[command(
    about = "A fast and flexible tool to deploy to Amazon Web Service's Elastic Container Service",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// AWS region (falls back to the settings file, then the AWS config chain)
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ship a new version of an application to ECS
    Ship(commands::ship::ShipArgs),
    /// Gracefully restart/redeploy an application
    Restart(commands::restart::RestartArgs),
    /// Recommend a memory reservation from recorded usage
    Estimate(commands::estimate::EstimateArgs),
    /// Show version information
    Version,
}

fn init_cli_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// CloudWatch Logs adds its own timestamps and does not render colours
fn init_lambda_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time()
        .init();
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<DeployError>()
        .map_or(1, DeployError::exit_code)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Version does not need settings or credentials
    if matches!(cli.command, Commands::Version) {
        println!("ecs-deploy {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = ecs_deploy_config::load_settings()?;
    let context = commands::Context::new(settings, cli.region);

    match cli.command {
        Commands::Ship(args) => commands::ship::handle(&context, args).await,
        Commands::Restart(args) => commands::restart::handle(&context, args).await,
        Commands::Estimate(args) => commands::estimate::handle(&context, args).await,
        Commands::Version => unreachable!("Version is handled before settings are loaded"),
    }
}

#[tokio::main]
async fn main() {
    if lambda::is_lambda_environment() {
        init_lambda_logging();
        if let Err(e) = lambda::run().await {
            tracing::error!(error = %e, "lambda runtime stopped");
            std::process::exit(1);
        }
        return;
    }

    let cli = Cli::parse();
    init_cli_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(exit_code(&e));
    }
}
