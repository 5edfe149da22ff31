use super::{Context, TargetArgs};
use clap::Args;
use colored::Colorize;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Args, Debug)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Days of history to look at (hourly data is kept for 455 days)
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u64).range(1..=455))]
    pub days: u64,
}

pub async fn handle(context: &Context, args: EstimateArgs) -> anyhow::Result<()> {
    let role = context.role(args.target.role);
    let clients = context.clients(role.as_deref()).await?;
    let deployer = context
        .deployer(&clients, true)
        .with_reservation_window(Duration::from_secs(args.days * SECONDS_PER_DAY));

    let application = &args.target.application;
    let environment = &args.target.environment;
    let reservation = deployer.estimate(environment, application).await?;

    if reservation == 0 {
        println!(
            "{}",
            format!(
                "No memory usage recorded for {} in {} over the last {} days",
                application, environment, args.days
            )
            .yellow()
        );
        println!("Container Insights must be enabled on the cluster.");
    } else {
        println!(
            "Recommended memory reservation for {} in {}: {} MiB",
            application.cyan(),
            environment.cyan(),
            reservation.to_string().bold()
        );
    }
    Ok(())
}
