//! Terminal progress output

use colored::Colorize;
use ecs_deploy_core::{
    ChangeRecord, DeployObserver, DeployState, DiffSummary, StabilityStatus,
};
use std::io::{self, Write};

/// Prints deployment progress to stdout
pub struct ConsoleObserver;

/// Prints only the task definition diff, uncoloured, to stderr.
///
/// Used with `--json` so stdout carries nothing but the result document.
pub struct DiffObserver;

/// Write the diff as plain text followed by its summary line
pub fn write_diff(out: &mut impl Write, records: &[ChangeRecord]) -> io::Result<()> {
    for record in records {
        writeln!(out, "{}", record)?;
    }
    writeln!(out, "{}", DiffSummary::of(records))
}

fn step_message(state: DeployState) -> Option<&'static str> {
    match state {
        DeployState::VersionRecorded => Some("Desired version recorded"),
        DeployState::ServiceLocated => Some("Service located"),
        DeployState::TemplateFetched => Some("Current task definition fetched"),
        DeployState::Registered => Some("New task definition registered"),
        DeployState::ServiceUpdated => Some("Service updated"),
        DeployState::Stabilizing => Some("Waiting for service to reach stable state"),
        DeployState::Stable => Some("Service is stable"),
        DeployState::DryRunExit => Some("Dry run, stopping before any change"),
        DeployState::TimedOut => Some("Service did not stabilize in time"),
        DeployState::Idle | DeployState::TemplateMutated | DeployState::Diffed => None,
    }
}

impl DeployObserver for ConsoleObserver {
    fn on_transition(&self, _from: DeployState, to: DeployState) {
        let Some(message) = step_message(to) else {
            return;
        };
        match to {
            DeployState::TimedOut => println!("{} {}", "✗".red(), message.red()),
            DeployState::DryRunExit => println!("{} {}", "•".yellow(), message),
            _ => println!("{} {}", "✓".green(), message),
        }
    }

    fn on_diff(&self, records: &[ChangeRecord]) {
        println!();
        for record in records {
            println!("{}", record.render_colored());
        }
        println!();
        println!("{}", DiffSummary::of(records).to_string().bold());
        println!();
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, status: &StabilityStatus) {
        if !status.is_stable() {
            println!("  [{}/{}] {}", attempt, max_attempts, status.to_string().dimmed());
        }
    }
}

impl DeployObserver for DiffObserver {
    fn on_diff(&self, records: &[ChangeRecord]) {
        if let Err(e) = write_diff(&mut io::stderr().lock(), records) {
            tracing::warn!(error = %e, "failed to print task definition diff");
        }
    }
}
