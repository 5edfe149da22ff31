//! Deployment state machine
//!
//! ```text
//! Idle ─▶ VersionRecorded ─▶ ServiceLocated ─▶ TemplateFetched ─▶ TemplateMutated ─▶ Diffed
//!  │                              ▲    │                                                │
//!  └──────────────────────────────┘    │ (restart)                 ┌────────────────────┤
//!      (dry run / restart)             ▼                           ▼                    ▼
//!                                 ServiceUpdated ◀──────────── Registered          DryRunExit
//!                                      │
//!                                      ▼
//!                                 Stabilizing ─▶ Stable | TimedOut
//! ```
//!
//! A dry-run restart stops at `ServiceLocated ─▶ DryRunExit`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    Idle,
    VersionRecorded,
    ServiceLocated,
    TemplateFetched,
    TemplateMutated,
    Diffed,
    DryRunExit,
    Registered,
    ServiceUpdated,
    Stabilizing,
    Stable,
    TimedOut,
}

impl DeployState {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: DeployState) -> bool {
        use DeployState::*;

        matches!(
            (self, next),
            (Idle, VersionRecorded)
                // dry runs and restarts skip the version write
                | (Idle, ServiceLocated)
                | (VersionRecorded, ServiceLocated)
                | (ServiceLocated, TemplateFetched)
                // restart goes straight to the update
                | (ServiceLocated, ServiceUpdated)
                | (ServiceLocated, DryRunExit)
                | (TemplateFetched, TemplateMutated)
                | (TemplateMutated, Diffed)
                | (Diffed, DryRunExit)
                | (Diffed, Registered)
                | (Registered, ServiceUpdated)
                | (ServiceUpdated, Stabilizing)
                | (Stabilizing, Stable)
                | (Stabilizing, TimedOut)
        )
    }

    /// No further transitions leave this state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeployState::DryRunExit | DeployState::Stable | DeployState::TimedOut
        )
    }

    /// The live service has been pointed at a new rollout
    pub fn has_updated_service(self) -> bool {
        matches!(
            self,
            DeployState::ServiceUpdated
                | DeployState::Stabilizing
                | DeployState::Stable
                | DeployState::TimedOut
        )
    }
}

impl std::fmt::Display for DeployState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeployState::Idle => "idle",
            DeployState::VersionRecorded => "version-recorded",
            DeployState::ServiceLocated => "service-located",
            DeployState::TemplateFetched => "template-fetched",
            DeployState::TemplateMutated => "template-mutated",
            DeployState::Diffed => "diffed",
            DeployState::DryRunExit => "dry-run-exit",
            DeployState::Registered => "registered",
            DeployState::ServiceUpdated => "service-updated",
            DeployState::Stabilizing => "stabilizing",
            DeployState::Stable => "stable",
            DeployState::TimedOut => "timed-out",
        };
        write!(f, "{}", name)
    }
}
