//! Task definition diff
//!
//! Compares the current and desired task definitions container by container
//! and produces one [`ChangeRecord`] per container. The result only feeds the
//! report shown to the operator; it never decides what gets deployed.

use crate::model::{ContainerSpec, TaskTemplate};
use colored::Colorize;
use serde::{Deserialize, Serialize};

/// How a single field differs between current and desired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Same value on both sides
    Unchanged,
    /// Only present in the desired template
    Added,
    /// Only present in the current template
    Removed,
    /// Present on both sides with different values
    Modified,
}

impl ChangeKind {
    fn marker(self) -> char {
        match self {
            ChangeKind::Unchanged => ' ',
            ChangeKind::Added => '+',
            ChangeKind::Removed => '-',
            ChangeKind::Modified => '~',
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Unchanged => write!(f, "unchanged"),
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Removed => write!(f, "removed"),
            ChangeKind::Modified => write!(f, "modified"),
        }
    }
}

/// One line of a change record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub key: String,
    pub kind: ChangeKind,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl Change {
    /// Classify a field from its value on either side
    pub fn between(key: impl Into<String>, before: Option<&str>, after: Option<&str>) -> Self {
        let kind = match (before, after) {
            (Some(x), Some(y)) if x == y => ChangeKind::Unchanged,
            (Some(_), Some(_)) => ChangeKind::Modified,
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (None, None) => ChangeKind::Unchanged,
        };
        Self {
            key: key.into(),
            kind,
            before: before.map(str::to_string),
            after: after.map(str::to_string),
        }
    }

    /// Plain text rendering, e.g. `~ image: web:1.0 --> web:2.0`
    pub fn line(&self) -> String {
        let before = self.before.as_deref().unwrap_or_default();
        let after = self.after.as_deref().unwrap_or_default();
        let marker = self.kind.marker();

        match self.kind {
            ChangeKind::Unchanged | ChangeKind::Added => {
                format!("{} {}: {}", marker, self.key, after)
            }
            ChangeKind::Removed => format!("{} {}: {}", marker, self.key, before),
            ChangeKind::Modified => {
                format!("{} {}: {} --> {}", marker, self.key, before, after)
            }
        }
    }

    /// Terminal rendering with the conventional diff colours
    pub fn colored_line(&self) -> String {
        let line = self.line();
        match self.kind {
            ChangeKind::Unchanged => line.white().to_string(),
            ChangeKind::Added => line.green().to_string(),
            ChangeKind::Removed => line.red().to_string(),
            ChangeKind::Modified => line.yellow().to_string(),
        }
    }
}

/// All changes for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Resource kind, e.g. `container`
    pub resource: String,

    /// Resource name
    pub name: String,

    /// Changes in render order
    pub changes: Vec<Change>,
}

impl ChangeRecord {
    pub fn new(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            name: name.into(),
            changes: Vec::new(),
        }
    }

    pub fn add(&mut self, key: impl Into<String>, before: Option<&str>, after: Option<&str>) {
        self.changes.push(Change::between(key, before, after));
    }

    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.kind != ChangeKind::Unchanged)
    }

    pub fn get(&self, key: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.key == key)
    }

    /// Coloured block for terminal output
    pub fn render_colored(&self) -> String {
        let mut out = format!("{} \"{}\" {{\n", self.resource, self.name.bold());
        for change in &self.changes {
            out.push_str("  ");
            out.push_str(&change.colored_line());
            out.push('\n');
        }
        out.push('}');
        out
    }
}

impl std::fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} \"{}\" {{", self.resource, self.name)?;
        for change in &self.changes {
            writeln!(f, "  {}", change.line())?;
        }
        write!(f, "}}")
    }
}

/// Counts of each change kind across a diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    pub fn of(records: &[ChangeRecord]) -> Self {
        let mut summary = Self::default();
        for change in records.iter().flat_map(|r| &r.changes) {
            match change.kind {
                ChangeKind::Added => summary.added += 1,
                ChangeKind::Removed => summary.removed += 1,
                ChangeKind::Modified => summary.modified += 1,
                ChangeKind::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to remove, {} unchanged",
            self.added, self.modified, self.removed, self.unchanged
        )
    }
}

/// Diff `current` against `desired`.
///
/// Per container: the image first, then the current secrets in their original
/// order, then secrets that only exist in the desired template. Secrets are
/// matched by name (case-sensitive). A memory reservation line is added only
/// when the value changes.
pub fn diff_templates(current: &TaskTemplate, desired: &TaskTemplate) -> Vec<ChangeRecord> {
    current
        .containers
        .iter()
        .enumerate()
        .map(|(index, before)| diff_container(before, desired.containers.get(index)))
        .collect()
}

fn diff_container(before: &ContainerSpec, after: Option<&ContainerSpec>) -> ChangeRecord {
    let mut record = ChangeRecord::new("container", before.name.clone());

    record.add(
        "image",
        Some(before.image.as_str()),
        after.map(|c| c.image.as_str()),
    );

    for secret in &before.secrets {
        let desired = after.and_then(|c| c.secret(&secret.name));
        record.add(
            secret.name.clone(),
            Some(secret.value_from.as_str()),
            desired.map(|s| s.value_from.as_str()),
        );
    }

    if let Some(after) = after {
        for secret in &after.secrets {
            if before.secret(&secret.name).is_none() {
                record.add(secret.name.clone(), None, Some(secret.value_from.as_str()));
            }
        }

        if before.memory_reservation != after.memory_reservation {
            let previous = before.memory_reservation.map(|m| m.to_string());
            let next = after.memory_reservation.map(|m| m.to_string());
            record.add("memoryReservation", previous.as_deref(), next.as_deref());
        }
    }

    record
}
