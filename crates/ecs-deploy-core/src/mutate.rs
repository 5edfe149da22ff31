//! Desired task definition construction
//!
//! The desired template is always built as a new value from the fields of the
//! current one. The current template is never touched, so it stays available
//! for the diff.

use crate::error::{DeployError, Result};
use crate::model::{ContainerSpec, SecretReference, TaskTemplate};
use crate::provider::ParameterStore;

/// Upper bound on parameter store pages read while refreshing secrets
pub const MAX_SECRET_PAGES: usize = 100;

/// Changes to apply to the application container
#[derive(Debug, Clone, Default)]
pub struct Mutation {
    /// New image tag
    pub version: String,

    /// Replacement secret list; `None` keeps the current secrets
    pub secrets: Option<Vec<SecretReference>>,

    /// New memory reservation; `None` keeps the current value
    pub memory_reservation: Option<i32>,
}

impl Mutation {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_secrets(mut self, secrets: Vec<SecretReference>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn with_memory_reservation(mut self, reservation: i32) -> Self {
        self.memory_reservation = Some(reservation);
        self
    }
}

/// Point `image` at tag `version`.
///
/// The tag is whatever follows the last `:` of the final path segment, so a
/// registry port (`host:5000/app`) is left alone. A pinned digest is dropped.
pub fn retag_image(image: &str, version: &str) -> String {
    let reference = image.split_once('@').map_or(image, |(name, _digest)| name);
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);

    match reference[name_start..].rfind(':') {
        Some(colon) => format!("{}:{}", &reference[..name_start + colon], version),
        None => format!("{}:{}", reference, version),
    }
}

/// Build the desired template from `current`.
///
/// Only the first container is changed; any further containers are treated as
/// sidecars and copied as they are.
pub fn mutate_template(current: &TaskTemplate, mutation: &Mutation) -> Result<TaskTemplate> {
    let Some(primary) = current.primary_container() else {
        return Err(DeployError::AmbiguousTemplate(format!(
            "task definition {} has no container definitions",
            current.display_name()
        )));
    };

    if mutation.memory_reservation.is_some() && current.containers.len() != 1 {
        return Err(DeployError::AmbiguousTemplate(format!(
            "memory reservation can only be sized for a single container, {} has {}",
            current.display_name(),
            current.containers.len()
        )));
    }

    let application = ContainerSpec {
        name: primary.name.clone(),
        image: retag_image(&primary.image, &mutation.version),
        cpu: primary.cpu,
        memory: primary.memory,
        memory_reservation: mutation.memory_reservation.or(primary.memory_reservation),
        secrets: match &mutation.secrets {
            Some(secrets) => secrets.clone(),
            None => primary.secrets.clone(),
        },
    };

    let mut containers = Vec::with_capacity(current.containers.len());
    containers.push(application);
    containers.extend(current.containers.iter().skip(1).cloned());

    Ok(TaskTemplate {
        family: current.family.clone(),
        revision: 0,
        template_ref: None,
        derived_from: current.template_ref.clone(),
        cpu: current.cpu.clone(),
        memory: current.memory.clone(),
        containers,
    })
}

/// Read every parameter directly under `prefix` as a secret reference.
///
/// Reading stops after [`MAX_SECRET_PAGES`] pages even if the store reports
/// more.
pub async fn load_secrets(store: &dyn ParameterStore, prefix: &str) -> Result<Vec<SecretReference>> {
    let mut secrets = Vec::new();
    let mut next_token = None;

    for page_number in 1..=MAX_SECRET_PAGES {
        let page = store
            .list_page(prefix, next_token.take())
            .await
            .map_err(|e| DeployError::SecretLookupFailed {
                prefix: prefix.to_string(),
                message: e.to_string(),
            })?;

        secrets.extend(
            page.parameters
                .iter()
                .map(|p| SecretReference::new(p.short_name(), p.arn.clone())),
        );

        match page.next_token {
            Some(token) if page_number < MAX_SECRET_PAGES => next_token = Some(token),
            Some(_) => {
                tracing::warn!(
                    %prefix,
                    pages = MAX_SECRET_PAGES,
                    "secret listing truncated at page limit"
                );
            }
            None => break,
        }
    }

    tracing::debug!(%prefix, count = secrets.len(), "loaded secrets");
    Ok(secrets)
}
