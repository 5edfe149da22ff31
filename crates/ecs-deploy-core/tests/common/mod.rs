use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ecs_deploy_core::{
    ChangeRecord, ContainerSpec, DeployObserver, DeployState, DeploymentConfiguration,
    MetricPoint, MetricQuery, MetricsStore, Parameter, ParameterPage, ParameterStore,
    ProviderError, ProviderResult, SecretReference, ServiceRecord, ServiceRegistry,
    ServiceUpdate, StabilityStatus, TaskTemplate,
};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const CLUSTER_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/prod";
pub const SERVICE_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:service/prod/web";
pub const CURRENT_TD: &str = "arn:aws:ecs:us-east-1:123456789012:task-definition/prod-web:7";
pub const NEXT_TD: &str = "arn:aws:ecs:us-east-1:123456789012:task-definition/prod-web:8";

pub fn service(grace: Option<i32>) -> ServiceRecord {
    ServiceRecord {
        cluster_ref: CLUSTER_ARN.to_string(),
        service_ref: SERVICE_ARN.to_string(),
        service_name: "web".to_string(),
        template_ref: CURRENT_TD.to_string(),
        desired_count: 2,
        deployment_configuration: Some(DeploymentConfiguration {
            maximum_percent: Some(200),
            minimum_healthy_percent: Some(100),
            circuit_breaker: None,
        }),
        network_configuration: None,
        platform_version: None,
        health_check_grace_period: grace,
        status: "ACTIVE".to_string(),
    }
}

pub fn template(secrets: &[(&str, &str)]) -> TaskTemplate {
    TaskTemplate {
        family: "prod-web".to_string(),
        revision: 7,
        template_ref: Some(CURRENT_TD.to_string()),
        derived_from: None,
        cpu: Some("256".to_string()),
        memory: Some("512".to_string()),
        containers: vec![ContainerSpec {
            name: "web".to_string(),
            image: "acct.ecr/web:1.0".to_string(),
            cpu: 0,
            memory: None,
            memory_reservation: Some(256),
            secrets: secrets
                .iter()
                .map(|(name, arn)| SecretReference::new(*name, *arn))
                .collect(),
        }],
    }
}

/// In-memory registry holding one service and its task definition
pub struct FakeRegistry {
    pub service: Option<ServiceRecord>,
    pub template: TaskTemplate,
    pub fail_locate: bool,
    pub fail_fetch: bool,
    pub fail_register: bool,
    pub fail_update: bool,
    polls: Mutex<VecDeque<StabilityStatus>>,
    pub registered: Mutex<Vec<TaskTemplate>>,
    pub updates: Mutex<Vec<ServiceUpdate>>,
    pub poll_count: Mutex<u32>,
}

impl FakeRegistry {
    pub fn new(service: ServiceRecord, template: TaskTemplate) -> Self {
        Self {
            service: Some(service),
            template,
            fail_locate: false,
            fail_fetch: false,
            fail_register: false,
            fail_update: false,
            polls: Mutex::new(VecDeque::new()),
            registered: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            poll_count: Mutex::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn empty(template: TaskTemplate) -> Self {
        Self {
            service: None,
            ..Self::new(service(None), template)
        }
    }

    /// Queue poll answers; once drained every poll reports the rollout in flight
    #[allow(dead_code)]
    pub fn with_polls(self, polls: Vec<StabilityStatus>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn register_count(&self) -> usize {
        self.registered.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn last_registered(&self) -> TaskTemplate {
        self.registered.lock().unwrap().last().cloned().unwrap()
    }

    #[allow(dead_code)]
    pub fn last_update(&self) -> ServiceUpdate {
        self.updates.lock().unwrap().last().cloned().unwrap()
    }

    #[allow(dead_code)]
    pub fn poll_count(&self) -> u32 {
        *self.poll_count.lock().unwrap()
    }
}

#[async_trait]
impl ServiceRegistry for FakeRegistry {
    async fn locate(&self, environment: &str, application: &str) -> ProviderResult<ServiceRecord> {
        if self.fail_locate {
            return Err(ProviderError::Unavailable("connection reset".to_string()));
        }
        self.service.clone().ok_or_else(|| {
            ProviderError::NotFound(format!("{} in {}", application, environment))
        })
    }

    async fn fetch_template(&self, template_ref: &str) -> ProviderResult<TaskTemplate> {
        if self.fail_fetch {
            return Err(ProviderError::Unavailable("request timed out".to_string()));
        }
        if self.template.template_ref.as_deref() == Some(template_ref) {
            Ok(self.template.clone())
        } else {
            Err(ProviderError::NotFound(template_ref.to_string()))
        }
    }

    async fn register(&self, template: &TaskTemplate) -> ProviderResult<String> {
        if self.fail_register {
            return Err(ProviderError::Rejected("invalid container definition".to_string()));
        }
        self.registered.lock().unwrap().push(template.clone());
        Ok(NEXT_TD.to_string())
    }

    async fn update_service(&self, update: &ServiceUpdate) -> ProviderResult<ServiceRecord> {
        if self.fail_update {
            return Err(ProviderError::Rejected("access denied".to_string()));
        }
        self.updates.lock().unwrap().push(update.clone());

        let mut updated = self.service.clone().unwrap_or_else(|| service(None));
        if let Some(template_ref) = &update.template_ref {
            updated.template_ref = template_ref.clone();
        }
        Ok(updated)
    }

    async fn poll_stability(&self, _: &str, _: &str) -> ProviderResult<StabilityStatus> {
        *self.poll_count.lock().unwrap() += 1;
        Ok(self
            .polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StabilityStatus::NotYet {
                running: 1,
                desired: 2,
                deployments: 2,
            }))
    }
}

/// Parameter store backed by a list of pages
#[derive(Default)]
pub struct FakeParameterStore {
    pub pages: Vec<Vec<Parameter>>,
    pub fail_put: bool,
    pub fail_list: bool,
    pub puts: Mutex<Vec<(String, String, String)>>,
}

impl FakeParameterStore {
    #[allow(dead_code)]
    pub fn with_parameters(names: &[&str]) -> Self {
        Self {
            pages: vec![
                names
                    .iter()
                    .map(|name| Parameter::new(*name, format!("arn:aws:ssm:::parameter{}", name)))
                    .collect(),
            ],
            ..Default::default()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ParameterStore for FakeParameterStore {
    async fn put(&self, path: &str, value: &str, description: &str) -> ProviderResult<()> {
        if self.fail_put {
            return Err(ProviderError::Unavailable("throttled".to_string()));
        }
        self.puts.lock().unwrap().push((
            path.to_string(),
            value.to_string(),
            description.to_string(),
        ));
        Ok(())
    }

    async fn list_page(
        &self,
        _path: &str,
        next_token: Option<String>,
    ) -> ProviderResult<ParameterPage> {
        if self.fail_list {
            return Err(ProviderError::Rejected("access denied".to_string()));
        }
        let index: usize = next_token.map_or(0, |t| t.parse().unwrap());
        let parameters = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(ParameterPage {
            parameters,
            next_token,
        })
    }
}

/// Metrics store returning fixed points and remembering the last query
#[derive(Default)]
pub struct FakeMetrics {
    pub points: Vec<MetricPoint>,
    pub fail_query: bool,
    pub queries: Mutex<Vec<MetricQuery>>,
}

impl FakeMetrics {
    /// One sample per listed hour on 2024-05-01
    #[allow(dead_code)]
    pub fn hourly(samples: &[(u32, f64)]) -> Self {
        Self {
            points: samples
                .iter()
                .map(|(hour, value)| MetricPoint {
                    timestamp: Utc.with_ymd_and_hms(2024, 5, 1, *hour, 0, 0).unwrap(),
                    value: *value,
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MetricsStore for FakeMetrics {
    async fn query_maximum(&self, query: &MetricQuery) -> ProviderResult<Vec<MetricPoint>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_query {
            return Err(ProviderError::Unavailable("throttled".to_string()));
        }
        Ok(self.points.clone())
    }
}

/// Observer that keeps everything it is told
#[derive(Default)]
pub struct RecordingObserver {
    pub transitions: Mutex<Vec<DeployState>>,
    pub diffs: Mutex<Vec<ChangeRecord>>,
    pub polls: Mutex<Vec<u32>>,
}

impl RecordingObserver {
    #[allow(dead_code)]
    pub fn states(&self) -> Vec<DeployState> {
        self.transitions.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn diff_lines(&self) -> Vec<String> {
        self.diffs
            .lock()
            .unwrap()
            .iter()
            .flat_map(|r| r.changes.iter().map(|c| c.line()))
            .collect()
    }
}

impl DeployObserver for RecordingObserver {
    fn on_transition(&self, _from: DeployState, to: DeployState) {
        self.transitions.lock().unwrap().push(to);
    }

    fn on_diff(&self, records: &[ChangeRecord]) {
        self.diffs.lock().unwrap().extend_from_slice(records);
    }

    fn on_poll(&self, attempt: u32, _max_attempts: u32, _status: &StabilityStatus) {
        self.polls.lock().unwrap().push(attempt);
    }
}
