//! ECS service registry
//!
//! Services and task definitions are converted into the provider-neutral
//! model on the way in. On the way out only the fields the deployment
//! changes are written. Registration copies the rest of the source task
//! definition (port mappings, log configuration, volumes, runtime platform,
//! inference accelerators, tags ...). Service updates build the rolling
//! update and network settings from the update itself, on top of the
//! deployment configuration seen when the service was located.

use crate::error::from_sdk;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::Client;
use aws_sdk_ecs::operation::register_task_definition::builders::RegisterTaskDefinitionFluentBuilder;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerDefinition, DeploymentCircuitBreaker,
    DeploymentConfiguration as SdkDeploymentConfiguration, Failure,
    NetworkConfiguration as SdkNetworkConfiguration, Secret, Service, Tag, TaskDefinition,
    TaskDefinitionField,
};
use ecs_deploy_core::{
    CircuitBreaker, ContainerSpec, DeploymentConfiguration, NetworkConfiguration, ProviderError,
    ProviderResult, SecretReference, ServiceRecord, ServiceRegistry, ServiceUpdate,
    StabilityStatus, TaskTemplate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// [`ServiceRegistry`] backed by the ECS API
#[derive(Debug, Clone)]
pub struct EcsServiceRegistry {
    client: Client,
    /// Deployment configuration of each located service, keyed by service ARN
    located: Arc<Mutex<HashMap<String, SdkDeploymentConfiguration>>>,
}

impl EcsServiceRegistry {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
            located: Arc::default(),
        }
    }

    async fn describe_service(&self, cluster: &str, service: &str) -> ProviderResult<Service> {
        let output = self
            .client
            .describe_services()
            .cluster(cluster)
            .services(service)
            .send()
            .await
            .map_err(|e| from_sdk("DescribeServices", e))?;

        if let Some(failure) = output.failures().first() {
            return Err(lookup_failure(cluster, service, failure));
        }

        output.services().first().cloned().ok_or_else(|| {
            ProviderError::NotFound(format!("unable to find service {} in cluster {}", service, cluster))
        })
    }

    async fn describe_task_definition(
        &self,
        template_ref: &str,
        include_tags: bool,
    ) -> ProviderResult<(TaskDefinition, Vec<Tag>)> {
        let mut request = self
            .client
            .describe_task_definition()
            .task_definition(template_ref);
        if include_tags {
            request = request.include(TaskDefinitionField::Tags);
        }
        let output = request
            .send()
            .await
            .map_err(|e| from_sdk("DescribeTaskDefinition", e))?;

        let definition = output
            .task_definition()
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(template_ref.to_string()))?;
        Ok((definition, output.tags().to_vec()))
    }

    fn remember(&self, service: &Service) {
        let (Some(arn), Some(config)) = (service.service_arn(), service.deployment_configuration())
        else {
            return;
        };
        if let Ok(mut located) = self.located.lock() {
            located.insert(arn.to_string(), config.clone());
        }
    }

    fn located_deployment_configuration(&self, service_ref: &str) -> Option<SdkDeploymentConfiguration> {
        self.located
            .lock()
            .ok()
            .and_then(|located| located.get(service_ref).cloned())
    }
}

#[async_trait]
impl ServiceRegistry for EcsServiceRegistry {
    async fn locate(&self, environment: &str, application: &str) -> ProviderResult<ServiceRecord> {
        let service = self.describe_service(environment, application).await?;
        let record = service_record(&service)?;
        self.remember(&service);
        Ok(record)
    }

    async fn fetch_template(&self, template_ref: &str) -> ProviderResult<TaskTemplate> {
        let (definition, _) = self.describe_task_definition(template_ref, false).await?;
        Ok(task_template(&definition))
    }

    async fn register(&self, template: &TaskTemplate) -> ProviderResult<String> {
        let source_ref = template.derived_from.as_deref().ok_or_else(|| {
            ProviderError::Rejected(format!(
                "{} was not derived from a registered task definition",
                template.display_name()
            ))
        })?;
        let (source, tags) = self.describe_task_definition(source_ref, true).await?;
        let containers = overlay_containers(source.container_definitions(), &template.containers)?;

        let request = self
            .client
            .register_task_definition()
            .family(&template.family)
            .set_container_definitions(Some(containers))
            .set_cpu(template.cpu.clone())
            .set_memory(template.memory.clone());

        let output = inherit_from_source(request, &source, &tags)
            .send()
            .await
            .map_err(|e| from_sdk("RegisterTaskDefinition", e))?;

        output
            .task_definition()
            .and_then(|td| td.task_definition_arn())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Unavailable("RegisterTaskDefinition returned no ARN".to_string())
            })
    }

    async fn update_service(&self, update: &ServiceUpdate) -> ProviderResult<ServiceRecord> {
        let deployment = update.deployment_configuration.as_ref().map(|config| {
            sdk_deployment_configuration(
                config,
                self.located_deployment_configuration(&update.service_ref),
            )
        });
        let network = update
            .network_configuration
            .as_ref()
            .map(sdk_network_configuration)
            .transpose()?;

        let output = self
            .client
            .update_service()
            .cluster(&update.cluster_ref)
            .service(&update.service_ref)
            .set_task_definition(update.template_ref.clone())
            .set_desired_count(update.desired_count)
            .set_deployment_configuration(deployment)
            .set_network_configuration(network)
            .set_platform_version(update.platform_version.clone())
            .set_health_check_grace_period_seconds(update.health_check_grace_period)
            .force_new_deployment(update.force_new_deployment)
            .send()
            .await
            .map_err(|e| from_sdk("UpdateService", e))?;

        let service = output.service().ok_or_else(|| {
            ProviderError::Unavailable("UpdateService returned no service".to_string())
        })?;
        service_record(service)
    }

    async fn poll_stability(
        &self,
        environment: &str,
        application: &str,
    ) -> ProviderResult<StabilityStatus> {
        let service = self.describe_service(environment, application).await?;
        match service.status() {
            Some("DRAINING") | Some("INACTIVE") => Err(ProviderError::NotFound(format!(
                "service {} in cluster {} is {}",
                application,
                environment,
                service.status().unwrap_or_default()
            ))),
            _ => Ok(stability(&service)),
        }
    }
}

/// Carry the task-level settings of `source` into a new registration
pub fn inherit_from_source(
    request: RegisterTaskDefinitionFluentBuilder,
    source: &TaskDefinition,
    tags: &[Tag],
) -> RegisterTaskDefinitionFluentBuilder {
    request
        .set_task_role_arn(source.task_role_arn().map(str::to_string))
        .set_execution_role_arn(source.execution_role_arn().map(str::to_string))
        .set_network_mode(source.network_mode().cloned())
        .set_placement_constraints(Some(source.placement_constraints().to_vec()))
        .set_volumes(Some(source.volumes().to_vec()))
        .set_requires_compatibilities(Some(source.requires_compatibilities().to_vec()))
        .set_runtime_platform(source.runtime_platform().cloned())
        .set_ephemeral_storage(source.ephemeral_storage().cloned())
        .set_pid_mode(source.pid_mode().cloned())
        .set_ipc_mode(source.ipc_mode().cloned())
        .set_proxy_configuration(source.proxy_configuration().cloned())
        .set_inference_accelerators(non_empty(source.inference_accelerators()))
        .set_tags(non_empty(tags))
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items.to_vec())
}

/// Every failure DescribeServices reports for the requested name means the
/// service cannot be found, whatever the reason (`MISSING`, a bad cluster ...)
pub fn lookup_failure(cluster: &str, service: &str, failure: &Failure) -> ProviderError {
    ProviderError::NotFound(format!(
        "unable to find service {} in cluster {}: {}",
        service,
        cluster,
        failure.reason().unwrap_or("unknown reason")
    ))
}

/// SDK rolling update settings for `config`.
///
/// Fields the model does not know about (alarms, bake time ...) are taken
/// from `located`, the configuration reported when the service was located.
pub fn sdk_deployment_configuration(
    config: &DeploymentConfiguration,
    located: Option<SdkDeploymentConfiguration>,
) -> SdkDeploymentConfiguration {
    let mut sdk = located.unwrap_or_else(|| SdkDeploymentConfiguration::builder().build());
    sdk.maximum_percent = config.maximum_percent;
    sdk.minimum_healthy_percent = config.minimum_healthy_percent;
    sdk.deployment_circuit_breaker = config.circuit_breaker.map(|cb| {
        DeploymentCircuitBreaker::builder()
            .enable(cb.enable)
            .rollback(cb.rollback)
            .build()
    });
    sdk
}

pub fn sdk_network_configuration(
    config: &NetworkConfiguration,
) -> ProviderResult<SdkNetworkConfiguration> {
    let vpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(config.subnets.clone()))
        .set_security_groups(non_empty(&config.security_groups))
        .set_assign_public_ip(config.assign_public_ip.map(|enabled| {
            if enabled {
                AssignPublicIp::Enabled
            } else {
                AssignPublicIp::Disabled
            }
        }))
        .build()
        .map_err(|e| ProviderError::Rejected(e.to_string()))?;

    Ok(SdkNetworkConfiguration::builder()
        .awsvpc_configuration(vpc)
        .build())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> ProviderResult<&'a str> {
    value.ok_or_else(|| ProviderError::Unavailable(format!("ECS response is missing {}", field)))
}

/// Provider-neutral view of an ECS service
pub fn service_record(service: &Service) -> ProviderResult<ServiceRecord> {
    Ok(ServiceRecord {
        cluster_ref: required(service.cluster_arn(), "clusterArn")?.to_string(),
        service_ref: required(service.service_arn(), "serviceArn")?.to_string(),
        service_name: service.service_name().unwrap_or_default().to_string(),
        template_ref: required(service.task_definition(), "taskDefinition")?.to_string(),
        desired_count: service.desired_count(),
        deployment_configuration: service.deployment_configuration().map(|dc| {
            DeploymentConfiguration {
                maximum_percent: dc.maximum_percent(),
                minimum_healthy_percent: dc.minimum_healthy_percent(),
                circuit_breaker: dc.deployment_circuit_breaker().map(|cb| CircuitBreaker {
                    enable: cb.enable(),
                    rollback: cb.rollback(),
                }),
            }
        }),
        network_configuration: service
            .network_configuration()
            .and_then(|nc| nc.awsvpc_configuration())
            .map(|vpc| NetworkConfiguration {
                subnets: vpc.subnets().to_vec(),
                security_groups: vpc.security_groups().to_vec(),
                assign_public_ip: vpc.assign_public_ip().map(|ip| *ip == AssignPublicIp::Enabled),
            }),
        platform_version: service.platform_version().map(str::to_string),
        health_check_grace_period: service.health_check_grace_period_seconds(),
        status: service.status().unwrap_or_default().to_string(),
    })
}

/// Steady state: a single deployment left and every desired task running
pub fn stability(service: &Service) -> StabilityStatus {
    let deployments = service.deployments().len();
    let running = service.running_count();
    let desired = service.desired_count();

    if deployments == 1 && running == desired {
        StabilityStatus::Stable
    } else {
        StabilityStatus::NotYet {
            running,
            desired,
            deployments,
        }
    }
}

pub fn task_template(definition: &TaskDefinition) -> TaskTemplate {
    TaskTemplate {
        family: definition.family().unwrap_or_default().to_string(),
        revision: definition.revision(),
        template_ref: definition.task_definition_arn().map(str::to_string),
        derived_from: None,
        cpu: definition.cpu().map(str::to_string),
        memory: definition.memory().map(str::to_string),
        containers: definition
            .container_definitions()
            .iter()
            .map(container_spec)
            .collect(),
    }
}

fn container_spec(definition: &ContainerDefinition) -> ContainerSpec {
    ContainerSpec {
        name: definition.name().unwrap_or_default().to_string(),
        image: definition.image().unwrap_or_default().to_string(),
        cpu: definition.cpu(),
        memory: definition.memory(),
        memory_reservation: definition.memory_reservation(),
        secrets: definition
            .secrets()
            .iter()
            .map(|s| SecretReference::new(s.name(), s.value_from()))
            .collect(),
    }
}

/// Copy each source container definition and write the modelled fields of
/// its desired counterpart on top.
pub fn overlay_containers(
    source: &[ContainerDefinition],
    desired: &[ContainerSpec],
) -> ProviderResult<Vec<ContainerDefinition>> {
    desired
        .iter()
        .map(|spec| {
            let mut definition = source
                .iter()
                .find(|d| d.name() == Some(spec.name.as_str()))
                .cloned()
                .ok_or_else(|| {
                    ProviderError::Rejected(format!(
                        "container {} is not part of the source task definition",
                        spec.name
                    ))
                })?;

            definition.image = Some(spec.image.clone());
            definition.memory_reservation = spec.memory_reservation;
            if !spec.secrets.is_empty() || definition.secrets.is_some() {
                definition.secrets = Some(
                    spec.secrets
                        .iter()
                        .map(|s| {
                            Secret::builder()
                                .name(&s.name)
                                .value_from(&s.value_from)
                                .build()
                                .map_err(|e| ProviderError::Rejected(e.to_string()))
                        })
                        .collect::<ProviderResult<Vec<_>>>()?,
                );
            }
            Ok(definition)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::config::{BehaviorVersion, Region};
    use aws_sdk_ecs::types::{
        Compatibility, DeploymentAlarms, Deployment, InferenceAccelerator, NetworkMode, PortMapping,
    };

    fn sdk_service(running: i32, deployments: usize) -> Service {
        let mut builder = Service::builder()
            .cluster_arn("arn:aws:ecs:us-east-1:123:cluster/prod")
            .service_arn("arn:aws:ecs:us-east-1:123:service/prod/web")
            .service_name("web")
            .task_definition("arn:aws:ecs:us-east-1:123:task-definition/prod-web:7")
            .desired_count(2)
            .running_count(running)
            .status("ACTIVE")
            .health_check_grace_period_seconds(0)
            .deployment_configuration(
                SdkDeploymentConfiguration::builder()
                    .maximum_percent(200)
                    .minimum_healthy_percent(50)
                    .build(),
            )
            .network_configuration(
                SdkNetworkConfiguration::builder()
                    .awsvpc_configuration(
                        AwsVpcConfiguration::builder()
                            .subnets("subnet-1")
                            .security_groups("sg-1")
                            .assign_public_ip(AssignPublicIp::Disabled)
                            .build()
                            .unwrap(),
                    )
                    .build(),
            );
        for _ in 0..deployments {
            builder = builder.deployments(Deployment::builder().status("PRIMARY").build());
        }
        builder.build()
    }

    fn sdk_container() -> ContainerDefinition {
        ContainerDefinition::builder()
            .name("web")
            .image("acct.ecr/web:1.0")
            .memory_reservation(256)
            .port_mappings(PortMapping::builder().container_port(8080).build())
            .secrets(
                Secret::builder()
                    .name("DB_PASS")
                    .value_from("arn:old")
                    .build()
                    .unwrap(),
            )
            .build()
    }

    #[test]
    fn test_service_record_conversion() {
        let record = service_record(&sdk_service(2, 1)).unwrap();

        assert_eq!(record.service_name, "web");
        assert_eq!(record.desired_count, 2);
        assert_eq!(record.configured_grace_period(), None);
        assert_eq!(
            record.deployment_configuration.unwrap().maximum_percent,
            Some(200)
        );
        let network = record.network_configuration.unwrap();
        assert_eq!(network.subnets, vec!["subnet-1".to_string()]);
        assert_eq!(network.assign_public_ip, Some(false));
    }

    #[test]
    fn test_service_record_requires_arns() {
        let service = Service::builder().service_name("web").build();
        assert!(service_record(&service).is_err());
    }

    #[test]
    fn test_stability() {
        assert_eq!(stability(&sdk_service(2, 1)), StabilityStatus::Stable);
        assert_eq!(
            stability(&sdk_service(2, 2)),
            StabilityStatus::NotYet {
                running: 2,
                desired: 2,
                deployments: 2
            }
        );
        assert!(!stability(&sdk_service(1, 1)).is_stable());
    }

    #[test]
    fn test_task_template_conversion() {
        let definition = TaskDefinition::builder()
            .family("prod-web")
            .revision(7)
            .task_definition_arn("arn:aws:ecs:us-east-1:123:task-definition/prod-web:7")
            .container_definitions(sdk_container())
            .build();

        let template = task_template(&definition);
        assert_eq!(template.family, "prod-web");
        assert_eq!(template.revision, 7);
        let container = template.primary_container().unwrap();
        assert_eq!(container.image, "acct.ecr/web:1.0");
        assert_eq!(container.secret("DB_PASS").unwrap().value_from, "arn:old");
    }

    #[test]
    fn test_overlay_keeps_unmodelled_fields() {
        let source = vec![sdk_container()];
        let desired = vec![ContainerSpec {
            name: "web".to_string(),
            image: "acct.ecr/web:2.0".to_string(),
            cpu: 0,
            memory: None,
            memory_reservation: Some(512),
            secrets: vec![SecretReference::new("API_KEY", "arn:new")],
        }];

        let merged = overlay_containers(&source, &desired).unwrap();

        assert_eq!(merged[0].image(), Some("acct.ecr/web:2.0"));
        assert_eq!(merged[0].memory_reservation(), Some(512));
        assert_eq!(merged[0].port_mappings().len(), 1);
        let names: Vec<_> = merged[0].secrets().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["API_KEY"]);
        // the source is left as it was
        assert_eq!(source[0].image(), Some("acct.ecr/web:1.0"));
    }

    #[test]
    fn test_overlay_unknown_container() {
        let desired = vec![ContainerSpec {
            name: "worker".to_string(),
            image: "worker:1".to_string(),
            cpu: 0,
            memory: None,
            memory_reservation: None,
            secrets: vec![],
        }];
        let err = overlay_containers(&[sdk_container()], &desired).unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)));
    }

    #[test]
    fn test_every_lookup_failure_is_not_found() {
        for reason in ["MISSING", "INACTIVE"] {
            let failure = Failure::builder()
                .arn("arn:aws:ecs:us-east-1:123:service/prod/web")
                .reason(reason)
                .build();

            match lookup_failure("prod", "web", &failure) {
                ProviderError::NotFound(message) => {
                    assert!(message.contains("unable to find service web in cluster prod"));
                    assert!(message.ends_with(reason));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_deployment_configuration_from_update() {
        let config = DeploymentConfiguration {
            maximum_percent: Some(150),
            minimum_healthy_percent: Some(100),
            circuit_breaker: Some(CircuitBreaker {
                enable: true,
                rollback: true,
            }),
        };
        let located = SdkDeploymentConfiguration::builder()
            .maximum_percent(200)
            .minimum_healthy_percent(50)
            .alarms(
                DeploymentAlarms::builder()
                    .alarm_names("web-5xx")
                    .enable(true)
                    .rollback(false)
                    .build()
                    .unwrap(),
            )
            .build();

        let sdk = sdk_deployment_configuration(&config, Some(located));

        assert_eq!(sdk.maximum_percent(), Some(150));
        assert_eq!(sdk.minimum_healthy_percent(), Some(100));
        let breaker = sdk.deployment_circuit_breaker().unwrap();
        assert!(breaker.enable());
        assert!(breaker.rollback());
        // alarms are not modelled and survive from the located service
        assert_eq!(sdk.alarms().unwrap().alarm_names(), ["web-5xx".to_string()]);

        let sdk = sdk_deployment_configuration(&DeploymentConfiguration::default(), None);
        assert_eq!(sdk.maximum_percent(), None);
        assert!(sdk.deployment_circuit_breaker().is_none());
    }

    #[test]
    fn test_network_configuration_from_update() {
        let config = NetworkConfiguration {
            subnets: vec!["subnet-1".to_string(), "subnet-2".to_string()],
            security_groups: vec![],
            assign_public_ip: Some(true),
        };

        let sdk = sdk_network_configuration(&config).unwrap();
        let vpc = sdk.awsvpc_configuration().unwrap();

        assert_eq!(vpc.subnets(), ["subnet-1".to_string(), "subnet-2".to_string()]);
        assert!(vpc.security_groups().is_empty());
        assert_eq!(vpc.assign_public_ip(), Some(&AssignPublicIp::Enabled));
    }

    #[test]
    fn test_service_record_round_trips_into_update_types() {
        let record = service_record(&sdk_service(2, 1)).unwrap();
        let network = sdk_network_configuration(record.network_configuration.as_ref().unwrap()).unwrap();
        let vpc = network.awsvpc_configuration().unwrap();
        assert_eq!(vpc.security_groups(), ["sg-1".to_string()]);
        assert_eq!(vpc.assign_public_ip(), Some(&AssignPublicIp::Disabled));
    }

    #[test]
    fn test_registration_inherits_source_settings() {
        let config = aws_sdk_ecs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        let client = Client::from_conf(config);

        let source = TaskDefinition::builder()
            .family("prod-web")
            .execution_role_arn("arn:aws:iam::123:role/web-exec")
            .network_mode(NetworkMode::Awsvpc)
            .requires_compatibilities(Compatibility::Fargate)
            .inference_accelerators(
                InferenceAccelerator::builder()
                    .device_name("eia")
                    .device_type("eia2.medium")
                    .build()
                    .unwrap(),
            )
            .build();
        let tags = vec![Tag::builder().key("team").value("web").build()];

        let request = inherit_from_source(client.register_task_definition(), &source, &tags);

        assert_eq!(
            request.get_execution_role_arn().as_deref(),
            Some("arn:aws:iam::123:role/web-exec")
        );
        assert_eq!(request.get_network_mode(), &Some(NetworkMode::Awsvpc));
        assert_eq!(request.get_inference_accelerators().as_ref().map(Vec::len), Some(1));
        assert_eq!(request.get_tags().as_ref().unwrap()[0].key(), Some("team"));

        let untagged = inherit_from_source(client.register_task_definition(), &source, &[]);
        assert!(untagged.get_tags().is_none());
    }
}
