//! SSM Parameter Store

use crate::error::from_sdk;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::types::ParameterType;
use ecs_deploy_core::{Parameter, ParameterPage, ParameterStore, ProviderResult};

#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put(&self, path: &str, value: &str, description: &str) -> ProviderResult<()> {
        self.client
            .put_parameter()
            .name(path)
            .value(value)
            .description(description)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| from_sdk("PutParameter", e))?;

        tracing::debug!(%path, "parameter written");
        Ok(())
    }

    async fn list_page(
        &self,
        path: &str,
        next_token: Option<String>,
    ) -> ProviderResult<ParameterPage> {
        let output = self
            .client
            .get_parameters_by_path()
            .path(path)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| from_sdk("GetParametersByPath", e))?;

        let parameters = output
            .parameters()
            .iter()
            .filter_map(|p| match (p.name(), p.arn()) {
                (Some(name), Some(arn)) => Some(Parameter::new(name, arn)),
                _ => None,
            })
            .collect();

        Ok(ParameterPage {
            parameters,
            next_token: output.next_token().map(str::to_string),
        })
    }
}
