//! SSM Parameter Store publishing.

use crate::sdk::error_text;
use async_trait::async_trait;
use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client;
use homedr_core::{DrError, ParameterStore, Result};

/// Parameter store backed by SSM in one region.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    /// Create from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put_parameter(&self, name: &str, value: &str, description: &str) -> Result<()> {
        self.client
            .put_parameter()
            .name(name)
            .description(description)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| DrError::ParameterStore {
                name: name.to_string(),
                msg: error_text(&e),
            })?;
        Ok(())
    }
}
