//! SageMaker domain and user profile lookups.

use crate::sdk::error_text;
use async_trait::async_trait;
use aws_sdk_sagemaker::operation::describe_domain::DescribeDomainError;
use aws_sdk_sagemaker::operation::describe_user_profile::DescribeUserProfileError;
use aws_sdk_sagemaker::types::UserProfileDetails;
use aws_sdk_sagemaker::Client;
use homedr_core::{DomainDescription, DrError, ProfileService, ProfileStatus, Result, UserProfile};
use tracing::debug;

/// Profile service backed by the SageMaker API of one region.
#[derive(Debug, Clone)]
pub struct SageMakerProfileService {
    client: Client,
    region: String,
}

impl SageMakerProfileService {
    /// Create from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();
        Self {
            client: Client::new(sdk_config),
            region,
        }
    }
}

fn service_error(op: &str, err: impl std::error::Error) -> DrError {
    DrError::ProfileService {
        msg: format!("{} failed: {}", op, error_text(&err)),
    }
}

/// Convert one listing entry. Entries without a name are dropped.
pub fn profile_from_details(
    details: &UserProfileDetails,
    domain_id: &str,
    region: &str,
) -> Option<UserProfile> {
    let name = details.user_profile_name()?;
    let status = details
        .status()
        .map(|s| ProfileStatus::parse(s.as_str()))
        .unwrap_or_else(|| ProfileStatus::Other(String::new()));
    Some(UserProfile {
        name: name.to_string(),
        domain_id: details.domain_id().unwrap_or(domain_id).to_string(),
        region: region.to_string(),
        status,
    })
}

#[async_trait]
impl ProfileService for SageMakerProfileService {
    async fn describe_domain(&self, domain_id: &str) -> Result<DomainDescription> {
        let output = self
            .client
            .describe_domain()
            .domain_id(domain_id)
            .send()
            .await
            .map_err(|e| {
                if matches!(
                    e.as_service_error(),
                    Some(DescribeDomainError::ResourceNotFound(_))
                ) {
                    DrError::NotFound {
                        what: format!("domain {}", domain_id),
                    }
                } else {
                    service_error("DescribeDomain", e)
                }
            })?;
        let home_volume_id = output
            .home_efs_file_system_id()
            .ok_or_else(|| DrError::ProfileService {
                msg: format!("domain {} has no home volume", domain_id),
            })?;
        Ok(DomainDescription {
            domain_id: domain_id.to_string(),
            home_volume_id: home_volume_id.to_string(),
        })
    }

    async fn describe_user_profile(&self, domain_id: &str, profile_name: &str) -> Result<String> {
        let output = self
            .client
            .describe_user_profile()
            .domain_id(domain_id)
            .user_profile_name(profile_name)
            .send()
            .await
            .map_err(|e| {
                if matches!(
                    e.as_service_error(),
                    Some(DescribeUserProfileError::ResourceNotFound(_))
                ) {
                    DrError::NotFound {
                        what: format!("user profile {} in {}", profile_name, domain_id),
                    }
                } else {
                    service_error("DescribeUserProfile", e)
                }
            })?;
        output
            .home_efs_file_system_uid()
            .map(str::to_string)
            .ok_or_else(|| DrError::ProfileService {
                msg: format!("user profile {} has no home owner id", profile_name),
            })
    }

    async fn list_user_profiles(&self, domain_id: &str) -> Result<Vec<UserProfile>> {
        let mut profiles = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_user_profiles()
                .domain_id_equals(domain_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| service_error("ListUserProfiles", e))?;
            profiles.extend(
                output
                    .user_profiles()
                    .iter()
                    .filter_map(|d| profile_from_details(d, domain_id, &self.region)),
            );
            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
            debug!(domain_id, fetched = profiles.len(), "listing next page");
        }
        Ok(profiles)
    }
}
