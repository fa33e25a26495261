//! EFS cross-region replication.

use crate::sdk::error_text;
use async_trait::async_trait;
use aws_sdk_efs::error::ProvideErrorMetadata;
use aws_sdk_efs::operation::describe_replication_configurations::DescribeReplicationConfigurationsError;
use aws_sdk_efs::types::{Destination, DestinationToCreate};
use aws_sdk_efs::Client;
use homedr_core::{DrError, ReplicationApi, ReplicationConfiguration, Result};

/// Error code EFS returns when the volume already has a replication.
const CONFLICT_CODE: &str = "ConflictException";

/// Replication API backed by EFS in the source volume's region.
#[derive(Debug, Clone)]
pub struct EfsReplicationApi {
    client: Client,
}

impl EfsReplicationApi {
    /// Create from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn replication_error(volume_id: &str, op: &str, err: impl std::error::Error) -> DrError {
    DrError::Replication {
        volume_id: volume_id.to_string(),
        msg: format!("{} failed: {}", op, error_text(&err)),
    }
}

/// Map a failed CreateReplicationConfiguration call. A conflict means the
/// volume already replicates, which callers treat as a lost race.
pub fn create_failure(volume_id: &str, code: Option<&str>, detail: String) -> DrError {
    match code {
        Some(CONFLICT_CODE) => DrError::ReplicationExists {
            volume_id: volume_id.to_string(),
        },
        _ => DrError::Replication {
            volume_id: volume_id.to_string(),
            msg: format!("CreateReplicationConfiguration failed: {}", detail),
        },
    }
}

/// Build a configuration from the first destination. `None` if there is none.
pub fn configuration_from(
    source_volume_id: &str,
    destinations: &[Destination],
) -> Option<ReplicationConfiguration> {
    let destination = destinations.first()?;
    Some(ReplicationConfiguration {
        source_volume_id: source_volume_id.to_string(),
        destination_region: destination.region().to_string(),
        destination_volume_id: destination.file_system_id().to_string(),
    })
}

#[async_trait]
impl ReplicationApi for EfsReplicationApi {
    async fn describe_replication(
        &self,
        volume_id: &str,
    ) -> Result<Option<ReplicationConfiguration>> {
        let output = match self
            .client
            .describe_replication_configurations()
            .file_system_id(volume_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(DescribeReplicationConfigurationsError::ReplicationNotFound(_))
                ) =>
            {
                return Ok(None);
            }
            Err(e) => {
                return Err(replication_error(
                    volume_id,
                    "DescribeReplicationConfigurations",
                    e,
                ))
            }
        };
        Ok(output
            .replications()
            .iter()
            .find_map(|r| configuration_from(r.source_file_system_id(), r.destinations())))
    }

    async fn create_replication(
        &self,
        volume_id: &str,
        destination_region: &str,
    ) -> Result<ReplicationConfiguration> {
        let output = self
            .client
            .create_replication_configuration()
            .source_file_system_id(volume_id)
            .destinations(DestinationToCreate::builder().region(destination_region).build())
            .send()
            .await
            .map_err(|e| {
                let code = e.as_service_error().and_then(|s| s.code());
                create_failure(volume_id, code, error_text(&e))
            })?;
        configuration_from(volume_id, output.destinations()).ok_or_else(|| {
            DrError::Replication {
                volume_id: volume_id.to_string(),
                msg: "created replication has no destination".to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_efs::types::ReplicationStatus;

    fn destination(region: &str, fs: &str) -> Destination {
        Destination::builder()
            .status(ReplicationStatus::Enabling)
            .file_system_id(fs)
            .region(region)
            .build()
            .unwrap()
    }

    #[test]
    fn test_configuration_from_first_destination() {
        let config = configuration_from(
            "fs-source",
            &[
                destination("us-west-2", "fs-replica"),
                destination("eu-west-1", "fs-other"),
            ],
        )
        .unwrap();
        assert_eq!(config.source_volume_id, "fs-source");
        assert_eq!(config.destination_region, "us-west-2");
        assert_eq!(config.destination_volume_id, "fs-replica");
    }

    #[test]
    fn test_no_destination_is_none() {
        assert!(configuration_from("fs-source", &[]).is_none());
    }

    mod create_failure {
        use super::*;

        #[test]
        fn test_conflict_is_existing_replication() {
            let err = create_failure("fs-1", Some("ConflictException"), "conflict".to_string());
            assert!(matches!(err, DrError::ReplicationExists { ref volume_id } if volume_id == "fs-1"));
            assert!(err.is_expected_absence());
        }

        #[test]
        fn test_other_code_is_replication_error() {
            let err = create_failure(
                "fs-1",
                Some("ValidationException"),
                "bad region".to_string(),
            );
            match err {
                DrError::Replication { volume_id, msg } => {
                    assert_eq!(volume_id, "fs-1");
                    assert_eq!(msg, "CreateReplicationConfiguration failed: bad region");
                }
                other => panic!("unexpected error {:?}", other),
            }
        }

        #[test]
        fn test_missing_code_is_replication_error() {
            let err = create_failure("fs-1", None, "timeout".to_string());
            assert!(matches!(err, DrError::Replication { .. }));
            assert!(!err.is_expected_absence());
        }
    }
}
