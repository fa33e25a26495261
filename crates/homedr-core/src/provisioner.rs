//! Idempotent provisioning of the cross-region home volume replica.
//!
//! Describe-then-create is racy when several events trigger provisioning at
//! once. A create rejected as a duplicate is therefore treated as the
//! already-exists case, so only one configuration can ever result.

use crate::error::Result;
use crate::services::{ParameterStore, ProfileService, ReplicationApi};
use crate::types::ReplicationConfiguration;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Parameter under which the replica volume id is published.
pub const REPLICA_PARAMETER_NAME: &str = "/SagemakerDomain/Primary/Replica/EfsId";

/// What `ensure_replica` found or did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaOutcome {
    /// A configuration already existed.
    AlreadyExists {
        /// Source volume.
        volume_id: String,
    },
    /// A configuration was created and its destination published.
    Created(ReplicationConfiguration),
    /// Our create lost a race with another invocation.
    LostRace {
        /// Source volume.
        volume_id: String,
    },
}

/// Ensures a replica of a domain's home volume exists in the secondary region.
pub struct ReplicaProvisioner {
    profiles: Arc<dyn ProfileService>,
    replication: Arc<dyn ReplicationApi>,
    parameters: Arc<dyn ParameterStore>,
    secondary_region: String,
    parameter_name: String,
}

impl ReplicaProvisioner {
    /// Create a provisioner targeting `secondary_region`.
    pub fn new(
        profiles: Arc<dyn ProfileService>,
        replication: Arc<dyn ReplicationApi>,
        parameters: Arc<dyn ParameterStore>,
        secondary_region: impl Into<String>,
    ) -> Self {
        Self {
            profiles,
            replication,
            parameters,
            secondary_region: secondary_region.into(),
            parameter_name: REPLICA_PARAMETER_NAME.to_string(),
        }
    }

    /// Publish under a different parameter name.
    pub fn with_parameter_name(mut self, name: impl Into<String>) -> Self {
        self.parameter_name = name.into();
        self
    }

    /// Parameter name the replica id is published under.
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    /// Make sure the domain's home volume is replicated.
    pub async fn ensure_replica(&self, domain_id: &str) -> Result<ReplicaOutcome> {
        let domain = self.profiles.describe_domain(domain_id).await?;
        let volume_id = domain.home_volume_id;
        info!(domain_id, volume_id = %volume_id, "resolved home volume");

        if let Some(existing) = self.replication.describe_replication(&volume_id).await? {
            info!(
                volume_id = %volume_id,
                destination = %existing.destination_volume_id,
                region = %existing.destination_region,
                "found existing replication"
            );
            return Ok(ReplicaOutcome::AlreadyExists { volume_id });
        }
        info!(volume_id = %volume_id, "no replication found");

        let config = match self
            .replication
            .create_replication(&volume_id, &self.secondary_region)
            .await
        {
            Ok(config) => config,
            Err(e) if e.is_expected_absence() => {
                info!(volume_id = %volume_id, error = %e, "create rejected as duplicate, replication exists");
                return Ok(ReplicaOutcome::LostRace { volume_id });
            }
            Err(e) => return Err(e),
        };
        info!(
            volume_id = %volume_id,
            replica = %config.destination_volume_id,
            "replication created"
        );

        let description = format!(
            "Sagemaker Domain Replicated EFS ID in {}",
            self.secondary_region
        );
        self.parameters
            .put_parameter(
                &self.parameter_name,
                &config.destination_volume_id,
                &description,
            )
            .await?;
        info!(name = %self.parameter_name, "replica id published");

        Ok(ReplicaOutcome::Created(config))
    }
}
