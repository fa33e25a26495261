//! Collaborator interfaces consumed by the maintainer and the synchronizer.
//!
//! Handles are constructed once at process start and passed down explicitly.
//! The AWS-backed implementations live in `homedr-aws`; in-memory ones in
//! [`crate::memory`].

use crate::error::Result;
use crate::types::{DomainDescription, ReplicationConfiguration, UidMappingRecord, UserProfile};
use async_trait::async_trait;
use std::sync::Arc;

/// A per-region durable table of profile name to owner identifier.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Name of the backing table, for logging.
    fn table_name(&self) -> &str;

    /// Write (overwrite) the record keyed by `record.profile_name`.
    async fn put(&self, record: &UidMappingRecord) -> Result<()>;

    /// Delete the record for `profile_name`. Deleting an absent key succeeds.
    async fn delete(&self, profile_name: &str) -> Result<()>;

    /// Read the record for `profile_name`, if any.
    async fn get(&self, profile_name: &str) -> Result<Option<UidMappingRecord>>;
}

/// The notebook platform's domain/profile API.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Resolve the domain's home volume.
    async fn describe_domain(&self, domain_id: &str) -> Result<DomainDescription>;

    /// Resolve a profile's storage-owner identifier.
    async fn describe_user_profile(&self, domain_id: &str, profile_name: &str) -> Result<String>;

    /// List every profile in the domain, all statuses.
    async fn list_user_profiles(&self, domain_id: &str) -> Result<Vec<UserProfile>>;
}

/// The storage volume replication API.
#[async_trait]
pub trait ReplicationApi: Send + Sync {
    /// Describe the replication of `volume_id`. `Ok(None)` means not found.
    async fn describe_replication(
        &self,
        volume_id: &str,
    ) -> Result<Option<ReplicationConfiguration>>;

    /// Create a replication of `volume_id` into `destination_region`.
    ///
    /// Returns [`crate::DrError::ReplicationExists`] if one already exists.
    async fn create_replication(
        &self,
        volume_id: &str,
        destination_region: &str,
    ) -> Result<ReplicationConfiguration>;
}

/// Shared parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Write `value` under `name`, overwriting any previous value.
    async fn put_parameter(&self, name: &str, value: &str, description: &str) -> Result<()>;
}

/// The client handles one mapping-maintainer process needs.
#[derive(Clone)]
pub struct TrackerClients {
    /// Local region's mapping store.
    pub store: Arc<dyn MappingStore>,
    /// Profile/domain service.
    pub profiles: Arc<dyn ProfileService>,
    /// Volume replication API.
    pub replication: Arc<dyn ReplicationApi>,
    /// Parameter store for publishing the replica id.
    pub parameters: Arc<dyn ParameterStore>,
}

/// The client handles the recovery job needs.
#[derive(Clone)]
pub struct RecoveryClients {
    /// Primary-region mapping store (replicated into the secondary region).
    pub primary_store: Arc<dyn MappingStore>,
    /// Secondary-region mapping store.
    pub secondary_store: Arc<dyn MappingStore>,
    /// Secondary region's profile service.
    pub profiles: Arc<dyn ProfileService>,
}
