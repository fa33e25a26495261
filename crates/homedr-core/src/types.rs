//! Domain types shared by the mapping maintainer and the recovery synchronizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a user profile as reported by the profile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileStatus {
    /// The profile is active and may own a home directory.
    InService,
    /// Any other status (Pending, Deleting, Failed, Updating, ...).
    Other(String),
}

impl ProfileStatus {
    /// Parse the service's status string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "InService" => ProfileStatus::InService,
            other => ProfileStatus::Other(other.to_string()),
        }
    }

    /// Returns true if the profile is InService.
    pub fn is_in_service(&self) -> bool {
        matches!(self, ProfileStatus::InService)
    }
}

/// A tenant workspace entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Profile name, unique within a domain.
    pub name: String,
    /// Owning domain identifier.
    pub domain_id: String,
    /// Region the profile lives in.
    pub region: String,
    /// Lifecycle status.
    pub status: ProfileStatus,
}

/// One row of a region's mapping store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidMappingRecord {
    /// Profile name (the store key).
    pub profile_name: String,
    /// Storage-owner identifier, opaque until ownership is fixed.
    pub owner_id: String,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Description of a domain needed for replica provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDescription {
    /// Domain identifier.
    pub domain_id: String,
    /// Identifier of the domain's home storage volume.
    pub home_volume_id: String,
}

/// A cross-region replication of one source volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfiguration {
    /// Source volume identifier; at most one configuration per value.
    pub source_volume_id: String,
    /// Region the replica lives in.
    pub destination_region: String,
    /// Replica volume identifier.
    pub destination_volume_id: String,
}
