//! Event-driven maintenance of the profile → owner id mapping.
//!
//! One `handle` call per lifecycle event. In the primary region every event
//! first makes sure the home volume replica exists, regardless of kind, so
//! provisioning does not depend on event ordering.

use crate::error::{DrError, Result};
use crate::event::{EventKind, ProfileEvent};
use crate::provisioner::{ReplicaOutcome, ReplicaProvisioner};
use crate::services::{MappingStore, ProfileService, TrackerClients};
use crate::types::UidMappingRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// What one handled event did to the local mapping store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingChange {
    /// A record was written.
    Put(UidMappingRecord),
    /// The record for this profile was deleted (or was already absent).
    Deleted(String),
    /// The event kind is not one the maintainer acts on.
    Ignored(String),
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleOutcome {
    /// Replica check result, when running in the primary region.
    pub replica: Option<ReplicaOutcome>,
    /// Mapping store change.
    pub change: MappingChange,
}

/// Reacts to profile lifecycle events for one region.
pub struct MappingMaintainer {
    primary_region: String,
    store: Arc<dyn MappingStore>,
    profiles: Arc<dyn ProfileService>,
    provisioner: ReplicaProvisioner,
    timeout: Option<Duration>,
}

impl MappingMaintainer {
    /// Build a maintainer from injected client handles.
    pub fn new(
        clients: TrackerClients,
        primary_region: impl Into<String>,
        secondary_region: impl Into<String>,
    ) -> Self {
        let provisioner = ReplicaProvisioner::new(
            clients.profiles.clone(),
            clients.replication,
            clients.parameters,
            secondary_region,
        );
        Self {
            primary_region: primary_region.into(),
            store: clients.store,
            profiles: clients.profiles,
            provisioner,
            timeout: None,
        }
    }

    /// Replace the replica provisioner (e.g. to change the parameter name).
    pub fn with_provisioner(mut self, provisioner: ReplicaProvisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// Bound each invocation by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Handle one event, bounded by the configured timeout if any.
    pub async fn handle(&self, event: &ProfileEvent) -> Result<HandleOutcome> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.handle_inner(event))
                .await
                .map_err(|_| DrError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => self.handle_inner(event).await,
        }
    }

    async fn handle_inner(&self, event: &ProfileEvent) -> Result<HandleOutcome> {
        let replica = if event.origination_region == self.primary_region {
            Some(self.provisioner.ensure_replica(&event.domain_id).await?)
        } else {
            None
        };

        let change = match &event.kind {
            EventKind::ProfileDeleted => {
                self.store.delete(&event.profile_name).await?;
                info!(
                    profile = %event.profile_name,
                    table = self.store.table_name(),
                    "mapping deleted"
                );
                MappingChange::Deleted(event.profile_name.clone())
            }
            EventKind::ProfileCreated => {
                let owner_id = self
                    .profiles
                    .describe_user_profile(&event.domain_id, &event.profile_name)
                    .await?;
                info!(profile = %event.profile_name, owner_id = %owner_id, "new profile found");
                let record = UidMappingRecord {
                    profile_name: event.profile_name.clone(),
                    owner_id,
                    created_at: event.event_time,
                    updated_at: event.origination_time,
                };
                self.store.put(&record).await?;
                info!(
                    profile = %record.profile_name,
                    owner_id = %record.owner_id,
                    table = self.store.table_name(),
                    "mapping written"
                );
                MappingChange::Put(record)
            }
            EventKind::Unrecognized(name) => {
                warn!(event_name = %name, profile = %event.profile_name, "ignoring event");
                MappingChange::Ignored(name.clone())
            }
        };

        Ok(HandleOutcome { replica, change })
    }
}
