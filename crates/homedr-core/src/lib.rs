#![warn(missing_docs)]

//! HomeDR core: per-user home directory continuity across a primary and a
//! secondary notebook domain.
//!
//! The [`maintainer`] keeps each region's profile → owner id table current and
//! provisions the home volume replica; the [`recovery`] synchronizer merges the
//! replicated home directories into the secondary domain at failover.

pub mod config;
pub mod error;
pub mod event;
pub mod maintainer;
pub mod memory;
pub mod merge;
pub mod provisioner;
pub mod recovery;
pub mod report;
pub mod services;
pub mod types;
pub mod uidmap;

pub use config::{RecoveryConfig, TrackerConfig};
pub use error::{DrError, Result};
pub use event::{EventKind, ProfileEvent};
pub use maintainer::{HandleOutcome, MappingChange, MappingMaintainer};
pub use merge::{ChownStats, LocalFs, MergeOptions, MergeStats, WorkspaceFs};
pub use provisioner::{ReplicaOutcome, ReplicaProvisioner, REPLICA_PARAMETER_NAME};
pub use recovery::{RecoverySynchronizer, SkipReason, SyncOutcome};
pub use report::{ProfileReport, RecoveryReport};
pub use services::{
    MappingStore, ParameterStore, ProfileService, RecoveryClients, ReplicationApi, TrackerClients,
};
pub use types::{
    DomainDescription, ProfileStatus, ReplicationConfiguration, UidMappingRecord, UserProfile,
};
pub use uidmap::{UidMapper, UidMapping};
