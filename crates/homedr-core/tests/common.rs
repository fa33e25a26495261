//! Common fixtures for integration tests: a two-region deployment with
//! in-memory services and temporary mount points.

#![allow(dead_code)]

use chrono::Utc;
use homedr_core::memory::{
    InMemoryMappingStore, InMemoryParameterStore, InMemoryProfileService, InMemoryReplication,
    SimulatedOwnershipFs,
};
use homedr_core::{
    MappingMaintainer, MappingStore, ProfileStatus, RecoveryClients, RecoveryConfig,
    RecoverySynchronizer, TrackerClients, UidMappingRecord,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const PRIMARY_REGION: &str = "us-east-1";
pub const SECONDARY_REGION: &str = "us-west-2";
pub const PRIMARY_DOMAIN: &str = "d-primary";
pub const SECONDARY_DOMAIN: &str = "d-secondary";

/// Both regions of a deployment plus the mounted volumes of the recovery job.
pub struct TestDeployment {
    tmp: TempDir,
    pub primary_store: Arc<InMemoryMappingStore>,
    pub secondary_store: Arc<InMemoryMappingStore>,
    pub primary_profiles: Arc<InMemoryProfileService>,
    pub secondary_profiles: Arc<InMemoryProfileService>,
    pub replication: Arc<InMemoryReplication>,
    pub parameters: Arc<InMemoryParameterStore>,
    pub fs: Arc<SimulatedOwnershipFs>,
}

impl TestDeployment {
    pub async fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("source_efs")).unwrap();
        fs::create_dir_all(tmp.path().join("target_efs")).unwrap();

        let primary_profiles = Arc::new(InMemoryProfileService::new(PRIMARY_REGION));
        primary_profiles.add_domain(PRIMARY_DOMAIN, "fs-primary").await;
        let secondary_profiles = Arc::new(InMemoryProfileService::new(SECONDARY_REGION));
        secondary_profiles
            .add_domain(SECONDARY_DOMAIN, "fs-secondary")
            .await;

        Self {
            tmp,
            primary_store: Arc::new(InMemoryMappingStore::new("uid-tracker-primary")),
            secondary_store: Arc::new(InMemoryMappingStore::new("uid-tracker-secondary")),
            primary_profiles,
            secondary_profiles,
            replication: Arc::new(InMemoryReplication::new()),
            parameters: Arc::new(InMemoryParameterStore::new()),
            fs: Arc::new(SimulatedOwnershipFs::new()),
        }
    }

    pub fn source_root(&self) -> PathBuf {
        self.tmp.path().join("source_efs")
    }

    pub fn target_root(&self) -> PathBuf {
        self.tmp.path().join("target_efs")
    }

    /// Maintainer deployed in the primary region.
    pub fn primary_maintainer(&self) -> MappingMaintainer {
        MappingMaintainer::new(
            TrackerClients {
                store: self.primary_store.clone(),
                profiles: self.primary_profiles.clone(),
                replication: self.replication.clone(),
                parameters: self.parameters.clone(),
            },
            PRIMARY_REGION,
            SECONDARY_REGION,
        )
    }

    /// Maintainer deployed in the secondary region.
    pub fn secondary_maintainer(&self) -> MappingMaintainer {
        MappingMaintainer::new(
            TrackerClients {
                store: self.secondary_store.clone(),
                profiles: self.secondary_profiles.clone(),
                replication: self.replication.clone(),
                parameters: self.parameters.clone(),
            },
            PRIMARY_REGION,
            SECONDARY_REGION,
        )
    }

    pub fn recovery_config(&self) -> RecoveryConfig {
        RecoveryConfig {
            primary_table: self.primary_store.table_name().to_string(),
            secondary_table: self.secondary_store.table_name().to_string(),
            secondary_domain_id: SECONDARY_DOMAIN.to_string(),
            source_root: self.source_root(),
            target_root: self.target_root(),
            ..RecoveryConfig::default()
        }
    }

    pub fn synchronizer(&self) -> RecoverySynchronizer {
        self.synchronizer_with(self.recovery_config())
    }

    pub fn synchronizer_with(&self, config: RecoveryConfig) -> RecoverySynchronizer {
        RecoverySynchronizer::new(
            RecoveryClients {
                primary_store: self.primary_store.clone(),
                secondary_store: self.secondary_store.clone(),
                profiles: self.secondary_profiles.clone(),
            },
            self.fs.clone(),
            config,
        )
    }

    /// Register an InService profile in the secondary domain.
    pub async fn active_profile(&self, name: &str) {
        self.secondary_profiles
            .add_profile(SECONDARY_DOMAIN, name, "", ProfileStatus::InService)
            .await;
    }

    pub async fn map(&self, store: &InMemoryMappingStore, name: &str, uid: &str) {
        let now = Utc::now();
        store
            .put(&UidMappingRecord {
                profile_name: name.to_string(),
                owner_id: uid.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    pub fn write_source(&self, rel: &str, content: &str) {
        write_file(&self.source_root().join(rel), content);
    }

    pub fn write_target(&self, rel: &str, content: &str) {
        write_file(&self.target_root().join(rel), content);
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Every path under `root` (including `root`), relative, sorted.
pub fn tree(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    collect(root, root, &mut out);
    out.sort();
    out
}

fn collect(root: &Path, path: &Path, out: &mut Vec<String>) {
    out.push(
        path.strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .into_owned(),
    );
    if fs::symlink_metadata(path).unwrap().is_dir() {
        for entry in fs::read_dir(path).unwrap() {
            collect(root, &entry.unwrap().path(), out);
        }
    }
}
