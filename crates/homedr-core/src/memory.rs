//! In-process collaborator implementations.
//!
//! Used by tests and by local recovery drills. Each type supports simple fault
//! injection so failure isolation can be exercised without real services.

use crate::error::{DrError, Result};
use crate::merge::{ChownStats, LocalFs, MergeOptions, MergeStats, WorkspaceFs};
use crate::services::{MappingStore, ParameterStore, ProfileService, ReplicationApi};
use crate::types::{
    DomainDescription, ProfileStatus, ReplicationConfiguration, UidMappingRecord, UserProfile,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// A mapping store held in a `HashMap`.
pub struct InMemoryMappingStore {
    table: String,
    records: Mutex<HashMap<String, UidMappingRecord>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryMappingStore {
    /// Create an empty store named `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            records: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make every put/delete fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every get fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns true if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    fn store_error(&self, op: &str) -> DrError {
        DrError::MappingStore {
            table: self.table.clone(),
            msg: format!("injected {} failure", op),
        }
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    fn table_name(&self) -> &str {
        &self.table
    }

    async fn put(&self, record: &UidMappingRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(self.store_error("put"));
        }
        self.records
            .lock()
            .await
            .insert(record.profile_name.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, profile_name: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(self.store_error("delete"));
        }
        self.records.lock().await.remove(profile_name);
        Ok(())
    }

    async fn get(&self, profile_name: &str) -> Result<Option<UidMappingRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(self.store_error("get"));
        }
        Ok(self.records.lock().await.get(profile_name).cloned())
    }
}

#[derive(Debug, Clone)]
struct ProfileEntry {
    owner_id: String,
    status: ProfileStatus,
}

/// A profile service backed by in-memory domains and profiles.
pub struct InMemoryProfileService {
    region: String,
    domains: Mutex<HashMap<String, String>>,
    profiles: Mutex<HashMap<String, Vec<(String, ProfileEntry)>>>,
    fail_list: AtomicBool,
}

impl InMemoryProfileService {
    /// Create an empty service reporting profiles in `region`.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            domains: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            fail_list: AtomicBool::new(false),
        }
    }

    /// Register a domain and its home volume.
    pub async fn add_domain(&self, domain_id: &str, home_volume_id: &str) {
        self.domains
            .lock()
            .await
            .insert(domain_id.to_string(), home_volume_id.to_string());
    }

    /// Register (or replace) a profile. Listing preserves insertion order.
    pub async fn add_profile(
        &self,
        domain_id: &str,
        name: &str,
        owner_id: &str,
        status: ProfileStatus,
    ) {
        let mut profiles = self.profiles.lock().await;
        let entries = profiles.entry(domain_id.to_string()).or_default();
        entries.retain(|(n, _)| n != name);
        entries.push((
            name.to_string(),
            ProfileEntry {
                owner_id: owner_id.to_string(),
                status,
            },
        ));
    }

    /// Make `list_user_profiles` fail until reset.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileService for InMemoryProfileService {
    async fn describe_domain(&self, domain_id: &str) -> Result<DomainDescription> {
        let domains = self.domains.lock().await;
        let home_volume_id = domains.get(domain_id).ok_or_else(|| DrError::NotFound {
            what: format!("domain {}", domain_id),
        })?;
        Ok(DomainDescription {
            domain_id: domain_id.to_string(),
            home_volume_id: home_volume_id.clone(),
        })
    }

    async fn describe_user_profile(&self, domain_id: &str, profile_name: &str) -> Result<String> {
        let profiles = self.profiles.lock().await;
        profiles
            .get(domain_id)
            .and_then(|entries| entries.iter().find(|(n, _)| n == profile_name))
            .map(|(_, entry)| entry.owner_id.clone())
            .ok_or_else(|| DrError::NotFound {
                what: format!("user profile {}/{}", domain_id, profile_name),
            })
    }

    async fn list_user_profiles(&self, domain_id: &str) -> Result<Vec<UserProfile>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DrError::ProfileService {
                msg: "injected list failure".to_string(),
            });
        }
        let profiles = self.profiles.lock().await;
        Ok(profiles
            .get(domain_id)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(name, entry)| UserProfile {
                        name: name.clone(),
                        domain_id: domain_id.to_string(),
                        region: self.region.clone(),
                        status: entry.status.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A replication API that enforces one configuration per source volume.
///
/// Describe yields to the scheduler before answering so concurrent callers can
/// interleave between describe and create.
pub struct InMemoryReplication {
    configs: Mutex<HashMap<String, ReplicationConfiguration>>,
    next_volume: AtomicU64,
    create_calls: AtomicU64,
    fail_describe: AtomicBool,
}

impl InMemoryReplication {
    /// Create an API with no configurations.
    pub fn new() -> Self {
        Self {
            configs: Mutex::new(HashMap::new()),
            next_volume: AtomicU64::new(1),
            create_calls: AtomicU64::new(0),
            fail_describe: AtomicBool::new(false),
        }
    }

    /// Number of configurations that exist.
    pub async fn config_count(&self) -> usize {
        self.configs.lock().await.len()
    }

    /// Number of create calls received, including rejected duplicates.
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Make describe fail with a non-absence error until reset.
    pub fn set_fail_describe(&self, fail: bool) {
        self.fail_describe.store(fail, Ordering::SeqCst);
    }
}

impl Default for InMemoryReplication {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicationApi for InMemoryReplication {
    async fn describe_replication(
        &self,
        volume_id: &str,
    ) -> Result<Option<ReplicationConfiguration>> {
        if self.fail_describe.load(Ordering::SeqCst) {
            return Err(DrError::Replication {
                volume_id: volume_id.to_string(),
                msg: "injected describe failure".to_string(),
            });
        }
        let found = self.configs.lock().await.get(volume_id).cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn create_replication(
        &self,
        volume_id: &str,
        destination_region: &str,
    ) -> Result<ReplicationConfiguration> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut configs = self.configs.lock().await;
        if configs.contains_key(volume_id) {
            return Err(DrError::ReplicationExists {
                volume_id: volume_id.to_string(),
            });
        }
        let n = self.next_volume.fetch_add(1, Ordering::SeqCst);
        let config = ReplicationConfiguration {
            source_volume_id: volume_id.to_string(),
            destination_region: destination_region.to_string(),
            destination_volume_id: format!("fs-replica{:04}", n),
        };
        configs.insert(volume_id.to_string(), config.clone());
        Ok(config)
    }
}

/// A parameter store held in a `HashMap`.
#[derive(Default)]
pub struct InMemoryParameterStore {
    params: Mutex<HashMap<String, String>>,
    puts: AtomicU64,
}

impl InMemoryParameterStore {
    /// Create an empty parameter store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a parameter.
    pub async fn get(&self, name: &str) -> Option<String> {
        self.params.lock().await.get(name).cloned()
    }

    /// Number of successful puts.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn put_parameter(&self, name: &str, value: &str, _description: &str) -> Result<()> {
        self.params
            .lock()
            .await
            .insert(name.to_string(), value.to_string());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A [`WorkspaceFs`] that merges on the real filesystem but records ownership
/// changes instead of applying them, so drills can run without privileges.
///
/// Merges into a directory registered with [`deny`](Self::deny) fail with a
/// permission error.
#[derive(Default)]
pub struct SimulatedOwnershipFs {
    inner: LocalFs,
    owners: std::sync::Mutex<HashMap<PathBuf, (u32, u32)>>,
    denied: std::sync::Mutex<HashSet<PathBuf>>,
}

impl SimulatedOwnershipFs {
    /// Create a filesystem with no recorded owners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make merges into `dst` fail.
    pub fn deny(&self, dst: impl Into<PathBuf>) {
        if let Ok(mut denied) = self.denied.lock() {
            denied.insert(dst.into());
        }
    }

    fn record_tree(&self, path: &Path, owner: (u32, u32), stats: &mut ChownStats) -> Result<()> {
        let meta = std::fs::symlink_metadata(path).map_err(|e| DrError::fs(path, e))?;
        let previous = self.owner(path)?;
        if previous == owner {
            stats.unchanged += 1;
        } else {
            stats.changed += 1;
            self.owners
                .lock()
                .map_err(|e| DrError::Task { msg: e.to_string() })?
                .insert(path.to_path_buf(), owner);
        }
        if meta.is_dir() {
            for name in self.inner.list(path)? {
                self.record_tree(&path.join(name), owner, stats)?;
            }
        }
        Ok(())
    }
}

impl WorkspaceFs for SimulatedOwnershipFs {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn list(&self, path: &Path) -> Result<Vec<String>> {
        self.inner.list(path)
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        self.inner.mkdir(path)
    }

    fn merge_copy(&self, src: &Path, dst: &Path, opts: &MergeOptions) -> Result<MergeStats> {
        let denied = self
            .denied
            .lock()
            .map(|d| d.contains(dst))
            .unwrap_or(false);
        if denied {
            return Err(DrError::fs(
                dst,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }
        self.inner.merge_copy(src, dst, opts)
    }

    fn chown_recursive(&self, path: &Path, uid: u32, gid: u32) -> Result<ChownStats> {
        let mut stats = ChownStats::default();
        self.record_tree(path, (uid, gid), &mut stats)?;
        Ok(stats)
    }

    fn owner(&self, path: &Path) -> Result<(u32, u32)> {
        let recorded = self
            .owners
            .lock()
            .map_err(|e| DrError::Task { msg: e.to_string() })?
            .get(path)
            .copied();
        match recorded {
            Some(owner) => Ok(owner),
            None => self.inner.owner(path),
        }
    }
}
