//! Failover-time workspace recovery.
//!
//! Per profile: Discover → Resolve → Decide → Sync → FixOwnership, or Skip.
//! Only the Discover step can abort the run; every profile after that is
//! isolated and the run continues whatever happens to it.

use crate::config::RecoveryConfig;
use crate::error::{DrError, Result};
use crate::merge::{ChownStats, MergeOptions, MergeStats, WorkspaceFs};
use crate::report::{ProfileReport, RecoveryReport};
use crate::services::RecoveryClients;
use crate::uidmap::{parse_owner_id, UidMapper, UidMapping};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Why a profile was not synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No record in the primary region's store.
    SourceUidMissing,
    /// No record in the secondary region's store.
    TargetUidMissing,
    /// The source tree has no directory for the profile (never launched).
    SourceDirMissing,
    /// An owner id cannot name a home directory or a numeric owner.
    InvalidOwnerId(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::SourceUidMissing => write!(f, "source uid not found"),
            SkipReason::TargetUidMissing => write!(f, "target uid not found"),
            SkipReason::SourceDirMissing => write!(f, "no source directory"),
            SkipReason::InvalidOwnerId(id) => write!(f, "invalid owner id {:?}", id),
        }
    }
}

/// Per-profile outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// Merged and re-owned.
    Synced {
        /// Source owner id.
        source_uid: String,
        /// Target owner id.
        target_uid: String,
        /// Whether the target directory had to be created.
        created_target: bool,
        /// Merge counters.
        merge: MergeStats,
        /// Ownership counters.
        chown: ChownStats,
    },
    /// Dry run: would have synced.
    Planned {
        /// Source owner id.
        source_uid: String,
        /// Target owner id.
        target_uid: String,
        /// Whether the target directory would be created.
        creates_target: bool,
    },
    /// Not synced; normal outcome.
    Skipped(SkipReason),
    /// A store or filesystem failure for this profile only.
    Failed(String),
}

impl SyncOutcome {
    /// Short label for logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Synced { .. } => "synced",
            SyncOutcome::Planned { .. } => "planned",
            SyncOutcome::Skipped(_) => "skipped",
            SyncOutcome::Failed(_) => "failed",
        }
    }
}

/// Target of a profile that passed the Decide step.
#[derive(Debug, Clone)]
struct SyncPlan {
    source_dir: PathBuf,
    target_dir: PathBuf,
    uid: u32,
    gid: u32,
}

/// Runs the recovery batch against injected stores, profile service and
/// filesystem.
pub struct RecoverySynchronizer {
    clients: RecoveryClients,
    fs: Arc<dyn WorkspaceFs>,
    config: RecoveryConfig,
}

impl RecoverySynchronizer {
    /// Create a synchronizer.
    pub fn new(clients: RecoveryClients, fs: Arc<dyn WorkspaceFs>, config: RecoveryConfig) -> Self {
        Self {
            clients,
            fs,
            config,
        }
    }

    /// Run once over every InService profile of the secondary domain.
    ///
    /// Fails only when the profile list cannot be obtained.
    pub async fn run(&self) -> Result<RecoveryReport> {
        let mut report =
            RecoveryReport::start(&self.config.secondary_domain_id, self.config.dry_run);

        let names = self.discover().await?;
        info!(profiles = ?names, "user profiles to recover");
        self.log_root("source", &self.config.source_root);
        self.log_root("target", &self.config.target_root);

        for name in names {
            let outcome = self.recover_profile(&name).await;
            match &outcome {
                SyncOutcome::Synced { merge, .. } => info!(
                    profile = %name,
                    copied = merge.files_copied,
                    kept = merge.files_kept,
                    special = merge.special_skipped,
                    "profile synced"
                ),
                SyncOutcome::Planned { source_uid, target_uid, .. } => info!(
                    profile = %name,
                    source_uid = %source_uid,
                    target_uid = %target_uid,
                    "dry run, would sync"
                ),
                SyncOutcome::Skipped(reason) => {
                    info!(profile = %name, reason = %reason, "profile skipped")
                }
                SyncOutcome::Failed(_) => {}
            }
            report.push(ProfileReport {
                profile_name: name,
                outcome,
            });
        }

        report.finish();
        info!(summary = %report.summary(), "workspace recovery finished");
        Ok(report)
    }

    async fn discover(&self) -> Result<Vec<String>> {
        let profiles = self
            .clients
            .profiles
            .list_user_profiles(&self.config.secondary_domain_id)
            .await?;
        Ok(profiles
            .into_iter()
            .filter(|p| p.status.is_in_service())
            .map(|p| p.name)
            .collect())
    }

    fn log_root(&self, side: &str, root: &Path) {
        match self.fs.list(root) {
            Ok(entries) => {
                info!(side, root = %root.display(), entries = ?entries, "uid directories")
            }
            Err(e) => warn!(side, root = %root.display(), error = %e, "cannot list root"),
        }
    }

    /// Recover one profile; never fails, the outcome carries any error.
    pub async fn recover_profile(&self, profile_name: &str) -> SyncOutcome {
        let mapper = UidMapper::new(
            self.clients.primary_store.as_ref(),
            self.clients.secondary_store.as_ref(),
        );
        let mapping = match mapper.resolve(profile_name).await {
            Ok(m) => m,
            Err(e) => return failed(profile_name, "resolve", e),
        };

        let plan = match self.decide(&mapping) {
            Ok(plan) => plan,
            Err(reason) => return SyncOutcome::Skipped(reason),
        };

        if self.config.dry_run {
            return SyncOutcome::Planned {
                creates_target: !self.fs.exists(&plan.target_dir),
                source_uid: mapping.source_uid,
                target_uid: mapping.target_uid,
            };
        }

        let fs = self.fs.clone();
        let opts = self.config.merge;
        let synced = tokio::task::spawn_blocking(move || sync_dir(fs.as_ref(), &plan, &opts))
            .await
            .map_err(|e| DrError::Task { msg: e.to_string() })
            .and_then(|r| r);

        match synced {
            Ok((created_target, merge, chown)) => SyncOutcome::Synced {
                source_uid: mapping.source_uid,
                target_uid: mapping.target_uid,
                created_target,
                merge,
                chown,
            },
            Err(e) => failed(profile_name, "sync", e),
        }
    }

    fn decide(&self, mapping: &UidMapping) -> std::result::Result<SyncPlan, SkipReason> {
        if mapping.source_uid.is_empty() {
            return Err(SkipReason::SourceUidMissing);
        }
        if mapping.target_uid.is_empty() {
            return Err(SkipReason::TargetUidMissing);
        }
        parse_owner_id(&mapping.source_uid)
            .map_err(|_| SkipReason::InvalidOwnerId(mapping.source_uid.clone()))?;
        let (uid, gid) = mapping
            .target_owner()
            .map_err(|_| SkipReason::InvalidOwnerId(mapping.target_uid.clone()))?;

        let source_dir = self.config.source_root.join(&mapping.source_uid);
        if !self.fs.exists(&source_dir) {
            info!(
                profile = %mapping.profile_name,
                dir = %source_dir.display(),
                "no directory in source volume, studio may not have been launched for this user"
            );
            return Err(SkipReason::SourceDirMissing);
        }
        Ok(SyncPlan {
            source_dir,
            target_dir: self.config.target_root.join(&mapping.target_uid),
            uid,
            gid,
        })
    }
}

fn sync_dir(
    fs: &dyn WorkspaceFs,
    plan: &SyncPlan,
    opts: &MergeOptions,
) -> Result<(bool, MergeStats, ChownStats)> {
    let source = plan.source_dir.display().to_string();
    let target = plan.target_dir.display().to_string();
    info!(dir = %source, entries = ?fs.list(&plan.source_dir)?, "source dir");

    let created = if fs.exists(&plan.target_dir) {
        false
    } else {
        info!(dir = %target, "creating target dir");
        fs.mkdir(&plan.target_dir)?;
        true
    };
    info!(dir = %target, entries = ?fs.list(&plan.target_dir)?, "target dir before sync");

    let merge = fs.merge_copy(&plan.source_dir, &plan.target_dir, opts)?;
    info!(
        dir = %target,
        entries = ?fs.list(&plan.target_dir)?,
        copied = merge.files_copied,
        kept = merge.files_kept,
        dirs = merge.dirs_created,
        excluded = merge.excluded,
        "target dir after sync"
    );

    let (before_uid, before_gid) = fs.owner(&plan.target_dir)?;
    info!(dir = %target, uid = before_uid, gid = before_gid, "owner before change");
    let chown = fs.chown_recursive(&plan.target_dir, plan.uid, plan.gid)?;
    let (after_uid, after_gid) = fs.owner(&plan.target_dir)?;
    info!(
        dir = %target,
        uid = after_uid,
        gid = after_gid,
        changed = chown.changed,
        "owner after change"
    );

    Ok((created, merge, chown))
}

/// Log a per-profile failure and turn it into an outcome tagged with
/// whether the home volume or a service call was at fault.
fn failed(profile_name: &str, stage: &str, err: DrError) -> SyncOutcome {
    let class = if err.is_filesystem() { "filesystem" } else { "service" };
    error!(profile = profile_name, stage, class, error = %err, "profile failed");
    SyncOutcome::Failed(format!("{} error during {}: {}", class, stage, err))
}
