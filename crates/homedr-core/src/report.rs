//! Recovery reports.
//!
//! Summarises one recovery run for operators auditing a drill after the fact.

use crate::error::{DrError, Result};
use crate::recovery::SyncOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// Profile name.
    pub profile_name: String,
    /// What happened.
    pub outcome: SyncOutcome,
}

/// Full report of one recovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Domain that was recovered.
    pub domain_id: String,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished (None while running).
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-profile outcomes, in processing order.
    pub profiles: Vec<ProfileReport>,
}

impl RecoveryReport {
    /// Start a report for `domain_id`.
    pub fn start(domain_id: &str, dry_run: bool) -> Self {
        Self {
            domain_id: domain_id.to_string(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            profiles: Vec::new(),
        }
    }

    /// Record one profile.
    pub fn push(&mut self, profile: ProfileReport) {
        self.profiles.push(profile);
    }

    /// Mark the run finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    fn count(&self, label: &str) -> usize {
        self.profiles
            .iter()
            .filter(|p| p.outcome.label() == label)
            .count()
    }

    /// Profiles synced.
    pub fn synced_count(&self) -> usize {
        self.count("synced")
    }

    /// Profiles planned (dry run).
    pub fn planned_count(&self) -> usize {
        self.count("planned")
    }

    /// Profiles skipped.
    pub fn skipped_count(&self) -> usize {
        self.count("skipped")
    }

    /// Profiles failed.
    pub fn failed_count(&self) -> usize {
        self.count("failed")
    }

    /// Returns true if any profile failed.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Total files copied across all synced profiles.
    pub fn files_copied(&self) -> u64 {
        self.profiles
            .iter()
            .map(|p| match &p.outcome {
                SyncOutcome::Synced { merge, .. } => merge.files_copied,
                _ => 0,
            })
            .sum()
    }

    /// Names of failed profiles.
    pub fn failed_profiles(&self) -> Vec<&str> {
        self.profiles
            .iter()
            .filter(|p| matches!(p.outcome, SyncOutcome::Failed(_)))
            .map(|p| p.profile_name.as_str())
            .collect()
    }

    /// Format as a one-line summary.
    pub fn summary(&self) -> String {
        if self.dry_run {
            return format!(
                "Domain {} (dry run): {} profiles | {} planned | {} skipped | {} failed",
                self.domain_id,
                self.profiles.len(),
                self.planned_count(),
                self.skipped_count(),
                self.failed_count()
            );
        }
        format!(
            "Domain {}: {} profiles | {} synced | {} skipped | {} failed | {} files copied",
            self.domain_id,
            self.profiles.len(),
            self.synced_count(),
            self.skipped_count(),
            self.failed_count(),
            self.files_copied()
        )
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| DrError::Config {
            msg: format!("cannot serialize report: {}", e),
        })?;
        std::fs::write(path, json).map_err(|e| DrError::fs(path, e))
    }
}
