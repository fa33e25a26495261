//! Command-line and environment configuration for both binaries.
//!
//! Values come from, in increasing precedence: built-in defaults, an optional
//! TOML/JSON config file, then flags or their environment variables.

use clap::Parser;
use homedr_core::{RecoveryConfig, Result, TrackerConfig};
use std::path::PathBuf;

/// Arguments of the event handler host.
#[derive(Parser, Debug, Default)]
#[command(name = "homedr-tracker")]
#[command(about = "Keeps the UID tracker table current from user profile events", long_about = None)]
pub struct TrackerArgs {
    /// Config file (TOML or JSON).
    #[arg(long, env = "HOMEDR_CONFIG")]
    pub config: Option<PathBuf>,

    /// This region's UID tracker table.
    #[arg(long, env = "TABLE_NAME")]
    pub table_name: Option<String>,

    /// Key attribute of the table.
    #[arg(long, env = "TABLE_PRIMARY_KEY")]
    pub table_primary_key: Option<String>,

    /// Region whose events provision the home volume replica.
    #[arg(long, env = "PRIMARY_REGION")]
    pub primary_region: Option<String>,

    /// Region the replica is created in.
    #[arg(long, env = "SECONDARY_REGION")]
    pub secondary_region: Option<String>,

    /// Per-event time budget in seconds; 0 disables it.
    #[arg(long, env = "HOMEDR_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl TrackerArgs {
    /// Resolve and validate the effective configuration.
    pub fn into_config(self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_file(path)?,
            None => TrackerConfig::default(),
        };
        overlay(&mut config.table_name, self.table_name);
        overlay(&mut config.table_primary_key, self.table_primary_key);
        overlay(&mut config.primary_region, self.primary_region);
        overlay(&mut config.secondary_region, self.secondary_region);
        overlay(&mut config.timeout_secs, self.timeout_secs);
        config.validate()?;
        Ok(config)
    }
}

/// Arguments of the failover recovery job.
#[derive(Parser, Debug, Default)]
#[command(name = "homedr-recover")]
#[command(about = "Merges replicated home directories into the secondary domain", long_about = None)]
pub struct RecoverArgs {
    /// Config file (TOML or JSON).
    #[arg(long, env = "HOMEDR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Primary region's UID tracker table.
    #[arg(long, env = "PRIMARY_UID_TRACKER_TABLE_NAME")]
    pub primary_table: Option<String>,

    /// Secondary region's UID tracker table.
    #[arg(long, env = "SECONDARY_UID_TRACKER_TABLE_NAME")]
    pub secondary_table: Option<String>,

    /// Key attribute of both tables.
    #[arg(long, env = "TABLE_PRIMARY_KEY")]
    pub table_primary_key: Option<String>,

    /// Secondary domain to recover.
    #[arg(long, env = "SECONDARY_SAGEMAKER_DOMAIN_ID")]
    pub domain_id: Option<String>,

    /// Mount point of the replicated primary home volume.
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Mount point of the secondary home volume.
    #[arg(long)]
    pub target_root: Option<PathBuf>,

    /// Resolve and decide only.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run report as JSON.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Exit non-zero if any profile failed.
    #[arg(long)]
    pub fail_on_profile_error: bool,
}

impl RecoverArgs {
    /// Resolve and validate the effective configuration.
    pub fn to_config(&self) -> Result<RecoveryConfig> {
        let mut config = match &self.config {
            Some(path) => RecoveryConfig::from_file(path)?,
            None => RecoveryConfig::default(),
        };
        overlay(&mut config.primary_table, self.primary_table.clone());
        overlay(&mut config.secondary_table, self.secondary_table.clone());
        overlay(&mut config.table_primary_key, self.table_primary_key.clone());
        overlay(&mut config.secondary_domain_id, self.domain_id.clone());
        overlay(&mut config.source_root, self.source_root.clone());
        overlay(&mut config.target_root, self.target_root.clone());
        config.dry_run |= self.dry_run;
        config.validate()?;
        Ok(config)
    }
}

fn overlay<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    mod tracker {
        use super::*;

        #[test]
        fn test_flags_build_config() {
            let args = TrackerArgs::try_parse_from([
                "homedr-tracker",
                "--table-name",
                "uid-tracker",
                "--primary-region",
                "us-east-1",
                "--secondary-region",
                "us-west-2",
            ])
            .unwrap();
            let config = args.into_config().unwrap();
            assert_eq!(config.table_name, "uid-tracker");
            assert_eq!(config.table_primary_key, "UserProfileName");
            assert_eq!(config.timeout_secs, 60);
        }

        #[test]
        fn test_missing_table_rejected() {
            let args = TrackerArgs {
                primary_region: Some("us-east-1".to_string()),
                secondary_region: Some("us-west-2".to_string()),
                ..TrackerArgs::default()
            };
            assert!(args.into_config().is_err());
        }
    }

    mod recover {
        use super::*;

        #[test]
        fn test_flags_override_file() {
            let mut file = NamedTempFile::with_suffix(".json").unwrap();
            write!(
                file,
                r#"{{"primary_table": "p", "secondary_table": "s", "secondary_domain_id": "d-file"}}"#
            )
            .unwrap();
            let args = RecoverArgs::try_parse_from([
                "homedr-recover",
                "--config",
                file.path().to_str().unwrap(),
                "--domain-id",
                "d-flag",
                "--dry-run",
                "--fail-on-profile-error",
            ])
            .unwrap();
            assert!(args.fail_on_profile_error);
            let config = args.to_config().unwrap();
            assert_eq!(config.primary_table, "p");
            assert_eq!(config.secondary_domain_id, "d-flag");
            assert!(config.dry_run);
            assert_eq!(config.source_root, PathBuf::from("/source_efs"));
        }

        #[test]
        fn test_same_roots_rejected() {
            let args = RecoverArgs {
                primary_table: Some("p".to_string()),
                secondary_table: Some("s".to_string()),
                domain_id: Some("d".to_string()),
                source_root: Some(PathBuf::from("/mnt/efs")),
                target_root: Some(PathBuf::from("/mnt/efs")),
                ..RecoverArgs::default()
            };
            assert!(args.to_config().is_err());
        }
    }
}
