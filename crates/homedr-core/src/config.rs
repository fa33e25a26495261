//! Process configuration for the tracker and the recovery job.

use crate::error::{DrError, Result};
use crate::merge::MergeOptions;
use crate::provisioner::REPLICA_PARAMETER_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default key attribute of the UID tracker tables.
pub const DEFAULT_TABLE_PRIMARY_KEY: &str = "UserProfileName";

/// Configuration of the mapping maintainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Local region's UID tracker table.
    pub table_name: String,
    /// Key attribute of the table.
    pub table_primary_key: String,
    /// Region whose events trigger replica provisioning.
    pub primary_region: String,
    /// Region replicas are created in.
    pub secondary_region: String,
    /// Parameter the replica volume id is published under.
    pub replica_parameter_name: String,
    /// Wall-clock budget per event, in seconds. Zero disables the bound.
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            table_primary_key: DEFAULT_TABLE_PRIMARY_KEY.to_string(),
            primary_region: String::new(),
            secondary_region: String::new(),
            replica_parameter_name: REPLICA_PARAMETER_NAME.to_string(),
            timeout_secs: 60,
        }
    }
}

impl TrackerConfig {
    /// Load from a TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        load(path)
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        require("table_name", &self.table_name)?;
        require("table_primary_key", &self.table_primary_key)?;
        require("primary_region", &self.primary_region)?;
        require("secondary_region", &self.secondary_region)?;
        require("replica_parameter_name", &self.replica_parameter_name)?;
        if self.primary_region == self.secondary_region {
            return Err(DrError::Config {
                msg: format!(
                    "primary and secondary region are both {}",
                    self.primary_region
                ),
            });
        }
        Ok(())
    }
}

/// Configuration of the recovery synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Primary region's UID tracker table (as replicated into this region).
    pub primary_table: String,
    /// Secondary region's UID tracker table.
    pub secondary_table: String,
    /// Key attribute of both tables.
    pub table_primary_key: String,
    /// Domain whose InService profiles are recovered.
    pub secondary_domain_id: String,
    /// Mount point of the replicated primary home volume.
    pub source_root: PathBuf,
    /// Mount point of the secondary domain's home volume.
    pub target_root: PathBuf,
    /// Merge policy.
    pub merge: MergeOptions,
    /// Resolve and decide only; leave the filesystem untouched.
    pub dry_run: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            primary_table: String::new(),
            secondary_table: String::new(),
            table_primary_key: DEFAULT_TABLE_PRIMARY_KEY.to_string(),
            secondary_domain_id: String::new(),
            source_root: PathBuf::from("/source_efs"),
            target_root: PathBuf::from("/target_efs"),
            merge: MergeOptions::default(),
            dry_run: false,
        }
    }
}

impl RecoveryConfig {
    /// Load from a TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        load(path)
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        require("primary_table", &self.primary_table)?;
        require("secondary_table", &self.secondary_table)?;
        require("table_primary_key", &self.table_primary_key)?;
        require("secondary_domain_id", &self.secondary_domain_id)?;
        if self.source_root == self.target_root {
            return Err(DrError::Config {
                msg: "source_root and target_root must differ".to_string(),
            });
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DrError::Config {
            msg: format!("{} is required", field),
        });
    }
    Ok(())
}

fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| DrError::fs(path, e))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match ext.to_lowercase().as_str() {
        "toml" => toml::from_str(&contents).map_err(|e| DrError::Config {
            msg: format!("{}: {}", path.display(), e),
        }),
        "json" => serde_json::from_str(&contents).map_err(|e| DrError::Config {
            msg: format!("{}: {}", path.display(), e),
        }),
        _ => Err(DrError::Config {
            msg: format!("unsupported config file extension: {}", ext),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = RecoveryConfig::default();
        assert_eq!(config.table_primary_key, "UserProfileName");
        assert_eq!(config.source_root, PathBuf::from("/source_efs"));
        assert_eq!(config.target_root, PathBuf::from("/target_efs"));
        assert!(config.merge.skip_hidden);
        assert!(!config.merge.overwrite);
        assert!(!config.dry_run);

        let tracker = TrackerConfig::default();
        assert_eq!(tracker.replica_parameter_name, REPLICA_PARAMETER_NAME);
        assert_eq!(tracker.timeout_secs, 60);
    }

    #[test]
    fn test_from_file_toml() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
primary_table = "uid-tracker-primary"
secondary_table = "uid-tracker-secondary"
secondary_domain_id = "d-xyz"
source_root = "/mnt/source"

[merge]
skip_hidden = true
overwrite = false
            "#
        )
        .unwrap();

        let config = RecoveryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.primary_table, "uid-tracker-primary");
        assert_eq!(config.secondary_domain_id, "d-xyz");
        assert_eq!(config.source_root, PathBuf::from("/mnt/source"));
        assert_eq!(config.target_root, PathBuf::from("/target_efs"));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file_json() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{
                "table_name": "uid-tracker",
                "primary_region": "us-east-1",
                "secondary_region": "us-west-2",
                "timeout_secs": 30
            }}"#
        )
        .unwrap();

        let config = TrackerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.table_name, "uid-tracker");
        assert_eq!(config.table_primary_key, "UserProfileName");
        assert_eq!(config.timeout_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        let err = TrackerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, DrError::Config { .. }));
    }

    #[test]
    fn test_validate_missing_fields() {
        let err = RecoveryConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("primary_table"));

        let config = TrackerConfig {
            table_name: "t".to_string(),
            primary_region: "us-east-1".to_string(),
            secondary_region: "us-east-1".to_string(),
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
