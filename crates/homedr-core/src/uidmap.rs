//! Owner id mapping between the primary and secondary regions.
//!
//! Each region assigns storage-owner ids independently, so the same profile
//! usually owns a differently-named home directory after failover. The mapping
//! is resolved per profile from both regions' mapping stores.

use crate::error::{DrError, Result};
use crate::services::MappingStore;
use tracing::info;

/// A profile's owner id in each region. Empty means no record in that region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidMapping {
    /// Profile name.
    pub profile_name: String,
    /// Owner id in the primary region's namespace.
    pub source_uid: String,
    /// Owner id in the secondary region's namespace.
    pub target_uid: String,
}

impl UidMapping {
    /// Numeric owner and group for the target directory.
    pub fn target_owner(&self) -> Result<(u32, u32)> {
        let uid = parse_owner_id(&self.target_uid)?;
        Ok((uid, uid))
    }
}

/// Interpret an opaque owner id as a numeric OS id.
///
/// The id also names the home directory, so only plain ASCII digits are
/// accepted: no sign, no whitespace.
pub fn parse_owner_id(raw: &str) -> Result<u32> {
    let invalid = || DrError::InvalidOwnerId {
        value: raw.to_string(),
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse::<u32>().map_err(|_| invalid())
}

/// Resolves [`UidMapping`]s from a primary and a secondary mapping store.
pub struct UidMapper<'a> {
    primary: &'a dyn MappingStore,
    secondary: &'a dyn MappingStore,
}

impl<'a> UidMapper<'a> {
    /// Create a mapper over the two regions' stores.
    pub fn new(primary: &'a dyn MappingStore, secondary: &'a dyn MappingStore) -> Self {
        Self { primary, secondary }
    }

    /// Look the profile up in both stores independently.
    ///
    /// A missing record yields an empty id. Store failures propagate.
    pub async fn resolve(&self, profile_name: &str) -> Result<UidMapping> {
        let source_uid = Self::lookup(self.primary, profile_name, "source").await?;
        let target_uid = Self::lookup(self.secondary, profile_name, "target").await?;
        Ok(UidMapping {
            profile_name: profile_name.to_string(),
            source_uid,
            target_uid,
        })
    }

    async fn lookup(store: &dyn MappingStore, profile_name: &str, side: &str) -> Result<String> {
        match store.get(profile_name).await? {
            Some(record) => {
                info!(
                    profile = profile_name,
                    side,
                    uid = %record.owner_id,
                    table = store.table_name(),
                    "uid found"
                );
                Ok(record.owner_id)
            }
            None => {
                info!(
                    profile = profile_name,
                    side,
                    table = store.table_name(),
                    "uid not found"
                );
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMappingStore;
    use crate::types::UidMappingRecord;
    use chrono::Utc;

    async fn put(store: &InMemoryMappingStore, name: &str, uid: &str) {
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

    mod parse {
        use super::*;

        #[test]
        fn test_numeric_id() {
            assert_eq!(parse_owner_id("200001").unwrap(), 200001);
        }

        #[test]
        fn test_whitespace_rejected() {
            assert!(parse_owner_id("2001 ").is_err());
            assert!(parse_owner_id(" 2001").is_err());
            assert!(parse_owner_id("2001\n").is_err());
        }

        #[test]
        fn test_sign_and_empty_rejected() {
            assert!(parse_owner_id("+2001").is_err());
            assert!(parse_owner_id("").is_err());
        }

        #[test]
        fn test_non_numeric_rejected() {
            assert!(matches!(
                parse_owner_id("user-2001"),
                Err(DrError::InvalidOwnerId { .. })
            ));
        }

        #[test]
        fn test_negative_and_overflow_rejected() {
            assert!(parse_owner_id("-1").is_err());
            assert!(parse_owner_id("4294967296").is_err());
        }
    }

    mod resolve {
        use super::*;

        #[tokio::test]
        async fn test_both_regions_present() {
            let primary = InMemoryMappingStore::new("primary");
            let secondary = InMemoryMappingStore::new("secondary");
            put(&primary, "sagemaker-user-7", "1001").await;
            put(&secondary, "sagemaker-user-7", "2001").await;

            let m = UidMapper::new(&primary, &secondary)
                .resolve("sagemaker-user-7")
                .await
                .unwrap();
            assert_eq!(m.source_uid, "1001");
            assert_eq!(m.target_uid, "2001");
            assert_eq!(m.target_owner().unwrap(), (2001, 2001));
        }

        #[tokio::test]
        async fn test_missing_secondary_is_empty_sentinel() {
            let primary = InMemoryMappingStore::new("primary");
            let secondary = InMemoryMappingStore::new("secondary");
            put(&primary, "sagemaker-user-3", "1001").await;

            let m = UidMapper::new(&primary, &secondary)
                .resolve("sagemaker-user-3")
                .await
                .unwrap();
            assert_eq!(m.source_uid, "1001");
            assert_eq!(m.target_uid, "");
        }

        #[tokio::test]
        async fn test_store_failure_propagates() {
            let primary = InMemoryMappingStore::new("primary");
            let secondary = InMemoryMappingStore::new("secondary");
            secondary.set_fail_reads(true);
            let err = UidMapper::new(&primary, &secondary)
                .resolve("u")
                .await
                .unwrap_err();
            assert!(matches!(err, DrError::MappingStore { .. }));
        }
    }
}
