//! DynamoDB-backed UID tracker table.
//!
//! Items carry the profile name under a configurable key attribute plus
//! `UID`, `CreationTime` and `LastUpdateTime`, all as strings.

use crate::sdk::error_text;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, SecondsFormat, Utc};
use homedr_core::{DrError, MappingStore, Result, UidMappingRecord};
use std::collections::HashMap;
use tracing::debug;

/// Owner id attribute.
pub const ATTR_UID: &str = "UID";
/// Profile creation time attribute.
pub const ATTR_CREATION_TIME: &str = "CreationTime";
/// Last write time attribute.
pub const ATTR_LAST_UPDATE_TIME: &str = "LastUpdateTime";

/// Mapping store over one DynamoDB table.
#[derive(Clone)]
pub struct DynamoMappingStore {
    client: Client,
    table_name: String,
    key_attribute: String,
}

impl std::fmt::Debug for DynamoMappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoMappingStore")
            .field("table_name", &self.table_name)
            .field("key_attribute", &self.key_attribute)
            .finish()
    }
}

impl DynamoMappingStore {
    /// Create a store from shared SDK configuration.
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        table_name: impl Into<String>,
        key_attribute: impl Into<String>,
    ) -> Self {
        Self::from_client(Client::new(sdk_config), table_name, key_attribute)
    }

    /// Create from a pre-built client.
    pub fn from_client(
        client: Client,
        table_name: impl Into<String>,
        key_attribute: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            key_attribute: key_attribute.into(),
        }
    }

    fn store_error(&self, op: &str, err: impl std::error::Error) -> DrError {
        DrError::MappingStore {
            table: self.table_name.clone(),
            msg: format!("{} failed: {}", op, error_text(&err)),
        }
    }
}

/// Encode a record as a table item.
pub fn record_to_item(key_attribute: &str, record: &UidMappingRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            key_attribute.to_string(),
            AttributeValue::S(record.profile_name.clone()),
        ),
        (ATTR_UID.to_string(), AttributeValue::S(record.owner_id.clone())),
        (
            ATTR_CREATION_TIME.to_string(),
            AttributeValue::S(timestamp(&record.created_at)),
        ),
        (
            ATTR_LAST_UPDATE_TIME.to_string(),
            AttributeValue::S(timestamp(&record.updated_at)),
        ),
    ])
}

/// ISO-8601 UTC with a `Z` suffix, fractional seconds only when present.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Decode a table item. Returns `None` if the key or `UID` is missing.
///
/// Unparseable timestamps fall back to the Unix epoch; recovery only reads
/// the owner id.
pub fn item_to_record(
    key_attribute: &str,
    item: &HashMap<String, AttributeValue>,
) -> Option<UidMappingRecord> {
    let profile_name = item.get(key_attribute)?.as_s().ok()?.clone();
    let owner_id = item.get(ATTR_UID)?.as_s().ok()?.clone();
    let time = |attr: &str| {
        item.get(attr)
            .and_then(|v| v.as_s().ok())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    };
    Some(UidMappingRecord {
        profile_name,
        owner_id,
        created_at: time(ATTR_CREATION_TIME),
        updated_at: time(ATTR_LAST_UPDATE_TIME),
    })
}

#[async_trait]
impl MappingStore for DynamoMappingStore {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn put(&self, record: &UidMappingRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(&self.key_attribute, record)))
            .send()
            .await
            .map_err(|e| self.store_error("PutItem", e))?;
        debug!(table = %self.table_name, profile = %record.profile_name, "put item");
        Ok(())
    }

    async fn delete(&self, profile_name: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(&self.key_attribute, AttributeValue::S(profile_name.to_string()))
            .send()
            .await
            .map_err(|e| self.store_error("DeleteItem", e))?;
        debug!(table = %self.table_name, profile = profile_name, "deleted item");
        Ok(())
    }

    async fn get(&self, profile_name: &str) -> Result<Option<UidMappingRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(&self.key_attribute, AttributeValue::S(profile_name.to_string()))
            .send()
            .await
            .map_err(|e| self.store_error("GetItem", e))?;
        Ok(output
            .item()
            .and_then(|item| item_to_record(&self.key_attribute, item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> UidMappingRecord {
        UidMappingRecord {
            profile_name: "sagemaker-user-7".to_string(),
            owner_id: "200005".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 5).unwrap(),
        }
    }

    #[test]
    fn test_item_layout() {
        let item = record_to_item("UserProfileName", &record());
        assert_eq!(item.len(), 4);
        assert_eq!(
            item["UserProfileName"].as_s().unwrap(),
            "sagemaker-user-7"
        );
        assert_eq!(item[ATTR_UID].as_s().unwrap(), "200005");
        assert_eq!(
            item[ATTR_CREATION_TIME].as_s().unwrap(),
            "2024-03-01T10:00:00Z"
        );
        assert_eq!(
            item[ATTR_LAST_UPDATE_TIME].as_s().unwrap(),
            "2024-03-01T10:00:05Z"
        );
    }

    #[test]
    fn test_item_decodes_back() {
        let item = record_to_item("Name", &record());
        assert_eq!(item_to_record("Name", &item), Some(record()));
    }

    #[test]
    fn test_item_without_uid_is_absent() {
        let mut item = record_to_item("Name", &record());
        item.remove(ATTR_UID);
        assert_eq!(item_to_record("Name", &item), None);
    }

    #[test]
    fn test_wrong_key_attribute_is_absent() {
        let item = record_to_item("Name", &record());
        assert_eq!(item_to_record("UserProfileName", &item), None);
    }

    #[test]
    fn test_numeric_uid_attribute_is_absent() {
        let mut item = record_to_item("Name", &record());
        item.insert(ATTR_UID.to_string(), AttributeValue::N("200005".to_string()));
        assert_eq!(item_to_record("Name", &item), None);
    }

    #[test]
    fn test_bad_timestamp_defaults() {
        let mut item = record_to_item("Name", &record());
        item.insert(
            ATTR_LAST_UPDATE_TIME.to_string(),
            AttributeValue::S("yesterday".to_string()),
        );
        let decoded = item_to_record("Name", &item).unwrap();
        assert_eq!(decoded.owner_id, "200005");
        assert_eq!(decoded.updated_at, DateTime::<Utc>::default());
    }
}
