//! Profile lifecycle events delivered by the infrastructure event bus.
//!
//! Only the fields the maintainer consults are modelled; everything else in the
//! envelope is ignored by serde.

use crate::error::{DrError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event name for profile creation.
pub const CREATE_USER_PROFILE: &str = "CreateUserProfile";
/// Event name for profile deletion.
pub const DELETE_USER_PROFILE: &str = "DeleteUserProfile";

/// What happened to the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// `CreateUserProfile`.
    ProfileCreated,
    /// `DeleteUserProfile`.
    ProfileDeleted,
    /// Any other API call routed to the handler.
    Unrecognized(String),
}

impl EventKind {
    /// Map an event name to its kind.
    pub fn from_event_name(name: &str) -> Self {
        match name {
            CREATE_USER_PROFILE => EventKind::ProfileCreated,
            DELETE_USER_PROFILE => EventKind::ProfileDeleted,
            other => EventKind::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestParameters {
    domain_id: String,
    user_profile_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Detail {
    event_name: String,
    event_time: DateTime<Utc>,
    request_parameters: RequestParameters,
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    time: DateTime<Utc>,
    region: String,
    detail: Detail,
}

/// A parsed profile lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEvent {
    /// When the bus emitted the event.
    pub origination_time: DateTime<Utc>,
    /// Region the event originated in.
    pub origination_region: String,
    /// Kind of lifecycle change.
    pub kind: EventKind,
    /// When the underlying API call happened.
    pub event_time: DateTime<Utc>,
    /// Domain the profile belongs to.
    pub domain_id: String,
    /// Profile name.
    pub profile_name: String,
}

impl ProfileEvent {
    /// Parse an event from its JSON envelope.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_value(value.clone()).map_err(|e| DrError::InvalidEvent {
                msg: e.to_string(),
            })?;
        let params = envelope.detail.request_parameters;
        if params.user_profile_name.is_empty() {
            return Err(DrError::InvalidEvent {
                msg: "empty userProfileName".to_string(),
            });
        }
        Ok(Self {
            origination_time: envelope.time,
            origination_region: envelope.region,
            kind: EventKind::from_event_name(&envelope.detail.event_name),
            event_time: envelope.detail.event_time,
            domain_id: params.domain_id,
            profile_name: params.user_profile_name,
        })
    }
}
