use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_fields::{datetime, hex_id, optional_hex_id};

/// Which dashboard a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    Ngo,
    Volunteer,
}

impl RecipientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientRole::Ngo => "ngo",
            RecipientRole::Volunteer => "volunteer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewCase,
    CaseUpdate,
    VolunteerAssigned,
    ResourceRequest,
    #[default]
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", with = "hex_id")]
    pub id: String,
    #[serde(with = "hex_id")]
    pub recipient: String,
    pub recipient_role: RecipientRole,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, with = "optional_hex_id", skip_serializing_if = "Option::is_none")]
    pub incident: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "datetime")]
    pub created_at: DateTime<Utc>,
}
