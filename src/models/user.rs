use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_fields::{datetime, hex_id, optional_datetime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Volunteer,
    Ngo,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Volunteer => "volunteer",
            Role::Ngo => "ngo",
        }
    }

    /// Label used in "Access denied. <label> role required." messages.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Volunteer => "Volunteer",
            Role::Ngo => "NGO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Weekdays,
    Weekends,
    Both,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerDetails {
    pub availability: Option<Availability>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoDetails {
    pub registration_number: Option<String>,
    pub organization_type: Option<String>,
    #[serde(default)]
    pub operating_areas: Vec<String>,
    /// Flipped by the document-signing webhook.
    #[serde(default)]
    pub documents_signed: bool,
    #[serde(default, with = "optional_datetime")]
    pub document_signed_at: Option<DateTime<Utc>>,
}

/// A registered account. `city` partitions every incident query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", with = "hex_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub phone_number: String,
    pub address: String,
    pub city: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_details: Option<VolunteerDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngo_details: Option<NgoDetails>,
    #[serde(with = "datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// The `name email phoneNumber` projection embedded in populated responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id", with = "hex_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
        }
    }
}

/// One NGO candidate together with the number of incidents assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NgoLoad {
    #[serde(rename = "_id", with = "hex_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub city: String,
    pub incident_count: i64,
}
