use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_fields::{datetime, hex_id, optional_datetime, optional_hex_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IncidentStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 3] = [
        IncidentStatus::Pending,
        IncidentStatus::InProgress,
        IncidentStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::InProgress => "in progress",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(IncidentStatus::Pending),
            "in progress" | "in-progress" | "in_progress" => Ok(IncidentStatus::InProgress),
            "resolved" => Ok(IncidentStatus::Resolved),
            other => Err(format!("Unknown incident status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityCategory {
    Critical,
    High,
    #[default]
    Moderate,
    Low,
}

/// Score at or above which an incident counts as critical on the dashboard.
pub const CRITICAL_SCORE: f64 = 7.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeverityAssessment {
    pub score: f64,
    #[serde(default)]
    pub category: SeverityCategory,
    #[serde(default)]
    pub assessment_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnimalInfo {
    pub photo: String,
    pub description: String,
    pub ai_severity_assessment: SeverityAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GeoType {
    #[default]
    Point,
}

/// GeoJSON point, `[longitude, latitude]`, with a free-text address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: GeoType,
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactMethod {
    #[default]
    Phone,
    Email,
}

/// Contact details copied from the reporter at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReporterInfo {
    pub name: String,
    pub contact_number: String,
    pub email: String,
    #[serde(default)]
    pub preferred_contact_method: ContactMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolunteerStatus {
    #[default]
    Unassigned,
    Assigned,
    OnSite,
    Completed,
}

impl VolunteerStatus {
    /// Maps the progress labels shown to volunteers onto activity states.
    pub fn from_progress_label(label: &str) -> Option<Self> {
        match label.trim() {
            "On the way" => Some(VolunteerStatus::Assigned),
            "Arrived" | "Animal rescued" => Some(VolunteerStatus::OnSite),
            "Completed" => Some(VolunteerStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerActivity {
    #[serde(default, with = "optional_hex_id")]
    pub assigned_volunteer: Option<String>,
    #[serde(default)]
    pub status: VolunteerStatus,
    #[serde(default, with = "optional_datetime")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_datetime")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    StatusChange,
    ResourceUpdate,
    VolunteerUpdate,
    GeneralNote,
}

/// Audit entry. Entries are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdate {
    #[serde(with = "datetime")]
    pub timestamp: DateTime<Utc>,
    pub update_type: UpdateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IncidentStatus>,
    pub description: String,
    #[serde(with = "hex_id")]
    pub updated_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Transport,
    Medical,
    Shelter,
    Food,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    #[default]
    Pending,
    InProgress,
    Fulfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourcePriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceNeed {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub priority: ResourcePriority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProvided {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Utc::now", with = "datetime")]
    pub provided_at: DateTime<Utc>,
    #[serde(default, with = "optional_hex_id")]
    pub provided_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Resources {
    #[serde(default)]
    pub needed: Vec<ResourceNeed>,
    #[serde(default)]
    pub provided: Vec<ResourceProvided>,
}

/// Legacy coarse severity label; new incidents always start at `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LegacySeverity {
    Critical,
    Moderate,
    Minor,
    #[default]
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    #[serde(rename = "_id", with = "hex_id")]
    pub id: String,
    /// Reporting user.
    #[serde(with = "hex_id")]
    pub user: String,
    pub city: String,
    #[serde(rename = "assignedNGO", with = "hex_id")]
    pub assigned_ngo: String,
    pub description: String,
    pub reporter_info: ReporterInfo,
    pub location: Location,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default)]
    pub severity_assessment: LegacySeverity,
    pub animal_info: AnimalInfo,
    pub animal_photo: String,
    #[serde(default)]
    pub volunteer_activity: VolunteerActivity,
    #[serde(default)]
    pub case_updates: Vec<CaseUpdate>,
    #[serde(default)]
    pub resources: Resources,
    /// Bumped by one on every successful mutation.
    #[serde(default)]
    pub version: i64,
    #[serde(with = "datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    pub fn is_critical(&self) -> bool {
        self.animal_info.ai_severity_assessment.score >= CRITICAL_SCORE
    }

    pub fn is_assigned_to_volunteer(&self, volunteer_id: &str) -> bool {
        self.volunteer_activity.assigned_volunteer.as_deref() == Some(volunteer_id)
    }

    /// Appends an audit entry and touches `updatedAt`.
    pub fn record(
        &mut self,
        update_type: UpdateType,
        description: impl Into<String>,
        actor: &str,
        now: DateTime<Utc>,
    ) {
        let status = match update_type {
            UpdateType::StatusChange => Some(self.status),
            _ => None,
        };
        self.case_updates.push(CaseUpdate {
            timestamp: now,
            update_type,
            status,
            description: description.into(),
            updated_by: actor.to_string(),
        });
        self.updated_at = now;
    }
}
