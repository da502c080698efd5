// src/lifecycle.rs

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Deserialize;

use crate::access;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::models::incident::{
    AnimalInfo, ContactMethod, GeoType, Incident, IncidentStatus, LegacySeverity, Location,
    ReporterInfo, ResourceNeed, ResourceProvided, Resources, SeverityAssessment, SeverityCategory,
    UpdateType, VolunteerActivity, VolunteerStatus,
};
use crate::models::new_id;
use crate::models::notification::{NotificationKind, RecipientRole};
use crate::ngo_selector;
use crate::notifications::notify;
use crate::store::EntityStore;
use crate::transitions::TransitionPolicy;

pub const CONCURRENT_UPDATE: &str = "Incident was modified by another request, reload and retry";

/// JSON carried in the `data` part of the incident-creation form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPayload {
    pub description: String,
    pub location: LocationInput,
    pub animal_info: AnimalInfoInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalInfoInput {
    pub description: String,
    pub ai_severity_assessment: SeverityInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityInput {
    pub score: f64,
    #[serde(default)]
    pub category: SeverityCategory,
    #[serde(default)]
    pub assessment_details: Option<String>,
}

impl IncidentPayload {
    pub fn validate(&self) -> AppResult<()> {
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        if self.animal_info.description.trim().is_empty() {
            return Err(AppError::Validation("Animal description is required".to_string()));
        }
        let coordinates = &self.location.coordinates;
        if coordinates.len() != 2 || coordinates.iter().any(|c| !c.is_finite()) {
            return Err(AppError::Validation(
                "Location coordinates must be [longitude, latitude]".to_string(),
            ));
        }
        let score = self.animal_info.ai_severity_assessment.score;
        if !(0.0..=10.0).contains(&score) {
            return Err(AppError::Validation(
                "Severity score must be between 0 and 10".to_string(),
            ));
        }
        Ok(())
    }
}

/// Body of `PUT /ngo/incidents/{id}/update`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: IncidentStatus,
    #[serde(default)]
    pub status_update: String,
    #[serde(default)]
    pub resources_needed: Option<Vec<ResourceNeed>>,
    #[serde(default)]
    pub resources_provided: Option<Vec<ResourceProvided>>,
    /// Version the client last saw; a mismatch is rejected.
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceUpdate {
    #[serde(default)]
    pub resources_needed: Option<Vec<ResourceNeed>>,
    #[serde(default)]
    pub resources_provided: Option<Vec<ResourceProvided>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    pub note: String,
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}

/// Creates an incident in `pending` and hands it to the least-loaded NGO of
/// the reporter's city. Nothing is written when no NGO is available.
pub async fn create_incident(
    store: &dyn EntityStore,
    caller: &Caller,
    payload: IncidentPayload,
    photo: Option<String>,
) -> AppResult<Incident> {
    payload.validate()?;
    let photo = match photo {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(AppError::Validation("Animal photo is required".to_string())),
    };

    let city = caller.city.trim().to_string();
    let ngo = ngo_selector::select_ngo(store, &city).await?;

    let now = Utc::now();
    let severity = payload.animal_info.ai_severity_assessment;
    let incident = Incident {
        id: new_id(),
        user: caller.id.clone(),
        city: city.clone(),
        assigned_ngo: ngo.id.clone(),
        description: payload.description.trim().to_string(),
        reporter_info: ReporterInfo {
            name: caller.name.clone(),
            contact_number: caller.phone_number.clone(),
            email: caller.email.clone(),
            preferred_contact_method: ContactMethod::Phone,
        },
        location: Location {
            kind: GeoType::Point,
            coordinates: payload.location.coordinates,
            address: payload.location.address,
        },
        status: IncidentStatus::Pending,
        severity_assessment: LegacySeverity::Pending,
        animal_info: AnimalInfo {
            photo: photo.clone(),
            description: payload.animal_info.description.trim().to_string(),
            ai_severity_assessment: SeverityAssessment {
                score: severity.score,
                category: severity.category,
                assessment_details: severity.assessment_details.unwrap_or_default(),
            },
        },
        animal_photo: photo,
        volunteer_activity: VolunteerActivity::default(),
        case_updates: Vec::new(),
        resources: Resources::default(),
        version: 0,
        created_at: now,
        updated_at: now,
    };

    store.insert_incident(&incident).await?;
    info!(
        "Incident {} created in {} and assigned to NGO {} (load {})",
        incident.id, city, ngo.id, ngo.incident_count
    );
    notify(
        store,
        &ngo.id,
        RecipientRole::Ngo,
        NotificationKind::NewCase,
        format!("New incident reported in {}: {}", city, incident.animal_info.description),
        Some(&incident.id),
    )
    .await;
    Ok(incident)
}

/// Loads an incident the caller is allowed to see.
pub async fn visible_incident(store: &dyn EntityStore, caller: &Caller, id: &str) -> AppResult<Incident> {
    let incident = store.find_incident(id).await?;
    access::ensure_visible(caller, incident)
}

/// NGO status change. Appends a STATUS_CHANGE entry and replaces any
/// non-empty resource list supplied.
pub async fn update_status(
    store: &dyn EntityStore,
    policy: &TransitionPolicy,
    caller: &Caller,
    id: &str,
    update: StatusUpdate,
) -> AppResult<Incident> {
    let mut incident = assigned_ngo_incident(store, caller, id).await?;
    let expected = check_client_version(&incident, update.version)?;
    policy.check(incident.status, update.status)?;

    let previous = incident.status;
    let now = next_timestamp(&incident);
    incident.status = update.status;
    let note = if update.status_update.trim().is_empty() {
        format!("Status changed from {} to {}", previous, update.status)
    } else {
        update.status_update.trim().to_string()
    };
    incident.record(UpdateType::StatusChange, note, &caller.id, now);

    if let Some(needed) = update.resources_needed.filter(|r| !r.is_empty()) {
        incident.resources.needed = needed;
    }
    if let Some(provided) = update.resources_provided.filter(|r| !r.is_empty()) {
        incident.resources.provided = stamp_provider(provided, caller);
    }

    let incident = commit(store, incident, expected).await?;
    info!("Incident {} status {} -> {} by {}", incident.id, previous, incident.status, caller.id);
    if let Some(volunteer) = &incident.volunteer_activity.assigned_volunteer {
        notify(
            store,
            volunteer,
            RecipientRole::Volunteer,
            NotificationKind::CaseUpdate,
            format!("Incident {} is now {}", incident.id, incident.status),
            Some(&incident.id),
        )
        .await;
    }
    Ok(incident)
}

/// Replaces the supplied resource lists and appends a RESOURCE_UPDATE entry.
pub async fn update_resources(
    store: &dyn EntityStore,
    caller: &Caller,
    id: &str,
    update: ResourceUpdate,
) -> AppResult<Incident> {
    if update.resources_needed.is_none() && update.resources_provided.is_none() {
        return Err(AppError::Validation("No resource changes supplied".to_string()));
    }
    let mut incident = assigned_ngo_incident(store, caller, id).await?;
    let expected = check_client_version(&incident, update.version)?;

    let now = next_timestamp(&incident);
    if let Some(needed) = update.resources_needed {
        incident.resources.needed = needed;
    }
    if let Some(provided) = update.resources_provided {
        incident.resources.provided = stamp_provider(provided, caller);
    }
    let note = update
        .note
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Resources updated: {} needed, {} provided",
                incident.resources.needed.len(),
                incident.resources.provided.len()
            )
        });
    incident.record(UpdateType::ResourceUpdate, note, &caller.id, now);

    commit(store, incident, expected).await
}

pub async fn add_note(
    store: &dyn EntityStore,
    caller: &Caller,
    id: &str,
    input: NoteInput,
) -> AppResult<Incident> {
    if input.note.trim().is_empty() {
        return Err(AppError::Validation("Note must not be empty".to_string()));
    }
    let mut incident = assigned_ngo_incident(store, caller, id).await?;
    let expected = check_client_version(&incident, input.version)?;
    let now = next_timestamp(&incident);
    incident.record(UpdateType::GeneralNote, input.note.trim(), &caller.id, now);
    commit(store, incident, expected).await
}

/// Volunteer claims a pending incident in their city.
///
/// Claiming again by the same volunteer is a no-op. A claim on an incident
/// already held by another volunteer, on one that has left `pending`, or a
/// claim that loses a race, fails with a conflict.
pub async fn self_assign(store: &dyn EntityStore, caller: &Caller, id: &str) -> AppResult<Incident> {
    let mut incident = visible_incident(store, caller, id).await?;
    if incident.is_assigned_to_volunteer(&caller.id) {
        return Ok(incident);
    }
    if incident.volunteer_activity.assigned_volunteer.is_some()
        && incident.volunteer_activity.status != VolunteerStatus::Unassigned
    {
        return Err(AppError::Conflict(
            "Incident already has an assigned volunteer".to_string(),
        ));
    }
    if incident.status != IncidentStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Incident is {} and no longer open for volunteers",
            incident.status
        )));
    }

    let expected = incident.version;
    let now = next_timestamp(&incident);
    incident.volunteer_activity = VolunteerActivity {
        assigned_volunteer: Some(caller.id.clone()),
        status: VolunteerStatus::Assigned,
        assigned_at: Some(now),
        last_update: Some(now),
    };
    incident.status = IncidentStatus::InProgress;
    incident.record(
        UpdateType::VolunteerUpdate,
        format!("Volunteer {} assigned to the incident", caller.name),
        &caller.id,
        now,
    );

    let incident = commit(store, incident, expected).await?;
    info!("Volunteer {} assigned to incident {}", caller.id, incident.id);
    notify(
        store,
        &incident.assigned_ngo,
        RecipientRole::Ngo,
        NotificationKind::VolunteerAssigned,
        format!("Volunteer {} took incident {}", caller.name, incident.id),
        Some(&incident.id),
    )
    .await;
    Ok(incident)
}

/// The assigned volunteer reports progress ("On the way", "Arrived", ...).
pub async fn update_volunteer_progress(
    store: &dyn EntityStore,
    caller: &Caller,
    id: &str,
    update: ProgressUpdate,
) -> AppResult<Incident> {
    let status = VolunteerStatus::from_progress_label(&update.status).ok_or_else(|| {
        AppError::Validation(format!("Unknown volunteer progress '{}'", update.status))
    })?;
    let mut incident = visible_incident(store, caller, id).await?;
    if !incident.is_assigned_to_volunteer(&caller.id) {
        return Err(AppError::Forbidden(
            "Only the assigned volunteer can report progress".to_string(),
        ));
    }
    let expected = check_client_version(&incident, update.version)?;

    let now = next_timestamp(&incident);
    incident.volunteer_activity.status = status;
    incident.volunteer_activity.last_update = Some(now);
    let note = update
        .note
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Volunteer {} reported: {}", caller.name, update.status.trim()));
    incident.record(UpdateType::VolunteerUpdate, note, &caller.id, now);

    commit(store, incident, expected).await
}

async fn assigned_ngo_incident(store: &dyn EntityStore, caller: &Caller, id: &str) -> AppResult<Incident> {
    let incident = visible_incident(store, caller, id).await?;
    if incident.assigned_ngo != caller.id {
        return Err(AppError::Forbidden(
            "Only the assigned NGO can change this incident".to_string(),
        ));
    }
    Ok(incident)
}

fn check_client_version(incident: &Incident, seen: Option<i64>) -> AppResult<i64> {
    match seen {
        Some(v) if v != incident.version => Err(AppError::Conflict(CONCURRENT_UPDATE.to_string())),
        _ => Ok(incident.version),
    }
}

fn stamp_provider(provided: Vec<ResourceProvided>, caller: &Caller) -> Vec<ResourceProvided> {
    provided
        .into_iter()
        .map(|mut p| {
            if p.provided_by.is_none() {
                p.provided_by = Some(caller.id.clone());
            }
            p
        })
        .collect()
}

/// Audit timestamps never go backwards, even if the clock does.
fn next_timestamp(incident: &Incident) -> DateTime<Utc> {
    let now = Utc::now();
    match incident.case_updates.last() {
        Some(last) if last.timestamp > now => last.timestamp,
        _ => now,
    }
}

async fn commit(store: &dyn EntityStore, mut incident: Incident, expected: i64) -> AppResult<Incident> {
    incident.version = expected + 1;
    if store.replace_incident(&incident, expected).await? {
        Ok(incident)
    } else {
        warn!("Version conflict on incident {} (expected {})", incident.id, expected);
        Err(AppError::Conflict(CONCURRENT_UPDATE.to_string()))
    }
}
