// src/ngo_dashboard.rs

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use serde_json::json;

use crate::access;
use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::lifecycle::{self, NoteInput, ResourceUpdate, StatusUpdate};
use crate::models::incident::{
    AnimalInfo, Incident, IncidentStatus, Location, ResourceNeed, SeverityAssessment, UpdateType,
    VolunteerStatus,
};
use crate::models::user::{Role, User, UserSummary};
use crate::user_management::{directory, summary};

/// Volunteer block with the volunteer's contact card filled in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedVolunteerActivity {
    pub assigned_volunteer: Option<UserSummary>,
    pub status: VolunteerStatus,
    pub assigned_at: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoIncidentRow {
    #[serde(rename = "_id")]
    pub id: String,
    pub animal_info: AnimalInfo,
    pub location: Location,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "assignedNGO")]
    pub assigned_ngo: String,
    pub user: Option<UserSummary>,
    pub volunteer_activity: PopulatedVolunteerActivity,
    pub version: i64,
}

#[derive(Debug, Serialize)]
pub struct ActorName {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedCaseUpdate {
    pub timestamp: DateTime<Utc>,
    pub update_type: UpdateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IncidentStatus>,
    pub description: String,
    pub updated_by: ActorName,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedProvision {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub description: String,
    pub provided_at: DateTime<Utc>,
    pub provided_by: Option<ActorName>,
}

#[derive(Debug, Serialize)]
pub struct AnimalSummary {
    pub photo: String,
    pub description: String,
    pub severity: SeverityAssessment,
}

#[derive(Debug, Serialize)]
pub struct DetailedIncident {
    pub id: String,
    pub status: IncidentStatus,
    pub description: String,
    pub animal_info: AnimalSummary,
    pub user_contact_info: Option<UserSummary>,
    pub volunteer_info: PopulatedVolunteerActivity,
    pub status_updates: Vec<PopulatedCaseUpdate>,
    pub resources_needed: Vec<ResourceNeed>,
    pub resources_provided: Vec<PopulatedProvision>,
    pub location: Location,
    pub version: i64,
}

fn populated_volunteer(
    incident: &Incident,
    users: &HashMap<String, User>,
) -> PopulatedVolunteerActivity {
    let activity = &incident.volunteer_activity;
    PopulatedVolunteerActivity {
        assigned_volunteer: activity
            .assigned_volunteer
            .as_deref()
            .and_then(|id| summary(users, id)),
        status: activity.status,
        assigned_at: activity.assigned_at,
        last_update: activity.last_update,
    }
}

/// GET /ngo/incidents
pub async fn get_all_incidents(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let incidents = state.store.find_incidents(&access::city_incidents(&caller)).await?;

    let ids = incidents.iter().flat_map(|i| {
        std::iter::once(i.user.clone()).chain(i.volunteer_activity.assigned_volunteer.clone())
    });
    let users = directory(state.store.as_ref(), ids).await?;

    let rows: Vec<NgoIncidentRow> = incidents
        .iter()
        .map(|incident| NgoIncidentRow {
            id: incident.id.clone(),
            animal_info: incident.animal_info.clone(),
            location: incident.location.clone(),
            status: incident.status,
            created_at: incident.created_at,
            assigned_ngo: incident.assigned_ngo.clone(),
            user: summary(&users, &incident.user),
            volunteer_activity: populated_volunteer(incident, &users),
            version: incident.version,
        })
        .collect();
    debug!("NGO {} listing {} incidents in {}", caller.id, rows.len(), caller.city);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": rows.len(),
        "data": rows,
    })))
}

/// GET /ngo/incidents/{id}
pub async fn get_detailed_incident(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let incident = lifecycle::visible_incident(state.store.as_ref(), &caller, &path).await?;

    let ids = std::iter::once(incident.user.clone())
        .chain(incident.volunteer_activity.assigned_volunteer.clone())
        .chain(incident.case_updates.iter().map(|u| u.updated_by.clone()))
        .chain(incident.resources.provided.iter().filter_map(|p| p.provided_by.clone()));
    let users = directory(state.store.as_ref(), ids).await?;
    let actor = |id: &str| ActorName {
        id: id.to_string(),
        name: users.get(id).map(|u| u.name.clone()),
    };

    let detail = DetailedIncident {
        id: incident.id.clone(),
        status: incident.status,
        description: incident.description.clone(),
        animal_info: AnimalSummary {
            photo: incident.animal_info.photo.clone(),
            description: incident.animal_info.description.clone(),
            severity: incident.animal_info.ai_severity_assessment.clone(),
        },
        user_contact_info: summary(&users, &incident.user),
        volunteer_info: populated_volunteer(&incident, &users),
        status_updates: incident
            .case_updates
            .iter()
            .map(|u| PopulatedCaseUpdate {
                timestamp: u.timestamp,
                update_type: u.update_type,
                status: u.status,
                description: u.description.clone(),
                updated_by: actor(u.updated_by.as_str()),
            })
            .collect(),
        resources_needed: incident.resources.needed.clone(),
        resources_provided: incident
            .resources
            .provided
            .iter()
            .map(|p| PopulatedProvision {
                kind: p.kind.clone(),
                description: p.description.clone(),
                provided_at: p.provided_at,
                provided_by: p.provided_by.as_deref().map(&actor),
            })
            .collect(),
        location: incident.location.clone(),
        version: incident.version,
    };
    Ok(HttpResponse::Ok().json(detail))
}

/// PUT /ngo/incidents/{id}/update
pub async fn update_incident_status(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusUpdate>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let incident = lifecycle::update_status(
        state.store.as_ref(),
        &state.transitions,
        &caller,
        &path,
        payload.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Incident updated successfully",
        "data": incident,
    })))
}

/// PUT /ngo/incidents/{id}/resources
pub async fn update_incident_resources(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ResourceUpdate>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let incident =
        lifecycle::update_resources(state.store.as_ref(), &caller, &path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Resources updated successfully",
        "data": incident,
    })))
}

/// POST /ngo/incidents/{id}/notes
pub async fn add_incident_note(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NoteInput>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let incident = lifecycle::add_note(state.store.as_ref(), &caller, &path, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Note added",
        "data": incident,
    })))
}

/// GET /ngo/profile
pub async fn get_ngo_profile(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let ngo = state
        .store
        .find_user(&caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("NGO not found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "name": ngo.name,
        "email": ngo.email,
        "city": ngo.city,
        "phoneNumber": ngo.phone_number,
        "ngoDetails": ngo.ngo_details,
    })))
}
