// src/volunteer.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::access;
use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::lifecycle::{self, ProgressUpdate};
use crate::models::incident::{AnimalInfo, IncidentStatus, LegacySeverity, Location};
use crate::models::user::Role;

pub const DEFAULT_MY_CASES_LIMIT: i64 = 5;
const MAX_MY_CASES_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct ReporterCard {
    pub name: String,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCase {
    pub id: String,
    pub location: Location,
    pub animal_info: AnimalInfo,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub user: ReporterCard,
    pub version: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedCase {
    pub id: String,
    pub animal_info: AnimalInfo,
    pub location: Location,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub description: String,
    pub version: i64,
}

#[derive(Debug, Serialize)]
pub struct VolunteerIncidentView {
    pub animal_info: crate::ngo_dashboard::AnimalSummary,
    pub incident_location: Location,
    pub status: IncidentStatus,
    pub severity_assessment: LegacySeverity,
    pub description: String,
    pub version: i64,
}

#[derive(Debug, Deserialize)]
pub struct MyCasesQuery {
    pub limit: Option<i64>,
}

/// GET /volunteer/incidents
///
/// Pending, unclaimed incidents in the volunteer's city, newest first.
pub async fn get_volunteer_incidents(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Volunteer)?;
    let incidents = state.store.find_incidents(&access::available_cases(&caller)).await?;
    debug!("{} open cases for volunteer {} in {}", incidents.len(), caller.id, caller.city);

    let data: Vec<OpenCase> = incidents
        .into_iter()
        .map(|incident| OpenCase {
            id: incident.id,
            location: incident.location,
            animal_info: incident.animal_info,
            status: incident.status,
            created_at: incident.created_at,
            // Contact snapshot taken when the incident was reported.
            user: ReporterCard {
                name: incident.reporter_info.name,
                phone_number: incident.reporter_info.contact_number,
            },
            version: incident.version,
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "debug": {
            "volunteerId": caller.id,
            "volunteerCity": caller.city,
            "totalIncidents": data.len(),
        },
        "data": data,
    })))
}

/// GET /volunteer/incidents/{id}
pub async fn get_incident_details(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Volunteer)?;
    let incident = lifecycle::visible_incident(state.store.as_ref(), &caller, &path).await?;
    let view = VolunteerIncidentView {
        animal_info: crate::ngo_dashboard::AnimalSummary {
            photo: incident.animal_info.photo,
            description: incident.animal_info.description,
            severity: incident.animal_info.ai_severity_assessment,
        },
        incident_location: incident.location,
        status: incident.status,
        severity_assessment: incident.severity_assessment,
        description: incident.description,
        version: incident.version,
    };
    Ok(HttpResponse::Ok().json(view))
}

/// PUT /volunteer/incidents/{id}/volunteer/update
pub async fn update_volunteer_status(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Volunteer)?;
    let incident = lifecycle::self_assign(state.store.as_ref(), &caller, &path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Status updated successfully",
        "incident": incident,
    })))
}

/// PUT /volunteer/incidents/{id}/progress
pub async fn update_progress(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ProgressUpdate>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Volunteer)?;
    let incident =
        lifecycle::update_volunteer_progress(state.store.as_ref(), &caller, &path, payload.into_inner())
            .await?;
    info!(
        "Volunteer {} progress on {}: {:?}",
        caller.id, incident.id, incident.volunteer_activity.status
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Progress updated successfully",
        "incident": incident,
    })))
}

/// GET /volunteer/my-cases
pub async fn get_my_cases(
    caller: Caller,
    state: web::Data<AppState>,
    query: web::Query<MyCasesQuery>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Volunteer)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MY_CASES_LIMIT)
        .clamp(1, MAX_MY_CASES_LIMIT);
    let incidents = state.store.find_incidents(&access::my_cases(&caller, limit)).await?;

    let data: Vec<AssignedCase> = incidents
        .into_iter()
        .map(|incident| AssignedCase {
            id: incident.id,
            animal_info: incident.animal_info,
            location: incident.location,
            status: incident.status,
            created_at: incident.created_at,
            assigned_at: incident.volunteer_activity.assigned_at,
            description: incident.description,
            version: incident.version,
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

/// GET /volunteer/{id}
pub async fn get_volunteer_profile(
    _caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let volunteer = state
        .store
        .find_user(&path)
        .await?
        .filter(|u| u.role == Role::Volunteer)
        .ok_or_else(|| AppError::NotFound("Volunteer not found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({
        "_id": volunteer.id,
        "name": volunteer.name,
        "email": volunteer.email,
        "phoneNumber": volunteer.phone_number,
    })))
}
