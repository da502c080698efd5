// src/access.rs

use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::models::incident::{Incident, IncidentStatus, VolunteerStatus};
use crate::models::user::Role;
use crate::store::{IncidentQuery, IncidentSort};

pub const NOT_IN_CITY: &str = "Incident not found or not accessible in your city";

pub fn require_role(caller: &Caller, role: Role) -> AppResult<()> {
    if caller.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Access denied. {} role required.",
            role.label()
        )))
    }
}

/// Every incident in the caller's city. NGOs see all of them, not only the
/// ones assigned to their own account.
pub fn city_incidents(caller: &Caller) -> IncidentQuery {
    IncidentQuery {
        city: Some(caller.city.clone()),
        ..Default::default()
    }
}

/// Pending incidents in the volunteer's city that nobody has claimed yet.
pub fn available_cases(caller: &Caller) -> IncidentQuery {
    IncidentQuery {
        city: Some(caller.city.clone()),
        status: Some(IncidentStatus::Pending),
        volunteer_status: Some(VolunteerStatus::Unassigned),
        ..Default::default()
    }
}

/// Incidents claimed by the volunteer, most recently claimed first. Not
/// restricted to the volunteer's current city.
pub fn my_cases(caller: &Caller, limit: i64) -> IncidentQuery {
    IncidentQuery {
        assigned_volunteer: Some(caller.id.clone()),
        sort: IncidentSort::RecentlyAssignedFirst,
        limit: Some(limit),
        ..Default::default()
    }
}

pub fn reported_by(caller: &Caller) -> IncidentQuery {
    IncidentQuery {
        reporter: Some(caller.id.clone()),
        ..Default::default()
    }
}

/// Listing used by the generic `/incidents` endpoint.
pub fn visible_incidents(caller: &Caller) -> IncidentQuery {
    match caller.role {
        Role::User => reported_by(caller),
        Role::Volunteer | Role::Ngo => city_incidents(caller),
    }
}

/// Out-of-scope incidents are reported exactly like missing ones.
pub fn ensure_visible(caller: &Caller, incident: Option<Incident>) -> AppResult<Incident> {
    match incident {
        Some(incident) if can_see(caller, &incident) => Ok(incident),
        _ => Err(AppError::NotFound(NOT_IN_CITY.to_string())),
    }
}

fn can_see(caller: &Caller, incident: &Incident) -> bool {
    match caller.role {
        Role::User => incident.user == caller.id,
        Role::Volunteer | Role::Ngo => incident.city == caller.city,
    }
}
