// src/dashboard_data.rs

use actix_web::{web, HttpResponse};
use log::debug;
use serde::Serialize;
use serde_json::json;

use crate::access;
use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::AppResult;
use crate::models::incident::{Incident, IncidentStatus};
use crate::models::user::Role;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total: usize,
    pub critical: usize,
    pub pending: usize,
    pub resolved: usize,
    pub in_progress: usize,
    /// Incidents the load balancer routed to this NGO.
    pub assigned_to_you: usize,
}

impl OverviewStats {
    /// Single pass over the NGO's city view.
    pub fn compute(incidents: &[Incident], ngo_id: &str) -> Self {
        incidents.iter().fold(OverviewStats::default(), |mut stats, incident| {
            stats.total += 1;
            if incident.is_critical() {
                stats.critical += 1;
            }
            match incident.status {
                IncidentStatus::Pending => stats.pending += 1,
                IncidentStatus::InProgress => stats.in_progress += 1,
                IncidentStatus::Resolved => stats.resolved += 1,
            }
            if incident.assigned_ngo == ngo_id {
                stats.assigned_to_you += 1;
            }
            stats
        })
    }
}

/// GET /ngo/overview
pub async fn get_dashboard_overview(
    caller: Caller,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    access::require_role(&caller, Role::Ngo)?;
    let incidents = state.store.find_incidents(&access::city_incidents(&caller)).await?;
    let stats = OverviewStats::compute(&incidents, &caller.id);
    debug!("Overview for NGO {} in {}: {:?}", caller.id, caller.city, stats);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "stats": stats,
        "debug": {
            "ngoId": caller.id,
            "ngoCity": caller.city,
            "totalIncidents": incidents.len(),
        }
    })))
}
