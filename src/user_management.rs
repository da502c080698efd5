use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::access;
use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::models::user::{Role, User, UserSummary};
use crate::store::EntityStore;

/// Resolves referenced user ids for populated responses. Unknown ids are
/// simply absent from the map.
pub(crate) async fn directory<I>(store: &dyn EntityStore, ids: I) -> AppResult<HashMap<String, User>>
where
    I: IntoIterator<Item = String>,
{
    let mut ids: Vec<String> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    let users = store.find_users(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id.clone(), u)).collect())
}

pub(crate) fn summary(directory: &HashMap<String, User>, id: &str) -> Option<UserSummary> {
    directory.get(id).map(UserSummary::from)
}

/// GET /users/profile/{id}
pub async fn get_user_profile(
    _caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = state
        .store
        .find_user(&path)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut profile = json!({
        "name": user.name,
        "contact_info": {
            "email": user.email,
            "phoneNumber": user.phone_number,
            "address": user.address,
        },
        "role": user.role,
        "city": user.city,
    });
    match (user.role, &user.volunteer_details, &user.ngo_details) {
        (Role::Volunteer, Some(details), _) => {
            profile["volunteerDetails"] = json!(details);
        }
        (Role::Ngo, _, Some(details)) => {
            profile["ngoDetails"] = json!(details);
        }
        _ => {}
    }
    Ok(HttpResponse::Ok().json(profile))
}

/// GET /users/my-incidents
pub async fn get_user_incidents(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let incidents = state.store.find_incidents(&access::reported_by(&caller)).await?;
    let message = if incidents.is_empty() {
        "No incidents found for this user"
    } else {
        "Incidents retrieved successfully"
    };
    Ok(HttpResponse::Ok().json(json!({ "data": incidents, "message": message })))
}
