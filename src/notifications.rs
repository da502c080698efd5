// src/notifications.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::warn;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::models::new_id;
use crate::models::notification::{Notification, NotificationKind, RecipientRole};
use crate::models::user::Role;
use crate::store::{EntityStore, NotificationQuery};

pub const NGO_INBOX_LIMIT: i64 = 50;
pub const VOLUNTEER_INBOX_LIMIT: i64 = 20;

/// Drops an entry in a dashboard inbox. The incident write has already
/// happened, so a failure here is logged and swallowed.
pub async fn notify(
    store: &dyn EntityStore,
    recipient: &str,
    recipient_role: RecipientRole,
    kind: NotificationKind,
    message: impl Into<String>,
    incident: Option<&str>,
) {
    let notification = Notification {
        id: new_id(),
        recipient: recipient.to_string(),
        recipient_role,
        kind,
        message: message.into(),
        incident: incident.map(str::to_string),
        is_read: false,
        created_at: Utc::now(),
    };
    if let Err(e) = store.insert_notification(&notification).await {
        warn!("Could not store notification for {}: {}", recipient, e);
    }
}

fn inbox(caller: &Caller) -> AppResult<NotificationQuery> {
    match caller.role {
        Role::Ngo => Ok(NotificationQuery {
            recipient: caller.id.clone(),
            recipient_role: RecipientRole::Ngo,
            unread_only: true,
            limit: NGO_INBOX_LIMIT,
        }),
        Role::Volunteer => Ok(NotificationQuery {
            recipient: caller.id.clone(),
            recipient_role: RecipientRole::Volunteer,
            unread_only: false,
            limit: VOLUNTEER_INBOX_LIMIT,
        }),
        Role::User => Err(AppError::Forbidden(
            "Notifications are only available to NGOs and volunteers".to_string(),
        )),
    }
}

/// GET /ngo/notifications
pub async fn get_ngo_notifications(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    crate::access::require_role(&caller, Role::Ngo)?;
    let notifications = state.store.find_notifications(&inbox(&caller)?).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": notifications.len(),
        "data": notifications,
    })))
}

/// GET /volunteer/notifications
pub async fn get_volunteer_notifications(
    caller: Caller,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    crate::access::require_role(&caller, Role::Volunteer)?;
    let notifications = state.store.find_notifications(&inbox(&caller)?).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// PUT /{ngo|volunteer}/notifications/{id}/read
pub async fn mark_read(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    inbox(&caller)?;
    if !state.store.mark_notification_read(&path, &caller.id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Notification marked as read" })))
}
