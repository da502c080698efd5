// src/incidents.rs

use actix_multipart::form::{json::Json as MpJson, tempfile::TempFile, MultipartForm};
use actix_web::{web, HttpResponse};
use log::{debug, info};

use crate::access;
use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::lifecycle::{self, IncidentPayload};

/// `POST /incidents/create` form: the photo plus a typed JSON `data` part.
#[derive(MultipartForm)]
pub struct CreateIncidentForm {
    #[multipart(rename = "animalPhoto", limit = "10MB")]
    pub animal_photo: Option<TempFile>,
    pub data: MpJson<IncidentPayload>,
}

/// Stores the uploaded photo, if any, and returns its reference.
pub(crate) async fn store_photo(
    state: &AppState,
    field: &str,
    file: Option<&TempFile>,
) -> AppResult<Option<String>> {
    let Some(file) = file.filter(|f| f.size > 0) else {
        return Ok(None);
    };
    if let Some(mime) = &file.content_type {
        if mime.type_() != "image" {
            return Err(AppError::Validation(format!(
                "{} must be an image, got {}",
                field, mime
            )));
        }
    }
    let name = state
        .photos
        .save(field, file.file.path(), file.file_name.as_deref())
        .await?;
    Ok(Some(name))
}

/// POST /incidents/create
pub async fn create_incident(
    caller: Caller,
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<CreateIncidentForm>,
) -> AppResult<HttpResponse> {
    let payload = form.data.into_inner();
    payload.validate()?;
    if form.animal_photo.as_ref().map_or(true, |f| f.size == 0) {
        return Err(AppError::Validation("Animal photo is required".to_string()));
    }

    let photo = store_photo(&state, "animalPhoto", form.animal_photo.as_ref()).await?;
    match lifecycle::create_incident(state.store.as_ref(), &caller, payload, photo.clone()).await {
        Ok(incident) => {
            info!("Incident {} reported by {}", incident.id, caller.id);
            Ok(HttpResponse::Created().json(incident))
        }
        Err(e) => {
            if let Some(photo) = photo {
                state.photos.discard(&photo).await;
            }
            Err(e)
        }
    }
}

/// GET /incidents
pub async fn get_incidents(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let incidents = state
        .store
        .find_incidents(&access::visible_incidents(&caller))
        .await?;
    debug!("{} incidents visible to {}", incidents.len(), caller.id);
    Ok(HttpResponse::Ok().json(incidents))
}

/// GET /incidents/{id}
pub async fn get_incident_by_id(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let incident = lifecycle::visible_incident(state.store.as_ref(), &caller, &path).await?;
    Ok(HttpResponse::Ok().json(incident))
}
