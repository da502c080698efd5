// src/lib.rs

pub mod access;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod dashboard_data;
pub mod db;
pub mod error;
pub mod incidents;
pub mod lifecycle;
pub mod models;
pub mod ngo_dashboard;
pub mod ngo_selector;
pub mod notifications;
pub mod pets;
pub mod photos;
pub mod store;
pub mod transitions;
pub mod user_management;
pub mod volunteer;

use actix_multipart::form::{json::JsonConfig as MultipartJsonConfig, MultipartFormConfig};
use actix_web::web;

use crate::error::AppError;

/// Request body size accepted for multipart uploads (5 photos at 10MB each).
const MULTIPART_TOTAL_LIMIT: usize = 60 * 1024 * 1024;

/// Extractor settings shared by every route: malformed JSON, query strings
/// and multipart bodies all surface as 400 validation errors.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        MultipartFormConfig::default()
            .total_limit(MULTIPART_TOTAL_LIMIT)
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    // The `data` part is usually sent without a content type.
    .app_data(MultipartJsonConfig::default().validate_content_type(false));
}

/// Mounts every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_config(cfg);
    cfg.service(
        web::scope("/api")
            // INCIDENTS
            .service(
                web::scope("/incidents")
                    .route("/create", web::post().to(incidents::create_incident))
                    .route("", web::get().to(incidents::get_incidents))
                    .route("/{id}", web::get().to(incidents::get_incident_by_id)),
            )
            // NGO DASHBOARD
            .service(
                web::scope("/ngo")
                    .route("/overview", web::get().to(dashboard_data::get_dashboard_overview))
                    .route("/profile", web::get().to(ngo_dashboard::get_ngo_profile))
                    .route("/notifications", web::get().to(notifications::get_ngo_notifications))
                    .route("/notifications/{id}/read", web::put().to(notifications::mark_read))
                    .route("/incidents", web::get().to(ngo_dashboard::get_all_incidents))
                    .service(
                        web::scope("/incidents/{id}")
                            .route("", web::get().to(ngo_dashboard::get_detailed_incident))
                            .route("/update", web::put().to(ngo_dashboard::update_incident_status))
                            .route("/resources", web::put().to(ngo_dashboard::update_incident_resources))
                            .route("/notes", web::post().to(ngo_dashboard::add_incident_note)),
                    ),
            )
            // VOLUNTEERS
            .service(
                web::scope("/volunteer")
                    .route("/incidents", web::get().to(volunteer::get_volunteer_incidents))
                    .route("/incidents/{id}", web::get().to(volunteer::get_incident_details))
                    .route(
                        "/incidents/{id}/volunteer/update",
                        web::put().to(volunteer::update_volunteer_status),
                    )
                    .route("/incidents/{id}/progress", web::put().to(volunteer::update_progress))
                    .route("/notifications", web::get().to(notifications::get_volunteer_notifications))
                    .route("/notifications/{id}/read", web::put().to(notifications::mark_read))
                    .route("/my-cases", web::get().to(volunteer::get_my_cases))
                    // Catch-all, keep last.
                    .route("/{id}", web::get().to(volunteer::get_volunteer_profile)),
            )
            // USERS
            .service(
                web::scope("/users")
                    .route("/profile/{id}", web::get().to(user_management::get_user_profile))
                    .route("/my-incidents", web::get().to(user_management::get_user_incidents)),
            )
            // PETS
            .service(
                web::scope("/pets")
                    .route("", web::get().to(pets::get_pets))
                    .route("", web::post().to(pets::create_pet))
                    .route("/{id}", web::get().to(pets::get_pet_details)),
            ),
    );
}
