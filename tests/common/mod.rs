#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::web;
use chrono::Utc;
use uuid::Uuid;

use hopes_alive::app_state::AppState;
use hopes_alive::auth::issue_token;
use hopes_alive::config::Config;
use hopes_alive::models::incident::*;
use hopes_alive::models::new_id;
use hopes_alive::models::user::{Role, User};
use hopes_alive::store::{EntityStore, MemoryStore};
use hopes_alive::transitions::TransitionPolicy;

pub const SECRET: &str = "test-secret";

pub struct TestEnv {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub upload_dir: PathBuf,
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub fn env() -> TestEnv {
    env_with_policy(TransitionPolicy::permissive())
}

pub fn env_with_policy(policy: TransitionPolicy) -> TestEnv {
    let upload_dir = std::env::temp_dir().join(format!("hopes-alive-test-{}", Uuid::new_v4().simple()));
    let mut config = Config::in_memory(SECRET, upload_dir.clone());
    config.transitions = policy;
    let store = Arc::new(MemoryStore::new());
    let state = web::Data::new(AppState::new(store.clone(), config));
    TestEnv {
        state,
        store,
        upload_dir,
    }
}

/// Builds the service exactly as `main` wires it, minus CORS and logging.
macro_rules! app {
    ($env:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(hopes_alive::auth::Authentication::new($crate::common::SECRET))
                .app_data($env.state.clone())
                .configure(hopes_alive::configure),
        )
        .await
    };
}

pub async fn seed_user(store: &MemoryStore, name: &str, role: Role, city: &str) -> User {
    let user = User {
        id: new_id(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        password: String::new(),
        role,
        phone_number: "9800000000".to_string(),
        address: format!("{} street", city),
        city: city.to_string(),
        is_active: true,
        volunteer_details: None,
        ngo_details: None,
        created_at: Utc::now(),
    };
    store.insert_user(&user).await.unwrap();
    user
}

pub fn bearer(user: &User) -> (&'static str, String) {
    let token = issue_token(&user.id, SECRET).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

/// Writes an incident directly, bypassing the selector.
pub async fn seed_incident(store: &MemoryStore, reporter: &User, ngo: &User, score: f64) -> Incident {
    let now = Utc::now();
    let incident = Incident {
        id: new_id(),
        user: reporter.id.clone(),
        city: reporter.city.clone(),
        assigned_ngo: ngo.id.clone(),
        description: "Dog hit by a scooter".to_string(),
        reporter_info: ReporterInfo {
            name: reporter.name.clone(),
            contact_number: reporter.phone_number.clone(),
            email: reporter.email.clone(),
            preferred_contact_method: ContactMethod::Phone,
        },
        location: Location {
            kind: GeoType::Point,
            coordinates: vec![73.85, 18.52],
            address: "FC Road".to_string(),
        },
        status: IncidentStatus::Pending,
        severity_assessment: LegacySeverity::Pending,
        animal_info: AnimalInfo {
            photo: "animalPhoto-seed.jpg".to_string(),
            description: "Brown dog, limping".to_string(),
            ai_severity_assessment: SeverityAssessment {
                score,
                category: SeverityCategory::High,
                assessment_details: String::new(),
            },
        },
        animal_photo: "animalPhoto-seed.jpg".to_string(),
        volunteer_activity: VolunteerActivity::default(),
        case_updates: Vec::new(),
        resources: Resources::default(),
        version: 0,
        created_at: now,
        updated_at: now,
    };
    store.insert_incident(&incident).await.unwrap();
    incident
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Encodes a multipart/form-data body; returns the content type header value
/// and the payload.
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let boundary = format!("----hopes-alive-{}", Uuid::new_v4().simple());
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

pub fn incident_json(score: f64) -> String {
    serde_json::json!({
        "description": "Injured dog near the station",
        "location": { "coordinates": [73.8567, 18.5204], "address": "Pune Station" },
        "animalInfo": {
            "description": "Stray dog with a leg wound",
            "aiSeverityAssessment": { "score": score, "category": "HIGH", "assessmentDetails": "Bleeding" }
        }
    })
    .to_string()
}

pub fn incident_form(score: f64) -> (String, Vec<u8>) {
    let data = incident_json(score);
    multipart(&[
        Part::Text("data", &data),
        Part::File {
            name: "animalPhoto",
            file_name: "dog.jpg",
            content_type: "image/jpeg",
            bytes: JPEG,
        },
    ])
}
