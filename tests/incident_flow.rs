#[macro_use]
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use common::*;
use hopes_alive::auth::Caller;
use hopes_alive::error::{AppError, AppResult};
use hopes_alive::lifecycle;
use hopes_alive::models::incident::{Incident, IncidentStatus, UpdateType, VolunteerStatus};
use hopes_alive::models::notification::{Notification, RecipientRole};
use hopes_alive::models::pet::Pet;
use hopes_alive::models::user::{NgoLoad, Role, User};
use hopes_alive::store::{EntityStore, IncidentQuery, MemoryStore, NotificationQuery, PetFilter};
use hopes_alive::transitions::TransitionPolicy;

#[actix_web::test]
async fn report_goes_to_least_loaded_ngo_in_city() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let busy = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let idle = seed_user(&env.store, "Tails Pune", Role::Ngo, "Pune").await;
    seed_user(&env.store, "Mumbai Rescue", Role::Ngo, "Mumbai").await;
    seed_incident(&env.store, &reporter, &busy, 4.0).await;
    let app = app!(env);

    let (content_type, body) = incident_form(8.0);
    let req = test::TestRequest::post()
        .uri("/api/incidents/create")
        .insert_header(bearer(&reporter))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let incident: Incident = test::read_body_json(resp).await;
    assert_eq!(incident.assigned_ngo, idle.id);
    assert_eq!(incident.city, "Pune");
    assert_eq!(incident.status, IncidentStatus::Pending);
    assert_eq!(incident.volunteer_activity.status, VolunteerStatus::Unassigned);
    assert!(incident.case_updates.is_empty());
    assert_eq!(incident.version, 0);
    assert_eq!(incident.reporter_info.name, "Asha");
    assert!(incident.animal_info.photo.starts_with("animalPhoto-"));
    assert!(env.upload_dir.join(&incident.animal_info.photo).exists());
}

#[actix_web::test]
async fn report_without_ngo_in_city_is_rejected_and_not_stored() {
    let env = env();
    let reporter = seed_user(&env.store, "Ravi", Role::User, "Nagpur").await;
    seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let app = app!(env);

    let (content_type, body) = incident_form(5.0);
    let req = test::TestRequest::post()
        .uri("/api/incidents/create")
        .insert_header(bearer(&reporter))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("No NGO found in your city"));

    let stored = env.store.find_incidents(&IncidentQuery::default()).await.unwrap();
    assert!(stored.is_empty());
    let leftover = std::fs::read_dir(&env.upload_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[actix_web::test]
async fn report_without_photo_is_a_validation_error() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let app = app!(env);

    let data = incident_json(3.0);
    let (content_type, body) = multipart(&[Part::Text("data", &data)]);
    let req = test::TestRequest::post()
        .uri("/api/incidents/create")
        .insert_header(bearer(&reporter))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn requests_without_token_are_unauthorized() {
    let env = env();
    let app = app!(env);
    let req = test::TestRequest::get().uri("/api/incidents").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/incidents")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn status_updates_append_ordered_audit_entries() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let steps = ["in progress", "resolved", "pending"];
    for status in steps {
        let req = test::TestRequest::put()
            .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
            .insert_header(bearer(&ngo))
            .set_json(json!({ "status": status, "status_update": format!("now {}", status) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Incident updated successfully"));
    }

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.case_updates.len(), steps.len());
    assert_eq!(stored.status, IncidentStatus::Pending);
    assert_eq!(stored.version, steps.len() as i64);
    for pair in stored.case_updates.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    for (entry, status) in stored.case_updates.iter().zip(steps) {
        assert_eq!(entry.update_type, UpdateType::StatusChange);
        assert_eq!(entry.updated_by, ngo.id);
        assert_eq!(entry.description, format!("now {}", status));
    }
}

#[actix_web::test]
async fn status_update_replaces_only_non_empty_resource_lists() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::put()
        .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
        .insert_header(bearer(&ngo))
        .set_json(json!({
            "status": "in progress",
            "status_update": "Ambulance sent",
            "resources_needed": [{ "type": "MEDICAL", "description": "Bandages", "priority": "HIGH" }],
            "resources_provided": [],
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
        .insert_header(bearer(&ngo))
        .set_json(json!({ "status": "in progress", "status_update": "Still treating", "resources_needed": [] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.resources.needed.len(), 1);
    assert_eq!(stored.resources.needed[0].description, "Bandages");
    assert!(stored.resources.provided.is_empty());
}

#[actix_web::test]
async fn other_city_sees_incident_as_missing() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let outsider = seed_user(&env.store, "Mumbai Rescue", Role::Ngo, "Mumbai").await;
    let volunteer = seed_user(&env.store, "Vik", Role::Volunteer, "Mumbai").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    for (user, uri) in [
        (&outsider, format!("/api/ngo/incidents/{}", incident.id)),
        (&volunteer, format!("/api/volunteer/incidents/{}", incident.id)),
        (&outsider, format!("/api/incidents/{}", incident.id)),
    ] {
        let req = test::TestRequest::get().uri(&uri).insert_header(bearer(user)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let req = test::TestRequest::put()
        .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
        .insert_header(bearer(&outsider))
        .set_json(json!({ "status": "resolved", "status_update": "x" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Pending);
    assert!(stored.case_updates.is_empty());
}

#[actix_web::test]
async fn same_city_ngo_lists_all_city_incidents_but_cannot_update_others() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let owner = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let neighbour = seed_user(&env.store, "Tails Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &owner, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::get()
        .uri("/api/ngo/incidents")
        .insert_header(bearer(&neighbour))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["_id"], json!(incident.id));
    assert_eq!(body["data"][0]["user"]["name"], json!("Asha"));

    let req = test::TestRequest::put()
        .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
        .insert_header(bearer(&neighbour))
        .set_json(json!({ "status": "resolved", "status_update": "x" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn wrong_role_is_forbidden() {
    let env = env();
    let volunteer = seed_user(&env.store, "Vik", Role::Volunteer, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let app = app!(env);

    let req = test::TestRequest::get()
        .uri("/api/ngo/overview")
        .insert_header(bearer(&volunteer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Access denied. NGO role required."));

    let req = test::TestRequest::get()
        .uri("/api/volunteer/incidents")
        .insert_header(bearer(&ngo))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn dashboard_counts_city_incidents() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let other = seed_user(&env.store, "Tails Pune", Role::Ngo, "Pune").await;
    let app = app!(env);

    for (score, owner, resolve) in [(9.0, &ngo, false), (3.0, &other, true), (7.0, &ngo, false), (2.0, &other, true)] {
        let incident = seed_incident(&env.store, &reporter, owner, score).await;
        if resolve {
            let req = test::TestRequest::put()
                .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
                .insert_header(bearer(owner))
                .set_json(json!({ "status": "resolved", "status_update": "done" }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }
    }

    let req = test::TestRequest::get()
        .uri("/api/ngo/overview")
        .insert_header(bearer(&ngo))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["stats"]["total"], json!(4));
    assert_eq!(body["stats"]["critical"], json!(2));
    assert_eq!(body["stats"]["pending"], json!(2));
    assert_eq!(body["stats"]["resolved"], json!(2));
    assert_eq!(body["stats"]["assignedToYou"], json!(2));
}

#[actix_web::test]
async fn stale_client_version_is_a_conflict() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let update = |version: i64| {
        test::TestRequest::put()
            .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
            .insert_header(bearer(&ngo))
            .set_json(json!({ "status": "in progress", "status_update": "on it", "version": version }))
            .to_request()
    };
    assert_eq!(test::call_service(&app, update(0)).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&app, update(0)).await.status(), StatusCode::CONFLICT);

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.case_updates.len(), 1);
    assert_eq!(stored.version, 1);
}

#[actix_web::test]
async fn forward_only_policy_rejects_reopening() {
    let env = env_with_policy(TransitionPolicy::forward_only());
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let set = |status: &str| {
        test::TestRequest::put()
            .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
            .insert_header(bearer(&ngo))
            .set_json(json!({ "status": status, "status_update": "" }))
            .to_request()
    };
    assert_eq!(test::call_service(&app, set("resolved")).await.status(), StatusCode::OK);
    let resp = test::call_service(&app, set("pending")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("invalid_transition"));

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Resolved);
    assert_eq!(stored.case_updates[0].description, "Status changed from pending to resolved");
}

#[actix_web::test]
async fn volunteer_claims_open_case_once() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let volunteer = seed_user(&env.store, "Vik", Role::Volunteer, "Pune").await;
    let rival = seed_user(&env.store, "Meera", Role::Volunteer, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::get()
        .uri("/api/volunteer/incidents")
        .insert_header(bearer(&volunteer))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["user"]["name"], json!("Asha"));

    let claim = |user: &User| {
        test::TestRequest::put()
            .uri(&format!("/api/volunteer/incidents/{}/volunteer/update", incident.id))
            .insert_header(bearer(user))
            .to_request()
    };
    let resp = test::call_service(&app, claim(&volunteer)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Status updated successfully"));
    assert_eq!(body["incident"]["status"], json!("in progress"));
    assert_eq!(body["incident"]["volunteerActivity"]["status"], json!("ASSIGNED"));

    assert_eq!(test::call_service(&app, claim(&volunteer)).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&app, claim(&rival)).await.status(), StatusCode::CONFLICT);

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.volunteer_activity.assigned_volunteer.as_deref(), Some(volunteer.id.as_str()));
    assert_eq!(stored.case_updates.len(), 1);
    assert_eq!(stored.case_updates[0].update_type, UpdateType::VolunteerUpdate);
    assert_eq!(stored.case_updates[0].description, "Volunteer Vik assigned to the incident");

    // Claimed cases drop out of the open list.
    let req = test::TestRequest::get()
        .uri("/api/volunteer/incidents")
        .insert_header(bearer(&rival))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], json!(0));

    let req = test::TestRequest::get()
        .uri("/api/volunteer/my-cases?limit=3")
        .insert_header(bearer(&volunteer))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let first = Caller::from(seed_user(&env.store, "Vik", Role::Volunteer, "Pune").await);
    let second = Caller::from(seed_user(&env.store, "Meera", Role::Volunteer, "Pune").await);
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let store: &dyn EntityStore = &*env.store;

    let (a, b) = futures::join!(
        lifecycle::self_assign(store, &first, &incident.id),
        lifecycle::self_assign(store, &second, &incident.id),
    );
    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!([a, b].into_iter().any(|r| matches!(r, Err(AppError::Conflict(_)))));

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.case_updates.len(), 1);
    assert_eq!(stored.version, 1);
}

#[actix_web::test]
async fn lost_compare_and_swap_writes_nothing() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;

    let mut winner = incident.clone();
    winner.version = 1;
    winner.status = IncidentStatus::Resolved;
    assert!(env.store.replace_incident(&winner, 0).await.unwrap());

    let mut loser = incident.clone();
    loser.version = 1;
    loser.status = IncidentStatus::InProgress;
    assert!(!env.store.replace_incident(&loser, 0).await.unwrap());

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Resolved);
}

/// Lets one rival write land right after the first incident read, so the
/// operation under test always commits against a stale version.
struct RacingStore {
    inner: Arc<MemoryStore>,
    rival: String,
    raced: AtomicBool,
}

#[async_trait]
impl EntityStore for RacingStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        self.inner.insert_user(user).await
    }
    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        self.inner.find_user(id).await
    }
    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<User>> {
        self.inner.find_users(ids).await
    }
    async fn ngo_loads(&self, city: &str) -> AppResult<Vec<NgoLoad>> {
        self.inner.ngo_loads(city).await
    }
    async fn insert_incident(&self, incident: &Incident) -> AppResult<()> {
        self.inner.insert_incident(incident).await
    }
    async fn find_incident(&self, id: &str) -> AppResult<Option<Incident>> {
        let found = self.inner.find_incident(id).await?;
        if let Some(current) = &found {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let mut rival = current.clone();
                rival.record(UpdateType::GeneralNote, "Rival note", &self.rival, Utc::now());
                rival.version = current.version + 1;
                assert!(self.inner.replace_incident(&rival, current.version).await?);
            }
        }
        Ok(found)
    }
    async fn find_incidents(&self, query: &IncidentQuery) -> AppResult<Vec<Incident>> {
        self.inner.find_incidents(query).await
    }
    async fn replace_incident(&self, incident: &Incident, expected_version: i64) -> AppResult<bool> {
        self.inner.replace_incident(incident, expected_version).await
    }
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        self.inner.insert_notification(notification).await
    }
    async fn find_notifications(&self, query: &NotificationQuery) -> AppResult<Vec<Notification>> {
        self.inner.find_notifications(query).await
    }
    async fn mark_notification_read(&self, id: &str, recipient: &str) -> AppResult<bool> {
        self.inner.mark_notification_read(id, recipient).await
    }
    async fn insert_pet(&self, pet: &Pet) -> AppResult<()> {
        self.inner.insert_pet(pet).await
    }
    async fn find_pet(&self, id: &str) -> AppResult<Option<Pet>> {
        self.inner.find_pet(id).await
    }
    async fn find_pets(&self, filter: &PetFilter) -> AppResult<Vec<Pet>> {
        self.inner.find_pets(filter).await
    }
}

#[actix_web::test]
async fn claim_committing_against_a_newer_version_is_a_conflict() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let volunteer = Caller::from(seed_user(&env.store, "Vik", Role::Volunteer, "Pune").await);
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let racing = RacingStore {
        inner: env.store.clone(),
        rival: ngo.id.clone(),
        raced: AtomicBool::new(false),
    };

    let result = lifecycle::self_assign(&racing, &volunteer, &incident.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))), "{:?}", result);

    // Only the rival's write is stored.
    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.status, IncidentStatus::Pending);
    assert_eq!(stored.volunteer_activity.assigned_volunteer, None);
    assert_eq!(stored.case_updates.len(), 1);
    assert_eq!(stored.case_updates[0].update_type, UpdateType::GeneralNote);

    let inbox = env
        .store
        .find_notifications(&NotificationQuery {
            recipient: ngo.id.clone(),
            recipient_role: RecipientRole::Ngo,
            unread_only: false,
            limit: 50,
        })
        .await
        .unwrap();
    assert!(inbox.is_empty());
}

#[actix_web::test]
async fn volunteers_cannot_claim_cases_that_left_pending() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let volunteer = seed_user(&env.store, "Vik", Role::Volunteer, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::put()
        .uri(&format!("/api/ngo/incidents/{}/update", incident.id))
        .insert_header(bearer(&ngo))
        .set_json(json!({ "status": "resolved", "status_update": "Treated on site" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/volunteer/incidents/{}/volunteer/update", incident.id))
        .insert_header(bearer(&volunteer))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Resolved);
    assert_eq!(stored.volunteer_activity.assigned_volunteer, None);
    assert_eq!(stored.case_updates.len(), 1);
}

#[actix_web::test]
async fn resource_updates_replace_lists_and_stamp_the_provider() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let resources = |body: Value| {
        test::TestRequest::put()
            .uri(&format!("/api/ngo/incidents/{}/resources", incident.id))
            .insert_header(bearer(&ngo))
            .set_json(body)
            .to_request()
    };

    let resp = test::call_service(
        &app,
        resources(json!({
            "resources_needed": [{ "type": "MEDICAL", "description": "Splint", "priority": "HIGH" }],
            "resources_provided": [{ "type": "FOOD", "description": "Kibble" }],
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Resources updated successfully"));
    assert_eq!(body["data"]["resources"]["provided"][0]["providedBy"], json!(ngo.id));

    // An empty list clears, unlike the status route.
    let resp = test::call_service(&app, resources(json!({ "resources_needed": [], "version": 1 }))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, resources(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, resources(json!({ "resources_needed": [], "version": 1 }))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert!(stored.resources.needed.is_empty());
    assert_eq!(stored.resources.provided.len(), 1);
    assert_eq!(stored.resources.provided[0].provided_by.as_deref(), Some(ngo.id.as_str()));
    assert_eq!(stored.case_updates.len(), 2);
    assert!(stored
        .case_updates
        .iter()
        .all(|entry| entry.update_type == UpdateType::ResourceUpdate && entry.updated_by == ngo.id));
    assert_eq!(stored.case_updates[0].description, "Resources updated: 1 needed, 1 provided");
    assert_eq!(stored.case_updates[1].description, "Resources updated: 0 needed, 1 provided");
}

#[actix_web::test]
async fn only_assigned_volunteer_reports_progress() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let volunteer = seed_user(&env.store, "Vik", Role::Volunteer, "Pune").await;
    let other = seed_user(&env.store, "Meera", Role::Volunteer, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::put()
        .uri(&format!("/api/volunteer/incidents/{}/volunteer/update", incident.id))
        .insert_header(bearer(&volunteer))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let progress = |user: &User, label: &str| {
        test::TestRequest::put()
            .uri(&format!("/api/volunteer/incidents/{}/progress", incident.id))
            .insert_header(bearer(user))
            .set_json(json!({ "status": label }))
            .to_request()
    };
    assert_eq!(
        test::call_service(&app, progress(&other, "Arrived")).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        test::call_service(&app, progress(&volunteer, "Teleported")).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        test::call_service(&app, progress(&volunteer, "Animal rescued")).await.status(),
        StatusCode::OK
    );

    let stored = env.store.find_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(stored.volunteer_activity.status, VolunteerStatus::OnSite);
    assert_eq!(stored.case_updates.len(), 2);
}

#[actix_web::test]
async fn detailed_view_names_audit_actors() {
    let env = env();
    let reporter = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let incident = seed_incident(&env.store, &reporter, &ngo, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::post()
        .uri(&format!("/api/ngo/incidents/{}/notes", incident.id))
        .insert_header(bearer(&ngo))
        .set_json(json!({ "note": "Called the reporter" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/ngo/incidents/{}", incident.id))
        .insert_header(bearer(&ngo))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_contact_info"]["name"], json!("Asha"));
    assert_eq!(body["status_updates"][0]["updateType"], json!("GENERAL_NOTE"));
    assert_eq!(body["status_updates"][0]["updatedBy"]["name"], json!("Paws Pune"));
    assert_eq!(body["version"], json!(1));
}

#[actix_web::test]
async fn reporters_see_only_their_own_incidents() {
    let env = env();
    let asha = seed_user(&env.store, "Asha", Role::User, "Pune").await;
    let ravi = seed_user(&env.store, "Ravi", Role::User, "Pune").await;
    let ngo = seed_user(&env.store, "Paws Pune", Role::Ngo, "Pune").await;
    let mine = seed_incident(&env.store, &asha, &ngo, 6.0).await;
    seed_incident(&env.store, &ravi, &ngo, 6.0).await;
    let app = app!(env);

    let req = test::TestRequest::get()
        .uri("/api/incidents")
        .insert_header(bearer(&asha))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["_id"], json!(mine.id));

    let req = test::TestRequest::get()
        .uri("/api/users/my-incidents")
        .insert_header(bearer(&asha))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let newcomer = seed_user(&env.store, "Neha", Role::User, "Pune").await;
    let req = test::TestRequest::get()
        .uri("/api/users/my-incidents")
        .insert_header(bearer(&newcomer))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], json!("No incidents found for this user"));
}
