// src/store/mod.rs

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::{doc, Document};

use crate::error::AppResult;
use crate::models::bson_fields::id_bson;
use crate::models::incident::{Incident, IncidentStatus, VolunteerStatus};
use crate::models::notification::{Notification, RecipientRole};
use crate::models::pet::{Gender, Pet, Species};
use crate::models::user::{NgoLoad, User};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncidentSort {
    #[default]
    NewestFirst,
    RecentlyAssignedFirst,
}

/// Filter for incident listings. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentQuery {
    pub city: Option<String>,
    pub status: Option<IncidentStatus>,
    pub volunteer_status: Option<VolunteerStatus>,
    pub assigned_volunteer: Option<String>,
    pub reporter: Option<String>,
    pub assigned_ngo: Option<String>,
    pub sort: IncidentSort,
    pub limit: Option<i64>,
}

impl IncidentQuery {
    pub fn matches(&self, incident: &Incident) -> bool {
        if let Some(city) = &self.city {
            if &incident.city != city {
                return false;
            }
        }
        if let Some(status) = self.status {
            if incident.status != status {
                return false;
            }
        }
        if let Some(volunteer_status) = self.volunteer_status {
            if incident.volunteer_activity.status != volunteer_status {
                return false;
            }
        }
        if let Some(volunteer) = &self.assigned_volunteer {
            if !incident.is_assigned_to_volunteer(volunteer) {
                return false;
            }
        }
        if let Some(reporter) = &self.reporter {
            if &incident.user != reporter {
                return false;
            }
        }
        if let Some(ngo) = &self.assigned_ngo {
            if &incident.assigned_ngo != ngo {
                return false;
            }
        }
        true
    }

    pub fn to_filter(&self) -> Document {
        let mut filter = doc! {};
        if let Some(city) = &self.city {
            filter.insert("city", city);
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(volunteer_status) = self.volunteer_status {
            filter.insert("volunteerActivity.status", volunteer_status_str(volunteer_status));
        }
        if let Some(volunteer) = &self.assigned_volunteer {
            filter.insert("volunteerActivity.assignedVolunteer", id_bson(volunteer));
        }
        if let Some(reporter) = &self.reporter {
            filter.insert("user", id_bson(reporter));
        }
        if let Some(ngo) = &self.assigned_ngo {
            filter.insert("assignedNGO", id_bson(ngo));
        }
        filter
    }

    pub fn sort_document(&self) -> Document {
        match self.sort {
            IncidentSort::NewestFirst => doc! { "createdAt": -1, "_id": -1 },
            IncidentSort::RecentlyAssignedFirst => {
                doc! { "volunteerActivity.assignedAt": -1, "_id": -1 }
            }
        }
    }
}

fn volunteer_status_str(status: VolunteerStatus) -> &'static str {
    match status {
        VolunteerStatus::Unassigned => "UNASSIGNED",
        VolunteerStatus::Assigned => "ASSIGNED",
        VolunteerStatus::OnSite => "ON_SITE",
        VolunteerStatus::Completed => "COMPLETED",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationQuery {
    pub recipient: String,
    pub recipient_role: RecipientRole,
    pub unread_only: bool,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetFilter {
    pub species: Option<Species>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub vaccinated: Option<bool>,
    pub neutered: Option<bool>,
}

impl PetFilter {
    pub fn matches(&self, pet: &Pet) -> bool {
        self.species.map_or(true, |s| pet.species == s)
            && self.city.as_ref().map_or(true, |c| &pet.city == c)
            && self.gender.map_or(true, |g| pet.gender == g)
            && self.min_age.map_or(true, |min| pet.age >= min)
            && self.max_age.map_or(true, |max| pet.age <= max)
            && self.vaccinated.map_or(true, |v| pet.vaccinated == v)
            && self.neutered.map_or(true, |n| pet.neutered == n)
    }

    pub fn to_filter(&self) -> Document {
        let mut filter = doc! {};
        if let Some(species) = self.species {
            filter.insert("species", format!("{:?}", species));
        }
        if let Some(city) = &self.city {
            filter.insert("city", city);
        }
        if let Some(gender) = self.gender {
            filter.insert("gender", format!("{:?}", gender));
        }
        if self.min_age.is_some() || self.max_age.is_some() {
            let mut age = doc! {};
            if let Some(min) = self.min_age {
                age.insert("$gte", min as i64);
            }
            if let Some(max) = self.max_age {
                age.insert("$lte", max as i64);
            }
            filter.insert("age", age);
        }
        if let Some(vaccinated) = self.vaccinated {
            filter.insert("vaccinated", vaccinated);
        }
        if let Some(neutered) = self.neutered {
            filter.insert("neutered", neutered);
        }
        filter
    }
}

/// Persistence seam for every entity the service touches.
///
/// Incident writes after creation go through [`EntityStore::replace_incident`],
/// which only succeeds when the stored `version` still equals
/// `expected_version`. Callers bump `version` before handing the document in.
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    async fn insert_user(&self, user: &User) -> AppResult<()>;
    async fn find_user(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<User>>;

    /// Active NGOs in `city` with their assigned-incident counts, least loaded
    /// first, ties broken by id.
    async fn ngo_loads(&self, city: &str) -> AppResult<Vec<NgoLoad>>;

    async fn insert_incident(&self, incident: &Incident) -> AppResult<()>;
    async fn find_incident(&self, id: &str) -> AppResult<Option<Incident>>;
    async fn find_incidents(&self, query: &IncidentQuery) -> AppResult<Vec<Incident>>;
    /// Returns `false` when the stored version no longer matches.
    async fn replace_incident(&self, incident: &Incident, expected_version: i64) -> AppResult<bool>;

    async fn insert_notification(&self, notification: &Notification) -> AppResult<()>;
    async fn find_notifications(&self, query: &NotificationQuery) -> AppResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: &str, recipient: &str) -> AppResult<bool>;

    async fn insert_pet(&self, pet: &Pet) -> AppResult<()>;
    async fn find_pet(&self, id: &str) -> AppResult<Option<Pet>>;
    async fn find_pets(&self, filter: &PetFilter) -> AppResult<Vec<Pet>>;
}
