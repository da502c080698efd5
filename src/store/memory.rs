// src/store/memory.rs

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EntityStore, IncidentQuery, IncidentSort, NotificationQuery, PetFilter};
use crate::error::{AppError, AppResult};
use crate::models::incident::Incident;
use crate::models::notification::Notification;
use crate::models::pet::Pet;
use crate::models::user::{NgoLoad, Role, User};

/// Process-local store used by the test suite and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    incidents: RwLock<HashMap<String, Incident>>,
    notifications: RwLock<Vec<Notification>>,
    pets: RwLock<Vec<Pet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(AppError::Conflict("User already exists".to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn ngo_loads(&self, city: &str) -> AppResult<Vec<NgoLoad>> {
        let users = self.users.read().await;
        let incidents = self.incidents.read().await;
        let mut loads: Vec<NgoLoad> = users
            .values()
            .filter(|u| u.role == Role::Ngo && u.is_active && u.city == city)
            .map(|u| NgoLoad {
                id: u.id.clone(),
                name: u.name.clone(),
                email: u.email.clone(),
                city: u.city.clone(),
                incident_count: incidents.values().filter(|i| i.assigned_ngo == u.id).count() as i64,
            })
            .collect();
        loads.sort_by(|a, b| a.incident_count.cmp(&b.incident_count).then_with(|| a.id.cmp(&b.id)));
        Ok(loads)
    }

    async fn insert_incident(&self, incident: &Incident) -> AppResult<()> {
        let mut incidents = self.incidents.write().await;
        if incidents.contains_key(&incident.id) {
            return Err(AppError::Conflict("Incident already exists".to_string()));
        }
        incidents.insert(incident.id.clone(), incident.clone());
        Ok(())
    }

    async fn find_incident(&self, id: &str) -> AppResult<Option<Incident>> {
        Ok(self.incidents.read().await.get(id).cloned())
    }

    async fn find_incidents(&self, query: &IncidentQuery) -> AppResult<Vec<Incident>> {
        let incidents = self.incidents.read().await;
        let mut found: Vec<Incident> = incidents.values().filter(|i| query.matches(i)).cloned().collect();
        match query.sort {
            IncidentSort::NewestFirst => {
                found.sort_by_key(|i| Reverse((i.created_at, i.id.clone())));
            }
            IncidentSort::RecentlyAssignedFirst => {
                found.sort_by_key(|i| Reverse((i.volunteer_activity.assigned_at, i.id.clone())));
            }
        }
        if let Some(limit) = query.limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn replace_incident(&self, incident: &Incident, expected_version: i64) -> AppResult<bool> {
        let mut incidents = self.incidents.write().await;
        match incidents.get_mut(&incident.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = incident.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn find_notifications(&self, query: &NotificationQuery) -> AppResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut found: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.recipient == query.recipient && n.recipient_role == query.recipient_role)
            .filter(|n| !query.unread_only || !n.is_read)
            .cloned()
            .collect();
        found.sort_by_key(|n| Reverse((n.created_at, n.id.clone())));
        found.truncate(query.limit.max(0) as usize);
        Ok(found)
    }

    async fn mark_notification_read(&self, id: &str, recipient: &str) -> AppResult<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == id && n.recipient == recipient) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_pet(&self, pet: &Pet) -> AppResult<()> {
        self.pets.write().await.push(pet.clone());
        Ok(())
    }

    async fn find_pet(&self, id: &str) -> AppResult<Option<Pet>> {
        Ok(self.pets.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn find_pets(&self, filter: &PetFilter) -> AppResult<Vec<Pet>> {
        let pets = self.pets.read().await;
        let mut found: Vec<Pet> = pets.iter().filter(|p| filter.matches(p)).cloned().collect();
        found.sort_by_key(|p| Reverse((p.created_at, p.id.clone())));
        Ok(found)
    }
}
