// src/store/mongo.rs

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::{debug, info};
use mongodb::bson::{doc, from_document, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use super::{EntityStore, IncidentQuery, NotificationQuery, PetFilter};
use crate::error::{AppError, AppResult};
use crate::models::bson_fields::id_bson;
use crate::models::incident::Incident;
use crate::models::notification::Notification;
use crate::models::pet::Pet;
use crate::models::user::{NgoLoad, User};

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>("users")
    }

    fn incidents(&self) -> Collection<Incident> {
        self.db.collection::<Incident>("incidents")
    }

    fn notifications(&self) -> Collection<Notification> {
        self.db.collection::<Notification>("notifications")
    }

    fn pets(&self) -> Collection<Pet> {
        self.db.collection::<Pet>("pets")
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
        for keys in [
            doc! { "city": 1, "createdAt": -1 },
            doc! { "assignedNGO": 1 },
            doc! { "volunteerActivity.assignedVolunteer": 1 },
            doc! { "user": 1 },
        ] {
            self.incidents().create_index(IndexModel::builder().keys(keys).build()).await?;
        }
        self.notifications()
            .create_index(IndexModel::builder().keys(doc! { "recipient": 1, "createdAt": -1 }).build())
            .await?;
        info!("MongoDB indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        self.users()
            .insert_one(user)
            .await
            .map_err(|e| AppError::from_write(e, "User"))?;
        Ok(())
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id_bson(id) }).await?)
    }

    async fn find_users(&self, ids: &[String]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Bson> = ids.iter().map(|id| id_bson(id)).collect();
        let users = self
            .users()
            .find(doc! { "_id": { "$in": ids } })
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn ngo_loads(&self, city: &str) -> AppResult<Vec<NgoLoad>> {
        let pipeline = vec![
            doc! { "$match": { "city": city, "role": "ngo", "isActive": true } },
            doc! {
                "$lookup": {
                    "from": "incidents",
                    "localField": "_id",
                    "foreignField": "assignedNGO",
                    "as": "assignedIncidents"
                }
            },
            doc! { "$addFields": { "incidentCount": { "$size": "$assignedIncidents" } } },
            doc! { "$sort": { "incidentCount": 1, "_id": 1 } },
            doc! { "$project": { "name": 1, "email": 1, "city": 1, "incidentCount": 1 } },
        ];
        let docs: Vec<Document> = self
            .db
            .collection::<Document>("users")
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;
        debug!("NGO load ranking for {}: {} candidates", city, docs.len());
        docs.into_iter()
            .map(|d| from_document::<NgoLoad>(d).map_err(AppError::from))
            .collect()
    }

    async fn insert_incident(&self, incident: &Incident) -> AppResult<()> {
        self.incidents()
            .insert_one(incident)
            .await
            .map_err(|e| AppError::from_write(e, "Incident"))?;
        Ok(())
    }

    async fn find_incident(&self, id: &str) -> AppResult<Option<Incident>> {
        Ok(self.incidents().find_one(doc! { "_id": id_bson(id) }).await?)
    }

    async fn find_incidents(&self, query: &IncidentQuery) -> AppResult<Vec<Incident>> {
        let incidents = self.incidents();
        let mut find = incidents.find(query.to_filter()).sort(query.sort_document());
        if let Some(limit) = query.limit {
            find = find.limit(limit);
        }
        Ok(find.await?.try_collect().await?)
    }

    async fn replace_incident(&self, incident: &Incident, expected_version: i64) -> AppResult<bool> {
        let filter = doc! { "_id": id_bson(&incident.id), "version": expected_version };
        let result = self.incidents().replace_one(filter, incident).await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        self.notifications().insert_one(notification).await?;
        Ok(())
    }

    async fn find_notifications(&self, query: &NotificationQuery) -> AppResult<Vec<Notification>> {
        let mut filter = doc! {
            "recipient": id_bson(&query.recipient),
            "recipientRole": query.recipient_role.as_str(),
        };
        if query.unread_only {
            filter.insert("isRead", false);
        }
        Ok(self
            .notifications()
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .limit(query.limit)
            .await?
            .try_collect()
            .await?)
    }

    async fn mark_notification_read(&self, id: &str, recipient: &str) -> AppResult<bool> {
        let result = self
            .notifications()
            .update_one(
                doc! { "_id": id_bson(id), "recipient": id_bson(recipient) },
                doc! { "$set": { "isRead": true } },
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_pet(&self, pet: &Pet) -> AppResult<()> {
        self.pets().insert_one(pet).await?;
        Ok(())
    }

    async fn find_pet(&self, id: &str) -> AppResult<Option<Pet>> {
        Ok(self.pets().find_one(doc! { "_id": id_bson(id) }).await?)
    }

    async fn find_pets(&self, filter: &PetFilter) -> AppResult<Vec<Pet>> {
        Ok(self
            .pets()
            .find(filter.to_filter())
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?)
    }
}
