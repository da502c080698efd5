// src/pets.rs

use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::incidents::store_photo;
use crate::models::new_id;
use crate::models::pet::{AdoptionStatus, Gender, Pet, Species};
use crate::models::user::UserSummary;
use crate::store::PetFilter;
use crate::user_management::{directory, summary};

pub const MAX_PET_PHOTOS: usize = 5;

/// Query string accepted by `GET /pets`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetQuery {
    pub species: Option<String>,
    pub city: Option<String>,
    pub gender: Option<String>,
    pub min_age: Option<String>,
    pub max_age: Option<String>,
    pub vaccinated: Option<String>,
    pub neutered: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_age(name: &str, value: &Option<String>) -> AppResult<Option<u32>> {
    present(value)
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| AppError::Validation(format!("{} must be a non-negative number", name)))
        })
        .transpose()
}

impl PetQuery {
    pub fn into_filter(self) -> AppResult<PetFilter> {
        Ok(PetFilter {
            species: present(&self.species)
                .map(str::parse::<Species>)
                .transpose()
                .map_err(AppError::Validation)?,
            city: present(&self.city).map(str::to_string),
            gender: present(&self.gender)
                .map(str::parse::<Gender>)
                .transpose()
                .map_err(AppError::Validation)?,
            min_age: parse_age("minAge", &self.min_age)?,
            max_age: parse_age("maxAge", &self.max_age)?,
            vaccinated: present(&self.vaccinated).map(|v| v == "true"),
            neutered: present(&self.neutered).map(|v| v == "true"),
        })
    }
}

/// Listing with the owner's contact card filled in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub age: u32,
    pub gender: Gender,
    pub city: String,
    pub description: String,
    pub photos: Vec<String>,
    pub vaccinated: bool,
    pub neutered: bool,
    pub owner: Option<UserSummary>,
    pub status: AdoptionStatus,
    pub created_at: DateTime<Utc>,
}

impl PetView {
    fn new(pet: Pet, owner: Option<UserSummary>) -> Self {
        PetView {
            id: pet.id,
            name: pet.name,
            species: pet.species,
            breed: pet.breed,
            age: pet.age,
            gender: pet.gender,
            city: pet.city,
            description: pet.description,
            photos: pet.photos,
            vaccinated: pet.vaccinated,
            neutered: pet.neutered,
            owner,
            status: pet.status,
            created_at: pet.created_at,
        }
    }
}

/// `POST /pets` form. Every text part is optional at the parser level so
/// missing fields produce one validation message.
#[derive(MultipartForm)]
pub struct CreatePetForm {
    #[multipart(limit = "10MB")]
    pub photos: Vec<TempFile>,
    pub name: Option<Text<String>>,
    pub species: Option<Text<String>>,
    pub breed: Option<Text<String>>,
    pub age: Option<Text<String>>,
    pub gender: Option<Text<String>>,
    pub city: Option<Text<String>>,
    pub description: Option<Text<String>>,
    pub vaccinated: Option<Text<String>>,
    pub neutered: Option<Text<String>>,
}

fn text(field: &Option<Text<String>>) -> Option<String> {
    field
        .as_ref()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn missing_fields() -> AppError {
    AppError::Validation(
        "Missing required fields: name, species, age, gender, city, description".to_string(),
    )
}

/// Fields of a new listing, validated before any photo is stored.
struct NewPet {
    name: String,
    species: Species,
    breed: String,
    age: u32,
    gender: Gender,
    city: String,
    description: String,
    vaccinated: bool,
    neutered: bool,
}

impl NewPet {
    fn from_form(form: &CreatePetForm) -> AppResult<Self> {
        let (Some(name), Some(species), Some(age), Some(gender), Some(city), Some(description)) = (
            text(&form.name),
            text(&form.species),
            text(&form.age),
            text(&form.gender),
            text(&form.city),
            text(&form.description),
        ) else {
            return Err(missing_fields());
        };
        Ok(NewPet {
            name,
            species: species.parse().map_err(AppError::Validation)?,
            breed: text(&form.breed).unwrap_or_default(),
            age: age
                .parse()
                .map_err(|_| AppError::Validation("age must be a non-negative number".to_string()))?,
            gender: gender.parse().map_err(AppError::Validation)?,
            city,
            description,
            vaccinated: text(&form.vaccinated).as_deref() == Some("true"),
            neutered: text(&form.neutered).as_deref() == Some("true"),
        })
    }
}

/// GET /pets
pub async fn get_pets(state: web::Data<AppState>, query: web::Query<PetQuery>) -> AppResult<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    let pets = state.store.find_pets(&filter).await?;
    let owners = directory(state.store.as_ref(), pets.iter().map(|p| p.owner.clone())).await?;
    let views: Vec<PetView> = pets
        .into_iter()
        .map(|pet| {
            let owner = summary(&owners, &pet.owner);
            PetView::new(pet, owner)
        })
        .collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /pets/{id}
pub async fn get_pet_details(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let pet = state
        .store
        .find_pet(&path)
        .await?
        .ok_or_else(|| AppError::NotFound("Pet not found".to_string()))?;
    let owners = directory(state.store.as_ref(), [pet.owner.clone()]).await?;
    let owner = summary(&owners, &pet.owner);
    Ok(HttpResponse::Ok().json(PetView::new(pet, owner)))
}

/// POST /pets
pub async fn create_pet(
    caller: Caller,
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<CreatePetForm>,
) -> AppResult<HttpResponse> {
    let uploads: Vec<&TempFile> = form.photos.iter().filter(|f| f.size > 0).collect();
    if uploads.is_empty() {
        return Err(AppError::Validation("At least one photo is required".to_string()));
    }
    if uploads.len() > MAX_PET_PHOTOS {
        return Err(AppError::Validation(format!(
            "At most {} photos are allowed",
            MAX_PET_PHOTOS
        )));
    }
    let new_pet = NewPet::from_form(&form)?;

    let mut photos = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match store_photo(&state, "photos", Some(upload)).await {
            Ok(Some(name)) => photos.push(name),
            Ok(None) => {}
            Err(e) => {
                for name in &photos {
                    state.photos.discard(name).await;
                }
                return Err(e);
            }
        }
    }

    let pet = Pet {
        id: new_id(),
        name: new_pet.name,
        species: new_pet.species,
        breed: new_pet.breed,
        age: new_pet.age,
        gender: new_pet.gender,
        city: new_pet.city,
        description: new_pet.description,
        photos,
        vaccinated: new_pet.vaccinated,
        neutered: new_pet.neutered,
        owner: caller.id.clone(),
        status: AdoptionStatus::Available,
        created_at: Utc::now(),
    };
    if let Err(e) = state.store.insert_pet(&pet).await {
        for name in &pet.photos {
            state.photos.discard(name).await;
        }
        return Err(e);
    }
    info!("Pet listing {} created by {}", pet.id, caller.id);

    Ok(HttpResponse::Created().json(json!({
        "message": "Pet created successfully",
        "pet": pet,
    })))
}
