use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_fields::{datetime, hex_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Other,
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Dog" => Ok(Species::Dog),
            "Cat" => Ok(Species::Cat),
            "Bird" => Ok(Species::Bird),
            "Other" => Ok(Species::Other),
            other => Err(format!("Unknown species '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(format!("Unknown gender '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdoptionStatus {
    #[default]
    Available,
    Pending,
    Adopted,
}

/// An adoption listing. Independent of the incident lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(rename = "_id", with = "hex_id")]
    pub id: String,
    pub name: String,
    pub species: Species,
    #[serde(default)]
    pub breed: String,
    pub age: u32,
    pub gender: Gender,
    pub city: String,
    pub description: String,
    pub photos: Vec<String>,
    #[serde(default)]
    pub vaccinated: bool,
    #[serde(default)]
    pub neutered: bool,
    #[serde(with = "hex_id")]
    pub owner: String,
    #[serde(default)]
    pub status: AdoptionStatus,
    #[serde(with = "datetime")]
    pub created_at: DateTime<Utc>,
}
