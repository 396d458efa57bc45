//! Trainer domain models.
//!
//! A trainer owns zero or more pokemons. Removing a trainer removes its
//! pokemons with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::creature::Creature;
use super::validation::{present, required_integer, required_string, when_present, ValidationErrors};

const NAME_MAX_CHARS: usize = 255;
const CITY_MAX_CHARS: usize = 255;
const MIN_AGE: i64 = 10;
const MAX_AGE: i64 = 100;

/// A pokemon trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Trainer {
    /// Unique identifier.
    pub id: i64,
    /// Trainer name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Home city.
    #[serde(rename = "ciudad")]
    pub city: String,
    /// Age in years (10 to 100).
    #[serde(rename = "edad")]
    pub age: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A trainer together with the pokemons it owns.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainerDetails {
    #[serde(flatten)]
    pub trainer: Trainer,
    #[serde(rename = "pokemons")]
    pub creatures: Vec<Creature>,
}

/// Body of `POST /entrenadores`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTrainerRequest {
    #[serde(default, rename = "nombre", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Value>,
    #[serde(default, rename = "ciudad", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub city: Option<Value>,
    #[serde(default, rename = "edad", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub age: Option<Value>,
}

/// A validated trainer ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrainer {
    pub name: String,
    pub city: String,
    pub age: i64,
}

impl CreateTrainerRequest {
    pub fn validate(self) -> Result<NewTrainer, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_string(&mut errors, "nombre", self.name, NAME_MAX_CHARS);
        let city = required_string(&mut errors, "ciudad", self.city, CITY_MAX_CHARS);
        let age = required_integer(&mut errors, "edad", self.age, MIN_AGE, MAX_AGE);

        match (name, city, age) {
            (Some(name), Some(city), Some(age)) => errors.finish(NewTrainer { name, city, age }),
            _ => Err(errors),
        }
    }
}

/// Body of `PUT /entrenadores/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTrainerRequest {
    #[serde(default, rename = "nombre", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Value>,
    #[serde(default, rename = "ciudad", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub city: Option<Value>,
    #[serde(default, rename = "edad", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub age: Option<Value>,
}

/// Validated column changes for a trainer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainerChanges {
    pub name: Option<String>,
    pub city: Option<String>,
    pub age: Option<i64>,
}

impl UpdateTrainerRequest {
    pub fn validate(self) -> Result<TrainerChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let changes = TrainerChanges {
            name: when_present(&mut errors, self.name, |e, v| {
                required_string(e, "nombre", v, NAME_MAX_CHARS)
            }),
            city: when_present(&mut errors, self.city, |e, v| {
                required_string(e, "ciudad", v, CITY_MAX_CHARS)
            }),
            age: when_present(&mut errors, self.age, |e, v| {
                required_integer(e, "edad", v, MIN_AGE, MAX_AGE)
            }),
        };

        errors.finish(changes)
    }
}
