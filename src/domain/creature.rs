//! Pokemon domain models.
//!
//! Every pokemon belongs to exactly one trainer and may appear in battles on
//! either side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::trainer::Trainer;
use super::validation::{
    as_integer, present, required_integer, required_reference, required_string, when_present,
    ValidationErrors,
};

const NAME_MAX_CHARS: usize = 255;
const KIND_MAX_CHARS: usize = 100;
const MIN_LEVEL: i64 = 1;
const MAX_LEVEL: i64 = 100;

/// A pokemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Creature {
    /// Unique identifier.
    pub id: i64,
    /// Owning trainer.
    #[serde(rename = "entrenador_id")]
    pub trainer_id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    /// Elemental type (fire, water, grass...).
    #[serde(rename = "tipo")]
    pub kind: String,
    /// Level (1 to 100).
    #[serde(rename = "nivel")]
    pub level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pokemon together with its owning trainer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatureDetails {
    #[serde(flatten)]
    pub creature: Creature,
    #[serde(rename = "entrenador")]
    pub trainer: Trainer,
}

/// Body of `POST /pokemons`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCreatureRequest {
    #[serde(default, rename = "nombre", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Value>,
    #[serde(default, rename = "tipo", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub kind: Option<Value>,
    #[serde(default, rename = "nivel", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub level: Option<Value>,
    #[serde(default, rename = "entrenador_id", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub trainer_id: Option<Value>,
}

/// A validated pokemon ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCreature {
    pub trainer_id: i64,
    pub name: String,
    pub kind: String,
    pub level: i64,
}

impl CreateCreatureRequest {
    /// Trainer id the body refers to, if it reads as one.
    pub fn requested_trainer(&self) -> Option<i64> {
        self.trainer_id.as_ref().and_then(as_integer)
    }

    /// Validate the body. `trainer_exists` is the storage lookup for
    /// [`Self::requested_trainer`].
    pub fn validate(self, trainer_exists: bool) -> Result<NewCreature, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_string(&mut errors, "nombre", self.name, NAME_MAX_CHARS);
        let kind = required_string(&mut errors, "tipo", self.kind, KIND_MAX_CHARS);
        let level = required_integer(&mut errors, "nivel", self.level, MIN_LEVEL, MAX_LEVEL);
        let trainer_id =
            required_reference(&mut errors, "entrenador_id", self.trainer_id, trainer_exists);

        match (name, kind, level, trainer_id) {
            (Some(name), Some(kind), Some(level), Some(trainer_id)) => errors.finish(NewCreature {
                trainer_id,
                name,
                kind,
                level,
            }),
            _ => Err(errors),
        }
    }
}

/// Body of `PUT /pokemons/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCreatureRequest {
    #[serde(default, rename = "nombre", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Value>,
    #[serde(default, rename = "tipo", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub kind: Option<Value>,
    #[serde(default, rename = "nivel", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub level: Option<Value>,
    #[serde(default, rename = "entrenador_id", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub trainer_id: Option<Value>,
}

/// Validated column changes for a pokemon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatureChanges {
    pub trainer_id: Option<i64>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub level: Option<i64>,
}

impl UpdateCreatureRequest {
    /// Trainer id the body wants to move the pokemon to, if any.
    pub fn requested_trainer(&self) -> Option<i64> {
        self.trainer_id.as_ref().and_then(as_integer)
    }

    /// Validate the body. `trainer_exists` is the storage lookup for
    /// [`Self::requested_trainer`].
    pub fn validate(self, trainer_exists: bool) -> Result<CreatureChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let changes = CreatureChanges {
            name: when_present(&mut errors, self.name, |e, v| {
                required_string(e, "nombre", v, NAME_MAX_CHARS)
            }),
            kind: when_present(&mut errors, self.kind, |e, v| {
                required_string(e, "tipo", v, KIND_MAX_CHARS)
            }),
            level: when_present(&mut errors, self.level, |e, v| {
                required_integer(e, "nivel", v, MIN_LEVEL, MAX_LEVEL)
            }),
            trainer_id: when_present(&mut errors, self.trainer_id, |e, v| {
                required_reference(e, "entrenador_id", v, trainer_exists)
            }),
        };

        errors.finish(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pikachu(trainer_id: i64) -> CreateCreatureRequest {
        CreateCreatureRequest {
            name: Some(json!("Pikachu")),
            kind: Some(json!("Electric")),
            level: Some(json!(5)),
            trainer_id: Some(json!(trainer_id)),
        }
    }

    #[test]
    fn test_create_valid() {
        let creature = pikachu(1).validate(true).unwrap();
        assert_eq!(creature.trainer_id, 1);
        assert_eq!(creature.kind, "Electric");
    }

    #[test]
    fn test_create_unknown_trainer() {
        let errors = pikachu(99).validate(false).unwrap_err();
        assert_eq!(
            errors.messages("entrenador_id"),
            ["The selected entrenador_id is invalid."]
        );
    }

    #[test]
    fn test_create_missing_trainer_is_required_not_invalid() {
        let request = CreateCreatureRequest {
            trainer_id: None,
            ..pikachu(1)
        };
        let errors = request.validate(false).unwrap_err();
        assert_eq!(
            errors.messages("entrenador_id"),
            ["The entrenador_id field is required."]
        );
    }

    #[test]
    fn test_create_kind_length_and_level_range() {
        let request = CreateCreatureRequest {
            kind: Some(json!("x".repeat(KIND_MAX_CHARS + 1))),
            level: Some(json!(0)),
            ..pikachu(1)
        };
        let errors = request.validate(true).unwrap_err();
        assert!(errors.has("tipo"));
        assert!(errors.has("nivel"));
        assert!(!errors.has("nombre"));
    }

    #[test]
    fn test_update_checks_trainer_only_when_given() {
        let request: UpdateCreatureRequest = serde_json::from_str(r#"{"nivel": 42}"#).unwrap();
        assert_eq!(request.requested_trainer(), None);
        let changes = request.validate(false).unwrap();
        assert_eq!(changes.level, Some(42));
        assert_eq!(changes.trainer_id, None);

        let request: UpdateCreatureRequest =
            serde_json::from_str(r#"{"entrenador_id": 12}"#).unwrap();
        assert_eq!(request.requested_trainer(), Some(12));
        assert!(request.validate(false).is_err());
    }

    #[test]
    fn test_create_wrong_types_keyed_by_field() {
        let request: CreateCreatureRequest = serde_json::from_value(json!({
            "nombre": ["Pikachu"],
            "tipo": "Electric",
            "nivel": "high",
            "entrenador_id": "1",
        }))
        .unwrap();
        assert_eq!(request.requested_trainer(), Some(1));
        let errors = request.validate(true).unwrap_err();
        assert_eq!(errors.messages("nombre"), ["The nombre field must be a string."]);
        assert_eq!(errors.messages("nivel"), ["The nivel field must be an integer."]);
        assert!(!errors.has("tipo"));
        assert!(!errors.has("entrenador_id"));
    }
}
