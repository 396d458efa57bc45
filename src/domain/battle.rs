//! Battle domain models.
//!
//! A battle pits a home pokemon against a different away pokemon on a given
//! date, optionally recording a score such as `3-1`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::creature::Creature;
use super::validation::{
    as_integer, optional_result, present, required_date, required_reference, when_present, ValidationErrors,
};

const HOME_FIELD: &str = "pokemon_local_id";
const AWAY_FIELD: &str = "pokemon_visitante_id";

/// A battle between two pokemons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Battle {
    /// Unique identifier.
    pub id: i64,
    /// Pokemon fighting at home.
    #[serde(rename = "pokemon_local_id")]
    pub home_creature_id: i64,
    /// Visiting pokemon.
    #[serde(rename = "pokemon_visitante_id")]
    pub away_creature_id: i64,
    /// When the battle takes place.
    #[serde(rename = "fecha")]
    pub date: DateTime<Utc>,
    /// Score in `home-away` form, when known.
    #[serde(rename = "resultado")]
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A battle together with both participants.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BattleDetails {
    #[serde(flatten)]
    pub battle: Battle,
    #[serde(rename = "pokemon_local")]
    pub home_creature: Creature,
    #[serde(rename = "pokemon_visitante")]
    pub away_creature: Creature,
}

/// Existence of the pokemons a battle body refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipantLookup {
    pub home_exists: bool,
    pub away_exists: bool,
}

/// Body of `POST /combates`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateBattleRequest {
    #[serde(default, rename = "pokemon_local_id", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub home_creature_id: Option<Value>,
    #[serde(default, rename = "pokemon_visitante_id", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub away_creature_id: Option<Value>,
    /// RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
    #[serde(default, rename = "fecha", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub date: Option<Value>,
    #[serde(default, rename = "resultado", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub result: Option<Value>,
}

/// A validated battle ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBattle {
    pub home_creature_id: i64,
    pub away_creature_id: i64,
    pub date: DateTime<Utc>,
    pub result: Option<String>,
}

impl CreateBattleRequest {
    /// Home pokemon id the body refers to, if it reads as one.
    pub fn requested_home(&self) -> Option<i64> {
        self.home_creature_id.as_ref().and_then(as_integer)
    }

    /// Away pokemon id the body refers to, if it reads as one.
    pub fn requested_away(&self) -> Option<i64> {
        self.away_creature_id.as_ref().and_then(as_integer)
    }

    pub fn validate(self, lookup: ParticipantLookup) -> Result<NewBattle, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let same_participant =
            self.requested_away().is_some() && self.requested_away() == self.requested_home();

        let home = required_reference(
            &mut errors,
            HOME_FIELD,
            self.home_creature_id,
            lookup.home_exists,
        );
        let away = required_reference(
            &mut errors,
            AWAY_FIELD,
            self.away_creature_id,
            lookup.away_exists,
        );
        if same_participant {
            errors.add(AWAY_FIELD, different_message(AWAY_FIELD, HOME_FIELD));
        }
        let date = required_date(&mut errors, "fecha", self.date);
        let result = optional_result(&mut errors, "resultado", self.result);

        match (home, away, date) {
            (Some(home_creature_id), Some(away_creature_id), Some(date)) => {
                errors.finish(NewBattle {
                    home_creature_id,
                    away_creature_id,
                    date,
                    result,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Body of `PUT /combates/{id}`. Absent fields are left unchanged and
/// `"resultado": null` clears the result.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBattleRequest {
    #[serde(default, rename = "pokemon_local_id", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub home_creature_id: Option<Value>,
    #[serde(default, rename = "pokemon_visitante_id", deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub away_creature_id: Option<Value>,
    #[serde(default, rename = "fecha", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub date: Option<Value>,
    #[serde(default, rename = "resultado", deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub result: Option<Value>,
}

/// Validated column changes for a battle.
///
/// `result` is `Some(None)` when the stored result should be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleChanges {
    pub home_creature_id: Option<i64>,
    pub away_creature_id: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    pub result: Option<Option<String>>,
}

impl UpdateBattleRequest {
    /// Home pokemon id the body asks for, if any.
    pub fn requested_home(&self) -> Option<i64> {
        self.home_creature_id.as_ref().and_then(as_integer)
    }

    /// Away pokemon id the body asks for, if any.
    pub fn requested_away(&self) -> Option<i64> {
        self.away_creature_id.as_ref().and_then(as_integer)
    }

    /// Validate the body against the stored battle.
    ///
    /// Participants must stay distinct once the changes are merged with
    /// `current`.
    pub fn validate(
        self,
        current: &Battle,
        lookup: ParticipantLookup,
    ) -> Result<BattleChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let touches_home = self.home_creature_id.is_some();
        let touches_away = self.away_creature_id.is_some();
        let merged_home = self.requested_home().unwrap_or(current.home_creature_id);
        let merged_away = self.requested_away().unwrap_or(current.away_creature_id);

        let changes = BattleChanges {
            home_creature_id: when_present(&mut errors, self.home_creature_id, |e, v| {
                required_reference(e, HOME_FIELD, v, lookup.home_exists)
            }),
            away_creature_id: when_present(&mut errors, self.away_creature_id, |e, v| {
                required_reference(e, AWAY_FIELD, v, lookup.away_exists)
            }),
            date: when_present(&mut errors, self.date, |e, v| required_date(e, "fecha", v)),
            result: self
                .result
                .map(|value| optional_result(&mut errors, "resultado", Some(value))),
        };

        if (touches_home || touches_away) && merged_home == merged_away {
            if touches_away {
                errors.add(AWAY_FIELD, different_message(AWAY_FIELD, HOME_FIELD));
            } else {
                errors.add(HOME_FIELD, different_message(HOME_FIELD, AWAY_FIELD));
            }
        }

        errors.finish(changes)
    }
}

fn different_message(field: &str, other: &str) -> String {
    format!("The {} field and {} must be different.", field, other)
}
