//! Database models for the Pokedex API.
//!
//! These are the row types returned by SQLx queries.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::{Battle, Creature, CreatureDetails, Trainer};
use crate::error::{ApiError, ApiResult};

fn parse_timestamp(value: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Internal(format!("invalid stored timestamp '{}': {}", value, e)))
}

/// Database row for entrenadores table.
#[derive(Debug, Clone, FromRow)]
pub struct TrainerRow {
    pub id: i64,
    pub nombre: String,
    pub ciudad: String,
    pub edad: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TrainerRow> for Trainer {
    type Error = ApiError;

    fn try_from(row: TrainerRow) -> Result<Self, Self::Error> {
        Ok(Trainer {
            id: row.id,
            name: row.nombre,
            city: row.ciudad,
            age: row.edad,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Database row for pokemons table.
#[derive(Debug, Clone, FromRow)]
pub struct CreatureRow {
    pub id: i64,
    pub entrenador_id: i64,
    pub nombre: String,
    pub tipo: String,
    pub nivel: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<CreatureRow> for Creature {
    type Error = ApiError;

    fn try_from(row: CreatureRow) -> Result<Self, Self::Error> {
        Ok(Creature {
            id: row.id,
            trainer_id: row.entrenador_id,
            name: row.nombre,
            kind: row.tipo,
            level: row.nivel,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Row for the pokemon list query (joined with the owning trainer).
#[derive(Debug, Clone, FromRow)]
pub struct CreatureWithTrainerRow {
    pub id: i64,
    pub entrenador_id: i64,
    pub nombre: String,
    pub tipo: String,
    pub nivel: i64,
    pub created_at: String,
    pub updated_at: String,
    pub entrenador_nombre: String,
    pub entrenador_ciudad: String,
    pub entrenador_edad: i64,
    pub entrenador_created_at: String,
    pub entrenador_updated_at: String,
}

impl TryFrom<CreatureWithTrainerRow> for CreatureDetails {
    type Error = ApiError;

    fn try_from(row: CreatureWithTrainerRow) -> Result<Self, Self::Error> {
        Ok(CreatureDetails {
            trainer: Trainer {
                id: row.entrenador_id,
                name: row.entrenador_nombre,
                city: row.entrenador_ciudad,
                age: row.entrenador_edad,
                created_at: parse_timestamp(&row.entrenador_created_at)?,
                updated_at: parse_timestamp(&row.entrenador_updated_at)?,
            },
            creature: Creature {
                id: row.id,
                trainer_id: row.entrenador_id,
                name: row.nombre,
                kind: row.tipo,
                level: row.nivel,
                created_at: parse_timestamp(&row.created_at)?,
                updated_at: parse_timestamp(&row.updated_at)?,
            },
        })
    }
}

/// Database row for combates table.
#[derive(Debug, Clone, FromRow)]
pub struct BattleRow {
    pub id: i64,
    pub pokemon_local_id: i64,
    pub pokemon_visitante_id: i64,
    pub fecha: String,
    pub resultado: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<BattleRow> for Battle {
    type Error = ApiError;

    fn try_from(row: BattleRow) -> Result<Self, Self::Error> {
        Ok(Battle {
            id: row.id,
            home_creature_id: row.pokemon_local_id,
            away_creature_id: row.pokemon_visitante_id,
            date: parse_timestamp(&row.fecha)?,
            result: row.resultado,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}
