//! Repository layer for database operations.

use std::collections::HashMap;

use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Sqlite};

use crate::domain::{
    Battle, BattleChanges, BattleDetails, Creature, CreatureChanges, CreatureDetails, NewBattle,
    NewCreature, NewTrainer, Trainer, TrainerChanges, TrainerDetails, ValidationErrors,
};
use crate::error::{ApiError, ApiResult};
use crate::storage::models::{BattleRow, CreatureRow, CreatureWithTrainerRow, TrainerRow};

const TRAINER_NOT_FOUND: &str = "Entrenador no encontrado";
const CREATURE_NOT_FOUND: &str = "Pokemon no encontrado";
const BATTLE_NOT_FOUND: &str = "Combate no encontrado";

/// Pokemon columns joined with the owning trainer's columns.
const CREATURE_WITH_TRAINER: &str = r#"
    SELECT p.id, p.entrenador_id, p.nombre, p.tipo, p.nivel, p.created_at, p.updated_at,
           e.nombre AS entrenador_nombre,
           e.ciudad AS entrenador_ciudad,
           e.edad AS entrenador_edad,
           e.created_at AS entrenador_created_at,
           e.updated_at AS entrenador_updated_at
    FROM pokemons p
    INNER JOIN entrenadores e ON e.id = p.entrenador_id
"#;

const TRAINER_FIELD: &str = "entrenador_id";
const HOME_FIELD: &str = "pokemon_local_id";
const AWAY_FIELD: &str = "pokemon_visitante_id";

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Report a write rejected by the trainer foreign key as a validation
/// failure on `entrenador_id`.
fn trainer_reference(error: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&error) {
        let mut errors = ValidationErrors::new();
        errors.invalid_reference(TRAINER_FIELD);
        ApiError::Validation(errors)
    } else {
        ApiError::Database(error)
    }
}

/// Repository for all Pokedex database operations.
#[derive(Clone)]
pub struct PokedexRepository {
    pool: SqlitePool,
}

impl PokedexRepository {
    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PokedexRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> ApiResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entrenadores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre TEXT NOT NULL,
                ciudad TEXT NOT NULL,
                edad INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pokemons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entrenador_id INTEGER NOT NULL,
                nombre TEXT NOT NULL,
                tipo TEXT NOT NULL,
                nivel INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (entrenador_id) REFERENCES entrenadores(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_pokemons_entrenador_id ON pokemons(entrenador_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS combates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pokemon_local_id INTEGER NOT NULL,
                pokemon_visitante_id INTEGER NOT NULL,
                fecha TEXT NOT NULL,
                resultado TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (pokemon_local_id) REFERENCES pokemons(id) ON DELETE CASCADE,
                FOREIGN KEY (pokemon_visitante_id) REFERENCES pokemons(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_combates_local ON combates(pokemon_local_id);
            CREATE INDEX IF NOT EXISTS idx_combates_visitante ON combates(pokemon_visitante_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Trainers ====================

    /// List all trainers with the pokemons they own.
    pub async fn list_trainers(&self) -> ApiResult<Vec<TrainerDetails>> {
        let rows: Vec<TrainerRow> = sqlx::query_as("SELECT * FROM entrenadores ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let creature_rows: Vec<CreatureRow> =
            sqlx::query_as("SELECT * FROM pokemons ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let mut owned: HashMap<i64, Vec<Creature>> = HashMap::new();
        for row in creature_rows {
            let creature = Creature::try_from(row)?;
            owned.entry(creature.trainer_id).or_default().push(creature);
        }

        rows.into_iter()
            .map(|row| {
                let trainer = Trainer::try_from(row)?;
                let creatures = owned.remove(&trainer.id).unwrap_or_default();
                Ok(TrainerDetails { trainer, creatures })
            })
            .collect()
    }

    /// Get a trainer by ID.
    pub async fn get_trainer(&self, id: i64) -> ApiResult<Trainer> {
        let row: TrainerRow = sqlx::query_as("SELECT * FROM entrenadores WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(TRAINER_NOT_FOUND.to_string()))?;

        row.try_into()
    }

    /// Get a trainer with its pokemons.
    pub async fn get_trainer_details(&self, id: i64) -> ApiResult<TrainerDetails> {
        let trainer = self.get_trainer(id).await?;

        let rows: Vec<CreatureRow> =
            sqlx::query_as("SELECT * FROM pokemons WHERE entrenador_id = ? ORDER BY id")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        let creatures = rows
            .into_iter()
            .map(Creature::try_from)
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(TrainerDetails { trainer, creatures })
    }

    /// Whether a trainer with this ID exists.
    pub async fn trainer_exists(&self, id: i64) -> ApiResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM entrenadores WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Insert a trainer and return the stored record.
    pub async fn create_trainer(&self, trainer: &NewTrainer) -> ApiResult<Trainer> {
        let timestamp = now();
        let result = sqlx::query(
            r#"
            INSERT INTO entrenadores (nombre, ciudad, edad, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trainer.name)
        .bind(&trainer.city)
        .bind(trainer.age)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        self.get_trainer(result.last_insert_rowid()).await
    }

    /// Apply the given changes to a trainer.
    pub async fn update_trainer(&self, id: i64, changes: &TrainerChanges) -> ApiResult<Trainer> {
        let result = sqlx::query(
            r#"
            UPDATE entrenadores SET
                nombre = COALESCE(?, nombre),
                ciudad = COALESCE(?, ciudad),
                edad = COALESCE(?, edad),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(changes.name.as_deref())
        .bind(changes.city.as_deref())
        .bind(changes.age)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(TRAINER_NOT_FOUND.to_string()));
        }

        self.get_trainer(id).await
    }

    /// Delete a trainer. Its pokemons (and their battles) go with it.
    pub async fn delete_trainer(&self, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM entrenadores WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(TRAINER_NOT_FOUND.to_string()));
        }

        Ok(())
    }

    // ==================== Pokemons ====================

    /// List all pokemons with their trainer.
    pub async fn list_creatures(&self) -> ApiResult<Vec<CreatureDetails>> {
        let rows: Vec<CreatureWithTrainerRow> =
            sqlx::query_as(&format!("{} ORDER BY p.id", CREATURE_WITH_TRAINER))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(CreatureDetails::try_from).collect()
    }

    /// List the pokemons owned by one trainer.
    ///
    /// An unknown trainer simply owns nothing.
    pub async fn list_creatures_by_trainer(
        &self,
        trainer_id: i64,
    ) -> ApiResult<Vec<CreatureDetails>> {
        let rows: Vec<CreatureWithTrainerRow> = sqlx::query_as(&format!(
            "{} WHERE p.entrenador_id = ? ORDER BY p.id",
            CREATURE_WITH_TRAINER
        ))
        .bind(trainer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CreatureDetails::try_from).collect()
    }

    /// Get a pokemon by ID.
    pub async fn get_creature(&self, id: i64) -> ApiResult<Creature> {
        let row: CreatureRow = sqlx::query_as("SELECT * FROM pokemons WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(CREATURE_NOT_FOUND.to_string()))?;

        row.try_into()
    }

    /// Get a pokemon with its trainer.
    pub async fn get_creature_details(&self, id: i64) -> ApiResult<CreatureDetails> {
        let row: CreatureWithTrainerRow =
            sqlx::query_as(&format!("{} WHERE p.id = ?", CREATURE_WITH_TRAINER))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ApiError::NotFound(CREATURE_NOT_FOUND.to_string()))?;

        row.try_into()
    }

    /// Whether a pokemon with this ID exists.
    pub async fn creature_exists(&self, id: i64) -> ApiResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM pokemons WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Insert a pokemon and return it with its trainer.
    pub async fn create_creature(&self, creature: &NewCreature) -> ApiResult<CreatureDetails> {
        let timestamp = now();
        let result = sqlx::query(
            r#"
            INSERT INTO pokemons (entrenador_id, nombre, tipo, nivel, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(creature.trainer_id)
        .bind(&creature.name)
        .bind(&creature.kind)
        .bind(creature.level)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .map_err(trainer_reference)?;

        self.get_creature_details(result.last_insert_rowid()).await
    }

    /// Apply the given changes to a pokemon.
    pub async fn update_creature(
        &self,
        id: i64,
        changes: &CreatureChanges,
    ) -> ApiResult<CreatureDetails> {
        let result = sqlx::query(
            r#"
            UPDATE pokemons SET
                entrenador_id = COALESCE(?, entrenador_id),
                nombre = COALESCE(?, nombre),
                tipo = COALESCE(?, tipo),
                nivel = COALESCE(?, nivel),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(changes.trainer_id)
        .bind(changes.name.as_deref())
        .bind(changes.kind.as_deref())
        .bind(changes.level)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(trainer_reference)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(CREATURE_NOT_FOUND.to_string()));
        }

        self.get_creature_details(id).await
    }

    /// Delete a pokemon. Battles it took part in go with it.
    pub async fn delete_creature(&self, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM pokemons WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(CREATURE_NOT_FOUND.to_string()));
        }

        Ok(())
    }

    /// Fetch the given pokemons in one query, keyed by ID.
    async fn creatures_by_id(&self, ids: &[i64]) -> ApiResult<HashMap<i64, Creature>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM pokemons WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<CreatureRow> = query.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| Creature::try_from(row).map(|c| (c.id, c)))
            .collect()
    }

    // ==================== Battles ====================

    /// Load both participants of each battle with a single secondary fetch.
    async fn attach_participants(&self, battles: Vec<Battle>) -> ApiResult<Vec<BattleDetails>> {
        let mut ids: Vec<i64> = battles
            .iter()
            .flat_map(|b| [b.home_creature_id, b.away_creature_id])
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let creatures = self.creatures_by_id(&ids).await?;
        let participant = |id: i64| {
            creatures.get(&id).cloned().ok_or_else(|| {
                ApiError::Internal(format!("battle references missing pokemon {}", id))
            })
        };

        battles
            .into_iter()
            .map(|battle| {
                Ok(BattleDetails {
                    home_creature: participant(battle.home_creature_id)?,
                    away_creature: participant(battle.away_creature_id)?,
                    battle,
                })
            })
            .collect()
    }

    /// List all battles with both participants.
    pub async fn list_battles(&self) -> ApiResult<Vec<BattleDetails>> {
        let rows: Vec<BattleRow> = sqlx::query_as("SELECT * FROM combates ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let battles = rows
            .into_iter()
            .map(Battle::try_from)
            .collect::<ApiResult<Vec<_>>>()?;

        self.attach_participants(battles).await
    }

    /// Get a battle by ID.
    pub async fn get_battle(&self, id: i64) -> ApiResult<Battle> {
        let row: BattleRow = sqlx::query_as("SELECT * FROM combates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(BATTLE_NOT_FOUND.to_string()))?;

        row.try_into()
    }

    /// Get a battle with both participants.
    pub async fn get_battle_details(&self, id: i64) -> ApiResult<BattleDetails> {
        let battle = self.get_battle(id).await?;

        self.attach_participants(vec![battle])
            .await?
            .pop()
            .ok_or_else(|| ApiError::NotFound(BATTLE_NOT_FOUND.to_string()))
    }

    /// Insert a battle and return it with both participants.
    pub async fn create_battle(&self, battle: &NewBattle) -> ApiResult<BattleDetails> {
        let timestamp = now();
        let result = sqlx::query(
            r#"
            INSERT INTO combates (
                pokemon_local_id, pokemon_visitante_id, fecha, resultado, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(battle.home_creature_id)
        .bind(battle.away_creature_id)
        .bind(battle.date.to_rfc3339())
        .bind(battle.result.as_deref())
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if is_foreign_key_violation(&e) => {
                let participants = [
                    (HOME_FIELD, Some(battle.home_creature_id)),
                    (AWAY_FIELD, Some(battle.away_creature_id)),
                ];
                return Err(self.participant_violation(e, participants).await);
            }
            Err(e) => return Err(e.into()),
        };

        self.get_battle_details(result.last_insert_rowid()).await
    }

    /// Apply the given changes to a battle.
    pub async fn update_battle(&self, id: i64, changes: &BattleChanges) -> ApiResult<BattleDetails> {
        let result = sqlx::query(
            r#"
            UPDATE combates SET
                pokemon_local_id = COALESCE(?, pokemon_local_id),
                pokemon_visitante_id = COALESCE(?, pokemon_visitante_id),
                fecha = COALESCE(?, fecha),
                resultado = CASE WHEN ? THEN ? ELSE resultado END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(changes.home_creature_id)
        .bind(changes.away_creature_id)
        .bind(changes.date.map(|d| d.to_rfc3339()))
        .bind(changes.result.is_some())
        .bind(changes.result.as_ref().and_then(|r| r.as_deref()))
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if is_foreign_key_violation(&e) => {
                let participants = [
                    (HOME_FIELD, changes.home_creature_id),
                    (AWAY_FIELD, changes.away_creature_id),
                ];
                return Err(self.participant_violation(e, participants).await);
            }
            Err(e) => return Err(e.into()),
        };

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(BATTLE_NOT_FOUND.to_string()));
        }

        self.get_battle_details(id).await
    }

    /// Turn a battle write rejected by a foreign key into a validation
    /// failure on whichever participant no longer exists.
    async fn participant_violation(
        &self,
        error: sqlx::Error,
        participants: [(&str, Option<i64>); 2],
    ) -> ApiError {
        let mut errors = ValidationErrors::new();
        for (field, id) in participants {
            let Some(id) = id else { continue };
            match self.creature_exists(id).await {
                Ok(true) => {}
                Ok(false) => errors.invalid_reference(field),
                Err(e) => return e,
            }
        }

        if errors.is_empty() {
            ApiError::Database(error)
        } else {
            ApiError::Validation(errors)
        }
    }

    /// Delete a battle.
    pub async fn delete_battle(&self, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM combates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(BATTLE_NOT_FOUND.to_string()));
        }

        Ok(())
    }
}
