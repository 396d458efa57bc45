//! HTTP request handlers.

use axum::{extract::State, http::StatusCode, Json};

use crate::api::types::*;
use crate::domain::{
    BattleDetails, CreateBattleRequest, CreateCreatureRequest, CreateTrainerRequest,
    CreatureDetails, ParticipantLookup, Trainer, TrainerDetails, UpdateBattleRequest,
    UpdateCreatureRequest, UpdateTrainerRequest,
};
use crate::error::ApiResult;
use crate::storage::PokedexRepository;
use crate::AppState;

type Reply<T> = ApiResult<Json<ApiResponse<T>>>;
type Created<T> = ApiResult<(StatusCode, Json<ApiResponse<T>>)>;

/// Look up an optional id, treating "not given" as nothing to check.
async fn creature_exists(repository: &PokedexRepository, id: Option<i64>) -> ApiResult<bool> {
    match id {
        Some(id) => repository.creature_exists(id).await,
        None => Ok(false),
    }
}

async fn trainer_exists(repository: &PokedexRepository, id: Option<i64>) -> ApiResult<bool> {
    match id {
        Some(id) => repository.trainer_exists(id).await,
        None => Ok(false),
    }
}

// ==================== Trainers ====================

/// List all trainers with their pokemons.
///
/// GET /entrenadores
#[utoipa::path(
    get,
    path = "/entrenadores",
    responses(
        (status = 200, description = "Trainers with their pokemons", body = [TrainerDetails]),
        (status = 500, description = "Internal error")
    ),
    tag = "entrenadores"
)]
pub async fn list_trainers(State(state): State<AppState>) -> Reply<Vec<TrainerDetails>> {
    let trainers = state.repository.list_trainers().await?;

    Ok(ApiResponse::ok(
        trainers,
        "Listado de entrenadores obtenido correctamente",
    ))
}

/// Get a trainer with its pokemons.
///
/// GET /entrenadores/{id}
#[utoipa::path(
    get,
    path = "/entrenadores/{id}",
    params(("id" = i64, Path, description = "Trainer ID")),
    responses(
        (status = 200, description = "Trainer found", body = TrainerDetails),
        (status = 404, description = "Trainer not found")
    ),
    tag = "entrenadores"
)]
pub async fn get_trainer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<TrainerDetails> {
    let trainer = state.repository.get_trainer_details(id).await?;

    Ok(ApiResponse::ok(trainer, "Entrenador obtenido correctamente"))
}

/// Create a trainer.
///
/// POST /entrenadores
#[utoipa::path(
    post,
    path = "/entrenadores",
    request_body = CreateTrainerRequest,
    responses(
        (status = 201, description = "Trainer created", body = Trainer),
        (status = 422, description = "Validation failed")
    ),
    tag = "entrenadores"
)]
pub async fn create_trainer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTrainerRequest>,
) -> Created<Trainer> {
    let new_trainer = request.validate()?;
    let trainer = state.repository.create_trainer(&new_trainer).await?;

    tracing::info!(trainer_id = trainer.id, name = %trainer.name, "Trainer created");

    Ok(ApiResponse::created(trainer, "Entrenador creado correctamente"))
}

/// Update some or all fields of a trainer.
///
/// PUT /entrenadores/{id}
#[utoipa::path(
    put,
    path = "/entrenadores/{id}",
    params(("id" = i64, Path, description = "Trainer ID")),
    request_body = UpdateTrainerRequest,
    responses(
        (status = 200, description = "Trainer updated", body = Trainer),
        (status = 404, description = "Trainer not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "entrenadores"
)]
pub async fn update_trainer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateTrainerRequest>,
) -> Reply<Trainer> {
    state.repository.get_trainer(id).await?;

    let changes = request.validate()?;
    let trainer = state.repository.update_trainer(id, &changes).await?;

    tracing::info!(trainer_id = id, "Trainer updated");

    Ok(ApiResponse::ok(trainer, "Entrenador actualizado correctamente"))
}

/// Delete a trainer together with its pokemons.
///
/// DELETE /entrenadores/{id}
#[utoipa::path(
    delete,
    path = "/entrenadores/{id}",
    params(("id" = i64, Path, description = "Trainer ID")),
    responses(
        (status = 200, description = "Trainer deleted"),
        (status = 404, description = "Trainer not found")
    ),
    tag = "entrenadores"
)]
pub async fn delete_trainer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<()> {
    state.repository.delete_trainer(id).await?;

    tracing::info!(trainer_id = id, "Trainer deleted");

    Ok(ApiResponse::message("Entrenador eliminado correctamente"))
}

/// List the pokemons owned by a trainer.
///
/// GET /entrenadores/{id}/pokemons
#[utoipa::path(
    get,
    path = "/entrenadores/{id}/pokemons",
    params(("id" = i64, Path, description = "Trainer ID")),
    responses(
        (status = 200, description = "Pokemons of the trainer", body = [CreatureDetails])
    ),
    tag = "entrenadores"
)]
pub async fn list_trainer_creatures(
    State(state): State<AppState>,
    ApiPath(trainer_id): ApiPath<i64>,
) -> Reply<Vec<CreatureDetails>> {
    let creatures = state.repository.list_creatures_by_trainer(trainer_id).await?;

    Ok(ApiResponse::ok(
        creatures,
        "Pokemons del entrenador obtenidos correctamente",
    ))
}

// ==================== Pokemons ====================

/// List all pokemons with their trainer.
///
/// GET /pokemons
#[utoipa::path(
    get,
    path = "/pokemons",
    responses(
        (status = 200, description = "Pokemons with their trainer", body = [CreatureDetails])
    ),
    tag = "pokemons"
)]
pub async fn list_creatures(State(state): State<AppState>) -> Reply<Vec<CreatureDetails>> {
    let creatures = state.repository.list_creatures().await?;

    Ok(ApiResponse::ok(
        creatures,
        "Listado de pokemons obtenido correctamente",
    ))
}

/// Get a pokemon with its trainer.
///
/// GET /pokemons/{id}
#[utoipa::path(
    get,
    path = "/pokemons/{id}",
    params(("id" = i64, Path, description = "Pokemon ID")),
    responses(
        (status = 200, description = "Pokemon found", body = CreatureDetails),
        (status = 404, description = "Pokemon not found")
    ),
    tag = "pokemons"
)]
pub async fn get_creature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<CreatureDetails> {
    let creature = state.repository.get_creature_details(id).await?;

    Ok(ApiResponse::ok(creature, "Pokemon obtenido correctamente"))
}

/// Create a pokemon for an existing trainer.
///
/// POST /pokemons
#[utoipa::path(
    post,
    path = "/pokemons",
    request_body = CreateCreatureRequest,
    responses(
        (status = 201, description = "Pokemon created", body = CreatureDetails),
        (status = 422, description = "Validation failed")
    ),
    tag = "pokemons"
)]
pub async fn create_creature(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCreatureRequest>,
) -> Created<CreatureDetails> {
    let known_trainer = trainer_exists(&state.repository, request.requested_trainer()).await?;

    let new_creature = request.validate(known_trainer)?;
    let creature = state.repository.create_creature(&new_creature).await?;

    tracing::info!(
        creature_id = creature.creature.id,
        trainer_id = creature.trainer.id,
        name = %creature.creature.name,
        "Pokemon created"
    );

    Ok(ApiResponse::created(creature, "Pokemon creado correctamente"))
}

/// Update some or all fields of a pokemon.
///
/// PUT /pokemons/{id}
#[utoipa::path(
    put,
    path = "/pokemons/{id}",
    params(("id" = i64, Path, description = "Pokemon ID")),
    request_body = UpdateCreatureRequest,
    responses(
        (status = 200, description = "Pokemon updated", body = CreatureDetails),
        (status = 404, description = "Pokemon not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "pokemons"
)]
pub async fn update_creature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateCreatureRequest>,
) -> Reply<CreatureDetails> {
    state.repository.get_creature(id).await?;

    let known_trainer = trainer_exists(&state.repository, request.requested_trainer()).await?;
    let changes = request.validate(known_trainer)?;
    let creature = state.repository.update_creature(id, &changes).await?;

    tracing::info!(creature_id = id, "Pokemon updated");

    Ok(ApiResponse::ok(creature, "Pokemon actualizado correctamente"))
}

/// Delete a pokemon together with its battles.
///
/// DELETE /pokemons/{id}
#[utoipa::path(
    delete,
    path = "/pokemons/{id}",
    params(("id" = i64, Path, description = "Pokemon ID")),
    responses(
        (status = 200, description = "Pokemon deleted"),
        (status = 404, description = "Pokemon not found")
    ),
    tag = "pokemons"
)]
pub async fn delete_creature(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<()> {
    state.repository.delete_creature(id).await?;

    tracing::info!(creature_id = id, "Pokemon deleted");

    Ok(ApiResponse::message("Pokemon eliminado correctamente"))
}

// ==================== Battles ====================

/// List all battles with both participants.
///
/// GET /combates
#[utoipa::path(
    get,
    path = "/combates",
    responses(
        (status = 200, description = "Battles with participants", body = [BattleDetails])
    ),
    tag = "combates"
)]
pub async fn list_battles(State(state): State<AppState>) -> Reply<Vec<BattleDetails>> {
    let battles = state.repository.list_battles().await?;

    Ok(ApiResponse::ok(
        battles,
        "Listado de combates obtenido correctamente",
    ))
}

/// Get a battle with both participants.
///
/// GET /combates/{id}
#[utoipa::path(
    get,
    path = "/combates/{id}",
    params(("id" = i64, Path, description = "Battle ID")),
    responses(
        (status = 200, description = "Battle found", body = BattleDetails),
        (status = 404, description = "Battle not found")
    ),
    tag = "combates"
)]
pub async fn get_battle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<BattleDetails> {
    let battle = state.repository.get_battle_details(id).await?;

    Ok(ApiResponse::ok(battle, "Combate obtenido correctamente"))
}

/// Create a battle between two different pokemons.
///
/// POST /combates
#[utoipa::path(
    post,
    path = "/combates",
    request_body = CreateBattleRequest,
    responses(
        (status = 201, description = "Battle created", body = BattleDetails),
        (status = 422, description = "Validation failed")
    ),
    tag = "combates"
)]
pub async fn create_battle(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBattleRequest>,
) -> Created<BattleDetails> {
    let lookup = ParticipantLookup {
        home_exists: creature_exists(&state.repository, request.requested_home()).await?,
        away_exists: creature_exists(&state.repository, request.requested_away()).await?,
    };

    let new_battle = request.validate(lookup)?;
    let battle = state.repository.create_battle(&new_battle).await?;

    tracing::info!(
        battle_id = battle.battle.id,
        home_creature_id = battle.battle.home_creature_id,
        away_creature_id = battle.battle.away_creature_id,
        "Battle created"
    );

    Ok(ApiResponse::created(battle, "Combate creado correctamente"))
}

/// Update some or all fields of a battle.
///
/// PUT /combates/{id}
#[utoipa::path(
    put,
    path = "/combates/{id}",
    params(("id" = i64, Path, description = "Battle ID")),
    request_body = UpdateBattleRequest,
    responses(
        (status = 200, description = "Battle updated", body = BattleDetails),
        (status = 404, description = "Battle not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "combates"
)]
pub async fn update_battle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateBattleRequest>,
) -> Reply<BattleDetails> {
    let current = state.repository.get_battle(id).await?;

    let lookup = ParticipantLookup {
        home_exists: creature_exists(&state.repository, request.requested_home()).await?,
        away_exists: creature_exists(&state.repository, request.requested_away()).await?,
    };
    let changes = request.validate(&current, lookup)?;
    let battle = state.repository.update_battle(id, &changes).await?;

    tracing::info!(battle_id = id, "Battle updated");

    Ok(ApiResponse::ok(battle, "Combate actualizado correctamente"))
}

/// Delete a battle.
///
/// DELETE /combates/{id}
#[utoipa::path(
    delete,
    path = "/combates/{id}",
    params(("id" = i64, Path, description = "Battle ID")),
    responses(
        (status = 200, description = "Battle deleted"),
        (status = 404, description = "Battle not found")
    ),
    tag = "combates"
)]
pub async fn delete_battle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Reply<()> {
    state.repository.delete_battle(id).await?;

    tracing::info!(battle_id = id, "Battle deleted");

    Ok(ApiResponse::message("Combate eliminado correctamente"))
}

// ==================== Health ====================

/// Health check endpoint.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1")
        .fetch_one(state.repository.pool())
        .await;

    let (status, database) = match database {
        Ok(_) => ("healthy", "connected"),
        Err(e) => {
            tracing::error!(error = %e, "Health check could not reach the database");
            ("unhealthy", "unavailable")
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
