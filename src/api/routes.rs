//! Route definitions for the API.

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_trainers,
        handlers::get_trainer,
        handlers::create_trainer,
        handlers::update_trainer,
        handlers::delete_trainer,
        handlers::list_trainer_creatures,
        handlers::list_creatures,
        handlers::get_creature,
        handlers::create_creature,
        handlers::update_creature,
        handlers::delete_creature,
        handlers::list_battles,
        handlers::get_battle,
        handlers::create_battle,
        handlers::update_battle,
        handlers::delete_battle,
        handlers::health_check,
    ),
    components(schemas(
        crate::api::types::HealthResponse,
        crate::domain::Trainer,
        crate::domain::TrainerDetails,
        crate::domain::CreateTrainerRequest,
        crate::domain::UpdateTrainerRequest,
        crate::domain::Creature,
        crate::domain::CreatureDetails,
        crate::domain::CreateCreatureRequest,
        crate::domain::UpdateCreatureRequest,
        crate::domain::Battle,
        crate::domain::BattleDetails,
        crate::domain::CreateBattleRequest,
        crate::domain::UpdateBattleRequest,
    )),
    tags(
        (name = "entrenadores", description = "Trainer management"),
        (name = "pokemons", description = "Pokemon management"),
        (name = "combates", description = "Battle management"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Pokedex API",
        version = "0.1.0",
        description = "CRUD over trainers, their pokemons and the battles between them",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Trainer, pokemon and battle routes.
fn resource_routes() -> Router<AppState> {
    Router::new()
        // Pokemons
        .route(
            "/pokemons",
            get(handlers::list_creatures).post(handlers::create_creature),
        )
        .route(
            "/pokemons/:id",
            get(handlers::get_creature)
                .put(handlers::update_creature)
                .delete(handlers::delete_creature),
        )
        // Trainers
        .route(
            "/entrenadores",
            get(handlers::list_trainers).post(handlers::create_trainer),
        )
        .route(
            "/entrenadores/:id",
            get(handlers::get_trainer)
                .put(handlers::update_trainer)
                .delete(handlers::delete_trainer),
        )
        .route(
            "/entrenadores/:id/pokemons",
            get(handlers::list_trainer_creatures),
        )
        // Battles
        .route(
            "/combates",
            get(handlers::list_battles).post(handlers::create_battle),
        )
        .route(
            "/combates/:id",
            get(handlers::get_battle)
                .put(handlers::update_battle)
                .delete(handlers::delete_battle),
        )
}

/// Build the API router, mounting the resources under `api_prefix`
/// (empty mounts them at the root).
pub fn build_router(state: AppState, api_prefix: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let resources = if api_prefix.is_empty() {
        resource_routes()
    } else {
        Router::new().nest(api_prefix, resource_routes())
    };

    resources
        // Health
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // OpenAPI docs
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
