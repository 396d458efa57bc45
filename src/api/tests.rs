//! End-to-end tests driving the full router against in-memory SQLite.

use std::str::FromStr;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

use crate::api::build_router;
use crate::logging;
use crate::storage::PokedexRepository;
use crate::AppState;

async fn test_state() -> AppState {
    logging::init_test();

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Invalid test database url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create test database");
    let repository = PokedexRepository::new(pool);
    repository.init_schema().await.expect("Failed to init schema");

    AppState { repository }
}

async fn test_app(api_prefix: &str) -> Router {
    build_router(test_state().await, api_prefix)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = tokio_test::assert_ok!(app.clone().oneshot(request).await);
    let status = response.status();
    let bytes = tokio_test::assert_ok!(axum::body::to_bytes(response.into_body(), usize::MAX).await);
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

async fn create_trainer(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/entrenadores",
        Some(json!({ "nombre": name, "ciudad": "Pallet", "edad": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

async fn create_creature(app: &Router, trainer_id: i64, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/pokemons",
        Some(json!({
            "nombre": name,
            "tipo": "Electric",
            "nivel": 5,
            "entrenador_id": trainer_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_trainer_pokemon_roundtrip() {
    let app = test_app("").await;

    let (status, body) = send(
        &app,
        "POST",
        "/entrenadores",
        Some(json!({ "nombre": "Ash", "ciudad": "Pallet", "edad": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Entrenador creado correctamente");
    assert_eq!(body["data"]["nombre"], "Ash");
    let ash = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/pokemons",
        Some(json!({
            "nombre": "Pikachu",
            "tipo": "Electric",
            "nivel": 5,
            "entrenador_id": ash
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["entrenador"]["nombre"], "Ash");

    let (status, body) = send(&app, "GET", &format!("/entrenadores/{ash}/pokemons"), None).await;
    assert_eq!(status, StatusCode::OK);
    let pokemons = body["data"].as_array().unwrap();
    assert_eq!(pokemons.len(), 1);
    assert_eq!(pokemons[0]["nombre"], "Pikachu");
    assert_eq!(pokemons[0]["entrenador_id"], ash);

    let (status, body) = send(&app, "GET", &format!("/entrenadores/{ash}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pokemons"][0]["nombre"], "Pikachu");
}

#[tokio::test]
async fn test_list_by_trainer_returns_only_owned() {
    let app = test_app("").await;
    let ash = create_trainer(&app, "Ash").await;
    let brock = create_trainer(&app, "Brock").await;
    let pikachu = create_creature(&app, ash, "Pikachu").await;
    create_creature(&app, brock, "Onix").await;
    let bulbasaur = create_creature(&app, ash, "Bulbasaur").await;

    let (_, body) = send(&app, "GET", &format!("/entrenadores/{ash}/pokemons"), None).await;
    let mut ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, [pikachu, bulbasaur]);

    let (status, body) = send(&app, "GET", "/entrenadores/999/pokemons", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_creature_with_unknown_trainer_is_rejected() {
    let app = test_app("").await;

    let (status, body) = send(
        &app,
        "POST",
        "/pokemons",
        Some(json!({ "nombre": "Mew", "tipo": "Psychic", "nivel": 50, "entrenador_id": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["errors"]["entrenador_id"][0],
        "The selected entrenador_id is invalid."
    );

    let (_, body) = send(&app, "GET", "/pokemons", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_battle_rules() {
    let app = test_app("").await;
    let ash = create_trainer(&app, "Ash").await;
    let pikachu = create_creature(&app, ash, "Pikachu").await;
    let onix = create_creature(&app, ash, "Onix").await;

    let (status, body) = send(
        &app,
        "POST",
        "/combates",
        Some(json!({
            "pokemon_local_id": pikachu,
            "pokemon_visitante_id": pikachu,
            "fecha": "2024-06-01 18:00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["pokemon_visitante_id"].is_array());

    let (status, body) = send(
        &app,
        "POST",
        "/combates",
        Some(json!({
            "pokemon_local_id": pikachu,
            "pokemon_visitante_id": onix,
            "fecha": "2024-06-01 18:00:00",
            "resultado": "abc"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["resultado"].is_array());

    let (status, body) = send(
        &app,
        "POST",
        "/combates",
        Some(json!({
            "pokemon_local_id": pikachu,
            "pokemon_visitante_id": onix,
            "fecha": "2024-06-01 18:00:00",
            "resultado": "3-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["resultado"], "3-1");
    assert_eq!(body["data"]["pokemon_local"]["nombre"], "Pikachu");
    assert_eq!(body["data"]["pokemon_visitante"]["nombre"], "Onix");
    let battle = body["data"]["id"].as_i64().unwrap();

    // Moving the away side onto the home pokemon is rejected on update too.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/combates/{battle}"),
        Some(json!({ "pokemon_visitante_id": pikachu })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/combates/{battle}"),
        Some(json!({ "resultado": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resultado"], Value::Null);
    assert_eq!(body["message"], "Combate actualizado correctamente");
}

#[tokio::test]
async fn test_trainer_age_update_bounds() {
    let app = test_app("").await;
    let ash = create_trainer(&app, "Ash").await;
    let uri = format!("/entrenadores/{ash}");

    for age in [5, 150] {
        let (status, body) = send(&app, "PUT", &uri, Some(json!({ "edad": age }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "age {age}");
        assert!(body["errors"]["edad"].is_array());
    }

    for age in [10, 100] {
        let (status, body) = send(&app, "PUT", &uri, Some(json!({ "edad": age }))).await;
        assert_eq!(status, StatusCode::OK, "age {age}");
        assert_eq!(body["data"]["edad"], age);
        assert_eq!(body["data"]["nombre"], "Ash");
    }
}

#[tokio::test]
async fn test_get_after_delete_is_not_found() {
    let app = test_app("").await;
    let ash = create_trainer(&app, "Ash").await;
    let pikachu = create_creature(&app, ash, "Pikachu").await;

    let (status, body) = send(&app, "DELETE", &format!("/pokemons/{pikachu}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Pokemon eliminado correctamente");
    assert!(body.get("data").is_none());

    let (status, body) = send(&app, "GET", &format!("/pokemons/{pikachu}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Pokemon no encontrado");

    let (status, _) = send(&app, "DELETE", &format!("/pokemons/{pikachu}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_trainer_removes_its_pokemons() {
    let app = test_app("").await;
    let ash = create_trainer(&app, "Ash").await;
    let pikachu = create_creature(&app, ash, "Pikachu").await;

    let (status, _) = send(&app, "DELETE", &format!("/entrenadores/{ash}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/pokemons/{pikachu}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_missing_record_is_not_found_before_validation() {
    let app = test_app("").await;

    let (status, body) = send(&app, "PUT", "/entrenadores/77", Some(json!({ "edad": 500 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Entrenador no encontrado");

    let (status, _) = send(&app, "PUT", "/combates/77", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests() {
    let app = test_app("").await;

    let request = Request::builder()
        .method("POST")
        .uri("/entrenadores")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/entrenadores", Some(json!("Ash"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["body"].is_array());

    let (status, body) = send(&app, "GET", "/entrenadores/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_missing_fields_are_all_reported() {
    let app = test_app("").await;

    let (status, body) = send(&app, "POST", "/combates", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["pokemon_local_id", "pokemon_visitante_id", "fecha"] {
        assert!(body["errors"][field].is_array(), "missing error for {field}");
    }
    assert!(body["errors"].get("resultado").is_none());
}

#[tokio::test]
async fn test_routes_mount_under_prefix() {
    let app = test_app("/api").await;

    let (status, body) = send(&app, "GET", "/api/entrenadores", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Listado de entrenadores obtenido correctamente");

    let (status, _) = send(&app, "GET", "/entrenadores", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_wrong_types_are_reported_per_field() {
    let app = test_app("").await;

    let (status, body) = send(&app, "POST", "/entrenadores", Some(json!({ "edad": "abc" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["edad"][0], "The edad field must be an integer.");
    assert_eq!(body["errors"]["nombre"][0], "The nombre field is required.");
    assert_eq!(body["errors"]["ciudad"][0], "The ciudad field is required.");
    assert!(body["errors"].get("body").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/entrenadores",
        Some(json!({ "nombre": "Ash", "ciudad": "Pallet", "edad": "25" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["edad"], 25);
    let ash = body["data"]["id"].as_i64().unwrap();

    let pikachu = create_creature(&app, ash, "Pikachu").await;
    let onix = create_creature(&app, ash, "Onix").await;
    let (status, body) = send(
        &app,
        "POST",
        "/combates",
        Some(json!({
            "pokemon_local_id": pikachu,
            "pokemon_visitante_id": onix,
            "fecha": "2024-06-01 18:00:00",
            "resultado": 31
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["resultado"][0], "The resultado field must be a string.");
    assert_eq!(body["errors"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_checks_references() {
    let app = test_app("").await;
    let ash = create_trainer(&app, "Ash").await;
    let brock = create_trainer(&app, "Brock").await;
    let pikachu = create_creature(&app, ash, "Pikachu").await;
    let onix = create_creature(&app, brock, "Onix").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/pokemons/{pikachu}"),
        Some(json!({ "entrenador_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["entrenador_id"][0],
        "The selected entrenador_id is invalid."
    );

    let (_, body) = send(&app, "GET", &format!("/pokemons/{pikachu}"), None).await;
    assert_eq!(body["data"]["entrenador_id"], ash);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/pokemons/{pikachu}"),
        Some(json!({ "entrenador_id": brock })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["entrenador_id"], brock);
    assert_eq!(body["data"]["entrenador"]["id"], brock);
    assert_eq!(body["data"]["entrenador"]["nombre"], "Brock");

    let (_, body) = send(&app, "GET", &format!("/entrenadores/{ash}/pokemons"), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/combates",
        Some(json!({
            "pokemon_local_id": pikachu,
            "pokemon_visitante_id": onix,
            "fecha": "2024-06-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let battle = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/combates/{battle}"),
        Some(json!({ "pokemon_local_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["pokemon_local_id"][0],
        "The selected pokemon_local_id is invalid."
    );

    let (_, body) = send(&app, "GET", &format!("/combates/{battle}"), None).await;
    assert_eq!(body["data"]["pokemon_local_id"], pikachu);
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let state = test_state().await;
    let pool = state.repository.pool().clone();
    let app = build_router(state, "");

    pool.close().await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "unavailable");
}
