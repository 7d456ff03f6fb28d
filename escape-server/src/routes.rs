//! HTTP route handlers for the progress API.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use escape::core::rubric::check_manifest;
use escape::core::types::Level;
use escape::io::player::MIN_PLAYER_ID_LEN;
use escape::wire::{
    HealthResponse, PlayerInitResponse, ProgressQuery, ProgressResponse, TaskUpdate,
    ValidateRequest, ValidateResponse, WelcomeResponse,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::state::AppState;

const WELCOME: &str = "Welcome to the Container Escape Room";

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/welcome", get(welcome))
        .route("/player/init", get(player_init))
        .route("/progress", get(get_progress))
        .route("/progress/update", post(update_progress))
        .route("/level/2/validate", post(validate_manifest))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitQuery {
    player_id: String,
}

/// GET /api/player/init?playerId= - register a player id chosen by the client.
async fn player_init(
    State(state): State<AppState>,
    Query(query): Query<InitQuery>,
) -> Result<Json<PlayerInitResponse>, StatusCode> {
    check_player_id(&query.player_id)?;
    let mut db = state.db.write().await;
    if db.register(&query.player_id) {
        info!(player_id = %query.player_id, "player registered");
        persist(&state, &db)?;
    }
    Ok(Json(PlayerInitResponse {
        ok: true,
        player_id: query.player_id,
    }))
}

/// GET /api/progress?playerId=&level=
async fn get_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, StatusCode> {
    check_player_id(&query.player_id)?;
    let level = level(query.level)?;
    let db = state.db.read().await;
    Ok(Json(db.progress(&query.player_id, level)))
}

/// POST /api/progress/update - OR-merge one task flag.
async fn update_progress(
    State(state): State<AppState>,
    Json(body): Json<TaskUpdate>,
) -> Result<Json<ProgressResponse>, StatusCode> {
    check_player_id(&body.player_id)?;
    let level = level(body.level)?;
    let mut db = state.db.write().await;
    let progress = db.update(&body.player_id, level, &body.task, body.completed);
    persist(&state, &db)?;
    info!(
        player_id = %body.player_id,
        level = level.number(),
        task = %body.task,
        done = progress.done,
        "task updated"
    );
    Ok(Json(progress))
}

/// POST /api/level/2/validate - check a manifest; a pass is stored.
async fn validate_manifest(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, StatusCode> {
    check_player_id(&body.player_id)?;
    let verdict = check_manifest(&body.manifest);
    if verdict.ok {
        let mut db = state.db.write().await;
        db.record_manifest(&body.player_id, &body.manifest);
        persist(&state, &db)?;
    }
    info!(player_id = %body.player_id, ok = verdict.ok, "manifest validated");
    Ok(Json(ValidateResponse::from(&verdict)))
}

fn check_player_id(player_id: &str) -> Result<(), StatusCode> {
    if player_id.chars().count() < MIN_PLAYER_ID_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

fn level(number: u8) -> Result<Level, StatusCode> {
    Level::from_number(number).ok_or(StatusCode::BAD_REQUEST)
}

fn persist(state: &AppState, db: &crate::store::ProgressDb) -> Result<(), StatusCode> {
    state.persist(db).map_err(|err| {
        error!(error = %format!("{err:#}"), "failed to persist progress");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
