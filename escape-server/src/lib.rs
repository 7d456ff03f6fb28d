//! Progress store for the container escape room.
//!
//! Keeps per-player task flags for both levels and grades level 2 manifests
//! with the same rules the client uses offline.

pub mod routes;
pub mod state;
pub mod store;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Full application: `/health` plus the `/api` routes, with permissive CORS.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state)
}
