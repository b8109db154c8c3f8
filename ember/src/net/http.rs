//! Router assembly and the health surface. Cross-origin access is fully
//! permissive; game clients are served from anywhere.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::net::poll::{self, PollGateway};
use crate::net::ws;
use crate::server::{HealthReport, Server};

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
    pub poll: Arc<PollGateway>,
}

pub fn router(server: Arc<Server>, poll: Arc<PollGateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/ws", get(ws::upgrade))
        .route("/poll/connect", post(poll::connect))
        .route("/poll/events", get(poll::events))
        .route("/poll/send", post(poll::send))
        .layer(cors)
        .with_state(AppState { server, poll })
}

async fn health(State(app): State<AppState>) -> Json<HealthReport> {
    Json(app.server.health().await)
}
