//! HTTP API server for integration with other systems.
//!
//! Provides a REST endpoint that runs the agent and returns the stored lyrics
//! and vocabulary, plus read-only access to stored songs.

use crate::agent::Agent;
use crate::cli::Output;
use crate::config::Settings;
use crate::storage::{ArtifactStore, SavedSong};
use crate::tools::VocabularyItem;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, instrument};

/// Shared application state.
struct AppState {
    agent: Agent,
    store: ArtifactStore,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let state = Arc::new(AppState {
        agent: Agent::from_settings(&settings)?,
        store: ArtifactStore::from_settings(&settings)?,
    });

    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Shabda API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Run agent", "POST /api/agent");
    Output::kv("List songs", "GET  /api/songs");
    Output::kv("Get song", "GET  /api/songs/:song_id");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/agent", post(run_agent))
        .route("/api/songs", get(list_songs))
        .route("/api/songs/{song_id}", get(get_song))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AgentRequest {
    /// Free-text request, e.g. "Find lyrics for Zingaat"
    message_request: String,
}

#[derive(Serialize, Deserialize)]
struct AgentResponse {
    song_id: String,
    lyrics: String,
    vocabulary: Vec<VocabularyItem>,
}

impl From<SavedSong> for AgentResponse {
    fn from(song: SavedSong) -> Self {
        Self {
            song_id: song.song_id,
            lyrics: song.lyrics,
            vocabulary: song.vocabulary,
        }
    }
}

#[derive(Serialize)]
struct SongListResponse {
    songs: Vec<String>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[instrument(skip(state, req), fields(request_id = %uuid::Uuid::new_v4()))]
async fn run_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentRequest>,
) -> impl IntoResponse {
    if req.message_request.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "message_request must not be empty".to_string(),
        );
    }

    let outcome = state.agent.process_request(&req.message_request).await;
    info!("Agent returned song ID {}", outcome.song_id);

    match state.store.load_or_placeholder(&outcome.song_id, None) {
        Ok(song) => Json(AgentResponse::from(song)).into_response(),
        Err(e) => {
            error!("Failed to read back {}: {}", outcome.song_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn list_songs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.list() {
        Ok(songs) => Json(SongListResponse {
            total: songs.len(),
            songs,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_song(
    State(state): State<Arc<AppState>>,
    Path(song_id): Path<String>,
) -> impl IntoResponse {
    match state.store.load(&song_id) {
        Ok(Some(song)) => Json(AgentResponse::from(song)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Song not found: {}", song_id),
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}
