//! chatpulse-server - HTTP front end for transcript analysis
//!
//! `POST /analyse` takes a multipart upload with a `file` field holding a
//! `_chat.txt` export and answers with the JSON report. `GET /health`
//! reports liveness.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chatpulse_core::{logging, Analyser, Config, GroupConfig, Report};
use clap::Parser;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chatpulse-server")]
#[command(about = "Serve chatpulse reports over HTTP")]
#[command(version)]
struct Args {
    /// Config file to use instead of ~/.config/chatpulse/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides `server.http_addr`)
    #[arg(short, long)]
    addr: Option<SocketAddr>,
}

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Missing 'file' field in multipart form")]
    MissingFile,

    #[error("Analysis failed: {0}")]
    Analysis(#[from] chatpulse_core::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Multipart(e) => (e.status(), self.to_string()),
            ServerError::MissingFile => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Analysis(_) | ServerError::Internal(_) => {
                error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "could not produce a report".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    group: Arc<GroupConfig>,
}

fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyse", post(analyse_upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn analyse_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Report>, ServerError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let data = field.bytes().await?;
        info!(size = data.len(), "Transcript uploaded");

        let group = Arc::clone(&state.group);
        let analysis = tokio::task::spawn_blocking(move || {
            Analyser::new(&group).analyse(data.to_vec())
        })
        .await
        .map_err(|e| ServerError::Internal(format!("analysis task failed: {e}")))??;

        return Ok(Json(analysis.report));
    }

    Err(ServerError::MissingFile)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(logging::filter_for(&config.logging))
        .init();

    info!("Starting chatpulse server v{}", env!("CARGO_PKG_VERSION"));

    let addr = args.addr.unwrap_or(config.server.http_addr);
    let state = AppState {
        group: Arc::new(config.group),
    };
    let app = build_router(state, config.server.max_upload_bytes);

    info!(addr = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
