use crate::state::AppState;
use crate::stream::{self, frame_stream};
use anyhow::Context;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use controller::Command;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Serialize)]
pub struct CommandReply {
    pub status: &'static str,
    pub message: String,
}

impl CommandReply {
    fn success(message: String) -> Self {
        Self {
            status: "success",
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error",
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReply {
    pub camera_active: bool,
    pub robot_connected: bool,
    pub last_command: Option<Command>,
    pub timestamp: f64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        .route("/control/:command", post(control))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn video_feed(State(state): State<AppState>) -> Response {
    let parts = frame_stream(
        Arc::clone(&state.frames),
        state.stream_idle_timeout,
        state.shutdown.clone(),
    );

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(stream::CONTENT_TYPE)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Body::from_stream(parts),
    )
        .into_response()
}

async fn control(
    State(state): State<AppState>,
    Path(verb): Path<String>,
) -> (StatusCode, Json<CommandReply>) {
    let command = match verb.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected control request");
            return (
                StatusCode::BAD_REQUEST,
                Json(CommandReply::error("Invalid command".into())),
            );
        }
    };

    // Serial writes block for up to the write timeout
    let commands = Arc::clone(&state.commands);
    match tokio::task::spawn_blocking(move || commands.send(command)).await {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(CommandReply::success(format!("Executing {command}"))),
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CommandReply::error(e.to_string())),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Command task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CommandReply::error(format!("Command task failed: {e}"))),
            )
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusReply> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    Json(StatusReply {
        camera_active: state.camera_active(),
        robot_connected: state.commands.is_connected(),
        last_command: state.commands.last_command(),
        timestamp,
    })
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn run_server<F>(addr: SocketAddr, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Gateway listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}
