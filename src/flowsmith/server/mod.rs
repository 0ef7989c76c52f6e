// SPDX-License-Identifier: MIT

//! HTTP adapter over the compiler
//!
//! Same library, same semantics as the CLI; the editor calls these routes
//! for live validation and code preview.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::error::{CompileError, FlowsmithError};
use crate::flowsmith::compiler::{CompileOutcome, Compiler, ValidationReport};

pub struct AppState {
    pub compiler: Compiler,
}

/// Compile error mapped onto an HTTP status
pub struct ApiError(CompileError);

impl From<CompileError> for ApiError {
    fn from(err: CompileError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CompileError::MalformedGraph(_) => StatusCode::BAD_REQUEST,
            CompileError::GraphTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CompileError::InvalidGraph { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CompileError::UnsupportedNodeType { .. }
            | CompileError::IdentifierResolution { .. }
            | CompileError::Emit { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Compiler invariant violated: {}", self.0);
        } else {
            log::warn!("Rejected graph: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/node-types", get(node_types))
        .route("/api/validate", post(validate_graph))
        .route("/api/compile", post(compile_graph))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(compiler: Compiler, port: u16) -> Result<(), FlowsmithError> {
    let app = router(Arc::new(AppState { compiler }));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn node_types(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.compiler.registry().catalog())
}

async fn validate_graph(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> Result<Json<ValidationReport>, ApiError> {
    Ok(Json(state.compiler.check(&document)?))
}

async fn compile_graph(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> Result<Json<CompileOutcome>, ApiError> {
    Ok(Json(state.compiler.compile(&document)?))
}
