//! Synchronous adapter
//!
//! One POST route per storage operation plus a liveness probe, mounted under
//! the configured prefix. Handlers only decode, call and encode.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerSection;
use crate::error::StorageError;
use crate::protocol::{Operation, Reply, execute_blocking, health_body};
use crate::storage::FileStore;

const TRANSPORT: &str = "http";

#[derive(Clone)]
struct HttpState {
    store: Arc<FileStore>,
}

/// Build the router for `store`.
pub fn router(store: Arc<FileStore>, config: &ServerSection) -> Router {
    let files = Router::new()
        .route("/write", post(write))
        .route("/read", post(read))
        .route("/list", post(list))
        .route("/delete", post(delete))
        .route("/move", post(move_entry))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(HttpState { store });

    match config.prefix() {
        "" => Router::new().merge(files),
        prefix => Router::new().nest(prefix, files),
    }
}

/// Serve until `shutdown` fires, then let in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

async fn write(State(state): State<HttpState>, body: Result<Bytes, BytesRejection>) -> Response {
    run(state, Operation::Write, body).await
}

async fn read(State(state): State<HttpState>, body: Result<Bytes, BytesRejection>) -> Response {
    run(state, Operation::Read, body).await
}

async fn list(State(state): State<HttpState>, body: Result<Bytes, BytesRejection>) -> Response {
    run(state, Operation::List, body).await
}

async fn delete(State(state): State<HttpState>, body: Result<Bytes, BytesRejection>) -> Response {
    run(state, Operation::Delete, body).await
}

async fn move_entry(
    State(state): State<HttpState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    run(state, Operation::Move, body).await
}

async fn health() -> Json<Value> {
    Json(health_body())
}

async fn run(state: HttpState, op: Operation, body: Result<Bytes, BytesRejection>) -> Response {
    let reply = match body {
        Ok(body) => execute_blocking(state.store, op, body, TRANSPORT).await,
        Err(rejection) => Reply::from_error(&StorageError::Validation(rejection.body_text())),
    };
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body)).into_response()
}
