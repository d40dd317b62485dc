//! HTTP request handlers.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::domain::run::RunConfig;

use super::{AppState, BlockingSink, WebError};

/// Channel depth for the run event stream; the engine blocks once the client
/// falls this far behind.
const STREAM_BUFFER: usize = 64;

/// Runs a backtest and streams its events as newline-delimited JSON.
///
/// The engine executes on a blocking thread; its terminal `complete` event
/// (success or failure) is always the last line of the stream. Engine errors
/// after stream start are carried inside that event, not as an HTTP status.
pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Json(config): Json<RunConfig>,
) -> Response {
    let (tx, rx) = tokio::sync::mpsc::channel(STREAM_BUFFER);
    let engine = state.engine.clone();

    tokio::task::spawn_blocking(move || {
        let sink = BlockingSink::new(tx);
        if let Err(err) = engine.run(&config, &sink) {
            // The sink already carried a terminal event for domain failures;
            // this is for the operator log.
            error!(error = %err, "backtest run failed");
        }
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let mut line =
            serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        Some((Ok::<_, std::convert::Infallible>(line), rx))
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, WebError> {
    let summaries = state.run_store.list(query.limit.unwrap_or(20))?;
    Ok(Json(summaries).into_response())
}

pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    match state.run_store.get(id)? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(WebError::not_found(format!("run {id} not found"))),
    }
}

pub async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    if state.run_store.delete(id)? {
        Ok(Json(json!({ "deleted": id })).into_response())
    } else {
        Err(WebError::not_found(format!("run {id} not found")))
    }
}

pub async fn cache_status(
    State(state): State<Arc<AppState>>,
) -> Result<Response, WebError> {
    let stats = state.cache.stats()?;
    Ok(Json(stats).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    pub symbol: Option<String>,
}

pub async fn cache_clear(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ClearRequest>>,
) -> Result<Response, WebError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let cleared = state.cache.clear(request.symbol.as_deref())?;
    Ok(Json(json!({ "cleared": cleared })).into_response())
}

pub async fn strategies(State(state): State<Arc<AppState>>) -> Response {
    Json(state.registry.list()).into_response()
}
