//! HTTP API adapter.
//!
//! JSON endpoints over the engine, run store and candle cache. The run
//! endpoint streams newline-delimited JSON events; everything else is plain
//! request/response.

mod error;
mod handlers;

pub use error::WebError;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::domain::cache::CandleCache;
use crate::domain::engine::BacktestEngine;
use crate::domain::event::{BacktestEvent, EventSink, SinkClosed};
use crate::domain::strategy::StrategyRegistry;
use crate::ports::run_store_port::RunStorePort;

pub struct AppState {
    pub engine: Arc<BacktestEngine>,
    pub registry: Arc<StrategyRegistry>,
    pub run_store: Arc<dyn RunStorePort>,
    pub cache: Arc<CandleCache>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/backtest/run", post(handlers::run_backtest))
        .route("/api/backtest/history", get(handlers::history))
        .route(
            "/api/backtest/runs/{id}",
            get(handlers::get_run).delete(handlers::delete_run),
        )
        .route("/api/backtest/cache/status", get(handlers::cache_status))
        .route("/api/backtest/cache/clear", post(handlers::cache_clear))
        .route("/api/strategies", get(handlers::strategies))
        .with_state(Arc::new(state))
}

/// Event sink over a tokio channel. The engine runs on a blocking thread, so
/// `blocking_send` is the correct hand-off; a dropped receiver (client went
/// away) surfaces as `SinkClosed` and aborts the run.
pub struct BlockingSink {
    tx: tokio::sync::mpsc::Sender<BacktestEvent>,
}

impl BlockingSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<BacktestEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for BlockingSink {
    fn send(&self, event: BacktestEvent) -> Result<(), SinkClosed> {
        self.tx.blocking_send(event).map_err(|_| SinkClosed)
    }
}
