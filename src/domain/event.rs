//! Streamed run events and the producer side of the event channel.
//!
//! A run emits zero or more `progress` and `trade` records followed by
//! exactly one terminal `complete` record. The engine pushes events through
//! an [`EventSink`]; the transport (CLI printer, HTTP stream, test collector)
//! owns the consuming end.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::mpsc::SyncSender;
use std::sync::Mutex;

use crate::domain::metrics::Metrics;
use crate::domain::position::{ClosedTrade, EquityPoint};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BacktestEvent {
    Progress {
        percent: f64,
        current_date: String,
        bars_processed: usize,
        total_bars: usize,
    },
    Trade {
        trade: ClosedTrade,
    },
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        metrics: Option<Metrics>,
        trades: Vec<ClosedTrade>,
        equity_curve: Vec<EquityPoint>,
        /// Rejection-reason histogram: why candidate bars produced no entry.
        signal_analysis: BTreeMap<String, u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl BacktestEvent {
    /// Terminal event for a run that failed before producing results.
    pub fn failure(error: impl Into<String>) -> Self {
        BacktestEvent::Complete {
            metrics: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            signal_analysis: BTreeMap::new(),
            run_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BacktestEvent::Complete { .. })
    }
}

/// Returned when the consumer has gone away; the engine abandons the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event consumer disconnected")]
pub struct SinkClosed;

/// Producer-side event hand-off.
pub trait EventSink: Send + Sync {
    fn send(&self, event: BacktestEvent) -> Result<(), SinkClosed>;
}

/// Sink over a bounded channel. Blocks the engine when the consumer lags,
/// which is the intended back-pressure.
pub struct ChannelSink {
    tx: SyncSender<BacktestEvent>,
}

impl ChannelSink {
    pub fn new(tx: SyncSender<BacktestEvent>) -> Self {
        ChannelSink { tx }
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: BacktestEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).map_err(|_| SinkClosed)
    }
}

/// Collects events in memory; used by tests and the CLI summary path.
#[derive(Default)]
pub struct CollectSink {
    events: Mutex<Vec<BacktestEvent>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_events(self) -> Vec<BacktestEvent> {
        self.events.into_inner().unwrap_or_default()
    }

    pub fn events(&self) -> Vec<BacktestEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectSink {
    fn send(&self, event: BacktestEvent) -> Result<(), SinkClosed> {
        self.events.lock().map_err(|_| SinkClosed)?.push(event);
        Ok(())
    }
}
