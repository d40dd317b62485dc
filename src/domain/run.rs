//! Run configuration and persisted run records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::interval::CandleInterval;
use crate::domain::metrics::Metrics;
use crate::domain::position::{ClosedTrade, EquityPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Segment {
    Cash,
    Fno,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Cash => "CASH",
            Segment::Fno => "FNO",
        }
    }
}

/// Immutable input to a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub algo_id: String,
    pub symbol: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_segment")]
    pub segment: Segment,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_interval")]
    pub interval: CandleInterval,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_risk_percent")]
    pub risk_percent: f64,
    #[serde(default = "default_max_positions")]
    pub max_positions: u32,
    /// Closes a position at the bar close once it has been open this long.
    #[serde(default)]
    pub max_trade_duration_minutes: Option<u32>,
}

fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_segment() -> Segment {
    Segment::Cash
}

fn default_interval() -> CandleInterval {
    CandleInterval::FiveMinutes
}

fn default_capital() -> f64 {
    100_000.0
}

fn default_risk_percent() -> f64 {
    1.0
}

fn default_max_positions() -> u32 {
    1
}

/// Full persisted result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(default)]
    pub id: i64,
    pub config: RunConfig,
    pub metrics: Metrics,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub created_at: String,
}

/// Listing row: identity plus headline metrics, no trade or curve blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,
    pub algo_id: String,
    pub symbol: String,
    pub exchange: String,
    pub segment: String,
    pub interval: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: Metrics,
    pub created_at: String,
}
