//! Strategy evaluation outcomes.

use serde::{Deserialize, Serialize};

/// Entry signal produced by a strategy for one bar. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub algo_id: String,
    pub symbol: String,
    pub action: Action,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub quantity: i64,
    /// In [0, 1].
    pub confidence: f64,
    pub reason: String,
    pub fee_breakeven: f64,
    pub expected_profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
}

/// Result of evaluating one bar: either an entry signal or the label of the
/// first filter that rejected the setup. Labels feed the per-run rejection
/// histogram reported in the terminal event.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Entry(Signal),
    Reject(&'static str),
}

/// Snapshot of the candidate bar handed to `Strategy::evaluate`, mirroring
/// what the live screener provides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateInfo {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub open_interest: i64,
}
