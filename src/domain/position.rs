//! Position lifecycle: at most one open position per run, converted into a
//! closed trade on exit.

use serde::{Deserialize, Serialize};

/// Why a position was closed. Checked in this order within a bar: stop-loss,
/// target, max-duration timeout; `Force` only on the final bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExitTrigger {
    Target,
    Sl,
    Time,
    Force,
}

/// The single open position of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub quantity: i64,
    pub entry_time: i64,
    pub open_bar_index: usize,
    pub reason: String,
}

impl OpenPosition {
    /// Mark-to-market P&L before fees.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity as f64
    }
}

/// Immutable record of a completed round trip. `pnl` is net of `fees`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: i64,
    pub entry_time: i64,
    pub exit_time: i64,
    pub pnl: f64,
    pub fees: f64,
    pub exit_trigger: ExitTrigger,
    pub reason: String,
}

/// One equity sample per processed bar; reflects unrealized P&L of any open
/// position, not only closed trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}
