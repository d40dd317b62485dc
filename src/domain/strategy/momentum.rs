//! Momentum scalping strategy.
//!
//! Entry requires all of: EMA fast above slow with a crossover inside the
//! last few bars, RSI in a healthy band, a volume surge over the trailing
//! average, price above session VWAP, and an ATR-sized target that clears
//! the fee breakeven with margin. Target and stop are ATR multiples.

use crate::domain::candle::Candle;
use crate::domain::error::StrategyError;
use crate::domain::fees::{position_size, round2, FeeConfig, TradeType};
use crate::domain::indicator::{ema, rsi_current, session_vwap, volume_ratio};
use crate::domain::market::MarketHours;
use crate::domain::signal::{Action, CandidateInfo, Signal, Verdict};
use crate::domain::strategy::{Strategy, StrategyParams};

pub const ALGO_ID: &str = "momentum_scalp";

pub const REJECT_HISTORY: &str = "Insufficient history";
pub const REJECT_EMA_BEARISH: &str = "EMA bearish (fast at or below slow)";
pub const REJECT_NO_CROSSOVER: &str = "No recent EMA crossover";
pub const REJECT_RSI_RANGE: &str = "RSI outside momentum band";
pub const REJECT_VOLUME: &str = "Volume below threshold";
pub const REJECT_BELOW_VWAP: &str = "Price below VWAP";
pub const REJECT_NO_ATR: &str = "ATR unavailable";
pub const REJECT_SIZE: &str = "Position size zero";
pub const REJECT_FEE_MARGIN: &str = "Fee margin too high for ATR target";

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub crossover_lookback: usize,
    pub rsi_period: usize,
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub volume_lookback: usize,
    pub volume_threshold: f64,
    pub atr_period: usize,
    pub atr_target_mult: f64,
    pub atr_sl_mult: f64,
    pub fee_safety_margin: f64,
    pub min_history: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        MomentumParams {
            ema_fast: 9,
            ema_slow: 21,
            crossover_lookback: 3,
            rsi_period: 14,
            rsi_min: 40.0,
            rsi_max: 65.0,
            volume_lookback: 20,
            volume_threshold: 1.5,
            atr_period: 14,
            atr_target_mult: 1.5,
            atr_sl_mult: 1.0,
            fee_safety_margin: 0.5,
            min_history: 30,
        }
    }
}

pub struct MomentumScalping {
    params: MomentumParams,
    fees: FeeConfig,
    hours: MarketHours,
    effective_capital: f64,
    risk_percent: f64,
}

impl MomentumScalping {
    pub fn new(params: &StrategyParams) -> Self {
        MomentumScalping {
            params: params.momentum.clone(),
            fees: params.fees.clone(),
            hours: params.hours,
            effective_capital: 100_000.0,
            risk_percent: 1.0,
        }
    }
}

impl Strategy for MomentumScalping {
    fn algo_id(&self) -> &'static str {
        ALGO_ID
    }

    fn name(&self) -> &'static str {
        "Momentum Scalping"
    }

    fn description(&self) -> &'static str {
        "EMA crossover with RSI and volume confirmation above VWAP"
    }

    fn set_runtime_params(&mut self, effective_capital: f64, risk_percent: f64) {
        self.effective_capital = effective_capital;
        self.risk_percent = risk_percent;
    }

    fn evaluate(
        &self,
        symbol: &str,
        candles: &[Candle],
        ltp: f64,
        _candidate: &CandidateInfo,
    ) -> Result<Verdict, StrategyError> {
        let p = &self.params;
        if candles.len() < p.min_history {
            return Ok(Verdict::Reject(REJECT_HISTORY));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let fast = ema(&closes, p.ema_fast);
        let slow = ema(&closes, p.ema_slow);

        let (last_fast, last_slow) = (fast[fast.len() - 1], slow[slow.len() - 1]);
        if last_fast.is_nan() || last_slow.is_nan() || last_fast <= last_slow {
            return Ok(Verdict::Reject(REJECT_EMA_BEARISH));
        }

        if !recent_crossover(&fast, &slow, p.crossover_lookback) {
            return Ok(Verdict::Reject(REJECT_NO_CROSSOVER));
        }

        let rsi = rsi_current(candles, p.rsi_period);
        if rsi < p.rsi_min || rsi > p.rsi_max {
            return Ok(Verdict::Reject(REJECT_RSI_RANGE));
        }

        let vol = volume_ratio(candles, p.volume_lookback);
        if vol.ratio < p.volume_threshold {
            return Ok(Verdict::Reject(REJECT_VOLUME));
        }

        let vwap = session_vwap(candles, self.hours.session_open);
        if ltp <= vwap {
            return Ok(Verdict::Reject(REJECT_BELOW_VWAP));
        }

        let atr = crate::domain::indicator::atr(candles, p.atr_period);
        if atr <= 0.0 {
            return Ok(Verdict::Reject(REJECT_NO_ATR));
        }

        let entry_price = ltp;
        let target = round2(entry_price + atr * p.atr_target_mult);
        let stop_loss = round2(entry_price - atr * p.atr_sl_mult);

        let quantity = position_size(
            self.effective_capital,
            self.risk_percent,
            entry_price - stop_loss,
        );
        if quantity <= 0 {
            return Ok(Verdict::Reject(REJECT_SIZE));
        }

        let fee_breakeven = self
            .fees
            .fee_breakeven(entry_price, quantity, TradeType::Intraday);
        let target_move = target - entry_price;
        if target_move <= fee_breakeven * (1.0 + p.fee_safety_margin) {
            return Ok(Verdict::Reject(REJECT_FEE_MARGIN));
        }

        let expected_profit = round2((target_move - fee_breakeven) * quantity as f64);
        let confidence = round2(((rsi - 30.0) / 35.0 * vol.ratio / 2.0).clamp(0.0, 1.0));

        let reason = format!(
            "EMA {}/{} crossover, RSI {:.1}, Vol {:.1}x, Above VWAP {:.2}, \
             ATR {:.2}, Target +{:.2} ({:.1}x ATR)",
            p.ema_fast, p.ema_slow, rsi, vol.ratio, vwap, atr, target_move, p.atr_target_mult
        );

        Ok(Verdict::Entry(Signal {
            algo_id: ALGO_ID.to_string(),
            symbol: symbol.to_string(),
            action: Action::Buy,
            entry_price,
            stop_loss,
            target,
            quantity,
            confidence,
            reason,
            fee_breakeven,
            expected_profit,
        }))
    }
}

/// True when fast crossed above slow within the last `lookback` bars.
fn recent_crossover(fast: &[f64], slow: &[f64], lookback: usize) -> bool {
    let n = fast.len();
    let from = n.saturating_sub(lookback);
    for i in from..n {
        if i < 1 {
            continue;
        }
        let values = [fast[i], slow[i], fast[i - 1], slow[i - 1]];
        if values.iter().any(|v| v.is_nan()) {
            continue;
        }
        if fast[i] > slow[i] && fast[i - 1] <= slow[i - 1] {
            return true;
        }
    }
    false
}
