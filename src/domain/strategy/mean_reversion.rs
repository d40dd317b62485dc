//! Mean reversion strategy.
//!
//! Buys oversold dips stretched well below session VWAP on capitulation
//! volume, targeting a reversion back to VWAP. The stop sits a wider ATR
//! multiple below entry since dips can keep falling.

use crate::domain::candle::Candle;
use crate::domain::error::StrategyError;
use crate::domain::fees::{position_size, round2, FeeConfig, TradeType};
use crate::domain::indicator::{atr, rsi_current, session_vwap, volume_ratio};
use crate::domain::market::MarketHours;
use crate::domain::signal::{Action, CandidateInfo, Signal, Verdict};
use crate::domain::strategy::{Strategy, StrategyParams};

pub const ALGO_ID: &str = "mean_reversion";

pub const REJECT_HISTORY: &str = "Insufficient history";
pub const REJECT_NOT_BELOW_VWAP: &str = "Price not below VWAP";
pub const REJECT_NO_ATR: &str = "ATR unavailable";
pub const REJECT_SHALLOW_DIP: &str = "Dip too shallow vs ATR";
pub const REJECT_RSI_HIGH: &str = "RSI not oversold";
pub const REJECT_VOLUME: &str = "Volume below capitulation threshold";
pub const REJECT_SIZE: &str = "Position size zero";
pub const REJECT_FEE_MARGIN: &str = "Fee margin too high for VWAP target";

#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversionParams {
    pub rsi_period: usize,
    pub rsi_max: f64,
    pub volume_lookback: usize,
    pub volume_threshold: f64,
    pub atr_period: usize,
    pub vwap_distance_atr_min: f64,
    pub atr_sl_mult: f64,
    pub fee_safety_margin: f64,
    pub min_history: usize,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        MeanReversionParams {
            rsi_period: 14,
            rsi_max: 35.0,
            volume_lookback: 20,
            volume_threshold: 2.0,
            atr_period: 14,
            vwap_distance_atr_min: 1.0,
            atr_sl_mult: 1.5,
            fee_safety_margin: 0.5,
            min_history: 30,
        }
    }
}

pub struct MeanReversion {
    params: MeanReversionParams,
    fees: FeeConfig,
    hours: MarketHours,
    effective_capital: f64,
    risk_percent: f64,
}

impl MeanReversion {
    pub fn new(params: &StrategyParams) -> Self {
        MeanReversion {
            params: params.mean_reversion.clone(),
            fees: params.fees.clone(),
            hours: params.hours,
            effective_capital: 100_000.0,
            risk_percent: 1.0,
        }
    }
}

impl Strategy for MeanReversion {
    fn algo_id(&self) -> &'static str {
        ALGO_ID
    }

    fn name(&self) -> &'static str {
        "Mean Reversion"
    }

    fn description(&self) -> &'static str {
        "Oversold dip below VWAP on capitulation volume, targeting VWAP"
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

        let vwap = session_vwap(candles, self.hours.session_open);
        if vwap <= 0.0 || ltp >= vwap {
            return Ok(Verdict::Reject(REJECT_NOT_BELOW_VWAP));
        }

        let atr = atr(candles, p.atr_period);
        if atr <= 0.0 {
            return Ok(Verdict::Reject(REJECT_NO_ATR));
        }

        let vwap_distance = vwap - ltp;
        if vwap_distance < atr * p.vwap_distance_atr_min {
            return Ok(Verdict::Reject(REJECT_SHALLOW_DIP));
        }

        let rsi = rsi_current(candles, p.rsi_period);
        if rsi > p.rsi_max {
            return Ok(Verdict::Reject(REJECT_RSI_HIGH));
        }

        let vol = volume_ratio(candles, p.volume_lookback);
        if vol.ratio < p.volume_threshold {
            return Ok(Verdict::Reject(REJECT_VOLUME));
        }

        let entry_price = ltp;
        let target = round2(vwap);
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
        let confidence = round2(((p.rsi_max - rsi) / 20.0 * vol.ratio / 3.0).clamp(0.0, 1.0));

        let reason = format!(
            "Dip {:.2} below VWAP {:.2} ({:.1}x ATR), RSI {:.1}, Vol {:.1}x, \
             reversion target {:.2}",
            vwap_distance,
            vwap,
            vwap_distance / atr,
            rsi,
            vol.ratio,
            target
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
