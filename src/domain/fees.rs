//! Fee arithmetic for Indian exchanges (NSE/BSE).
//!
//! This is the exact fee model used by the live order path; the simulation
//! engine calls the same functions so backtested P&L predicts real P&L.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Intraday,
    Delivery,
}

/// Per-order fee configuration. Defaults match the live broker setup.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeConfig {
    pub brokerage_per_order: f64,
    pub brokerage_turnover_cap: f64,
    pub stt_intraday_sell_rate: f64,
    pub stt_delivery_rate: f64,
    pub exchange_txn_rate: f64,
    pub sebi_rate: f64,
    pub stamp_duty_rate: f64,
    pub gst_rate: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            brokerage_per_order: 20.0,
            brokerage_turnover_cap: 0.0003,
            stt_intraday_sell_rate: 0.00025,
            stt_delivery_rate: 0.001,
            exchange_txn_rate: 0.0000345,
            sebi_rate: 0.000001,
            stamp_duty_rate: 0.00003,
            gst_rate: 0.18,
        }
    }
}

/// Round to 2 decimal places, matching the live calculator's presentation.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl FeeConfig {
    /// Total fees for a single order leg, rounded to the paisa.
    pub fn fees(&self, price: f64, qty: i64, side: OrderSide, trade_type: TradeType) -> f64 {
        let turnover = price * qty as f64;
        let brokerage = self
            .brokerage_per_order
            .min(turnover * self.brokerage_turnover_cap);

        let stt = match trade_type {
            TradeType::Intraday => {
                if side == OrderSide::Sell {
                    turnover * self.stt_intraday_sell_rate
                } else {
                    0.0
                }
            }
            TradeType::Delivery => turnover * self.stt_delivery_rate,
        };

        let exchange_txn = turnover * self.exchange_txn_rate;
        let sebi = turnover * self.sebi_rate;
        let stamp_duty = if side == OrderSide::Buy {
            turnover * self.stamp_duty_rate
        } else {
            0.0
        };
        let gst = (brokerage + exchange_txn + sebi) * self.gst_rate;

        round2(brokerage + stt + exchange_txn + sebi + stamp_duty + gst)
    }

    /// Net P&L and total round-trip fees for a completed long trade.
    pub fn exit_pnl(
        &self,
        entry_price: f64,
        exit_price: f64,
        qty: i64,
        trade_type: TradeType,
    ) -> (f64, f64) {
        let gross = (exit_price - entry_price) * qty as f64;
        let entry_fees = self.fees(entry_price, qty, OrderSide::Buy, trade_type);
        let exit_fees = self.fees(exit_price, qty, OrderSide::Sell, trade_type);
        let total_fees = round2(entry_fees + exit_fees);
        (round2(gross - total_fees), total_fees)
    }

    /// Price move per share needed to cover the round trip, estimated at the
    /// entry price.
    pub fn fee_breakeven(&self, entry_price: f64, qty: i64, trade_type: TradeType) -> f64 {
        if qty <= 0 {
            return 0.0;
        }
        let buy = self.fees(entry_price, qty, OrderSide::Buy, trade_type);
        let sell = self.fees(entry_price, qty, OrderSide::Sell, trade_type);
        round2((buy + sell) / qty as f64)
    }
}

/// Shares to buy so that a stop-loss hit loses at most `risk_percent` of
/// capital. Whole shares only.
pub fn position_size(capital: f64, risk_percent: f64, risk_per_share: f64) -> i64 {
    if risk_per_share <= 0.0 {
        return 0;
    }
    let risk_amount = capital * (risk_percent / 100.0);
    (risk_amount / risk_per_share).floor() as i64
}
