//! Performance metrics derived from the trade list and equity curve.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::position::{ClosedTrade, EquityPoint};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics of a completed run. Money values are rounded to 2
/// decimals, ratios to 4, durations to 1, matching the live dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub total_fees: f64,
    /// Sum of per-trade net P&L (trades carry pnl net of fees).
    pub net_pnl: f64,
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: f64,
    /// Gross profit over absolute gross loss; `None` when there are no
    /// losing trades to divide by.
    pub profit_factor: Option<f64>,
    pub expectancy: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub avg_win: f64,
    /// Mean losing trade P&L; negative by construction.
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_duration_seconds: f64,
}

impl Metrics {
    pub fn compute(
        initial_capital: f64,
        trades: &[ClosedTrade],
        equity_curve: &[EquityPoint],
    ) -> Self {
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let total_fees: f64 = trades.iter().map(|t| t.fees).sum();
        let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losses = trades.iter().filter(|t| t.pnl <= 0.0).count();

        let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).sum();
        let losing = trades.iter().filter(|t| t.pnl < 0.0).count();

        let avg_win = if wins > 0 {
            gross_profit / wins as f64
        } else {
            0.0
        };
        let avg_loss = if losing > 0 {
            gross_loss / losing as f64
        } else {
            0.0
        };

        let best_trade = trades.iter().map(|t| t.pnl).fold(f64::NAN, f64::max);
        let worst_trade = trades.iter().map(|t| t.pnl).fold(f64::NAN, f64::min);
        let (best_trade, worst_trade) = if trades.is_empty() {
            (0.0, 0.0)
        } else {
            (best_trade, worst_trade)
        };

        let avg_duration_seconds = if trades.is_empty() {
            0.0
        } else {
            trades
                .iter()
                .map(|t| (t.exit_time - t.entry_time) as f64)
                .sum::<f64>()
                / trades.len() as f64
        };

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital + total_pnl);

        let total_return_pct = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        let win_rate_pct = if trades.is_empty() {
            0.0
        } else {
            wins as f64 / trades.len() as f64 * 100.0
        };

        let profit_factor = if gross_loss < 0.0 {
            Some(round(gross_profit / gross_loss.abs(), 4))
        } else if gross_profit > 0.0 {
            None
        } else {
            Some(0.0)
        };

        let expectancy = if trades.is_empty() {
            0.0
        } else {
            let n = trades.len() as f64;
            avg_win * (wins as f64 / n) + avg_loss * (losses as f64 / n)
        };

        let (max_drawdown, max_drawdown_pct) = drawdown(initial_capital, equity_curve);
        let (sharpe_ratio, sortino_ratio) = risk_adjusted(equity_curve);

        Metrics {
            initial_capital,
            final_equity: round(final_equity, 2),
            total_return_pct: round(total_return_pct, 2),
            total_fees: round(total_fees, 2),
            net_pnl: round(total_pnl, 2),
            trade_count: trades.len(),
            wins,
            losses,
            win_rate_pct: round(win_rate_pct, 2),
            profit_factor,
            expectancy: round(expectancy, 2),
            max_drawdown: round(max_drawdown, 2),
            max_drawdown_pct: round(max_drawdown_pct, 2),
            sharpe_ratio: round(sharpe_ratio, 4),
            sortino_ratio: round(sortino_ratio, 4),
            avg_win: round(avg_win, 2),
            avg_loss: round(avg_loss, 2),
            best_trade: round(best_trade, 2),
            worst_trade: round(worst_trade, 2),
            avg_duration_seconds: round(avg_duration_seconds, 1),
        }
    }
}

fn round(x: f64, dp: u32) -> f64 {
    let factor = 10_f64.powi(dp as i32);
    (x * factor).round() / factor
}

/// Largest peak-to-trough decline over the curve, absolute and as a
/// percentage of the peak. The peak starts at initial capital.
fn drawdown(initial_capital: f64, equity_curve: &[EquityPoint]) -> (f64, f64) {
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;
    let mut max_dd_pct = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let dd = peak - point.equity;
        if dd > max_dd {
            max_dd = dd;
        }
        if peak > 0.0 {
            let dd_pct = dd / peak * 100.0;
            if dd_pct > max_dd_pct {
                max_dd_pct = dd_pct;
            }
        }
    }

    (max_dd, max_dd_pct)
}

/// Sharpe and Sortino from day-bucketed equity returns, annualized by √252.
/// The last equity point of each UTC day stands for that day.
fn risk_adjusted(equity_curve: &[EquityPoint]) -> (f64, f64) {
    let mut daily_equity: BTreeMap<i64, f64> = BTreeMap::new();
    for point in equity_curve {
        if let Some(dt) = DateTime::<Utc>::from_timestamp(point.time, 0) {
            let day = dt.date_naive().num_days_from_ce() as i64;
            daily_equity.insert(day, point.equity);
        }
    }

    let equities: Vec<f64> = daily_equity.into_values().collect();
    let mut returns = Vec::with_capacity(equities.len().saturating_sub(1));
    for pair in equities.windows(2) {
        if pair[0] > 0.0 {
            returns.push((pair[1] - pair[0]) / pair[0]);
        }
    }

    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std = variance.sqrt();
    let sharpe = if std > 0.0 {
        mean / std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_std = if downside.is_empty() {
        0.0
    } else {
        (downside.iter().map(|r| r * r).sum::<f64>() / downside.len() as f64).sqrt()
    };
    let sortino = if downside_std > 0.0 {
        mean / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitTrigger;
    use approx::assert_relative_eq;

    fn trade(pnl: f64, fees: f64, entry_time: i64, exit_time: i64) -> ClosedTrade {
        ClosedTrade {
            entry_price: 100.0,
            exit_price: 100.0,
            quantity: 1,
            entry_time,
            exit_time,
            pnl,
            fees,
            exit_trigger: ExitTrigger::Target,
            reason: String::new(),
        }
    }

    fn curve(points: &[(i64, f64)]) -> Vec<EquityPoint> {
        points
            .iter()
            .map(|&(time, equity)| EquityPoint { time, equity })
            .collect()
    }

    #[test]
    fn single_winning_trade() {
        // entry 1217.90, exit 1221.92, qty 82, fees 83.63
        let gross = (1221.92 - 1217.90) * 82.0;
        let pnl = ((gross - 83.63) * 100.0_f64).round() / 100.0;
        assert_relative_eq!(pnl, 246.01);

        let trades = vec![trade(pnl, 83.63, 0, 600)];
        let points = curve(&[(0, 100_000.0), (600, 100_000.0 + pnl)]);
        let metrics = Metrics::compute(100_000.0, &trades, &points);

        assert_relative_eq!(metrics.net_pnl, 246.01);
        assert_relative_eq!(metrics.win_rate_pct, 100.0);
        assert_eq!(metrics.trade_count, 1);
        assert_eq!(metrics.wins, 1);
        assert_eq!(metrics.losses, 0);
        assert_eq!(metrics.profit_factor, None);
        assert_relative_eq!(metrics.final_equity, 100_246.01);
        assert_relative_eq!(metrics.avg_duration_seconds, 600.0);
    }

    #[test]
    fn no_trades() {
        let metrics = Metrics::compute(100_000.0, &[], &curve(&[(0, 100_000.0)]));
        assert_eq!(metrics.trade_count, 0);
        assert_relative_eq!(metrics.net_pnl, 0.0);
        assert_relative_eq!(metrics.win_rate_pct, 0.0);
        assert_eq!(metrics.profit_factor, Some(0.0));
        assert_relative_eq!(metrics.final_equity, 100_000.0);
    }

    #[test]
    fn profit_factor_and_expectancy() {
        let trades = vec![
            trade(300.0, 10.0, 0, 60),
            trade(-100.0, 10.0, 120, 180),
            trade(-50.0, 10.0, 240, 300),
        ];
        let points = curve(&[(0, 100_000.0), (300, 100_150.0)]);
        let metrics = Metrics::compute(100_000.0, &trades, &points);

        assert_eq!(metrics.profit_factor, Some(2.0));
        // avg_win 300, avg_loss -75, 1/3 win rate:
        // 300*(1/3) + (-75)*(2/3) = 50
        assert_relative_eq!(metrics.expectancy, 50.0);
        assert_relative_eq!(metrics.best_trade, 300.0);
        assert_relative_eq!(metrics.worst_trade, -100.0);
        assert_relative_eq!(metrics.total_fees, 30.0);
    }

    #[test]
    fn drawdown_peak_to_trough() {
        let points = curve(&[
            (0, 100_000.0),
            (60, 105_000.0),
            (120, 98_000.0),
            (180, 103_000.0),
        ]);
        let metrics = Metrics::compute(100_000.0, &[], &points);
        assert_relative_eq!(metrics.max_drawdown, 7_000.0);
        assert_relative_eq!(metrics.max_drawdown_pct, 7_000.0 / 105_000.0 * 100.0, epsilon = 0.01);
    }

    #[test]
    fn sharpe_zero_on_flat_curve() {
        const DAY: i64 = 86_400;
        let points = curve(&[(0, 100_000.0), (DAY, 100_000.0), (2 * DAY, 100_000.0)]);
        let metrics = Metrics::compute(100_000.0, &[], &points);
        assert_relative_eq!(metrics.sharpe_ratio, 0.0);
        assert_relative_eq!(metrics.sortino_ratio, 0.0);
    }

    #[test]
    fn sortino_uses_downside_only() {
        const DAY: i64 = 86_400;
        let points = curve(&[
            (0, 100_000.0),
            (DAY, 101_000.0),
            (2 * DAY, 100_500.0),
            (3 * DAY, 102_000.0),
        ]);
        let metrics = Metrics::compute(100_000.0, &[], &points);
        assert!(metrics.sortino_ratio > metrics.sharpe_ratio);
    }
}
