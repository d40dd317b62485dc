//! Average True Range with Wilder's smoothing.

use crate::domain::candle::Candle;
use crate::domain::fees::round2;

/// Current ATR value, 0.0 when fewer than `period + 1` candles are available.
/// Seed is the simple average of the first `period` true ranges, then
/// atr = (atr * (n-1) + tr) / n.
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period + 1 {
        return 0.0;
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();

    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    for tr in &true_ranges[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
    }

    round2(atr)
}
