//! Relative Strength Index with Wilder's smoothing.
//!
//! Seed: simple mean of gains/losses over the first n deltas. Thereafter
//! avg = (prev_avg * (n-1) + current) / n. RSI = 100 - 100/(1 + gain/loss);
//! if the average loss is zero, RSI = 100. Needs n+1 candles minimum.

use crate::domain::candle::Candle;

/// RSI series, NaN until index `period` (the first n deltas are the seed).
pub fn rsi(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let diff = candles[i].close - candles[i - 1].close;
        if diff > 0.0 {
            avg_gain += diff;
        } else {
            avg_loss += -diff;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    out[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in (period + 1)..n {
        let diff = candles[i].close - candles[i - 1].close;
        let gain = if diff > 0.0 { diff } else { 0.0 };
        let loss = if diff < 0.0 { -diff } else { 0.0 };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[i] = rsi_from_averages(avg_gain, avg_loss);
    }
    out
}

/// Latest RSI value, or 50.0 (neutral) when there is not enough history.
pub fn rsi_current(candles: &[Candle], period: usize) -> f64 {
    match rsi(candles, period).last() {
        Some(v) if v.is_finite() => *v,
        _ => 50.0,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                time: 60 * i as i64,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
                open_interest: 0,
            })
            .collect()
    }

    #[test]
    fn warmup_is_nan() {
        let candles = candles_from_closes(&[1.0; 20]);
        let out = rsi(&candles, 14);
        assert!(out[..14].iter().all(|v| v.is_nan()));
        assert!(out[14].is_finite());
    }

    #[test]
    fn all_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        assert_relative_eq!(rsi_current(&candles, 14), 100.0);
    }

    #[test]
    fn all_losses_near_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let candles = candles_from_closes(&closes);
        let current = rsi_current(&candles, 14);
        assert!(current < 1.0, "got {current}");
    }

    #[test]
    fn insufficient_history_defaults_neutral() {
        let candles = candles_from_closes(&[100.0, 101.0, 102.0]);
        assert_relative_eq!(rsi_current(&candles, 14), 50.0);
    }

    #[test]
    fn alternating_moves_stay_midrange() {
        let closes: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let candles = candles_from_closes(&closes);
        let current = rsi_current(&candles, 14);
        assert!(current > 30.0 && current < 70.0, "got {current}");
    }
}
