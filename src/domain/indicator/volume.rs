//! Volume participation relative to recent history.

use crate::domain::candle::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeStats {
    pub current: i64,
    pub average: f64,
    /// Current volume over the trailing average, rounded to one decimal.
    pub ratio: f64,
}

/// Compare the latest candle's volume against the mean of the previous
/// `lookback` candles (the latest bar itself is excluded from the average).
pub fn volume_ratio(candles: &[Candle], lookback: usize) -> VolumeStats {
    if candles.len() < 2 {
        return VolumeStats {
            current: 0,
            average: 0.0,
            ratio: 0.0,
        };
    }

    let current = candles[candles.len() - 1].volume;
    let hist_start = candles.len().saturating_sub(lookback + 1);
    let hist = &candles[hist_start..candles.len() - 1];
    let average = if hist.is_empty() {
        current as f64
    } else {
        hist.iter().map(|c| c.volume as f64).sum::<f64>() / hist.len() as f64
    };

    let ratio = if average > 0.0 {
        (current as f64 / average * 10.0).round() / 10.0
    } else {
        0.0
    };

    VolumeStats {
        current,
        average,
        ratio,
    }
}
