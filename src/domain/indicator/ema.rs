//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n closes placed at index
//! n-1, then EMA[i] = C[i]*k + EMA[i-1]*(1-k). Indices before the seed are NaN.

/// EMA over a close series. Returns a vector the same length as `closes`.
pub fn ema(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let seed: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;

    let k = 2.0 / (period as f64 + 1.0);
    for i in period..n {
        out[i] = closes[i] * k + out[i - 1] * (1.0 - k);
    }
    out
}
