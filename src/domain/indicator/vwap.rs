//! Session-anchored volume-weighted average price.

use chrono::{DateTime, NaiveTime, Timelike, Utc};

use crate::domain::candle::Candle;
use crate::domain::fees::round2;

/// VWAP anchored at the most recent session open.
///
/// Scans backward for the latest candle whose UTC time-of-day falls within
/// five minutes of `session_open`, or where the calendar day changes from the
/// previous candle, then accumulates sum(typical * volume) / sum(volume) from
/// that anchor forward. Returns 0.0 when the session carries no volume.
pub fn session_vwap(candles: &[Candle], session_open: NaiveTime) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }

    let mut anchor = 0;
    for i in (0..candles.len()).rev() {
        let Some(dt) = DateTime::<Utc>::from_timestamp(candles[i].time, 0) else {
            continue;
        };
        let minute_of_day = dt.hour() * 60 + dt.minute();
        let open_minute = session_open.hour() * 60 + session_open.minute();
        if minute_of_day >= open_minute && minute_of_day < open_minute + 5 {
            anchor = i;
            break;
        }
        if i > 0 {
            if let Some(prev) = DateTime::<Utc>::from_timestamp(candles[i - 1].time, 0) {
                if dt.date_naive() != prev.date_naive() {
                    anchor = i;
                    break;
                }
            }
        }
    }

    let mut cum_tpv = 0.0;
    let mut cum_vol: i64 = 0;
    for c in &candles[anchor..] {
        cum_tpv += c.typical_price() * c.volume as f64;
        cum_vol += c.volume;
    }

    if cum_vol > 0 {
        round2(cum_tpv / cum_vol as f64)
    } else {
        0.0
    }
}
