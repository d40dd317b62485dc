//! Candle interval enumeration and per-interval fetch limits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported candle intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1minute")]
    OneMinute,
    #[serde(rename = "2minute")]
    TwoMinutes,
    #[serde(rename = "3minute")]
    ThreeMinutes,
    #[serde(rename = "5minute")]
    FiveMinutes,
    #[serde(rename = "10minute")]
    TenMinutes,
    #[serde(rename = "15minute")]
    FifteenMinutes,
    #[serde(rename = "30minute")]
    ThirtyMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "4hours")]
    FourHours,
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "1month")]
    OneMonth,
}

impl CandleInterval {
    /// Label used by the external data source and in cache keys.
    pub fn label(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1minute",
            CandleInterval::TwoMinutes => "2minute",
            CandleInterval::ThreeMinutes => "3minute",
            CandleInterval::FiveMinutes => "5minute",
            CandleInterval::TenMinutes => "10minute",
            CandleInterval::FifteenMinutes => "15minute",
            CandleInterval::ThirtyMinutes => "30minute",
            CandleInterval::OneHour => "1hour",
            CandleInterval::FourHours => "4hours",
            CandleInterval::OneDay => "1day",
            CandleInterval::OneWeek => "1week",
            CandleInterval::OneMonth => "1month",
        }
    }

    /// Max calendar days per upstream request for this interval.
    /// Provider limit, not engine logic.
    pub fn max_chunk_days(&self) -> i64 {
        match self {
            CandleInterval::OneMinute
            | CandleInterval::TwoMinutes
            | CandleInterval::ThreeMinutes
            | CandleInterval::FiveMinutes => 30,
            CandleInterval::TenMinutes
            | CandleInterval::FifteenMinutes
            | CandleInterval::ThirtyMinutes => 90,
            CandleInterval::OneHour
            | CandleInterval::FourHours
            | CandleInterval::OneDay
            | CandleInterval::OneWeek
            | CandleInterval::OneMonth => 180,
        }
    }

    pub fn all() -> &'static [CandleInterval] {
        &[
            CandleInterval::OneMinute,
            CandleInterval::TwoMinutes,
            CandleInterval::ThreeMinutes,
            CandleInterval::FiveMinutes,
            CandleInterval::TenMinutes,
            CandleInterval::FifteenMinutes,
            CandleInterval::ThirtyMinutes,
            CandleInterval::OneHour,
            CandleInterval::FourHours,
            CandleInterval::OneDay,
            CandleInterval::OneWeek,
            CandleInterval::OneMonth,
        ]
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CandleInterval {
    type Err = String;

    /// Accepts both the provider label ("5minute") and the short form ("5m").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(' ', "");
        let interval = match normalized.as_str() {
            "1minute" | "1m" | "1min" => CandleInterval::OneMinute,
            "2minute" | "2m" | "2min" => CandleInterval::TwoMinutes,
            "3minute" | "3m" | "3min" => CandleInterval::ThreeMinutes,
            "5minute" | "5m" | "5min" => CandleInterval::FiveMinutes,
            "10minute" | "10m" | "10min" => CandleInterval::TenMinutes,
            "15minute" | "15m" | "15min" => CandleInterval::FifteenMinutes,
            "30minute" | "30m" | "30min" => CandleInterval::ThirtyMinutes,
            "1hour" | "1h" => CandleInterval::OneHour,
            "4hours" | "4hour" | "4h" => CandleInterval::FourHours,
            "1day" | "1d" => CandleInterval::OneDay,
            "1week" | "1w" => CandleInterval::OneWeek,
            "1month" | "1mo" => CandleInterval::OneMonth,
            other => return Err(format!("unknown candle interval: {other}")),
        };
        Ok(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labels_and_short_forms() {
        assert_eq!(
            "5minute".parse::<CandleInterval>().unwrap(),
            CandleInterval::FiveMinutes
        );
        assert_eq!(
            "5m".parse::<CandleInterval>().unwrap(),
            CandleInterval::FiveMinutes
        );
        assert_eq!(
            "1mo".parse::<CandleInterval>().unwrap(),
            CandleInterval::OneMonth
        );
        assert!("7minute".parse::<CandleInterval>().is_err());
    }

    #[test]
    fn chunk_limits_by_granularity() {
        assert_eq!(CandleInterval::OneMinute.max_chunk_days(), 30);
        assert_eq!(CandleInterval::FiveMinutes.max_chunk_days(), 30);
        assert_eq!(CandleInterval::FifteenMinutes.max_chunk_days(), 90);
        assert_eq!(CandleInterval::OneHour.max_chunk_days(), 180);
        assert_eq!(CandleInterval::OneDay.max_chunk_days(), 180);
    }

    #[test]
    fn label_round_trips_through_parse() {
        for interval in CandleInterval::all() {
            assert_eq!(
                interval.label().parse::<CandleInterval>().unwrap(),
                *interval
            );
        }
    }

    #[test]
    fn serde_uses_provider_label() {
        let json = serde_json::to_string(&CandleInterval::FiveMinutes).unwrap();
        assert_eq!(json, "\"5minute\"");
        let back: CandleInterval = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CandleInterval::FiveMinutes);
    }
}
