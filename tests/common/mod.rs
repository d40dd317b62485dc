//! Shared fixtures for integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tickreplay::domain::candle::Candle;
use tickreplay::domain::error::{EngineError, StrategyError};
use tickreplay::domain::interval::CandleInterval;
use tickreplay::domain::run::{RunConfig, Segment};
use tickreplay::domain::signal::{Action, CandidateInfo, Signal, Verdict};
use tickreplay::domain::strategy::{Strategy, StrategyParams, StrategyRegistry};
use tickreplay::ports::market_data_port::MarketDataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// NSE session open (03:45 UTC) for a date, as an epoch timestamp.
pub fn session_open_ts(day: NaiveDate) -> i64 {
    day.and_hms_opt(3, 45, 0).unwrap().and_utc().timestamp()
}

/// One 75-bar five-minute session that is flat at 100 except for a single
/// breakout: bar 40 closes at 101.5 (above the prior 10-bar high of 100.5),
/// the price runs up through bar 43's high of 106.5, and the bar fades to
/// close at 104.0 below the rolling prior high.
///
/// With [`BreakoutStrategy`] this produces exactly one trade per day:
/// entry 101.5 at bar 40, target 105.5 hit at bar 43. The fade on bar 43
/// keeps the same-bar re-entry check from firing after the exit.
pub fn breakout_day(day: NaiveDate) -> Vec<Candle> {
    let open_ts = session_open_ts(day);
    (0..75)
        .map(|i| {
            let (open, high, low, close) = match i {
                40 => (100.0, 101.6, 99.9, 101.5),
                41 => (101.5, 103.2, 101.4, 103.0),
                42 => (103.0, 104.7, 102.9, 104.5),
                43 => (104.5, 106.5, 104.0, 104.0),
                44 => (104.0, 104.1, 99.8, 100.0),
                _ => (100.0, 100.5, 99.5, 100.0),
            };
            Candle {
                time: open_ts + i * 300,
                open,
                high,
                low,
                close,
                volume: 10_000,
                open_interest: 0,
            }
        })
        .collect()
}

/// A 75-bar session that never leaves the 99.5-100.5 band.
pub fn flat_day(day: NaiveDate) -> Vec<Candle> {
    let open_ts = session_open_ts(day);
    (0..75)
        .map(|i| Candle {
            time: open_ts + i * 300,
            open: 100.0,
            high: 100.5,
            low: 99.5,
            close: 100.0,
            volume: 10_000,
            open_interest: 0,
        })
        .collect()
}

/// Feed over a fixed candle vector that counts upstream calls, for cache
/// idempotence assertions.
pub struct CountingFeed {
    candles: Vec<Candle>,
    calls: AtomicUsize,
}

impl CountingFeed {
    pub fn new(candles: Vec<Candle>) -> Arc<Self> {
        Arc::new(Self {
            candles,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for CountingFeed {
    fn fetch_historical(
        &self,
        _exchange: &str,
        _segment: Segment,
        _symbol: &str,
        _interval: CandleInterval,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<Candle>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .candles
            .iter()
            .filter(|c| c.time >= start_ts && c.time <= end_ts)
            .cloned()
            .collect())
    }
}

/// Deterministic test strategy: enters when the close breaks the prior
/// 10-bar high, with a fixed -2/+4 bracket and 10 shares.
pub struct BreakoutStrategy;

impl Strategy for BreakoutStrategy {
    fn algo_id(&self) -> &'static str {
        "breakout_test"
    }

    fn name(&self) -> &'static str {
        "Breakout (test)"
    }

    fn description(&self) -> &'static str {
        "close above prior 10-bar high, fixed bracket"
    }

    fn set_runtime_params(&mut self, _capital: f64, _risk: f64) {}

    fn evaluate(
        &self,
        symbol: &str,
        candles: &[Candle],
        ltp: f64,
        _candidate: &CandidateInfo,
    ) -> Result<Verdict, StrategyError> {
        if candles.len() < 12 {
            return Ok(Verdict::Reject("Insufficient history"));
        }
        let window = &candles[candles.len() - 11..candles.len() - 1];
        let prior_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        if ltp <= prior_high {
            return Ok(Verdict::Reject("No breakout"));
        }
        Ok(Verdict::Entry(Signal {
            algo_id: "breakout_test".to_string(),
            symbol: symbol.to_string(),
            action: Action::Buy,
            entry_price: ltp,
            stop_loss: ltp - 2.0,
            target: ltp + 4.0,
            quantity: 10,
            confidence: 1.0,
            reason: "breakout".to_string(),
            fee_breakeven: 0.0,
            expected_profit: 0.0,
        }))
    }
}

/// Registry with the built-ins plus [`BreakoutStrategy`].
pub fn test_registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::with_builtins();
    registry.register("breakout_test", |_: &StrategyParams| Box::new(BreakoutStrategy));
    registry
}

pub fn run_config(symbol: &str, start: NaiveDate, end: NaiveDate) -> RunConfig {
    RunConfig {
        algo_id: "breakout_test".to_string(),
        symbol: symbol.to_string(),
        exchange: "NSE".to_string(),
        segment: Segment::Cash,
        start_date: start,
        end_date: end,
        interval: CandleInterval::FiveMinutes,
        initial_capital: 100_000.0,
        risk_percent: 1.0,
        max_positions: 1,
        max_trade_duration_minutes: None,
    }
}
