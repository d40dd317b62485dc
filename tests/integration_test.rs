//! End-to-end tests: CSV-less feed through the cache, engine, and SQLite
//! run store, asserting the engine's observable contract.

#![cfg(feature = "sqlite")]

mod common;

use common::*;
use std::sync::Arc;

use tickreplay::adapters::sqlite_store::SqliteStore;
use tickreplay::domain::cache::CandleCache;
use tickreplay::domain::engine::BacktestEngine;
use tickreplay::domain::event::{BacktestEvent, CollectSink};
use tickreplay::domain::fees::{FeeConfig, TradeType};
use tickreplay::domain::position::{ClosedTrade, ExitTrigger};
use tickreplay::domain::strategy::StrategyParams;
use tickreplay::ports::run_store_port::RunStorePort;

/// Five trading days (2024-03-04 to 2024-03-08), one breakout per day.
fn week_of_breakouts() -> Vec<tickreplay::domain::candle::Candle> {
    (4..=8)
        .flat_map(|d| breakout_day(date(2024, 3, d)))
        .collect()
}

struct Harness {
    engine: BacktestEngine,
    feed: Arc<CountingFeed>,
    store: Arc<SqliteStore>,
}

fn harness(candles: Vec<tickreplay::domain::candle::Candle>) -> Harness {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let feed = CountingFeed::new(candles);
    let cache = Arc::new(CandleCache::new(store.clone(), feed.clone()));
    let engine = BacktestEngine::new(
        cache,
        Arc::new(test_registry()),
        store.clone(),
        StrategyParams::default(),
    );
    Harness {
        engine,
        feed,
        store,
    }
}

fn trades_of(events: &[BacktestEvent]) -> Vec<ClosedTrade> {
    events
        .iter()
        .filter_map(|e| match e {
            BacktestEvent::Trade { trade } => Some(trade.clone()),
            _ => None,
        })
        .collect()
}

mod full_pipeline {
    use super::*;

    #[test]
    fn five_day_scenario_produces_one_target_hit_per_day() {
        let h = harness(week_of_breakouts());
        let sink = CollectSink::new();
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        let run_id = h.engine.run(&config, &sink).unwrap();
        assert!(run_id.is_some());

        let events = sink.into_events();
        let trades = trades_of(&events);
        assert_eq!(trades.len(), 5);
        for trade in &trades {
            assert_eq!(trade.exit_trigger, ExitTrigger::Target);
            assert!((trade.entry_price - 101.5).abs() < f64::EPSILON);
            assert!((trade.exit_price - 105.5).abs() < f64::EPSILON);
            assert_eq!(trade.quantity, 10);
            assert!(trade.pnl > 0.0);
        }
    }

    #[test]
    fn event_stream_ends_with_exactly_one_complete() {
        let h = harness(week_of_breakouts());
        let sink = CollectSink::new();
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        h.engine.run(&config, &sink).unwrap();
        let events = sink.into_events();

        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.last().unwrap().is_terminal());
        // Progress fires roughly every 5 percent plus the final bar.
        let progress = events
            .iter()
            .filter(|e| matches!(e, BacktestEvent::Progress { .. }))
            .count();
        assert!(progress >= 20, "got {progress} progress events");
    }

    #[test]
    fn final_equity_is_initial_plus_net_pnl() {
        let h = harness(week_of_breakouts());
        let sink = CollectSink::new();
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        h.engine.run(&config, &sink).unwrap();

        match sink.into_events().last().unwrap() {
            BacktestEvent::Complete {
                metrics: Some(m),
                trades,
                equity_curve,
                ..
            } => {
                let net: f64 = trades.iter().map(|t| t.pnl).sum();
                assert!((m.final_equity - (100_000.0 + net)).abs() < 0.01);
                assert!((m.win_rate_pct - 100.0).abs() < f64::EPSILON);
                assert_eq!(m.profit_factor, None);
                // One equity sample per processed bar.
                assert_eq!(equity_curve.len(), 5 * 75);
            }
            _ => panic!("expected successful terminal event"),
        }
    }

    #[test]
    fn completed_run_is_persisted_and_retrievable() {
        let h = harness(week_of_breakouts());
        let sink = CollectSink::new();
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        let run_id = h.engine.run(&config, &sink).unwrap().unwrap();

        let record = h.store.get(run_id).unwrap().expect("run stored");
        assert_eq!(record.config, config);
        assert_eq!(record.trades.len(), 5);

        let summaries = h.store.list(10).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, run_id);
        assert_eq!(summaries[0].algo_id, "breakout_test");
    }
}

mod cache_behavior {
    use super::*;

    #[test]
    fn second_identical_run_fetches_nothing() {
        let h = harness(week_of_breakouts());
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        h.engine.run(&config, &CollectSink::new()).unwrap();
        let after_first = h.feed.calls();
        assert!(after_first >= 1);

        h.engine.run(&config, &CollectSink::new()).unwrap();
        assert_eq!(h.feed.calls(), after_first);
    }

    #[test]
    fn both_runs_produce_identical_trades() {
        let h = harness(week_of_breakouts());
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        let first = CollectSink::new();
        h.engine.run(&config, &first).unwrap();
        let second = CollectSink::new();
        h.engine.run(&config, &second).unwrap();

        assert_eq!(
            trades_of(&first.into_events()),
            trades_of(&second.into_events())
        );
    }
}

mod determinism {
    use super::*;

    #[test]
    fn changing_future_days_does_not_change_past_trades() {
        // Same first four days; the fifth differs completely.
        let mut with_breakout: Vec<_> = (4..=7)
            .flat_map(|d| breakout_day(date(2024, 3, d)))
            .collect();
        let mut with_flat = with_breakout.clone();
        with_breakout.extend(breakout_day(date(2024, 3, 8)));
        with_flat.extend(flat_day(date(2024, 3, 8)));

        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));
        let day5_open = session_open_ts(date(2024, 3, 8));

        let a = harness(with_breakout);
        let sink_a = CollectSink::new();
        a.engine.run(&config, &sink_a).unwrap();

        let b = harness(with_flat);
        let sink_b = CollectSink::new();
        b.engine.run(&config, &sink_b).unwrap();

        let past = |events: &[BacktestEvent]| {
            trades_of(events)
                .into_iter()
                .filter(|t| t.exit_time < day5_open)
                .collect::<Vec<_>>()
        };

        assert_eq!(past(&sink_a.into_events()), past(&sink_b.into_events()));
    }
}

mod fee_model {
    use super::*;

    #[test]
    fn engine_trades_carry_live_model_fees() {
        let h = harness(week_of_breakouts());
        let sink = CollectSink::new();
        let config = run_config("NSE-TEST", date(2024, 3, 4), date(2024, 3, 8));

        h.engine.run(&config, &sink).unwrap();
        let trades = trades_of(&sink.into_events());

        let fees = FeeConfig::default();
        for trade in trades {
            let (expected_pnl, expected_fees) = fees.exit_pnl(
                trade.entry_price,
                trade.exit_price,
                trade.quantity,
                TradeType::Intraday,
            );
            assert!((trade.pnl - expected_pnl).abs() < f64::EPSILON);
            assert!((trade.fees - expected_fees).abs() < f64::EPSILON);
        }
    }
}
