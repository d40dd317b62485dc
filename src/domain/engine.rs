//! Bar-by-bar simulation engine.
//!
//! Replays cached candles through a strategy, manages the single open
//! position, and streams progress, trades and the terminal result through an
//! [`EventSink`]. All fee arithmetic goes through the live fee model so the
//! simulated P&L matches what the same trades would cost for real.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::cache::CandleCache;
use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::event::{BacktestEvent, EventSink};
use crate::domain::fees::TradeType;
use crate::domain::metrics::Metrics;
use crate::domain::position::{ClosedTrade, EquityPoint, ExitTrigger, OpenPosition};
use crate::domain::run::{RunConfig, RunRecord};
use crate::domain::signal::{CandidateInfo, Verdict};
use crate::domain::strategy::{StrategyParams, StrategyRegistry};
use crate::ports::run_store_port::RunStorePort;

/// Bars at the start of a run that are history-only; no entries are
/// evaluated until this many bars have passed.
const WARMUP_BARS: usize = 30;

/// Histogram label for bars where the strategy itself errored.
const EVAL_ERROR_LABEL: &str = "Strategy evaluation error";

pub struct BacktestEngine {
    cache: Arc<CandleCache>,
    registry: Arc<StrategyRegistry>,
    run_store: Arc<dyn RunStorePort>,
    params: StrategyParams,
}

impl BacktestEngine {
    pub fn new(
        cache: Arc<CandleCache>,
        registry: Arc<StrategyRegistry>,
        run_store: Arc<dyn RunStorePort>,
        params: StrategyParams,
    ) -> Self {
        BacktestEngine {
            cache,
            registry,
            run_store,
            params,
        }
    }

    /// Execute one run, streaming events into `sink`.
    ///
    /// Domain failures (bad dates, unknown strategy, no data) surface as a
    /// terminal `complete` event carrying `error`, then as the returned
    /// error. A closed sink aborts the run before anything is persisted.
    pub fn run(&self, config: &RunConfig, sink: &dyn EventSink) -> Result<Option<i64>, EngineError> {
        if let Err(err) = self.validate(config) {
            self.emit(sink, BacktestEvent::failure(err.to_string()))?;
            return Err(err);
        }

        // Resolve the strategy before touching the data layer.
        let mut strategy = match self.registry.get(&config.algo_id, &self.params) {
            Ok(strategy) => strategy,
            Err(err) => {
                self.emit(sink, BacktestEvent::failure(err.to_string()))?;
                return Err(err);
            }
        };

        let series = match self.cache.get_candles(
            &config.symbol,
            config.segment,
            config.interval,
            config.start_date,
            config.end_date,
            &config.exchange,
        ) {
            Ok(series) => series,
            Err(err) => {
                self.emit(sink, BacktestEvent::failure(err.to_string()))?;
                return Err(err);
            }
        };

        if series.candles.is_empty() {
            let err = EngineError::NoDataInRange {
                symbol: config.symbol.clone(),
                start: config.start_date,
                end: config.end_date,
            };
            self.emit(
                sink,
                BacktestEvent::failure(format!(
                    "{err}. Check the symbol spelling and that the range covers trading days."
                )),
            )?;
            return Err(err);
        }

        let candles = &series.candles;
        let total_bars = candles.len();
        let progress_every = (total_bars / 20).max(1);

        info!(
            algo_id = %config.algo_id,
            symbol = %config.symbol,
            interval = config.interval.label(),
            bars = total_bars,
            "starting run"
        );

        let mut trades: Vec<ClosedTrade> = Vec::new();
        let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(total_bars);
        let mut signal_analysis: BTreeMap<String, u64> = BTreeMap::new();
        let mut position: Option<OpenPosition> = None;
        let mut realized_pnl = 0.0;

        if !series.unavailable.is_empty() {
            warn!(
                symbol = %config.symbol,
                days = series.unavailable.len(),
                "running with gaps, some days could not be fetched"
            );
            *signal_analysis
                .entry(format!(
                    "Data unavailable for {} day(s)",
                    series.unavailable.len()
                ))
                .or_insert(0) += 1;
        }

        for i in 0..total_bars {
            let bar = &candles[i];

            // Exits first. Entries never exit on their own bar.
            let exit = position.as_ref().and_then(|open| {
                if i > open.open_bar_index {
                    exit_check(open, bar, config)
                } else {
                    None
                }
            });
            if let Some((exit_price, trigger)) = exit {
                if let Some(open) = position.take() {
                    let (pnl, fees) = self.params.fees.exit_pnl(
                        open.entry_price,
                        exit_price,
                        open.quantity,
                        TradeType::Intraday,
                    );
                    realized_pnl += pnl;
                    let trade = ClosedTrade {
                        entry_price: open.entry_price,
                        exit_price,
                        quantity: open.quantity,
                        entry_time: open.entry_time,
                        exit_time: bar.time,
                        pnl,
                        fees,
                        exit_trigger: trigger,
                        reason: open.reason,
                    };
                    trades.push(trade.clone());
                    self.emit(sink, BacktestEvent::Trade { trade })?;
                }
            }

            // Entries after warm-up, only when flat.
            if position.is_none() && i >= WARMUP_BARS {
                let equity = config.initial_capital + realized_pnl;
                strategy.set_runtime_params(equity, config.risk_percent);

                let candidate = candidate_info(&config.symbol, bar);
                let open_symbols: Vec<String> = Vec::new();
                if !strategy.should_skip_symbol(&config.symbol, &candidate, &open_symbols) {
                    match strategy.evaluate(&config.symbol, &candles[..=i], bar.close, &candidate)
                    {
                        Ok(Verdict::Entry(signal)) => {
                            position = Some(OpenPosition {
                                entry_price: signal.entry_price,
                                stop_loss: signal.stop_loss,
                                target: signal.target,
                                quantity: signal.quantity,
                                entry_time: bar.time,
                                open_bar_index: i,
                                reason: signal.reason,
                            });
                        }
                        Ok(Verdict::Reject(label)) => {
                            *signal_analysis.entry(label.to_string()).or_insert(0) += 1;
                        }
                        Err(err) => {
                            warn!(
                                symbol = %config.symbol,
                                bar = i,
                                reason = %err.reason,
                                "strategy evaluation failed, bar skipped"
                            );
                            *signal_analysis
                                .entry(EVAL_ERROR_LABEL.to_string())
                                .or_insert(0) += 1;
                        }
                    }
                }
            }

            // Force-close on the final bar so every run ends flat.
            if i == total_bars - 1 {
                if let Some(open) = position.take() {
                    let (pnl, fees) = self.params.fees.exit_pnl(
                        open.entry_price,
                        bar.close,
                        open.quantity,
                        TradeType::Intraday,
                    );
                    realized_pnl += pnl;
                    let trade = ClosedTrade {
                        entry_price: open.entry_price,
                        exit_price: bar.close,
                        quantity: open.quantity,
                        entry_time: open.entry_time,
                        exit_time: bar.time,
                        pnl,
                        fees,
                        exit_trigger: ExitTrigger::Force,
                        reason: open.reason,
                    };
                    trades.push(trade.clone());
                    self.emit(sink, BacktestEvent::Trade { trade })?;
                }
            }

            let unrealized = position
                .as_ref()
                .map(|p| p.unrealized_pnl(bar.close))
                .unwrap_or(0.0);
            equity_curve.push(EquityPoint {
                time: bar.time,
                equity: config.initial_capital + realized_pnl + unrealized,
            });

            let bars_processed = i + 1;
            if bars_processed % progress_every == 0 || bars_processed == total_bars {
                let percent = (bars_processed as f64 / total_bars as f64 * 1000.0).round() / 10.0;
                self.emit(
                    sink,
                    BacktestEvent::Progress {
                        percent,
                        current_date: format_bar_time(bar.time),
                        bars_processed,
                        total_bars,
                    },
                )?;
            }
        }

        let metrics = Metrics::compute(config.initial_capital, &trades, &equity_curve);

        let record = RunRecord {
            id: 0,
            config: config.clone(),
            metrics: metrics.clone(),
            trades: trades.clone(),
            equity_curve: equity_curve.clone(),
            created_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let run_id = self.run_store.save(&record)?;

        info!(
            run_id,
            trades = trades.len(),
            net_pnl = metrics.net_pnl,
            "run complete"
        );

        self.emit(
            sink,
            BacktestEvent::Complete {
                metrics: Some(metrics),
                trades,
                equity_curve,
                signal_analysis,
                run_id: Some(run_id),
                error: None,
            },
        )?;

        Ok(Some(run_id))
    }

    fn validate(&self, config: &RunConfig) -> Result<(), EngineError> {
        if config.start_date > config.end_date {
            return Err(EngineError::InvalidRun {
                reason: format!(
                    "start date {} is after end date {}",
                    config.start_date, config.end_date
                ),
            });
        }
        let today = Utc::now().date_naive();
        if config.end_date > today {
            return Err(EngineError::InvalidRun {
                reason: format!("end date {} is in the future", config.end_date),
            });
        }
        if config.initial_capital <= 0.0 {
            return Err(EngineError::InvalidRun {
                reason: "initial capital must be positive".to_string(),
            });
        }
        if config.risk_percent <= 0.0 || config.risk_percent > 100.0 {
            return Err(EngineError::InvalidRun {
                reason: "risk percent must be in (0, 100]".to_string(),
            });
        }
        Ok(())
    }

    fn emit(&self, sink: &dyn EventSink, event: BacktestEvent) -> Result<(), EngineError> {
        sink.send(event).map_err(|_| EngineError::StreamClosed)
    }
}

/// Exit decision for one bar against an open position. Priority is fixed:
/// stop-loss beats target when a bar spans both, then the duration cap.
fn exit_check(
    open: &OpenPosition,
    bar: &Candle,
    config: &RunConfig,
) -> Option<(f64, ExitTrigger)> {
    if bar.low <= open.stop_loss {
        return Some((open.stop_loss, ExitTrigger::Sl));
    }
    if bar.high >= open.target {
        return Some((open.target, ExitTrigger::Target));
    }
    if let Some(max_minutes) = config.max_trade_duration_minutes {
        if bar.time - open.entry_time >= i64::from(max_minutes) * 60 {
            return Some((bar.close, ExitTrigger::Time));
        }
    }
    None
}

fn candidate_info(symbol: &str, bar: &Candle) -> CandidateInfo {
    CandidateInfo {
        symbol: symbol.to_string(),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
        open_interest: bar.open_interest,
    }
}

fn format_bar_time(time: i64) -> String {
    DateTime::<Utc>::from_timestamp(time, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
