//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::EngineError;
use crate::domain::fees::FeeConfig;
use crate::domain::interval::CandleInterval;
use crate::domain::market::MarketHours;
use crate::domain::run::{RunConfig, Segment};
use crate::domain::strategy::{StrategyParams, StrategyRegistry};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "tickreplay", about = "Historical strategy simulation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy identifier (see `strategies`)
        #[arg(short, long)]
        strategy: String,
        #[arg(long)]
        symbol: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        end: NaiveDate,
        /// Candle interval, e.g. 5m or 5minute
        #[arg(long, default_value = "5minute")]
        interval: CandleInterval,
        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,
        /// Percent of capital risked per trade
        #[arg(long, default_value_t = 1.0)]
        risk: f64,
        #[arg(long)]
        exchange: Option<String>,
        /// CASH or FNO
        #[arg(long)]
        segment: Option<String>,
        /// Close positions open longer than this many minutes
        #[arg(long)]
        max_duration: Option<u32>,
        /// Print raw events as newline-delimited JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List available strategies
    Strategies,
    /// List past runs, newest first
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a stored run in full
    Show {
        #[arg(short, long)]
        config: PathBuf,
        id: i64,
    },
    /// Delete a stored run
    Delete {
        #[arg(short, long)]
        config: PathBuf,
        id: i64,
    },
    /// Candle cache statistics
    CacheStats {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Purge the candle cache, optionally for one symbol
    CacheClear {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Start the HTTP API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            strategy,
            symbol,
            start,
            end,
            interval,
            capital,
            risk,
            exchange,
            segment,
            max_duration,
            json,
        } => run_backtest(
            &config,
            RunArgs {
                strategy,
                symbol,
                start,
                end,
                interval,
                capital,
                risk,
                exchange,
                segment,
                max_duration,
                json,
            },
        ),
        Command::Strategies => run_strategies(),
        Command::History { config, limit } => run_history(&config, limit),
        Command::Show { config, id } => run_show(&config, id),
        Command::Delete { config, id } => run_delete(&config, id),
        Command::CacheStats { config } => run_cache_stats(&config),
        Command::CacheClear { config, symbol } => run_cache_clear(&config, symbol.as_deref()),
        Command::Serve { config } => run_serve(&config),
    }
}

struct RunArgs {
    strategy: String,
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
    interval: CandleInterval,
    capital: f64,
    risk: f64,
    exchange: Option<String>,
    segment: Option<String>,
    max_duration: Option<u32>,
    json: bool,
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = EngineError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Strategy parameters from the `[fees]` and `[market]` config sections;
/// anything not set falls back to the live defaults.
pub fn build_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, EngineError> {
    let defaults = FeeConfig::default();
    let fees = FeeConfig {
        brokerage_per_order: config.get_double(
            "fees",
            "brokerage_per_order",
            defaults.brokerage_per_order,
        ),
        brokerage_turnover_cap: config.get_double(
            "fees",
            "brokerage_turnover_cap",
            defaults.brokerage_turnover_cap,
        ),
        stt_intraday_sell_rate: config.get_double(
            "fees",
            "stt_intraday_sell_rate",
            defaults.stt_intraday_sell_rate,
        ),
        stt_delivery_rate: config.get_double(
            "fees",
            "stt_delivery_rate",
            defaults.stt_delivery_rate,
        ),
        exchange_txn_rate: config.get_double(
            "fees",
            "exchange_txn_rate",
            defaults.exchange_txn_rate,
        ),
        sebi_rate: config.get_double("fees", "sebi_rate", defaults.sebi_rate),
        stamp_duty_rate: config.get_double("fees", "stamp_duty_rate", defaults.stamp_duty_rate),
        gst_rate: config.get_double("fees", "gst_rate", defaults.gst_rate),
    };

    let nse = MarketHours::nse();
    let hours = MarketHours {
        session_open: parse_session_time(config, "session_open", nse.session_open)?,
        session_close: parse_session_time(config, "session_close", nse.session_close)?,
    };

    Ok(StrategyParams {
        fees,
        hours,
        ..StrategyParams::default()
    })
}

fn parse_session_time(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, EngineError> {
    match config.get_string("market", key) {
        Some(raw) => {
            NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|_| EngineError::ConfigInvalid {
                section: "market".into(),
                key: key.into(),
                reason: "expected HH:MM (UTC)".into(),
            })
        }
        None => Ok(default),
    }
}

fn parse_segment(raw: Option<&str>) -> Result<Segment, EngineError> {
    match raw {
        None => Ok(Segment::Cash),
        Some(s) => match s.to_uppercase().as_str() {
            "CASH" => Ok(Segment::Cash),
            "FNO" => Ok(Segment::Fno),
            other => Err(EngineError::InvalidRun {
                reason: format!("unknown segment {other:?}, expected CASH or FNO"),
            }),
        },
    }
}

#[cfg(feature = "sqlite")]
struct Stack {
    engine: crate::domain::engine::BacktestEngine,
    registry: Arc<StrategyRegistry>,
    cache: Arc<crate::domain::cache::CandleCache>,
    store: Arc<crate::adapters::sqlite_store::SqliteStore>,
}

#[cfg(feature = "sqlite")]
fn build_stack(config: &FileConfigAdapter) -> Result<Stack, EngineError> {
    use crate::adapters::csv_market_data::CsvMarketData;
    use crate::adapters::sqlite_store::SqliteStore;
    use crate::domain::cache::CandleCache;
    use crate::domain::engine::BacktestEngine;

    let params = build_strategy_params(config)?;
    let store = Arc::new(SqliteStore::from_config(config)?);
    let feed = Arc::new(CsvMarketData::from_config(config)?);
    let cache = Arc::new(
        CandleCache::new(store.clone(), feed).with_market_hours(params.hours),
    );
    let registry = Arc::new(StrategyRegistry::with_builtins());
    let engine = BacktestEngine::new(
        cache.clone(),
        registry.clone(),
        store.clone(),
        params,
    );
    Ok(Stack {
        engine,
        registry,
        cache,
        store,
    })
}

fn run_backtest(config_path: &PathBuf, args: RunArgs) -> ExitCode {
    #[cfg(feature = "sqlite")]
    {
        use crate::domain::event::ChannelSink;
        use std::sync::mpsc;

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let segment = match parse_segment(args.segment.as_deref()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let stack = match build_stack(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let run_config = RunConfig {
            algo_id: args.strategy,
            symbol: args.symbol,
            exchange: args.exchange.unwrap_or_else(|| "NSE".to_string()),
            segment,
            start_date: args.start,
            end_date: args.end,
            interval: args.interval,
            initial_capital: args.capital,
            risk_percent: args.risk,
            max_positions: 1,
            max_trade_duration_minutes: args.max_duration,
        };

        let (tx, rx) = mpsc::sync_channel(64);
        let result = std::thread::scope(|scope| {
            let engine = &stack.engine;
            let run_config = &run_config;
            let handle = scope.spawn(move || {
                let sink = ChannelSink::new(tx);
                engine.run(run_config, &sink)
            });

            for event in rx {
                print_event(&event, args.json);
            }

            match handle.join() {
                Ok(result) => result,
                Err(_) => Err(EngineError::InvalidRun {
                    reason: "engine thread panicked".into(),
                }),
            }
        });

        match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, args);
        eprintln!("error: sqlite feature is required for run");
        ExitCode::from(1)
    }
}

#[cfg(feature = "sqlite")]
fn print_event(event: &crate::domain::event::BacktestEvent, json: bool) {
    use crate::domain::event::BacktestEvent;

    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
        return;
    }

    match event {
        BacktestEvent::Progress {
            percent,
            current_date,
            ..
        } => eprintln!("  {percent:>5.1}%  {current_date}"),
        BacktestEvent::Trade { trade } => eprintln!(
            "  trade: {:?} entry {:.2} exit {:.2} qty {} pnl {:.2}",
            trade.exit_trigger, trade.entry_price, trade.exit_price, trade.quantity, trade.pnl
        ),
        BacktestEvent::Complete {
            metrics,
            trades,
            signal_analysis,
            run_id,
            error,
            ..
        } => {
            if let Some(error) = error {
                eprintln!("run failed: {error}");
                return;
            }
            if let Some(m) = metrics {
                println!("trades:          {}", trades.len());
                println!("win rate:        {:.2}%", m.win_rate_pct);
                println!("net pnl:         {:.2}", m.net_pnl);
                println!("total fees:      {:.2}", m.total_fees);
                println!("final equity:    {:.2}", m.final_equity);
                println!("total return:    {:.2}%", m.total_return_pct);
                println!("max drawdown:    {:.2} ({:.2}%)", m.max_drawdown, m.max_drawdown_pct);
                println!("sharpe:          {:.4}", m.sharpe_ratio);
                match m.profit_factor {
                    Some(pf) => println!("profit factor:   {pf:.4}"),
                    None => println!("profit factor:   inf"),
                }
            }
            if !signal_analysis.is_empty() {
                println!("rejections:");
                for (label, count) in signal_analysis {
                    println!("  {count:>6}  {label}");
                }
            }
            if let Some(id) = run_id {
                println!("saved as run {id}");
            }
        }
    }
}

fn run_strategies() -> ExitCode {
    let registry = StrategyRegistry::with_builtins();
    for info in registry.list() {
        println!("{:<16} {:<20} {}", info.algo_id, info.name, info.description);
    }
    ExitCode::SUCCESS
}

fn run_history(config_path: &PathBuf, limit: usize) -> ExitCode {
    #[cfg(feature = "sqlite")]
    {
        use crate::ports::run_store_port::RunStorePort;

        with_stack(config_path, |stack| {
            let summaries = stack.store.list(limit)?;
            if summaries.is_empty() {
                println!("no runs stored");
                return Ok(());
            }
            for s in summaries {
                println!(
                    "{:>4}  {:<16} {:<16} {} to {}  pnl {:>10.2}  win {:>6.2}%  {}",
                    s.id,
                    s.algo_id,
                    s.symbol,
                    s.start_date,
                    s.end_date,
                    s.metrics.net_pnl,
                    s.metrics.win_rate_pct,
                    s.created_at
                );
            }
            Ok(())
        })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, limit);
        sqlite_required()
    }
}

fn run_show(config_path: &PathBuf, id: i64) -> ExitCode {
    #[cfg(feature = "sqlite")]
    {
        use crate::ports::run_store_port::RunStorePort;

        with_stack(config_path, |stack| {
            match stack.store.get(id)? {
                Some(record) => {
                    let json = serde_json::to_string_pretty(&record).map_err(|e| {
                        EngineError::DatabaseQuery {
                            reason: e.to_string(),
                        }
                    })?;
                    println!("{json}");
                    Ok(())
                }
                None => Err(EngineError::InvalidRun {
                    reason: format!("run {id} not found"),
                }),
            }
        })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, id);
        sqlite_required()
    }
}

fn run_delete(config_path: &PathBuf, id: i64) -> ExitCode {
    #[cfg(feature = "sqlite")]
    {
        use crate::ports::run_store_port::RunStorePort;

        with_stack(config_path, |stack| {
            if stack.store.delete(id)? {
                println!("deleted run {id}");
                Ok(())
            } else {
                Err(EngineError::InvalidRun {
                    reason: format!("run {id} not found"),
                })
            }
        })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, id);
        sqlite_required()
    }
}

fn run_cache_stats(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "sqlite")]
    {
        with_stack(config_path, |stack| {
            let stats = stack.cache.stats()?;
            println!("entries:     {}", stats.total_entries);
            println!("size:        {} bytes", stats.size_bytes);
            match (stats.oldest_date, stats.newest_date) {
                (Some(oldest), Some(newest)) => println!("range:       {oldest} to {newest}"),
                _ => println!("range:       empty"),
            }
            Ok(())
        })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config_path;
        sqlite_required()
    }
}

fn run_cache_clear(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    #[cfg(feature = "sqlite")]
    {
        with_stack(config_path, |stack| {
            let cleared = stack.cache.clear(symbol)?;
            match symbol {
                Some(symbol) => println!("cleared {cleared} entries for {symbol}"),
                None => println!("cleared {cleared} entries"),
            }
            Ok(())
        })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, symbol);
        sqlite_required()
    }
}

#[cfg(feature = "sqlite")]
fn with_stack(
    config_path: &PathBuf,
    f: impl FnOnce(&Stack) -> Result<(), EngineError>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let stack = match build_stack(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    match f(&stack) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_required() -> ExitCode {
    eprintln!("error: sqlite feature is required for this command");
    ExitCode::from(1)
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::net::SocketAddr;

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let stack = match build_stack(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let addr: SocketAddr = match config
            .get_string("web", "listen")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
        {
            Ok(addr) => addr,
            Err(e) => {
                let err = EngineError::ConfigInvalid {
                    section: "web".into(),
                    key: "listen".into(),
                    reason: e.to_string(),
                };
                eprintln!("error: {err}");
                return (&err).into();
            }
        };

        eprintln!("listening on {addr}");

        let state = AppState {
            engine: Arc::new(stack.engine),
            registry: stack.registry,
            run_store: stack.store.clone(),
            cache: stack.cache,
        };
        let router = build_router(state);

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
        };

        let served: Result<(), std::io::Error> = runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await
        });

        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(1)
            }
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
