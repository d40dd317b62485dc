//! SQLite persistence adapter.
//!
//! One database file holds both the day-granular candle cache and the run
//! history. Candle days and run result blobs are stored as JSON columns;
//! everything queried on (symbol, dates, algo_id) is a real column with an
//! index.

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::run::{RunRecord, RunSummary};
use crate::ports::candle_store_port::{CacheStats, CandleKey, CandleStorePort};
use crate::ports::config_port::ConfigPort;
use crate::ports::run_store_port::RunStorePort;

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| EngineError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| EngineError::Database {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, EngineError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| EngineError::Database {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), EngineError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS candle_cache (
                symbol TEXT NOT NULL,
                segment TEXT NOT NULL,
                interval TEXT NOT NULL,
                date TEXT NOT NULL,
                candles_json TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (symbol, segment, interval, date)
            );
            CREATE INDEX IF NOT EXISTS idx_candle_cache_date ON candle_cache(date);

            CREATE TABLE IF NOT EXISTS backtest_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                algo_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                exchange TEXT NOT NULL,
                segment TEXT NOT NULL,
                interval TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                config_json TEXT NOT NULL,
                metrics_json TEXT NOT NULL,
                trades_json TEXT NOT NULL,
                equity_curve_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_runs_algo ON backtest_runs(algo_id);
            CREATE INDEX IF NOT EXISTS idx_runs_created ON backtest_runs(created_at);",
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, EngineError> {
        self.pool.get().map_err(|e: r2d2::Error| EngineError::Database {
            reason: e.to_string(),
        })
    }
}

fn query_err(e: rusqlite::Error) -> EngineError {
    EngineError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn json_err(e: serde_json::Error) -> EngineError {
    EngineError::DatabaseQuery {
        reason: format!("JSON column: {e}"),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| EngineError::Database {
        reason: format!("stored date {s:?}: {e}"),
    })
}

impl CandleStorePort for SqliteStore {
    fn load_days(
        &self,
        key: &CandleKey,
        dates: &[NaiveDate],
    ) -> Result<HashMap<NaiveDate, Vec<Candle>>, EngineError> {
        let mut out = HashMap::new();
        let (Some(min), Some(max)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(out);
        };

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, candles_json FROM candle_cache
                 WHERE symbol = ?1 AND segment = ?2 AND interval = ?3
                   AND date >= ?4 AND date <= ?5",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    key.symbol,
                    key.segment.label(),
                    key.interval.label(),
                    min.format("%Y-%m-%d").to_string(),
                    max.format("%Y-%m-%d").to_string(),
                ],
                |row| {
                    let date: String = row.get(0)?;
                    let json: String = row.get(1)?;
                    Ok((date, json))
                },
            )
            .map_err(query_err)?;

        for row in rows {
            let (date_str, json) = row.map_err(query_err)?;
            let date = parse_date(&date_str)?;
            if dates.contains(&date) {
                let candles: Vec<Candle> = serde_json::from_str(&json).map_err(json_err)?;
                out.insert(date, candles);
            }
        }
        Ok(out)
    }

    fn store_day(
        &self,
        key: &CandleKey,
        date: NaiveDate,
        candles: &[Candle],
        fetched_at: &str,
    ) -> Result<(), EngineError> {
        let json = serde_json::to_string(candles).map_err(json_err)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO candle_cache
                 (symbol, segment, interval, date, candles_json, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.symbol,
                key.segment.label(),
                key.interval.label(),
                date.format("%Y-%m-%d").to_string(),
                json,
                fetched_at,
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats, EngineError> {
        let conn = self.conn()?;
        let (total, size, min_str, max_str): (i64, Option<i64>, Option<String>, Option<String>) =
            conn.query_row(
                "SELECT COUNT(*), SUM(LENGTH(candles_json)), MIN(date), MAX(date)
                 FROM candle_cache",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(query_err)?;

        let oldest_date = min_str.as_deref().map(parse_date).transpose()?;
        let newest_date = max_str.as_deref().map(parse_date).transpose()?;

        Ok(CacheStats {
            total_entries: total as u64,
            size_bytes: size.unwrap_or(0) as u64,
            oldest_date,
            newest_date,
        })
    }

    fn clear(&self, symbol: Option<&str>) -> Result<u64, EngineError> {
        let conn = self.conn()?;
        let deleted = match symbol {
            Some(symbol) => conn
                .execute("DELETE FROM candle_cache WHERE symbol = ?1", params![symbol])
                .map_err(query_err)?,
            None => conn
                .execute("DELETE FROM candle_cache", [])
                .map_err(query_err)?,
        };
        Ok(deleted as u64)
    }
}

impl RunStorePort for SqliteStore {
    fn save(&self, record: &RunRecord) -> Result<i64, EngineError> {
        let config_json = serde_json::to_string(&record.config).map_err(json_err)?;
        let metrics_json = serde_json::to_string(&record.metrics).map_err(json_err)?;
        let trades_json = serde_json::to_string(&record.trades).map_err(json_err)?;
        let equity_json = serde_json::to_string(&record.equity_curve).map_err(json_err)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO backtest_runs
                 (algo_id, symbol, exchange, segment, interval, start_date, end_date,
                  config_json, metrics_json, trades_json, equity_curve_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.config.algo_id,
                record.config.symbol,
                record.config.exchange,
                record.config.segment.label(),
                record.config.interval.label(),
                record.config.start_date.format("%Y-%m-%d").to_string(),
                record.config.end_date.format("%Y-%m-%d").to_string(),
                config_json,
                metrics_json,
                trades_json,
                equity_json,
                record.created_at,
            ],
        )
        .map_err(query_err)?;

        Ok(conn.last_insert_rowid())
    }

    fn list(&self, limit: usize) -> Result<Vec<RunSummary>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, algo_id, symbol, exchange, segment, interval,
                        start_date, end_date, metrics_json, created_at
                 FROM backtest_runs
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(query_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, algo_id, symbol, exchange, segment, interval, start, end, metrics, created) =
                row.map_err(query_err)?;
            summaries.push(RunSummary {
                id,
                algo_id,
                symbol,
                exchange,
                segment,
                interval,
                start_date: parse_date(&start)?,
                end_date: parse_date(&end)?,
                metrics: serde_json::from_str(&metrics).map_err(json_err)?,
                created_at: created,
            });
        }
        Ok(summaries)
    }

    fn get(&self, run_id: i64) -> Result<Option<RunRecord>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT config_json, metrics_json, trades_json, equity_curve_json, created_at
                 FROM backtest_runs WHERE id = ?1",
            )
            .map_err(query_err)?;

        let mut rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(query_err)?;

        match rows.next() {
            Some(row) => {
                let (config, metrics, trades, equity, created_at) = row.map_err(query_err)?;
                Ok(Some(RunRecord {
                    id: run_id,
                    config: serde_json::from_str(&config).map_err(json_err)?,
                    metrics: serde_json::from_str(&metrics).map_err(json_err)?,
                    trades: serde_json::from_str(&trades).map_err(json_err)?,
                    equity_curve: serde_json::from_str(&equity).map_err(json_err)?,
                    created_at,
                }))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, run_id: i64) -> Result<bool, EngineError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM backtest_runs WHERE id = ?1", params![run_id])
            .map_err(query_err)?;
        Ok(deleted > 0)
    }
}
