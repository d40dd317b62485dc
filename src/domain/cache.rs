//! Day-granular candle cache.
//!
//! Resolves a requested date range against the local store, fetches only the
//! missing days from the market data port in interval-limited chunks, and
//! returns one time-sorted, deduplicated candle sequence. Storage and fetch
//! live behind ports so the cache logic itself stays synchronous and pure.

use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::interval::CandleInterval;
use crate::domain::market::MarketHours;
use crate::domain::run::Segment;
use crate::ports::candle_store_port::{CacheStats, CandleKey, CandleStorePort};
use crate::ports::market_data_port::MarketDataPort;

/// Result of a range request. Days that could not be fetched after retries
/// are listed in `unavailable`; callers decide whether the gap is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    pub candles: Vec<Candle>,
    pub unavailable: Vec<NaiveDate>,
}

pub struct CandleCache {
    store: Arc<dyn CandleStorePort>,
    feed: Arc<dyn MarketDataPort>,
    hours: MarketHours,
    max_retries: u32,
    retry_backoff: Duration,
}

impl CandleCache {
    pub fn new(store: Arc<dyn CandleStorePort>, feed: Arc<dyn MarketDataPort>) -> Self {
        CandleCache {
            store,
            feed,
            hours: MarketHours::default(),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_market_hours(mut self, hours: MarketHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Candles for `[start_date, end_date]`, cached days plus freshly
    /// fetched ones, ascending by time and unique per timestamp.
    pub fn get_candles(
        &self,
        symbol: &str,
        segment: Segment,
        interval: CandleInterval,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exchange: &str,
    ) -> Result<CandleSeries, EngineError> {
        if start_date > end_date {
            return Ok(CandleSeries {
                candles: Vec::new(),
                unavailable: Vec::new(),
            });
        }

        let key = CandleKey {
            symbol: symbol.to_string(),
            segment,
            interval,
        };

        let all_dates = calendar_days(start_date, end_date);
        let mut by_date = self.store.load_days(&key, &all_dates)?;

        let missing: Vec<NaiveDate> = all_dates
            .iter()
            .copied()
            .filter(|d| !by_date.contains_key(d))
            .collect();

        let mut unavailable = Vec::new();
        if !missing.is_empty() {
            debug!(
                symbol,
                interval = interval.label(),
                missing = missing.len(),
                "cache miss, fetching from provider"
            );
            self.fetch_missing(
                &key,
                exchange,
                &missing,
                &mut by_date,
                &mut unavailable,
            )?;
        }

        let mut candles: Vec<Candle> = Vec::new();
        for date in &all_dates {
            if let Some(day) = by_date.get(date) {
                candles.extend_from_slice(day);
            }
        }
        candles.sort_by_key(|c| c.time);
        candles.dedup_by_key(|c| c.time);

        Ok(CandleSeries {
            candles,
            unavailable,
        })
    }

    pub fn stats(&self) -> Result<CacheStats, EngineError> {
        self.store.stats()
    }

    pub fn clear(&self, symbol: Option<&str>) -> Result<u64, EngineError> {
        self.store.clear(symbol)
    }

    /// Fetch the missing days in chunks. A chunk covers consecutive calendar
    /// days only, so a fetch window never spans days that are already cached;
    /// each contiguous run is further capped at the interval's maximum span.
    /// Every day of a successfully fetched chunk is written back, including
    /// empty ones (non-trading days), so a repeated request performs no
    /// further fetches.
    fn fetch_missing(
        &self,
        key: &CandleKey,
        exchange: &str,
        missing: &[NaiveDate],
        by_date: &mut HashMap<NaiveDate, Vec<Candle>>,
        unavailable: &mut Vec<NaiveDate>,
    ) -> Result<(), EngineError> {
        let max_days = key.interval.max_chunk_days();

        let mut i = 0;
        while i < missing.len() {
            let chunk_start = missing[i];
            let mut j = i;
            while j + 1 < missing.len() {
                let next = missing[j + 1];
                let adjacent = missing[j].checked_add_days(Days::new(1)) == Some(next);
                let within_cap = (next - chunk_start).num_days() < max_days;
                if adjacent && within_cap {
                    j += 1;
                } else {
                    break;
                }
            }
            let chunk_end = missing[j];
            let chunk_days = &missing[i..=j];

            match self.fetch_chunk(key, exchange, chunk_start, chunk_end) {
                Ok(candles) => {
                    info!(
                        symbol = %key.symbol,
                        interval = key.interval.label(),
                        %chunk_start,
                        %chunk_end,
                        candles = candles.len(),
                        "fetched chunk"
                    );
                    let mut fetched: HashMap<NaiveDate, Vec<Candle>> = HashMap::new();
                    for candle in candles {
                        if let Some(date) = candle.date() {
                            fetched.entry(date).or_default().push(candle);
                        }
                    }
                    let fetched_at = Utc::now().to_rfc3339();
                    for date in chunk_days {
                        let mut day = fetched.remove(date).unwrap_or_default();
                        day.sort_by_key(|c| c.time);
                        day.dedup_by_key(|c| c.time);
                        self.store.store_day(key, *date, &day, &fetched_at)?;
                        by_date.insert(*date, day);
                    }
                }
                Err(err) => {
                    warn!(
                        symbol = %key.symbol,
                        %chunk_start,
                        %chunk_end,
                        error = %err,
                        "chunk fetch failed, marking days unavailable"
                    );
                    unavailable.extend(chunk_days.iter().copied());
                }
            }

            i = j + 1;
        }

        Ok(())
    }

    fn fetch_chunk(
        &self,
        key: &CandleKey,
        exchange: &str,
        chunk_start: NaiveDate,
        chunk_end: NaiveDate,
    ) -> Result<Vec<Candle>, EngineError> {
        let start_ts = chunk_start.and_time(self.hours.session_open).and_utc().timestamp();
        let end_ts = chunk_end.and_time(self.hours.session_close).and_utc().timestamp();

        let mut attempt = 0;
        loop {
            match self.feed.fetch_historical(
                exchange,
                key.segment,
                &key.symbol,
                key.interval,
                start_ts,
                end_ts,
            ) {
                Ok(candles) => return Ok(candles),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        symbol = %key.symbol,
                        attempt,
                        error = %err,
                        "fetch failed, retrying"
                    );
                    std::thread::sleep(self.retry_backoff * attempt);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn calendar_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = start;
    while d <= end {
        days.push(d);
        match d.checked_add_days(Days::new(1)) {
            Some(next) => d = next,
            None => break,
        }
    }
    days
}
