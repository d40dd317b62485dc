//! Day-granular candle storage port trait.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::interval::CandleInterval;
use crate::domain::run::Segment;

/// Cache key without the date component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandleKey {
    pub symbol: String,
    pub segment: Segment,
    pub interval: CandleInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub size_bytes: u64,
    pub oldest_date: Option<NaiveDate>,
    pub newest_date: Option<NaiveDate>,
}

/// Store of cached candle days. Writes must be serialized per
/// (symbol, segment, interval, date); reads may run concurrently.
pub trait CandleStorePort: Send + Sync {
    /// Load the cached days among `dates`. Absent days are simply missing
    /// from the returned map.
    fn load_days(
        &self,
        key: &CandleKey,
        dates: &[NaiveDate],
    ) -> Result<HashMap<NaiveDate, Vec<Candle>>, EngineError>;

    /// Insert or replace one day's candles (already sorted by time).
    fn store_day(
        &self,
        key: &CandleKey,
        date: NaiveDate,
        candles: &[Candle],
        fetched_at: &str,
    ) -> Result<(), EngineError>;

    fn stats(&self) -> Result<CacheStats, EngineError>;

    /// Purge cached days, optionally for a single symbol. Returns the number
    /// of entries deleted.
    fn clear(&self, symbol: Option<&str>) -> Result<u64, EngineError>;
}
