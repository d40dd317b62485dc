//! Historical market data port trait.
//!
//! The external provider is rate-limited and rejects requests that span more
//! than the interval's maximum chunk; the candle cache is responsible for
//! honoring [`CandleInterval::max_chunk_days`] before calling through.

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::interval::CandleInterval;
use crate::domain::run::Segment;

pub trait MarketDataPort: Send + Sync {
    /// Fetch candles for `[start_ts, end_ts]` (epoch seconds, inclusive).
    /// Implementations return candles in any order; callers sort and dedupe.
    #[allow(clippy::too_many_arguments)]
    fn fetch_historical(
        &self,
        exchange: &str,
        segment: Segment,
        symbol: &str,
        interval: CandleInterval,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<Candle>, EngineError>;
}
