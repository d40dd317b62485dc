//! CSV file market data adapter.
//!
//! Serves historical candles from per-symbol CSV files, one file per
//! (symbol, interval). This is the offline stand-in for a live provider;
//! the cache layer on top behaves identically either way.
//!
//! Expected layout: `<base_dir>/<symbol>_<interval>.csv` with a header of
//! `time,open,high,low,close,volume[,open_interest]`, time in epoch seconds.

use std::path::{Path, PathBuf};

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::domain::interval::CandleInterval;
use crate::domain::run::Segment;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvMarketData {
    base_dir: PathBuf,
}

impl CsvMarketData {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        let dir = config
            .get_string("data", "csv_dir")
            .ok_or_else(|| EngineError::ConfigMissing {
                section: "data".into(),
                key: "csv_dir".into(),
            })?;
        Ok(Self::new(dir))
    }

    fn csv_path(&self, symbol: &str, interval: CandleInterval) -> PathBuf {
        self.base_dir
            .join(format!("{}_{}.csv", symbol, interval.label()))
    }
}

fn read_candles(path: &Path) -> Result<Vec<Candle>, String> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;

    let mut candles = Vec::new();
    for result in reader.deserialize() {
        let candle: Candle =
            result.map_err(|e| format!("CSV parse error in {}: {}", path.display(), e))?;
        candles.push(candle);
    }
    Ok(candles)
}

impl MarketDataPort for CsvMarketData {
    fn fetch_historical(
        &self,
        _exchange: &str,
        _segment: Segment,
        symbol: &str,
        interval: CandleInterval,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<Candle>, EngineError> {
        let path = self.csv_path(symbol, interval);
        // A missing file means the provider simply has no data for the
        // symbol at this interval; that is an empty result, not an error.
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut candles = read_candles(&path).map_err(|reason| EngineError::Fetch {
            symbol: symbol.to_string(),
            start: start_ts.to_string(),
            end: end_ts.to_string(),
            reason,
        })?;
        candles.retain(|c| c.time >= start_ts && c.time <= end_ts);
        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, body: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        write!(file, "{body}").unwrap();
    }

    #[test]
    fn reads_and_filters_by_timestamp_range() {
        let dir = TempDir::new().unwrap();
        write_csv(
            &dir,
            "NSE-RELIANCE_5minute.csv",
            "time,open,high,low,close,volume\n\
             300,100.0,101.0,99.0,100.5,1000\n\
             600,100.5,102.0,100.0,101.5,1200\n\
             900,101.5,103.0,101.0,102.5,900\n",
        );
        let feed = CsvMarketData::new(dir.path());

        let candles = feed
            .fetch_historical(
                "NSE",
                Segment::Cash,
                "NSE-RELIANCE",
                CandleInterval::FiveMinutes,
                300,
                600,
            )
            .unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 300);
        assert_eq!(candles[1].close, 101.5);
    }

    #[test]
    fn optional_open_interest_column() {
        let dir = TempDir::new().unwrap();
        write_csv(
            &dir,
            "NSE-NIFTY_5minute.csv",
            "time,open,high,low,close,volume,open_interest\n\
             300,100.0,101.0,99.0,100.5,1000,550\n",
        );
        let feed = CsvMarketData::new(dir.path());

        let candles = feed
            .fetch_historical(
                "NSE",
                Segment::Fno,
                "NSE-NIFTY",
                CandleInterval::FiveMinutes,
                0,
                1000,
            )
            .unwrap();

        assert_eq!(candles[0].open_interest, 550);
    }

    #[test]
    fn missing_file_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let feed = CsvMarketData::new(dir.path());

        let candles = feed
            .fetch_historical(
                "NSE",
                Segment::Cash,
                "NSE-NOSUCH",
                CandleInterval::FiveMinutes,
                0,
                1000,
            )
            .unwrap();
        assert!(candles.is_empty());
    }

    #[test]
    fn malformed_row_is_a_fetch_error() {
        let dir = TempDir::new().unwrap();
        write_csv(
            &dir,
            "NSE-BAD_5minute.csv",
            "time,open,high,low,close,volume\n\
             300,not_a_price,101.0,99.0,100.5,1000\n",
        );
        let feed = CsvMarketData::new(dir.path());

        let err = feed
            .fetch_historical(
                "NSE",
                Segment::Cash,
                "NSE-BAD",
                CandleInterval::FiveMinutes,
                0,
                1000,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Fetch { .. }));
    }

    #[test]
    fn from_config_requires_csv_dir() {
        struct EmptyConfig;
        impl ConfigPort for EmptyConfig {
            fn get_string(&self, _: &str, _: &str) -> Option<String> {
                None
            }
            fn get_int(&self, _: &str, _: &str, default: i64) -> i64 {
                default
            }
            fn get_double(&self, _: &str, _: &str, default: f64) -> f64 {
                default
            }
            fn get_bool(&self, _: &str, _: &str, default: bool) -> bool {
                default
            }
        }

        assert!(matches!(
            CsvMarketData::from_config(&EmptyConfig),
            Err(EngineError::ConfigMissing { .. })
        ));
    }
}
