//! Domain error types.

use chrono::NaiveDate;

/// Strategy evaluation failure for a single bar. Caught by the engine,
/// counted in the rejection histogram, never aborts a run.
#[derive(Debug, Clone, thiserror::Error)]
#[error("strategy evaluation failed: {reason}")]
pub struct StrategyError {
    pub reason: String,
}

impl StrategyError {
    pub fn new(reason: impl Into<String>) -> Self {
        StrategyError {
            reason: reason.into(),
        }
    }
}

/// Top-level error type for tickreplay.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("strategy not found: {algo_id}")]
    StrategyNotFound { algo_id: String },

    #[error("no candle data for {symbol} between {start} and {end}")]
    NoDataInRange {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("historical fetch failed for {symbol} ({start} to {end}): {reason}")]
    Fetch {
        symbol: String,
        start: String,
        end: String,
        reason: String,
    },

    #[error("invalid run request: {reason}")]
    InvalidRun { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("event stream closed by consumer")]
    StreamClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Database { .. } | EngineError::DatabaseQuery { .. } => 3,
            EngineError::StrategyNotFound { .. } | EngineError::InvalidRun { .. } => 4,
            EngineError::NoDataInRange { .. } | EngineError::Fetch { .. } => 5,
            EngineError::StreamClosed => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = EngineError::StrategyNotFound {
            algo_id: "nope".into(),
        };
        assert_eq!(err.to_string(), "strategy not found: nope");

        let err = EngineError::NoDataInRange {
            symbol: "NSE-RELIANCE".into(),
            start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        };
        assert!(err.to_string().contains("NSE-RELIANCE"));
    }

    #[test]
    fn exit_codes_are_stable() {
        let err = EngineError::StrategyNotFound {
            algo_id: "x".into(),
        };
        let code: std::process::ExitCode = (&err).into();
        // ExitCode has no accessor; construction not panicking is the check.
        let _ = code;
    }
}
