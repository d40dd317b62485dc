//! Trading session boundaries.
//!
//! Candle timestamps are stored in UTC, so session times are expressed in
//! UTC as well. The NSE cash session is 09:15-15:30 IST, i.e. 03:45-10:00 UTC.

use chrono::NaiveTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    pub session_open: NaiveTime,
    pub session_close: NaiveTime,
}

impl MarketHours {
    /// NSE/BSE cash market hours in UTC.
    pub fn nse() -> Self {
        MarketHours {
            session_open: NaiveTime::from_hms_opt(3, 45, 0).expect("valid time"),
            session_close: NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
        }
    }
}

impl Default for MarketHours {
    fn default() -> Self {
        MarketHours::nse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nse_session_in_utc() {
        let hours = MarketHours::nse();
        assert_eq!(hours.session_open, NaiveTime::from_hms_opt(3, 45, 0).unwrap());
        assert_eq!(hours.session_close, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }
}
