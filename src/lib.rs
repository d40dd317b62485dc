//! tickreplay — historical strategy simulation engine.
//!
//! Replays cached OHLCV candles bar by bar through a trading strategy,
//! simulates the position lifecycle under the live fee model, and streams
//! progress/trade/complete events to the caller.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
