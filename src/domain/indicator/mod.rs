//! Technical indicators.
//!
//! All functions are pure and deterministic over the candle slice they are
//! given. The simulation engine and the live evaluation path call these same
//! functions, so their results must stay bit-identical between the two.

pub mod ema;
pub mod rsi;
pub mod atr;
pub mod vwap;
pub mod volume;

pub use atr::atr;
pub use ema::ema;
pub use rsi::{rsi, rsi_current};
pub use volume::{volume_ratio, VolumeStats};
pub use vwap::session_vwap;
