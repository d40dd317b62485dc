//! Core domain types and logic.

pub mod candle;
pub mod interval;
pub mod market;
pub mod fees;
pub mod indicator;
pub mod signal;
pub mod position;
pub mod run;
pub mod event;
pub mod strategy;
pub mod cache;
pub mod metrics;
pub mod engine;
pub mod error;
