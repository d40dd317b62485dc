//! Concrete implementations of the port traits.

pub mod csv_market_data;
pub mod file_config_adapter;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;

#[cfg(feature = "web")]
pub mod web;

pub use csv_market_data::CsvMarketData;
pub use file_config_adapter::FileConfigAdapter;

#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteStore;
