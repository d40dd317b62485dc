//! Run history persistence port trait.
//!
//! Runs are immutable once saved; there is no update operation.

use crate::domain::error::EngineError;
use crate::domain::run::{RunRecord, RunSummary};

pub trait RunStorePort: Send + Sync {
    /// Persist a completed run and return its store-assigned id.
    fn save(&self, record: &RunRecord) -> Result<i64, EngineError>;

    /// Newest first.
    fn list(&self, limit: usize) -> Result<Vec<RunSummary>, EngineError>;

    fn get(&self, run_id: i64) -> Result<Option<RunRecord>, EngineError>;

    /// Returns true when a row was deleted.
    fn delete(&self, run_id: i64) -> Result<bool, EngineError>;
}
