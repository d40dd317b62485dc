//! Strategy capability contract and registry.
//!
//! Strategies are pure decision-makers: they read the bars they are handed
//! (never anything later), and either produce an entry [`Signal`] or name the
//! filter that rejected the bar. The registry maps an identifier to a
//! constructor so the engine stays strategy-agnostic; it is an explicit
//! object constructed at startup and injected, never global state.

pub mod momentum;
pub mod mean_reversion;

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::candle::Candle;
use crate::domain::error::{EngineError, StrategyError};
use crate::domain::fees::FeeConfig;
use crate::domain::market::MarketHours;
use crate::domain::signal::{CandidateInfo, Verdict};

pub use mean_reversion::MeanReversion;
pub use momentum::MomentumScalping;

/// Capability set every strategy implements.
pub trait Strategy: Send {
    fn algo_id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Called once per evaluation cycle so position sizing reflects current
    /// capital (running equity in a backtest, account equity live).
    fn set_runtime_params(&mut self, effective_capital: f64, risk_percent: f64);

    /// Evaluate one bar. `candles` is the history up to and including the
    /// current bar; implementations must not assume anything beyond it.
    fn evaluate(
        &self,
        symbol: &str,
        candles: &[Candle],
        ltp: f64,
        candidate: &CandidateInfo,
    ) -> Result<Verdict, StrategyError>;

    /// Guard against duplicate entries: `open_symbols` lists symbols that
    /// already hold an open position.
    fn should_skip_symbol(
        &self,
        symbol: &str,
        _candidate: &CandidateInfo,
        open_symbols: &[String],
    ) -> bool {
        open_symbols.iter().any(|s| s == symbol)
    }
}

/// Tunable parameters shared with built-in strategies. One instance per run;
/// no state is shared between strategy instances.
#[derive(Debug, Clone, Default)]
pub struct StrategyParams {
    pub fees: FeeConfig,
    pub hours: MarketHours,
    pub momentum: momentum::MomentumParams,
    pub mean_reversion: mean_reversion::MeanReversionParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyInfo {
    pub algo_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

type StrategyCtor = fn(&StrategyParams) -> Box<dyn Strategy>;

pub struct StrategyRegistry {
    factories: HashMap<&'static str, StrategyCtor>,
    /// Registration order, for stable listings.
    order: Vec<&'static str>,
}

impl StrategyRegistry {
    /// Empty registry; useful for tests with fake strategies.
    pub fn new() -> Self {
        StrategyRegistry {
            factories: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry with the built-in strategies registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(momentum::ALGO_ID, |params| {
            Box::new(MomentumScalping::new(params))
        });
        registry.register(mean_reversion::ALGO_ID, |params| {
            Box::new(MeanReversion::new(params))
        });
        registry
    }

    pub fn register(&mut self, algo_id: &'static str, ctor: StrategyCtor) {
        if self.factories.insert(algo_id, ctor).is_none() {
            self.order.push(algo_id);
        }
    }

    /// A configured instance, or `StrategyNotFound`.
    pub fn get(
        &self,
        algo_id: &str,
        params: &StrategyParams,
    ) -> Result<Box<dyn Strategy>, EngineError> {
        match self.factories.get(algo_id) {
            Some(ctor) => Ok(ctor(params)),
            None => Err(EngineError::StrategyNotFound {
                algo_id: algo_id.to_string(),
            }),
        }
    }

    pub fn list(&self) -> Vec<StrategyInfo> {
        let params = StrategyParams::default();
        self.order
            .iter()
            .filter_map(|id| self.factories.get(id))
            .map(|ctor| {
                let strategy = ctor(&params);
                StrategyInfo {
                    algo_id: strategy.algo_id(),
                    name: strategy.name(),
                    description: strategy.description(),
                }
            })
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
