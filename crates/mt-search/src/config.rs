//! Search configuration and execution-mode probing.

use mt_grid::BetaTable;
use mt_types::{config_error, MtResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable carrying the number of participating workers.
pub const WORKERS_ENV: &str = "MT_NUM_WORKERS";

/// Options for a single grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-category weights, in category order. `None` = equal weights.
    pub weights: Option<Vec<f64>>,

    /// Log progress while searching. Forced off on non-root workers.
    pub verbose: bool,

    /// Progress is logged every this many percent of evaluations (1..=100).
    pub progress_interval: u32,

    /// Resolution of the β interpolation table.
    pub beta_samples: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            weights: None,
            verbose: true,
            progress_interval: 10,
            beta_samples: BetaTable::DEFAULT_SAMPLES,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_progress_interval(mut self, percent: u32) -> Self {
        self.progress_interval = percent;
        self
    }

    pub fn with_beta_samples(mut self, samples: usize) -> Self {
        self.beta_samples = samples;
        self
    }

    pub(crate) fn validate(&self) -> MtResult<()> {
        if !(1..=100).contains(&self.progress_interval) {
            return Err(config_error!(
                "progress_interval must be within 1..=100, got {}",
                self.progress_interval
            ));
        }
        Ok(())
    }
}

/// How many workers take part in a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Serial,
    Distributed { workers: usize },
}

impl ExecutionMode {
    /// Probe the environment. A missing, malformed or unit world size
    /// selects the serial path; probing never fails.
    pub fn from_env() -> Self {
        Self::from_world_size(std::env::var(WORKERS_ENV).ok().as_deref())
    }

    pub(crate) fn from_world_size(value: Option<&str>) -> Self {
        let mode = match value.map(|v| v.trim().parse::<usize>()) {
            Some(Ok(workers)) if workers > 1 => Self::Distributed { workers },
            _ => Self::Serial,
        };
        debug!(?value, ?mode, "Probed execution mode");
        mode
    }

    pub fn workers(&self) -> usize {
        match self {
            Self::Serial => 1,
            Self::Distributed { workers } => *workers,
        }
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Serial
    }
}
