// Grid-search driver: evaluates misfit over origins x sources for one shard

use mt_grid::{LuneAxes, MomentTensorParameterization, ParameterGrid};
use mt_types::{MomentTensor, MtError, MtResult, Origin, SearchError};
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::misfit::{resolve_weights, MisfitCategory, MisfitEvaluator, TraceAttributes};
use crate::status::{SearchState, SearchStatus};
use crate::surface::MisfitSurface;

/// Runs one grid search over a (possibly sharded) source grid.
///
/// Evaluation is strictly sequential and in grid order: origins outer,
/// sources inner. Evaluator errors are returned exactly as raised.
pub struct GridSearchDriver<'a, E: MisfitEvaluator> {
    categories: &'a [MisfitCategory<E>],
    weights: Vec<f64>,
    parameterization: MomentTensorParameterization,
    config: SearchConfig,
    status: SearchStatus,
}

impl<'a, E: MisfitEvaluator> GridSearchDriver<'a, E> {
    /// Validate the configuration against `categories`.
    pub fn new(categories: &'a [MisfitCategory<E>], config: SearchConfig) -> MtResult<Self> {
        config.validate()?;
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let weights = resolve_weights(&names, config.weights.as_deref())?;
        let parameterization = MomentTensorParameterization::new(config.beta_samples)?;

        debug!("Created grid-search driver with categories {:?}", names);

        Ok(Self {
            categories,
            weights,
            parameterization,
            config,
            status: SearchStatus::new(),
        })
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    /// Effective per-category weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Evaluate every (origin, source) pair. A driver runs once.
    pub fn run(&mut self, origins: &[Origin], sources: &ParameterGrid) -> MtResult<MisfitSurface> {
        if self.status.state != SearchState::Idle {
            return Err(SearchError::AlreadyRun.into());
        }
        self.status
            .mark_running(origins.len().saturating_mul(sources.len()));

        match self.evaluate_all(origins, sources) {
            Ok(surface) => {
                self.status.mark_done();
                if self.config.verbose {
                    info!("Grid search completed: {} evaluations", self.status.evaluations);
                }
                Ok(surface)
            }
            Err(err) => {
                self.status.mark_failed(err.to_string());
                Err(err)
            }
        }
    }

    fn evaluate_all(&mut self, origins: &[Origin], sources: &ParameterGrid) -> MtResult<MisfitSurface> {
        if origins.is_empty() {
            return Err(SearchError::NoOrigins.into());
        }
        let axes = LuneAxes::resolve(sources)?;
        let n_origins = origins.len();
        let total = self.status.total;

        if self.config.verbose {
            info!(
                "Evaluating {} origins x {} sources x {} categories",
                n_origins,
                sources.len(),
                self.categories.len()
            );
        }
        let step = progress_step(total, self.config.progress_interval);

        let mut values = vec![0.0; total];
        for (io, origin) in origins.iter().enumerate() {
            for i in 0..sources.len() {
                let coordinate = sources.coordinate_at(i)?;
                let source = self
                    .parameterization
                    .to_moment_tensor(&axes.extract(&coordinate))?;
                values[i * n_origins + io] = self.misfit(origin, &source)?;

                self.status.evaluations += 1;
                let done = self.status.evaluations;
                if self.config.verbose && (done % step == 0 || done == total) {
                    info!(
                        "Grid search progress: {}/{} ({:.0}%)",
                        done,
                        total,
                        100.0 * self.status.progress()
                    );
                }
            }
        }

        Ok(MisfitSurface::from_values(n_origins, sources.offset(), values))
    }

    /// Weighted sum of the category misfits for one source.
    pub fn misfit(&self, origin: &Origin, source: &MomentTensor) -> MtResult<f64> {
        let mut total = 0.0;
        for (category, weight) in self.categories.iter().zip(&self.weights) {
            let value = category
                .evaluator
                .evaluate(
                    &category.data,
                    &category.greens,
                    origin,
                    source,
                    category.time_shift.as_ref(),
                )
                .map_err(MtError::Evaluator)?;

            if !value.is_finite() || value < 0.0 {
                return Err(SearchError::InvalidMisfit {
                    category: category.name.clone(),
                    value,
                }
                .into());
            }
            total += weight * value;
        }
        Ok(total)
    }

    /// Moment tensor at index `i` of `sources`.
    pub fn tensor_at(&self, sources: &ParameterGrid, i: usize) -> MtResult<MomentTensor> {
        let axes = LuneAxes::resolve(sources)?;
        let coordinate = sources.coordinate_at(i)?;
        self.parameterization
            .to_moment_tensor(&axes.extract(&coordinate))
    }

    /// Per-category trace attributes for one source, for diagnostics.
    pub fn collect_attributes(
        &self,
        origin: &Origin,
        source: &MomentTensor,
    ) -> MtResult<Vec<(String, Vec<TraceAttributes>)>> {
        self.categories
            .iter()
            .map(|category| {
                category
                    .evaluator
                    .collect_attributes(&category.data, &category.greens, origin, source)
                    .map(|attrs| (category.name.clone(), attrs))
                    .map_err(MtError::Evaluator)
            })
            .collect()
    }
}

/// Number of evaluations between progress messages.
fn progress_step(total: usize, interval_percent: u32) -> usize {
    ((total as f64) * f64::from(interval_percent) / 100.0)
        .ceil()
        .max(1.0) as usize
}
