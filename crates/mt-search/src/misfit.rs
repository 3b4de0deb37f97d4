//! The misfit collaborator contract and per-category inputs.

use mt_types::{BoxError, MomentTensor, MtResult, Origin, SearchError};
use serde::{Deserialize, Serialize};

/// Bounds for the per-trace cross-correlation time-shift search, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeShiftWindow {
    pub min: f64,
    pub max: f64,
}

/// Per-trace diagnostics reported by an evaluator for a given source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceAttributes {
    /// Station/component label (e.g. "AK.BPAW.Z").
    pub trace: String,
    /// Time shift that best aligned synthetics with data, in seconds.
    pub time_shift: f64,
    /// Ratio of observed to synthetic amplitude.
    pub amplitude_ratio: f64,
}

/// Scores one source against one category of processed data.
///
/// Implementations are shared read-only by every worker, so they must be
/// `Sync`, as must the data and Green's functions they consume.
pub trait MisfitEvaluator: Send + Sync {
    /// Processed observed waveforms for one category.
    type Data: Sync;
    /// Green's functions matching `Data`.
    type Greens: Sync;

    /// Non-negative misfit between `data` and synthetics for `source` at `origin`.
    fn evaluate(
        &self,
        data: &Self::Data,
        greens: &Self::Greens,
        origin: &Origin,
        source: &MomentTensor,
        time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError>;

    /// Per-trace attributes for diagnostics; evaluators without any return none.
    fn collect_attributes(
        &self,
        _data: &Self::Data,
        _greens: &Self::Greens,
        _origin: &Origin,
        _source: &MomentTensor,
    ) -> Result<Vec<TraceAttributes>, BoxError> {
        Ok(Vec::new())
    }
}

/// One misfit category (e.g. body waves): evaluator plus its inputs.
pub struct MisfitCategory<E: MisfitEvaluator> {
    pub name: String,
    pub evaluator: E,
    pub data: E::Data,
    pub greens: E::Greens,
    pub time_shift: Option<TimeShiftWindow>,
}

impl<E: MisfitEvaluator> MisfitCategory<E> {
    pub fn new(name: impl Into<String>, evaluator: E, data: E::Data, greens: E::Greens) -> Self {
        Self {
            name: name.into(),
            evaluator,
            data,
            greens,
            time_shift: None,
        }
    }

    pub fn with_time_shift(mut self, min: f64, max: f64) -> Self {
        self.time_shift = Some(TimeShiftWindow { min, max });
        self
    }
}

/// Weights applied to each category's misfit.
///
/// `None` means equal weights summing to one. Explicit weights are used as
/// given once they pass validation.
pub(crate) fn resolve_weights(names: &[&str], weights: Option<&[f64]>) -> MtResult<Vec<f64>> {
    if names.is_empty() {
        return Err(SearchError::NoCategories.into());
    }

    let weights = match weights {
        None => return Ok(vec![1.0 / names.len() as f64; names.len()]),
        Some(w) => w,
    };

    if weights.len() != names.len() {
        return Err(SearchError::WeightCountMismatch {
            weights: weights.len(),
            categories: names.len(),
        }
        .into());
    }
    for (name, &weight) in names.iter().zip(weights) {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SearchError::InvalidWeight {
                category: name.to_string(),
                weight,
            }
            .into());
        }
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(SearchError::ZeroWeightTotal { total }.into());
    }
    Ok(weights.to_vec())
}
