//! Stub evaluators and fixtures shared by the unit tests.

use chrono::{TimeZone, Utc};
use mt_grid::{
    magnitude_to_rho, GridSpec, LuneAxes, MomentTensorParameterization, ParameterGrid,
};
use mt_types::{BoxError, MomentTensor, Origin};

use crate::misfit::{MisfitEvaluator, TimeShiftWindow, TraceAttributes};

/// Returns its data as the misfit.
pub struct FixedMisfit;

impl MisfitEvaluator for FixedMisfit {
    type Data = f64;
    type Greens = ();

    fn evaluate(
        &self,
        data: &f64,
        _greens: &(),
        _origin: &Origin,
        _source: &MomentTensor,
        _time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError> {
        Ok(*data)
    }
}

/// Scaled squared distance between unit-norm tensors, plus origin depth in km.
pub struct ReferenceMisfit;

impl MisfitEvaluator for ReferenceMisfit {
    type Data = MomentTensor;
    type Greens = f64;

    fn evaluate(
        &self,
        data: &MomentTensor,
        greens: &f64,
        origin: &Origin,
        source: &MomentTensor,
        _time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError> {
        let (a, b) = (source.norm(), data.norm());
        let distance: f64 = source
            .components()
            .iter()
            .zip(data.components())
            .map(|(s, d)| (s / a - d / b).powi(2))
            .sum();
        Ok(greens * distance + origin.depth_in_m / 1000.0)
    }

    fn collect_attributes(
        &self,
        _data: &MomentTensor,
        greens: &f64,
        _origin: &Origin,
        _source: &MomentTensor,
    ) -> Result<Vec<TraceAttributes>, BoxError> {
        Ok(vec![TraceAttributes {
            trace: "XX.STUB.Z".to_string(),
            time_shift: 0.0,
            amplitude_ratio: *greens,
        }])
    }
}

#[derive(Debug)]
pub struct StubFailure;

impl std::fmt::Display for StubFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(FailingEvaluator::MESSAGE)
    }
}

impl std::error::Error for StubFailure {}

/// Fails on every call.
pub struct FailingEvaluator;

impl FailingEvaluator {
    pub const MESSAGE: &'static str = "greens missing for station BPAW";
}

impl MisfitEvaluator for FailingEvaluator {
    type Data = ();
    type Greens = ();

    fn evaluate(
        &self,
        _data: &(),
        _greens: &(),
        _origin: &Origin,
        _source: &MomentTensor,
        _time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError> {
        Err(Box::new(StubFailure))
    }
}

/// Source rejected by [`RejectSources`]; `index` is its position in the reject list.
#[derive(Debug)]
pub struct RejectedSource {
    pub index: usize,
}

impl std::fmt::Display for RejectedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source {} rejected", self.index)
    }
}

impl std::error::Error for RejectedSource {}

/// Fails for exactly the tensors listed in `data`, succeeds elsewhere.
pub struct RejectSources;

impl MisfitEvaluator for RejectSources {
    type Data = Vec<MomentTensor>;
    type Greens = ();

    fn evaluate(
        &self,
        data: &Vec<MomentTensor>,
        _greens: &(),
        _origin: &Origin,
        source: &MomentTensor,
        _time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError> {
        match data.iter().position(|rejected| rejected == source) {
            Some(index) => Err(Box::new(RejectedSource { index })),
            None => Ok(1.0),
        }
    }
}

/// Panics on the tensors listed in `data`.
pub struct PanicOnSources;

impl MisfitEvaluator for PanicOnSources {
    type Data = Vec<MomentTensor>;
    type Greens = ();

    fn evaluate(
        &self,
        data: &Vec<MomentTensor>,
        _greens: &(),
        _origin: &Origin,
        source: &MomentTensor,
        _time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError> {
        assert!(!data.contains(source), "evaluator crashed");
        Ok(1.0)
    }
}

/// Tensors at `indices` of `grid`, built the way the driver builds them.
pub fn tensors_at(grid: &ParameterGrid, indices: &[usize]) -> Vec<MomentTensor> {
    let axes = LuneAxes::resolve(grid).unwrap();
    let parameterization = MomentTensorParameterization::default();
    indices
        .iter()
        .map(|&i| {
            let coordinate = grid.coordinate_at(i).unwrap();
            parameterization
                .to_moment_tensor(&axes.extract(&coordinate))
                .unwrap()
        })
        .collect()
}

/// `n` origins at increasing depth.
pub fn origins(n: usize) -> Vec<Origin> {
    let time = Utc.with_ymd_and_hms(2009, 4, 7, 20, 12, 55).unwrap();
    (0..n)
        .map(|i| Origin::new(61.45, -149.74, 1000.0 * (10 + 5 * i) as f64, time))
        .collect()
}

/// 3 x 3 x 2 structured lune grid with the remaining axes fixed.
pub fn small_source_grid() -> ParameterGrid {
    GridSpec::new()
        .add_fixed("rho", magnitude_to_rho(4.5))
        .add_fixed("v", 0.0)
        .add_fixed("w", 0.0)
        .add_linear("kappa", 20.0, 340.0, 3)
        .add_linear("sigma", -60.0, 60.0, 3)
        .add_values("h", vec![0.25, 0.75])
        .build()
        .unwrap()
}
