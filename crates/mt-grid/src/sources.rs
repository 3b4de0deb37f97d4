//! Ready-made moment-tensor source grids.
//!
//! Every grid produced here carries the six lune axes in the order
//! `rho, v, w, kappa, sigma, h`; axes a source family does not vary are
//! pinned to a single value, so one parameterization serves all families.

use mt_types::{config_error, MtResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grid::{GridSpec, ParameterGrid};
use crate::lune::{magnitude_to_rho, LUNE_AXES, V_MAX, W_MAX};

/// Which part of the lune a source grid covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFamily {
    /// v = w = 0.
    DoubleCouple,
    /// w = 0, v free.
    Deviatoric,
    /// v and w free.
    FullMomentTensor,
}

impl SourceFamily {
    fn varies_v(self) -> bool {
        !matches!(self, Self::DoubleCouple)
    }

    fn varies_w(self) -> bool {
        matches!(self, Self::FullMomentTensor)
    }
}

/// `npts` cell-centred points over [start, stop].
///
/// Centring keeps periodic axes (strike) from sampling 0° and 360° twice and
/// keeps v, w off the lune boundary.
fn centred(start: f64, stop: f64, npts: usize) -> Vec<f64> {
    let step = (stop - start) / npts as f64;
    (0..npts).map(|i| start + (i as f64 + 0.5) * step).collect()
}

fn rho_values(magnitudes: &[f64]) -> MtResult<Vec<f64>> {
    if magnitudes.is_empty() {
        return Err(config_error!("At least one magnitude is required"));
    }
    if let Some(mw) = magnitudes.iter().find(|m| !m.is_finite()) {
        return Err(config_error!("Invalid magnitude: {mw}"));
    }
    Ok(magnitudes.iter().map(|&mw| magnitude_to_rho(mw)).collect())
}

/// Structured grid regular in every free axis of `family`.
pub fn regular_source_grid(
    family: SourceFamily,
    npts_per_axis: usize,
    magnitudes: &[f64],
) -> MtResult<ParameterGrid> {
    if npts_per_axis == 0 {
        return Err(config_error!("npts_per_axis must be positive"));
    }
    let mut spec = GridSpec::new().add_values("rho", rho_values(magnitudes)?);

    spec = if family.varies_v() {
        spec.add_values("v", centred(-V_MAX, V_MAX, npts_per_axis))
    } else {
        spec.add_fixed("v", 0.0)
    };
    spec = if family.varies_w() {
        spec.add_values("w", centred(-W_MAX, W_MAX, npts_per_axis))
    } else {
        spec.add_fixed("w", 0.0)
    };

    let grid = spec
        .add_values("kappa", centred(0.0, 360.0, npts_per_axis))
        .add_values("sigma", centred(-90.0, 90.0, npts_per_axis))
        .add_values("h", centred(0.0, 1.0, npts_per_axis))
        .build()?;

    debug!(
        "Built regular {:?} grid with {} points",
        family,
        grid.size()
    );
    Ok(grid)
}

/// Unstructured grid of `npts` uniform random points per magnitude.
///
/// Uniform sampling of the lune parameters is uniform over moment tensors,
/// so no rejection step is needed. The same seed always yields the same grid.
pub fn random_source_grid(
    family: SourceFamily,
    npts: usize,
    magnitudes: &[f64],
    seed: u64,
) -> MtResult<ParameterGrid> {
    if npts == 0 {
        return Err(config_error!("npts must be positive"));
    }
    let rhos = rho_values(magnitudes)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut points = Vec::with_capacity(rhos.len() * npts);
    for rho in rhos {
        for _ in 0..npts {
            let v = if family.varies_v() {
                rng.gen_range(-V_MAX..=V_MAX)
            } else {
                0.0
            };
            let w = if family.varies_w() {
                rng.gen_range(-W_MAX..=W_MAX)
            } else {
                0.0
            };
            points.push(vec![
                rho,
                v,
                w,
                rng.gen_range(0.0..360.0),
                rng.gen_range(-90.0..=90.0),
                rng.gen_range(0.0..=1.0),
            ]);
        }
    }

    let names = LUNE_AXES.iter().map(|s| s.to_string()).collect();
    let grid = ParameterGrid::unstructured(names, points)?;
    debug!(
        "Built random {:?} grid with {} points (seed {})",
        family,
        grid.size(),
        seed
    );
    Ok(grid)
}

pub fn double_couple_grid_regular(npts_per_axis: usize, magnitudes: &[f64]) -> MtResult<ParameterGrid> {
    regular_source_grid(SourceFamily::DoubleCouple, npts_per_axis, magnitudes)
}

pub fn double_couple_grid_random(npts: usize, magnitudes: &[f64], seed: u64) -> MtResult<ParameterGrid> {
    random_source_grid(SourceFamily::DoubleCouple, npts, magnitudes, seed)
}

pub fn deviatoric_grid_semiregular(npts_per_axis: usize, magnitudes: &[f64]) -> MtResult<ParameterGrid> {
    regular_source_grid(SourceFamily::Deviatoric, npts_per_axis, magnitudes)
}

pub fn deviatoric_grid_random(npts: usize, magnitudes: &[f64], seed: u64) -> MtResult<ParameterGrid> {
    random_source_grid(SourceFamily::Deviatoric, npts, magnitudes, seed)
}

pub fn full_moment_tensor_grid_semiregular(
    npts_per_axis: usize,
    magnitudes: &[f64],
) -> MtResult<ParameterGrid> {
    regular_source_grid(SourceFamily::FullMomentTensor, npts_per_axis, magnitudes)
}

pub fn full_moment_tensor_grid_random(
    npts: usize,
    magnitudes: &[f64],
    seed: u64,
) -> MtResult<ParameterGrid> {
    random_source_grid(SourceFamily::FullMomentTensor, npts, magnitudes, seed)
}
