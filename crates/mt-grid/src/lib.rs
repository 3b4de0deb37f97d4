//! # mt-grid
//!
//! Sampled parameter spaces for moment-tensor grid search.
//!
//! Provides structured and unstructured parameter grids with contiguous
//! decomposition for distributed execution, the lune (Tape–Tape)
//! parameterization that turns grid points into moment tensors, and
//! ready-made source grids for double-couple, deviatoric and full
//! moment-tensor searches.

mod grid;
mod lune;
mod sources;

pub use grid::{AxisDef, AxisKind, GridDecomposer, GridSpec, ParameterGrid};
pub use lune::{
    beta_to_u, magnitude_to_moment, magnitude_to_rho, BetaTable, LuneAxes, LuneParameters,
    MomentTensorParameterization, DOUBLE_COUPLE_BETA, LUNE_AXES, V_MAX, W_MAX,
};
pub use sources::{
    deviatoric_grid_random, deviatoric_grid_semiregular, double_couple_grid_random,
    double_couple_grid_regular, full_moment_tensor_grid_random,
    full_moment_tensor_grid_semiregular, random_source_grid, regular_source_grid, SourceFamily,
};
