//! Uniform lune parameterization of moment tensors (Tape & Tape, 2015).
//!
//! Sampling `(v, w, κ, σ, h)` uniformly gives uniform density over the
//! space of moment tensors of fixed norm. The conversion to tensor
//! components is closed form except for the `w → β` step, which requires
//! inverting `u(β) = 0.75β − 0.5 sin 2β + 0.0625 sin 4β` numerically.

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

use mt_types::{GridError, MomentTensor, MtResult, ParameterError};
use serde::{Deserialize, Serialize};

use crate::grid::ParameterGrid;

/// Upper bound of |w|; u = 3π/8 − w spans [0, 3π/4].
pub const W_MAX: f64 = 3.0 * PI / 8.0;

/// Upper bound of |v|.
pub const V_MAX: f64 = 1.0 / 3.0;

/// β of the pure double couple; u(π/2) = 3π/8 so w = 0 lands here.
pub const DOUBLE_COUPLE_BETA: f64 = FRAC_PI_2;

/// Axis names every moment-tensor source grid carries.
pub const LUNE_AXES: [&str; 6] = ["rho", "v", "w", "kappa", "sigma", "h"];

/// Scalar moment in N·m for moment magnitude `mw`.
pub fn magnitude_to_moment(mw: f64) -> f64 {
    10f64.powf(1.5 * mw + 9.1)
}

/// Tensor norm ρ = √2 · M0 for moment magnitude `mw`.
pub fn magnitude_to_rho(mw: f64) -> f64 {
    magnitude_to_moment(mw) * SQRT_2
}

/// u(β), monotonic on [0, π] with u(0) = 0, u(π/2) = 3π/8, u(π) = 3π/4.
pub fn beta_to_u(beta: f64) -> f64 {
    0.75 * beta - 0.5 * (2.0 * beta).sin() + 0.0625 * (4.0 * beta).sin()
}

/// Sampled u(β) used to invert it by linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaTable {
    beta: Vec<f64>,
    u: Vec<f64>,
}

impl BetaTable {
    pub const DEFAULT_SAMPLES: usize = 1000;

    /// Sample u at `samples` evenly spaced β over [0, π].
    pub fn new(samples: usize) -> MtResult<Self> {
        if samples <= 1 {
            return Err(ParameterError::InvalidResolution { samples }.into());
        }
        Ok(Self::sampled(samples))
    }

    fn sampled(samples: usize) -> Self {
        let beta: Vec<f64> = (0..samples)
            .map(|i| PI * (i as f64 / (samples - 1) as f64))
            .collect();
        let u = beta.iter().map(|&b| beta_to_u(b)).collect();
        Self { beta, u }
    }

    pub fn samples(&self) -> usize {
        self.beta.len()
    }

    /// Distance between adjacent β samples; bounds the inversion error.
    pub fn spacing(&self) -> f64 {
        PI / (self.samples() - 1) as f64
    }

    /// Inverse of u(β); values outside [0, 3π/4] clamp to the end points.
    /// NaN maps to NaN.
    pub fn u_to_beta(&self, u: f64) -> f64 {
        if u.is_nan() {
            return f64::NAN;
        }
        let last = self.u.len() - 1;
        if u <= self.u[0] {
            return self.beta[0];
        }
        if u >= self.u[last] {
            return self.beta[last];
        }

        // First sample strictly greater than u; 1 <= k <= last here.
        let k = self.u.partition_point(|&x| x <= u);
        let (u0, u1) = (self.u[k - 1], self.u[k]);
        let (b0, b1) = (self.beta[k - 1], self.beta[k]);
        if u1 == u0 {
            return b0;
        }
        b0 + (u - u0) / (u1 - u0) * (b1 - b0)
    }
}

impl Default for BetaTable {
    fn default() -> Self {
        Self::sampled(Self::DEFAULT_SAMPLES)
    }
}

/// One point of the lune parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LuneParameters {
    /// Tensor norm, √2 · M0.
    pub rho: f64,
    /// Lune longitude-like coordinate, |v| <= 1/3.
    pub v: f64,
    /// Lune latitude-like coordinate, |w| <= 3π/8.
    pub w: f64,
    /// Strike in degrees.
    pub kappa: f64,
    /// Slip (rake) in degrees.
    pub sigma: f64,
    /// Cosine of dip, in [0, 1].
    pub h: f64,
}

impl LuneParameters {
    /// Double couple of magnitude `mw`.
    pub fn double_couple(mw: f64, kappa: f64, sigma: f64, h: f64) -> Self {
        Self {
            rho: magnitude_to_rho(mw),
            v: 0.0,
            w: 0.0,
            kappa,
            sigma,
            h,
        }
    }

    fn validate(&self) -> Result<(), ParameterError> {
        let named = [
            ("rho", self.rho),
            ("v", self.v),
            ("w", self.w),
            ("kappa", self.kappa),
            ("sigma", self.sigma),
            ("h", self.h),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ParameterError::NonFinite {
                    name: name.to_string(),
                });
            }
        }
        if self.rho < 0.0 {
            return Err(ParameterError::InvalidMoment { rho: self.rho });
        }
        if (3.0 * self.v).abs() > 1.0 {
            return Err(ParameterError::SourceTypeOutOfRange { v: self.v });
        }
        if self.w.abs() > W_MAX {
            return Err(ParameterError::LuneLatitudeOutOfRange { w: self.w });
        }
        if !(0.0..=1.0).contains(&self.h) {
            return Err(ParameterError::DipOutOfRange { h: self.h });
        }
        Ok(())
    }
}

/// Positions of the lune axes within a grid's coordinate tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuneAxes {
    positions: [usize; 6],
}

impl LuneAxes {
    /// Locate all six lune axes in `grid`; a missing axis is a configuration error.
    pub fn resolve(grid: &ParameterGrid) -> MtResult<Self> {
        let mut positions = [0usize; 6];
        for (slot, name) in positions.iter_mut().zip(LUNE_AXES) {
            *slot = grid.axis_index(name).ok_or_else(|| GridError::UnknownAxis {
                axis: name.to_string(),
            })?;
        }
        Ok(Self { positions })
    }

    pub fn extract(&self, coordinate: &[f64]) -> LuneParameters {
        let [rho, v, w, kappa, sigma, h] = self.positions.map(|k| coordinate[k]);
        LuneParameters {
            rho,
            v,
            w,
            kappa,
            sigma,
            h,
        }
    }
}

/// Maps lune parameters to moment-tensor components.
///
/// Holds the β interpolation table so it is built once per search rather
/// than once per grid point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MomentTensorParameterization {
    table: BetaTable,
}

impl MomentTensorParameterization {
    /// Parameterization whose β table has `samples` points.
    pub fn new(samples: usize) -> MtResult<Self> {
        Ok(Self {
            table: BetaTable::new(samples)?,
        })
    }

    pub fn table(&self) -> &BetaTable {
        &self.table
    }

    /// Build the tensor for `p`, rejecting out-of-range parameters first.
    pub fn to_moment_tensor(&self, p: &LuneParameters) -> MtResult<MomentTensor> {
        p.validate()?;

        let m0 = p.rho / SQRT_2;
        let gamma = (3.0 * p.v).asin() / 3.0;
        let beta = self.table.u_to_beta(W_MAX - p.w);
        let theta = p.h.acos();
        let kappa = p.kappa.to_radians();
        let sigma = p.sigma.to_radians();

        Ok(MomentTensor::new(tt_to_mij(m0, beta, gamma, kappa, sigma, theta)))
    }
}

/// Closed-form tensor components; all angles in radians.
fn tt_to_mij(m0: f64, beta: f64, gamma: f64, kappa: f64, sigma: f64, theta: f64) -> [f64; 6] {
    let r3 = 3f64.sqrt();
    let r6 = 6f64.sqrt();

    let (sb, cb) = beta.sin_cos();
    let (sg, cg) = gamma.sin_cos();
    let (ss, cs) = sigma.sin_cos();
    let (st, ct) = theta.sin_cos();
    let (sk, ck) = kappa.sin_cos();
    let (s2k, c2k) = (2.0 * kappa).sin_cos();
    let (s2s, c2s) = (2.0 * sigma).sin_cos();
    let (s2t, c2t) = (2.0 * theta).sin_cos();

    let mrr = m0 / 12.0
        * (4.0 * r6 * cb
            + sb * (r3 * sg * (-1.0 - 3.0 * c2t + 6.0 * c2s * st * st) + 12.0 * cg * s2t * ss));

    let mtt = m0 / 24.0
        * (8.0 * r6 * cb
            + sb * (-24.0 * cg * (cs * st * s2k + s2t * sk * sk * ss)
                + r3 * sg
                    * ((1.0 + 3.0 * c2k) * (1.0 - 3.0 * c2s) + 12.0 * c2t * cs * cs * sk * sk
                        - 12.0 * ct * s2k * s2s)));

    let mpp = m0 / 6.0
        * (2.0 * r6 * cb
            + sb * (r3 * ct * ct * ck * ck * (1.0 + 3.0 * c2s) * sg
                - 2.0 * r3 * ck * ck * sg * st * st
                + r3 * (1.0 - 3.0 * c2s) * sg * sk * sk
                + 6.0 * cg * cs * st * s2k
                + 3.0 * ct * (-4.0 * cg * ck * ck * st * ss + r3 * sg * s2k * s2s)));

    let mrt = -m0 / 2.0
        * sb
        * (2.0 * r3 * cs * sg * st * (ct * cs * sk - ck * ss)
            + 2.0 * cg * (ct * ck * cs + c2t * sk * ss));

    let mrp = -m0 / 2.0
        * sb
        * (ck * (r3 * cs * cs * sg * s2t + 2.0 * cg * c2t * ss)
            + sk * (-2.0 * cg * ct * cs + r3 * sg * st * s2s));

    let mtp = -m0 / 8.0
        * sb
        * (4.0 * cg * (2.0 * c2k * cs * st + s2t * s2k * ss)
            + r3 * sg * ((1.0 - 2.0 * c2t * cs * cs - 3.0 * c2s) * s2k + 4.0 * ct * c2k * s2s));

    [mrr, mtt, mpp, mrt, mrp, mtp]
}
