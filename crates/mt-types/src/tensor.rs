//! Symmetric moment tensor in up-south-east coordinates.

use serde::{Deserialize, Serialize};

/// Six independent components of a symmetric moment tensor, in N·m.
///
/// Components follow the up-south-east (r, θ, φ) convention used by most
/// moment-tensor catalogues: `[Mrr, Mtt, Mpp, Mrt, Mrp, Mtp]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentTensor {
    components: [f64; 6],
}

impl MomentTensor {
    pub fn new(components: [f64; 6]) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[f64; 6] {
        &self.components
    }

    pub fn mrr(&self) -> f64 {
        self.components[0]
    }

    pub fn mtt(&self) -> f64 {
        self.components[1]
    }

    pub fn mpp(&self) -> f64 {
        self.components[2]
    }

    pub fn mrt(&self) -> f64 {
        self.components[3]
    }

    pub fn mrp(&self) -> f64 {
        self.components[4]
    }

    pub fn mtp(&self) -> f64 {
        self.components[5]
    }

    /// Full 3×3 symmetric matrix.
    pub fn as_matrix(&self) -> [[f64; 3]; 3] {
        let [rr, tt, pp, rt, rp, tp] = self.components;
        [[rr, rt, rp], [rt, tt, tp], [rp, tp, pp]]
    }

    /// Trace; three times the isotropic part.
    pub fn trace(&self) -> f64 {
        self.mrr() + self.mtt() + self.mpp()
    }

    /// Frobenius norm. Equals ρ for tensors built from lune parameters.
    pub fn norm(&self) -> f64 {
        let [rr, tt, pp, rt, rp, tp] = self.components;
        (rr * rr + tt * tt + pp * pp + 2.0 * (rt * rt + rp * rp + tp * tp)).sqrt()
    }

    /// Scalar moment M0 = ‖M‖ / √2.
    pub fn scalar_moment(&self) -> f64 {
        self.norm() / std::f64::consts::SQRT_2
    }

    pub fn determinant(&self) -> f64 {
        let m = self.as_matrix();
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}
