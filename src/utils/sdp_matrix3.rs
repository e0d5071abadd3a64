use crate::math::{Matrix3, Real, Vector};

/// A symmetric-definite-positive 3x3 matrix, stored as its six distinct
/// entries.
///
/// Inverse inertia tensors are always symmetric; storing them this way
/// halves the footprint of every [`RigidBody`](crate::dynamics::RigidBody)
/// and avoids re-deriving symmetry after every quaternion-sandwich
/// recomputation (`R * I^-1 * R^t`).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SdpMatrix3 {
    pub m11: Real,
    pub m12: Real,
    pub m13: Real,
    pub m22: Real,
    pub m23: Real,
    pub m33: Real,
}

impl SdpMatrix3 {
    pub const fn zero() -> Self {
        Self {
            m11: 0.0,
            m12: 0.0,
            m13: 0.0,
            m22: 0.0,
            m23: 0.0,
            m33: 0.0,
        }
    }

    pub fn identity() -> Self {
        Self {
            m11: 1.0,
            m12: 0.0,
            m13: 0.0,
            m22: 1.0,
            m23: 0.0,
            m33: 1.0,
        }
    }

    pub fn from_sdp_matrix(m: Matrix3) -> Self {
        Self {
            m11: m.m11,
            m12: m.m12,
            m13: m.m13,
            m22: m.m22,
            m23: m.m23,
            m33: m.m33,
        }
    }

    pub fn as_matrix(&self) -> Matrix3 {
        Matrix3::new(
            self.m11, self.m12, self.m13, self.m12, self.m22, self.m23, self.m13, self.m23,
            self.m33,
        )
    }

    /// The classic 3x3 symmetric inverse, via the cofactor/determinant
    /// formula. Degenerate tensors (zero determinant, e.g. an
    /// infinite-mass/kinematic body) invert to the zero matrix rather than
    /// panicking -- consistent with the engine-wide "NaN/empty sentinel on
    /// programmer error" policy (see the error-handling notes).
    pub fn inverse(&self) -> Self {
        let minor_m12_m23 = self.m22 * self.m33 - self.m23 * self.m23;
        let minor_m11_m23 = self.m12 * self.m33 - self.m13 * self.m23;
        let minor_m11_m22 = self.m12 * self.m23 - self.m13 * self.m22;
        let det = self.m11 * minor_m12_m23 - self.m12 * minor_m11_m23 + self.m13 * minor_m11_m22;

        if det.abs() < crate::math::DEFAULT_EPSILON {
            return Self::zero();
        }

        let inv_det = 1.0 / det;
        Self {
            m11: minor_m12_m23 * inv_det,
            m12: -minor_m11_m23 * inv_det,
            m13: minor_m11_m22 * inv_det,
            m22: (self.m11 * self.m33 - self.m13 * self.m13) * inv_det,
            m23: -(self.m11 * self.m23 - self.m13 * self.m12) * inv_det,
            m33: (self.m11 * self.m22 - self.m12 * self.m12) * inv_det,
        }
    }

    pub fn mul_vector(&self, v: Vector) -> Vector {
        Vector::new(
            self.m11 * v.x + self.m12 * v.y + self.m13 * v.z,
            self.m12 * v.x + self.m22 * v.y + self.m23 * v.z,
            self.m13 * v.x + self.m23 * v.y + self.m33 * v.z,
        )
    }

    /// `R * self * R^t`, transforming an inertia tensor from local-space to
    /// world-space for the current orientation.
    pub fn quadform(&self, r: &nalgebra::Matrix3<Real>) -> Self {
        let m = r * self.as_matrix() * r.transpose();
        Self::from_sdp_matrix(m)
    }

    pub fn add(&self, rhs: &Self) -> Self {
        Self {
            m11: self.m11 + rhs.m11,
            m12: self.m12 + rhs.m12,
            m13: self.m13 + rhs.m13,
            m22: self.m22 + rhs.m22,
            m23: self.m23 + rhs.m23,
            m33: self.m33 + rhs.m33,
        }
    }
}

impl Default for SdpMatrix3 {
    fn default() -> Self {
        Self::zero()
    }
}
