//! Point-to-point anchor (§4.9, §6 `add_fixed_joint`/ball joints): pins a
//! point fixed in each body's local frame to coincide in world space.
//! Three world-axis [`AxisConstraint`]s, one per world axis, solved
//! independently -- the off-diagonal coupling between axes is small
//! enough in practice that the source does not bother computing a full
//! 3x3 effective mass, and neither do we.

use super::axis_constraint::{AxisConstraint, Endpoint};
use crate::math::{Real, Vector};
use crate::utils::SdpMatrix3;

pub struct AnchorPoint {
    axes: [AxisConstraint; 3],
}

impl AnchorPoint {
    /// `r1`/`r2` are the world-space lever arms from each body's center
    /// of mass to the (coincident, at rest) anchor point.
    #[allow(clippy::too_many_arguments)]
    pub fn new(r1: Vector, r2: Vector, inv_mass1: Real, inv_i1: SdpMatrix3, inv_mass2: Real, inv_i2: SdpMatrix3, bias: Vector) -> Self {
        let axes = [
            AxisConstraint::new(Vector::x(), r1, r2, inv_mass1, inv_i1, inv_mass2, inv_i2, bias.x),
            AxisConstraint::new(Vector::y(), r1, r2, inv_mass1, inv_i1, inv_mass2, inv_i2, bias.y),
            AxisConstraint::new(Vector::z(), r1, r2, inv_mass1, inv_i1, inv_mass2, inv_i2, bias.z),
        ];
        Self { axes }
    }

    pub fn warm_start(&self, body1: &mut Endpoint, body2: &mut Endpoint) {
        for axis in &self.axes {
            axis.warm_start(body1, body2);
        }
    }

    pub fn solve_velocity(&mut self, body1: &mut Endpoint, body2: &mut Endpoint) {
        for axis in &mut self.axes {
            axis.solve_velocity(body1, body2, -Real::MAX, Real::MAX);
        }
    }

    /// `error` is `anchor_on_body2 - anchor_on_body1` in world space;
    /// corrected toward zero regardless of sign (a bilateral constraint,
    /// unlike a contact's one-sided penetration).
    pub fn solve_position(&self, body1: &mut Endpoint, body2: &mut Endpoint, baumgarte: Real, error: Vector) {
        self.axes[0].solve_position(body1, body2, baumgarte, error.x);
        self.axes[1].solve_position(body1, body2, baumgarte, error.y);
        self.axes[2].solve_position(body1, body2, baumgarte, error.z);
    }
}
