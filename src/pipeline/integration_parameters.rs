//! Every per-step knob the world exposes (§6 "velocity/position iteration
//! counts ... configurable"), bundled the way the rest of this crate
//! bundles its settings structs (cf. [`crate::dynamics::RigidBodySettings`]):
//! an owned, dependency-injected config struct rather than a process
//! singleton (§9 "global mutable state").

use crate::dynamics::solver::ContactSolverSettings;
use crate::math::Real;

/// Per-step tuning for integration, the constraint solver, and continuous
/// collision detection.
#[derive(Copy, Clone, Debug)]
pub struct IntegrationParameters {
    pub dt: Real,
    /// Sequential-impulse sweeps per step before the position pass (§4.9).
    pub velocity_iterations: u32,
    /// Baumgarte position-correction sweeps per step (§4.9).
    pub position_iterations: u32,
    pub contact_solver: ContactSolverSettings,
    /// Number of steps a contact's impulse cache entry survives without
    /// being refreshed before it is dropped (§4.10).
    pub frames_to_retain_cache: u32,
    /// `|delta_position|^2 / bounding_radius` threshold above which a body
    /// runs continuous collision detection instead of discrete (§4.7).
    pub ccd_trigger_ratio: Real,
    /// Root-finding tolerance passed to [`crate::geometry::time_of_impact`]
    /// (§4.6).
    pub ccd_tolerance: Real,
}

impl IntegrationParameters {
    pub fn inv_dt(&self) -> Real {
        crate::utils::inv(self.dt)
    }
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            velocity_iterations: 5,
            position_iterations: 3,
            contact_solver: ContactSolverSettings::default(),
            frames_to_retain_cache: 10,
            ccd_trigger_ratio: 1.35,
            ccd_tolerance: 1.0e-3,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inv_dt_is_the_reciprocal_of_dt() {
        let params = IntegrationParameters::default();
        assert!((params.inv_dt() - 60.0).abs() < 1.0e-3);
    }
}
