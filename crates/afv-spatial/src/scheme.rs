//! The seam between a spatial discretization and the pseudo-time driver.

use afv_core::AfvResult;
use afv_physics::State;

use crate::linear::LinearOperator;

/// What the pseudo-time driver needs from a spatial discretization.
///
/// `residual` fills R(u) and the per-cell wave-speed integrals used for
/// the local time step ∆t_i = CFL · A_i / w_i; `assemble_jacobian` adds
/// ∂R/∂u into a linear operator whose diagonal the driver has already
/// seeded with A_i/∆t_i.
pub trait SpatialScheme: Sync {
    fn n_cells(&self) -> usize;

    /// Cell area (the 2D "volume").
    fn cell_volume(&self, i: usize) -> f64;

    fn residual(&self, u: &[State], r: &mut [State], wave: &mut [f64]) -> AfvResult<()>;

    fn assemble_jacobian(&self, u: &[State], op: &mut dyn LinearOperator) -> AfvResult<()>;

    /// True when the state is usable (positive density and pressure for
    /// the flow system).
    fn is_physical(&self, u: &State) -> bool {
        let _ = u;
        true
    }

    /// Implicit residual smoothing for the explicit mode; default no-op.
    fn smooth_residual(&self, r: &mut [State], coefficient: f64, sweeps: usize) {
        let _ = (r, coefficient, sweeps);
    }
}
