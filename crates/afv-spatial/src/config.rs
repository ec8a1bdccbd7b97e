//! Immutable configuration records for the spatial discretization.

use afv_flux::NumFlux;

use crate::bc::BoundarySpec;
use crate::gradient::GradientMethod;
use crate::limiter::SlopeLimiter;

/// Flow conditions and boundary setup. Immutable after construction.
#[derive(Clone, Debug)]
pub struct FlowPhysicsConfig {
    /// Adiabatic index γ.
    pub gamma: f64,
    /// Free-stream Mach number.
    pub mach_inf: f64,
    /// Angle of attack in degrees.
    pub aoa_deg: f64,
    /// Dimensional free-stream temperature [K], used by Sutherland's law.
    pub reference_temperature: f64,
    /// Free-stream Reynolds number (viscous runs).
    pub re_inf: f64,
    /// Prandtl number (viscous runs).
    pub prandtl: f64,
    /// Solve Navier-Stokes instead of Euler.
    pub viscous: bool,
    /// Hold μ constant instead of Sutherland's law.
    pub constant_viscosity: bool,
    /// Boundary markers and their rules.
    pub boundaries: Vec<BoundarySpec>,
}

impl FlowPhysicsConfig {
    /// Inviscid flow conditions.
    pub fn inviscid(gamma: f64, mach_inf: f64, aoa_deg: f64, boundaries: Vec<BoundarySpec>) -> Self {
        Self {
            gamma,
            mach_inf,
            aoa_deg,
            reference_temperature: 288.15,
            re_inf: 0.0,
            prandtl: 0.72,
            viscous: false,
            constant_viscosity: false,
            boundaries,
        }
    }
}

/// Scheme selection for the spatial discretization. Immutable after
/// construction.
#[derive(Clone, Copy, Debug)]
pub struct FlowNumericsConfig {
    /// Flux used for the residual.
    pub inviscid_flux: NumFlux,
    /// Flux linearized for the implicit operator; "consistent" in the
    /// control file resolves to `inviscid_flux` before this is built.
    pub jacobian_flux: NumFlux,
    pub gradient: GradientMethod,
    pub limiter: SlopeLimiter,
    /// Venkatakrishnan's K (unused by the other limiters).
    pub limiter_param: f64,
    /// Second-order reconstruction of face states.
    pub second_order: bool,
    /// Reconstruct in primitive variables. Forced on for viscous runs so
    /// the viscous terms consume primitive gradients.
    pub reconstruct_primitive: bool,
}

impl Default for FlowNumericsConfig {
    fn default() -> Self {
        Self {
            inviscid_flux: NumFlux::Llf,
            jacobian_flux: NumFlux::Llf,
            gradient: GradientMethod::LeastSquares,
            limiter: SlopeLimiter::None,
            limiter_param: 2.0,
            second_order: true,
            reconstruct_primitive: false,
        }
    }
}
