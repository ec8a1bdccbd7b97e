//! Gradient-based viscous flux for the Navier-Stokes terms.

use afv_physics::{Gas, State, Vec2, sutherland_viscosity};

use crate::config::FlowPhysicsConfig;
use crate::gradient::CellGradient;

/// Sutherland reference constant, 110.4 K.
const SUTHERLAND_K: f64 = 110.4;

/// Nondimensional viscous closure: stress tensor, heat conduction, and
/// the diffusive spectral radius used for time-step and Jacobian
/// stabilization.
#[derive(Clone, Copy, Debug)]
pub struct ViscousModel {
    re_inf: f64,
    prandtl: f64,
    constant_viscosity: bool,
    /// 110.4 K over the reference temperature.
    s_star: f64,
}

impl ViscousModel {
    pub fn new(phys: &FlowPhysicsConfig) -> Self {
        Self {
            re_inf: phys.re_inf,
            prandtl: phys.prandtl,
            constant_viscosity: phys.constant_viscosity,
            s_star: SUTHERLAND_K / phys.reference_temperature,
        }
    }

    /// Nondimensional dynamic viscosity at temperature `t`, including the
    /// 1/Re∞ scale.
    pub fn viscosity(&self, t: f64) -> f64 {
        let mu = if self.constant_viscosity {
            1.0
        } else {
            sutherland_viscosity(t, self.s_star)
        };
        mu / self.re_inf
    }

    /// Viscous normal flux from the face primitive state (ρ, v_x, v_y, p)
    /// and the face gradient of those primitives. The result is
    /// subtracted from the convective flux.
    pub fn flux(&self, gas: &Gas, prim: &State, grad: &CellGradient, n: Vec2) -> State {
        let (rho, vx, vy, p) = (prim[0], prim[1], prim[2], prim[3]);
        let gm2 = gas.gamma * gas.mach_inf * gas.mach_inf;
        let t = gm2 * p / rho;
        let mu = self.viscosity(t);

        let dvx = Vec2::new(grad[0][1], grad[1][1]);
        let dvy = Vec2::new(grad[0][2], grad[1][2]);
        let drho = Vec2::new(grad[0][0], grad[1][0]);
        let dp = Vec2::new(grad[0][3], grad[1][3]);
        // T = γ M∞² p / ρ.
        let dt = gm2 / (rho * rho) * (rho * dp - p * drho);

        let div = dvx.x + dvy.y;
        let txx = mu * (2.0 * dvx.x - 2.0 / 3.0 * div);
        let tyy = mu * (2.0 * dvy.y - 2.0 / 3.0 * div);
        let txy = mu * (dvx.y + dvy.x);

        // Energy flux τ·v + q with q = -k ∇T.
        let k = mu / ((gas.gamma - 1.0) * gas.mach_inf * gas.mach_inf * self.prandtl);
        State::new(
            0.0,
            txx * n.x + txy * n.y,
            txy * n.x + tyy * n.y,
            (txx * vx + txy * vy) * n.x + (txy * vx + tyy * vy) * n.y - k * dt.dot(&n),
        )
    }

    /// Diffusive wave-speed surrogate ν̄ ℓ / Δ for a face of length `len`
    /// whose adjacent centers are `dist` apart.
    pub fn spectral_radius(&self, gas: &Gas, rho: f64, t: f64, len: f64, dist: f64) -> f64 {
        let nu = self.viscosity(t) / rho * (4.0 / 3.0_f64).max(gas.gamma / self.prandtl);
        nu * len / dist.max(f64::MIN_POSITIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::BcRule;
    use crate::config::FlowPhysicsConfig;
    use approx::assert_relative_eq;

    fn model() -> (Gas, ViscousModel) {
        let phys = FlowPhysicsConfig {
            viscous: true,
            re_inf: 1000.0,
            constant_viscosity: true,
            ..FlowPhysicsConfig::inviscid(1.4, 0.5, 0.0, vec![])
        };
        (Gas::new(1.4, 0.5).unwrap(), ViscousModel::new(&phys))
    }

    #[test]
    fn constant_viscosity_scales_with_reynolds() {
        let (_, model) = model();
        assert_relative_eq!(model.viscosity(0.7), 1e-3, epsilon = 1e-16);
        assert_relative_eq!(model.viscosity(1.9), 1e-3, epsilon = 1e-16);
    }

    #[test]
    fn pure_shear_produces_only_tangential_stress() {
        let (gas, model) = model();
        // u = (y, 0): dvx/dy = 1, everything else flat.
        let prim = State::new(1.0, 0.5, 0.0, 1.0 / (1.4 * 0.25));
        let grad: CellGradient = [State::zeros(), State::new(0.0, 1.0, 0.0, 0.0)];
        let n = Vec2::new(0.0, 1.0);
        let f = model.flux(&gas, &prim, &grad, n);
        let mu = model.viscosity(gas.gamma * 0.25 * prim[3] / prim[0]);
        assert_relative_eq!(f[0], 0.0);
        assert_relative_eq!(f[1], mu, epsilon = 1e-15); // τ_xy
        assert_relative_eq!(f[2], 0.0, epsilon = 1e-15);
        // Work of the shear stress on the moving fluid.
        assert_relative_eq!(f[3], mu * prim[1], epsilon = 1e-15);
    }

    #[test]
    fn heat_conducts_against_the_temperature_gradient() {
        let (gas, model) = model();
        // Fluid at rest with pressure (hence temperature) rising along n:
        // the energy flux carries q = -k ∇T, so its normal component is
        // negative.
        let prim = State::new(1.0, 0.0, 0.0, gas.p_inf());
        let grad: CellGradient = [State::new(0.0, 0.0, 0.0, 1.0), State::zeros()];
        let n = Vec2::new(1.0, 0.0);
        let f = model.flux(&gas, &prim, &grad, n);

        let gm2 = gas.gamma * gas.mach_inf * gas.mach_inf;
        let dt_dn = gm2; // ∇T·n = γ M∞² (ρ ∇p - p ∇ρ)/ρ² with ρ = 1, ∇ρ = 0
        let t = gm2 * prim[3] / prim[0];
        let k = model.viscosity(t) / ((gas.gamma - 1.0) * gas.mach_inf * gas.mach_inf * 0.72);
        assert_relative_eq!(f[3], -k * dt_dn, epsilon = 1e-15);
        assert!(f[3] < 0.0);
        // No motion, no stress.
        assert_relative_eq!(f[1], 0.0);
        assert_relative_eq!(f[2], 0.0);

        // A density gradient alone drives conduction the other way.
        let grad: CellGradient = [State::new(1.0, 0.0, 0.0, 0.0), State::zeros()];
        let f = model.flux(&gas, &prim, &grad, n);
        assert!(f[3] > 0.0);
    }

    #[test]
    fn uniform_flow_has_zero_viscous_flux() {
        let (gas, model) = model();
        let prim = State::new(1.0, 1.0, 0.0, gas.p_inf());
        let grad: CellGradient = [State::zeros(), State::zeros()];
        let f = model.flux(&gas, &prim, &grad, Vec2::new(0.6, 0.8));
        for k in 0..4 {
            assert_relative_eq!(f[k], 0.0);
        }
    }

    #[test]
    fn bc_rules_expose_wall_detection() {
        assert!(BcRule::SlipWall.is_wall());
        assert!(!BcRule::Farfield.is_wall());
    }
}
