use afv_core::{AfvError, AfvResult};

use crate::{State, Vec2};

/// Sutherland's law in nondimensional form: μ(T) with T scaled by the
/// free-stream temperature. `s_star` is 110.4 K divided by the reference
/// temperature.
pub fn sutherland_viscosity(t: f64, s_star: f64) -> f64 {
    t.powf(1.5) * (1.0 + s_star) / (t + s_star)
}

/// Nondimensional calorically perfect gas.
///
/// Carries only the two parameters every conversion needs; the heavier
/// flow configuration (angles, Reynolds number, wall setpoints) lives with
/// the spatial discretization.
#[derive(Clone, Copy, Debug)]
pub struct Gas {
    /// Ratio of specific heats γ.
    pub gamma: f64,
    /// Free-stream Mach number M∞.
    pub mach_inf: f64,
}

impl Gas {
    pub fn new(gamma: f64, mach_inf: f64) -> AfvResult<Self> {
        if !(gamma > 1.0) {
            return Err(AfvError::config(format!(
                "adiabatic index must exceed 1, got {gamma}"
            )));
        }
        if !(mach_inf > 0.0) {
            return Err(AfvError::config(format!(
                "free-stream Mach number must be positive, got {mach_inf}"
            )));
        }
        Ok(Self { gamma, mach_inf })
    }

    /// p = (γ-1)(ρE - ½ ρ|v|²).
    pub fn pressure(&self, u: &State) -> f64 {
        let ke = 0.5 * (u[1] * u[1] + u[2] * u[2]) / u[0];
        (self.gamma - 1.0) * (u[3] - ke)
    }

    /// T = γ M∞² p / ρ.
    pub fn temperature(&self, u: &State) -> f64 {
        self.gamma * self.mach_inf * self.mach_inf * self.pressure(u) / u[0]
    }

    /// c = sqrt(γ p / ρ).
    pub fn sound_speed(&self, u: &State) -> f64 {
        (self.gamma * self.pressure(u) / u[0]).sqrt()
    }

    /// Entropy function s = p / ρ^γ.
    pub fn entropy(&self, u: &State) -> f64 {
        self.pressure(u) / u[0].powf(self.gamma)
    }

    /// Total energy density from (ρ, v, T): ρE = p/(γ-1) + ½ ρ|v|².
    pub fn energy_from_prim_t(&self, rho: f64, v: Vec2, t: f64) -> f64 {
        let p = rho * t / (self.gamma * self.mach_inf * self.mach_inf);
        p / (self.gamma - 1.0) + 0.5 * rho * v.norm_squared()
    }

    /// Conservative state from the temperature primitives (ρ, v_x, v_y, T).
    pub fn prim_t_to_cons(&self, prim: &State) -> State {
        let rho = prim[0];
        let v = Vec2::new(prim[1], prim[2]);
        State::new(
            rho,
            rho * v.x,
            rho * v.y,
            self.energy_from_prim_t(rho, v, prim[3]),
        )
    }

    /// Temperature primitives (ρ, v_x, v_y, T) from a conservative state.
    pub fn cons_to_prim_t(&self, u: &State) -> State {
        State::new(u[0], u[1] / u[0], u[2] / u[0], self.temperature(u))
    }

    /// Pressure primitives (ρ, v_x, v_y, p) from a conservative state.
    pub fn cons_to_prim_p(&self, u: &State) -> State {
        State::new(u[0], u[1] / u[0], u[2] / u[0], self.pressure(u))
    }

    /// Conservative state from the pressure primitives (ρ, v_x, v_y, p).
    pub fn prim_p_to_cons(&self, prim: &State) -> State {
        let rho = prim[0];
        let (vx, vy, p) = (prim[1], prim[2], prim[3]);
        State::new(
            rho,
            rho * vx,
            rho * vy,
            p / (self.gamma - 1.0) + 0.5 * rho * (vx * vx + vy * vy),
        )
    }

    /// Free-stream conservative reference: ρ∞ = 1, |v∞| = 1 at angle of
    /// attack α, p∞ = 1/(γ M∞²), so E∞ = 1/((γ-1) γ M∞²) + ½.
    pub fn free_stream(&self, alpha_rad: f64) -> State {
        let p_inf = 1.0 / (self.gamma * self.mach_inf * self.mach_inf);
        State::new(
            1.0,
            alpha_rad.cos(),
            alpha_rad.sin(),
            p_inf / (self.gamma - 1.0) + 0.5,
        )
    }

    /// Free-stream pressure p∞ = 1/(γ M∞²).
    pub fn p_inf(&self) -> f64 {
        1.0 / (self.gamma * self.mach_inf * self.mach_inf)
    }

    /// Local Mach number |v|/c.
    pub fn mach(&self, u: &State) -> f64 {
        let v = Vec2::new(u[1] / u[0], u[2] / u[0]);
        v.norm() / self.sound_speed(u)
    }

    /// True when ρ and p are both strictly positive.
    pub fn is_physical(&self, u: &State) -> bool {
        u[0] > 0.0 && self.pressure(u) > 0.0
    }
}
