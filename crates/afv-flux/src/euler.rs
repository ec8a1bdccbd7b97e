//! Physical Euler normal flux, its exact Jacobian, and the derivative
//! helpers shared by the numerical flux linearizations.

use afv_physics::{Block, Gas, State, Vec2};

/// Frequently needed per-state quantities for a given face normal.
#[derive(Clone, Copy, Debug)]
pub struct FaceQuants {
    pub rho: f64,
    pub vx: f64,
    pub vy: f64,
    /// Normal velocity v·n.
    pub vn: f64,
    /// Squared speed |v|².
    pub q2: f64,
    pub p: f64,
    pub c: f64,
    /// Total specific enthalpy (ρE + p)/ρ.
    pub h: f64,
}

pub fn quants(gas: &Gas, u: &State, n: Vec2) -> FaceQuants {
    let rho = u[0];
    let vx = u[1] / rho;
    let vy = u[2] / rho;
    let p = gas.pressure(u);
    FaceQuants {
        rho,
        vx,
        vy,
        vn: vx * n.x + vy * n.y,
        q2: vx * vx + vy * vy,
        p,
        c: (gas.gamma * p / rho).sqrt(),
        h: (u[3] + p) / rho,
    }
}

/// Conservative normal flux F(u, n).
pub fn physical_flux(gas: &Gas, u: &State, n: Vec2) -> State {
    let q = quants(gas, u, n);
    let mass = q.rho * q.vn;
    State::new(
        mass,
        mass * q.vx + q.p * n.x,
        mass * q.vy + q.p * n.y,
        mass * q.h,
    )
}

/// Exact flux Jacobian A(u, n) = ∂F/∂u.
pub fn flux_jacobian(gas: &Gas, u: &State, n: Vec2) -> Block {
    let g1 = gas.gamma - 1.0;
    let q = quants(gas, u, n);
    let (vx, vy, vn, q2, h) = (q.vx, q.vy, q.vn, q.q2, q.h);
    Block::from_row_slice(&[
        0.0,
        n.x,
        n.y,
        0.0,
        0.5 * g1 * q2 * n.x - vx * vn,
        vn + vx * n.x - g1 * vx * n.x,
        vx * n.y - g1 * vy * n.x,
        g1 * n.x,
        0.5 * g1 * q2 * n.y - vy * vn,
        vy * n.x - g1 * vx * n.y,
        vn + vy * n.y - g1 * vy * n.y,
        g1 * n.y,
        (0.5 * g1 * q2 - h) * vn,
        h * n.x - g1 * vx * vn,
        h * n.y - g1 * vy * vn,
        gas.gamma * vn,
    ])
}

/// Convective spectral radius |v·n| + c.
pub fn max_wave_speed(gas: &Gas, u: &State, n: Vec2) -> f64 {
    let q = quants(gas, u, n);
    q.vn.abs() + q.c
}

// Gradients (w.r.t. conservative variables) of the scalar quantities the
// linearizations need. All take precomputed face quantities.

pub fn grad_vn(q: &FaceQuants, n: Vec2) -> State {
    State::new(-q.vn / q.rho, n.x / q.rho, n.y / q.rho, 0.0)
}

pub fn grad_vx(q: &FaceQuants) -> State {
    State::new(-q.vx / q.rho, 1.0 / q.rho, 0.0, 0.0)
}

pub fn grad_vy(q: &FaceQuants) -> State {
    State::new(-q.vy / q.rho, 0.0, 1.0 / q.rho, 0.0)
}

pub fn grad_q2(q: &FaceQuants) -> State {
    State::new(-2.0 * q.q2 / q.rho, 2.0 * q.vx / q.rho, 2.0 * q.vy / q.rho, 0.0)
}

pub fn grad_p(gas: &Gas, q: &FaceQuants) -> State {
    let g1 = gas.gamma - 1.0;
    State::new(0.5 * g1 * q.q2, -g1 * q.vx, -g1 * q.vy, g1)
}

pub fn grad_c(gas: &Gas, q: &FaceQuants) -> State {
    let mut g = gas.gamma / (2.0 * q.c * q.rho) * grad_p(gas, q);
    g[0] -= q.c / (2.0 * q.rho);
    g
}

/// Gradient of the spectral radius |vn| + c.
pub fn grad_wave_speed(gas: &Gas, q: &FaceQuants, n: Vec2) -> State {
    q.vn.signum() * grad_vn(q, n) + grad_c(gas, q)
}

/// Roe-averaged face state between left and right.
#[derive(Clone, Copy, Debug)]
pub struct RoeAverage {
    pub rho: f64,
    pub vx: f64,
    pub vy: f64,
    pub vn: f64,
    pub q2: f64,
    pub h: f64,
    pub c: f64,
}

pub fn roe_average(gas: &Gas, ql: &FaceQuants, qr: &FaceQuants, n: Vec2) -> RoeAverage {
    let r = (qr.rho / ql.rho).sqrt();
    let w = 1.0 / (1.0 + r);
    let vx = (ql.vx + r * qr.vx) * w;
    let vy = (ql.vy + r * qr.vy) * w;
    let h = (ql.h + r * qr.h) * w;
    let q2 = vx * vx + vy * vy;
    let c2 = (gas.gamma - 1.0) * (h - 0.5 * q2);
    RoeAverage {
        rho: r * ql.rho,
        vx,
        vy,
        vn: vx * n.x + vy * n.y,
        q2,
        h,
        c: c2.max(f64::MIN_POSITIVE).sqrt(),
    }
}
