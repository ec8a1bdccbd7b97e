//! Van Leer flux-vector splitting with its exact Jacobian.

use afv_physics::{Block, Gas, State, Vec2};

use crate::euler::{
    flux_jacobian, grad_c, grad_q2, grad_vn, grad_vx, grad_vy, physical_flux, quants,
};

pub(crate) fn flux(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> State {
    split(gas, ul, n, 1.0).0 + split(gas, ur, n, -1.0).0
}

pub(crate) fn jacobian(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> (Block, Block) {
    (split(gas, ul, n, 1.0).1, split(gas, ur, n, -1.0).1)
}

/// One-sided split flux F± and its Jacobian with respect to its own state.
/// `side` is +1 for the forward-moving part, -1 for the backward part.
fn split(gas: &Gas, u: &State, n: Vec2, side: f64) -> (State, Block) {
    let g = gas.gamma;
    let g1 = g - 1.0;
    let q = quants(gas, u, n);
    let m = q.vn / q.c;

    // Supersonic: the full flux travels on one side, nothing on the other.
    if side * m >= 1.0 {
        return (physical_flux(gas, u, n), flux_jacobian(gas, u, n));
    }
    if side * m <= -1.0 {
        return (State::zeros(), Block::zeros());
    }

    // Subsonic split. a = vn ± c; mass flux fm = ±ρ a²/(4c).
    let a = q.vn + side * q.c;
    let fm = side * q.rho * a * a / (4.0 * q.c);
    let b1 = q.vx + n.x * (2.0 * side * q.c - q.vn) / g;
    let b2 = q.vy + n.y * (2.0 * side * q.c - q.vn) / g;
    let w = g1 * q.vn + 2.0 * side * q.c;
    let b3 = w * w / (2.0 * (g * g - 1.0)) + 0.5 * (q.q2 - q.vn * q.vn);
    let f = fm * State::new(1.0, b1, b2, b3);

    let d_vn = grad_vn(&q, n);
    let d_c = grad_c(gas, &q);
    let d_rho = State::new(1.0, 0.0, 0.0, 0.0);
    let d_a = d_vn + side * d_c;

    let d_fm = side
        * (a * a / (4.0 * q.c) * d_rho + q.rho * a / (2.0 * q.c) * d_a
            - q.rho * a * a / (4.0 * q.c * q.c) * d_c);
    let d_b1 = grad_vx(&q) + n.x / g * (2.0 * side * d_c - d_vn);
    let d_b2 = grad_vy(&q) + n.y / g * (2.0 * side * d_c - d_vn);
    let d_b3 = w / (g * g - 1.0) * (g1 * d_vn + 2.0 * side * d_c) + 0.5 * grad_q2(&q)
        - q.vn * d_vn;

    let b = State::new(1.0, b1, b2, b3);
    let mut jac = b * d_fm.transpose();
    for j in 0..4 {
        jac[(1, j)] += fm * d_b1[j];
        jac[(2, j)] += fm * d_b2[j];
        jac[(3, j)] += fm * d_b3[j];
    }
    (f, jac)
}
