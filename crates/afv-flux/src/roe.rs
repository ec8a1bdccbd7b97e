//! Roe flux with Harten entropy fix.
//!
//! The residual flux uses the full wave decomposition. The Jacobian holds
//! the Roe dissipation matrix |A~| fixed (frozen-coefficient
//! linearization): ∂F/∂u_L ≈ ½(A_L + |A~|), ∂F/∂u_R ≈ ½(A_R - |A~|).

use afv_physics::{Block, Gas, State, Vec2};

use crate::euler::{RoeAverage, flux_jacobian, physical_flux, quants, roe_average};

/// Harten's smoothing of |λ| below the threshold δ.
fn fixed_abs(lambda: f64, delta: f64) -> f64 {
    let a = lambda.abs();
    if a < delta {
        0.5 * (lambda * lambda / delta + delta)
    } else {
        a
    }
}

/// Eigenvalues (λ1, λ2=λ3, λ4) with the entropy fix applied to the
/// acoustic pair.
fn eigenvalues(avg: &RoeAverage, entropy_fix: f64) -> (f64, f64, f64) {
    let delta = entropy_fix * avg.c;
    (
        fixed_abs(avg.vn - avg.c, delta),
        avg.vn.abs(),
        fixed_abs(avg.vn + avg.c, delta),
    )
}

/// Right eigenvectors of the normal-projected Euler Jacobian at the Roe
/// average, in the order (vn-c, vn, vn, vn+c).
fn eigenvectors(avg: &RoeAverage, n: Vec2) -> [State; 4] {
    let t = Vec2::new(-n.y, n.x);
    let vt = avg.vx * t.x + avg.vy * t.y;
    [
        State::new(
            1.0,
            avg.vx - avg.c * n.x,
            avg.vy - avg.c * n.y,
            avg.h - avg.c * avg.vn,
        ),
        State::new(1.0, avg.vx, avg.vy, 0.5 * avg.q2),
        State::new(0.0, t.x, t.y, vt),
        State::new(
            1.0,
            avg.vx + avg.c * n.x,
            avg.vy + avg.c * n.y,
            avg.h + avg.c * avg.vn,
        ),
    ]
}

pub(crate) fn flux(
    gas: &Gas,
    ul: &State,
    ur: &State,
    n: Vec2,
    entropy_fix: f64,
) -> State {
    let ql = quants(gas, ul, n);
    let qr = quants(gas, ur, n);
    let avg = roe_average(gas, &ql, &qr, n);
    let (l1, l2, l4) = eigenvalues(&avg, entropy_fix);

    let t = Vec2::new(-n.y, n.x);
    let d_rho = qr.rho - ql.rho;
    let d_p = qr.p - ql.p;
    let d_vn = qr.vn - ql.vn;
    let d_vt = (qr.vx - ql.vx) * t.x + (qr.vy - ql.vy) * t.y;

    let c2 = avg.c * avg.c;
    let a1 = (d_p - avg.rho * avg.c * d_vn) / (2.0 * c2);
    let a2 = d_rho - d_p / c2;
    let a3 = avg.rho * d_vt;
    let a4 = (d_p + avg.rho * avg.c * d_vn) / (2.0 * c2);

    let [k1, k2, k3, k4] = eigenvectors(&avg, n);
    let dissipation = l1 * a1 * k1 + l2 * a2 * k2 + l2 * a3 * k3 + l4 * a4 * k4;

    0.5 * (physical_flux(gas, ul, n) + physical_flux(gas, ur, n)) - 0.5 * dissipation
}

pub(crate) fn jacobian(
    gas: &Gas,
    ul: &State,
    ur: &State,
    n: Vec2,
    entropy_fix: f64,
) -> (Block, Block) {
    let ql = quants(gas, ul, n);
    let qr = quants(gas, ur, n);
    let avg = roe_average(gas, &ql, &qr, n);
    let (l1, l2, l4) = eigenvalues(&avg, entropy_fix);

    let r = Block::from_columns(&eigenvectors(&avg, n));
    let abs_a = match r.try_inverse() {
        Some(rinv) => {
            let lam = Block::from_diagonal(&State::new(l1, l2, l2, l4));
            r * lam * rinv
        }
        // Degenerate average state; fall back to scalar dissipation.
        None => {
            let lmax = l1.max(l2).max(l4);
            Block::from_diagonal_element(lmax)
        }
    };

    let jl = 0.5 * (flux_jacobian(gas, ul, n) + abs_a);
    let jr = 0.5 * (flux_jacobian(gas, ur, n) - abs_a);
    (jl, jr)
}
