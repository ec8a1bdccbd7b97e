//! HLL and HLLC fluxes with Einfeldt-style wave speed estimates.
//!
//! Both share the frozen-wave-speed linearization: the signal speeds are
//! held fixed while the algebraic flux formula is differentiated, which is
//! the usual implicit-operator treatment for these fluxes.

use afv_physics::{Block, Gas, State, Vec2};

use crate::euler::{FaceQuants, flux_jacobian, physical_flux, quants, roe_average};

/// Left/right signal speed estimates (Roe-average strengthened).
fn wave_speeds(gas: &Gas, ql: &FaceQuants, qr: &FaceQuants, n: Vec2) -> (f64, f64) {
    let avg = roe_average(gas, ql, qr, n);
    let sl = (ql.vn - ql.c).min(avg.vn - avg.c);
    let sr = (qr.vn + qr.c).max(avg.vn + avg.c);
    (sl, sr)
}

pub(crate) fn hll_flux(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> State {
    let ql = quants(gas, ul, n);
    let qr = quants(gas, ur, n);
    let (sl, sr) = wave_speeds(gas, &ql, &qr, n);
    if sl >= 0.0 {
        physical_flux(gas, ul, n)
    } else if sr <= 0.0 {
        physical_flux(gas, ur, n)
    } else {
        let fl = physical_flux(gas, ul, n);
        let fr = physical_flux(gas, ur, n);
        (sr * fl - sl * fr + sl * sr * (ur - ul)) / (sr - sl)
    }
}

pub(crate) fn hll_jacobian(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> (Block, Block) {
    let ql = quants(gas, ul, n);
    let qr = quants(gas, ur, n);
    let (sl, sr) = wave_speeds(gas, &ql, &qr, n);
    frozen_speed_jacobian(gas, ul, ur, n, sl, sr)
}

/// HLLC: restores the contact wave missing from HLL.
pub(crate) fn hllc_flux(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> State {
    let ql = quants(gas, ul, n);
    let qr = quants(gas, ur, n);
    let (sl, sr) = wave_speeds(gas, &ql, &qr, n);

    if sl >= 0.0 {
        return physical_flux(gas, ul, n);
    }
    if sr <= 0.0 {
        return physical_flux(gas, ur, n);
    }

    // Contact speed from the integral relations across the two outer waves.
    let ml = ql.rho * (sl - ql.vn);
    let mr = qr.rho * (sr - qr.vn);
    let sm = (mr * qr.vn - ml * ql.vn + ql.p - qr.p) / (mr - ml);

    if sm >= 0.0 {
        let ustar = star_state(ul, &ql, sl, sm, n);
        physical_flux(gas, ul, n) + sl * (ustar - ul)
    } else {
        let ustar = star_state(ur, &qr, sr, sm, n);
        physical_flux(gas, ur, n) + sr * (ustar - ur)
    }
}

/// Star-region state behind the outer wave with speed `s`.
fn star_state(u: &State, q: &FaceQuants, s: f64, sm: f64, n: Vec2) -> State {
    let rho_star = q.rho * (s - q.vn) / (s - sm);
    let dm = sm - q.vn;
    let e_spec = u[3] / q.rho;
    rho_star
        * State::new(
            1.0,
            q.vx + dm * n.x,
            q.vy + dm * n.y,
            e_spec + dm * (sm + q.p / (q.rho * (s - q.vn))),
        )
}

/// HLLC uses the same frozen-speed linearization as HLL; the contact-wave
/// refinement of the residual flux is not differentiated.
pub(crate) fn hllc_jacobian(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> (Block, Block) {
    hll_jacobian(gas, ul, ur, n)
}

fn frozen_speed_jacobian(
    gas: &Gas,
    ul: &State,
    ur: &State,
    n: Vec2,
    sl: f64,
    sr: f64,
) -> (Block, Block) {
    if sl >= 0.0 {
        return (flux_jacobian(gas, ul, n), Block::zeros());
    }
    if sr <= 0.0 {
        return (Block::zeros(), flux_jacobian(gas, ur, n));
    }
    let inv = 1.0 / (sr - sl);
    let mut jl = inv * sr * flux_jacobian(gas, ul, n);
    let mut jr = -inv * sl * flux_jacobian(gas, ur, n);
    let shift = inv * sl * sr;
    for k in 0..4 {
        jl[(k, k)] -= shift;
        jr[(k, k)] += shift;
    }
    (jl, jr)
}
