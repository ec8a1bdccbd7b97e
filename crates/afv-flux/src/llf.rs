//! Local Lax-Friedrichs (Rusanov) flux with its exact Jacobian.

use afv_physics::{Block, Gas, State, Vec2};

use crate::euler::{
    flux_jacobian, grad_wave_speed, max_wave_speed, physical_flux, quants,
};

pub(crate) fn flux(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> State {
    let fl = physical_flux(gas, ul, n);
    let fr = physical_flux(gas, ur, n);
    let lambda = max_wave_speed(gas, ul, n).max(max_wave_speed(gas, ur, n));
    0.5 * (fl + fr) - 0.5 * lambda * (ur - ul)
}

/// Exact linearization, including the dissipation's dependence on the
/// dominant wave speed.
pub(crate) fn jacobian(gas: &Gas, ul: &State, ur: &State, n: Vec2) -> (Block, Block) {
    let ql = quants(gas, ul, n);
    let qr = quants(gas, ur, n);
    let lam_l = ql.vn.abs() + ql.c;
    let lam_r = qr.vn.abs() + qr.c;
    let lambda = lam_l.max(lam_r);
    let du = ur - ul;

    let mut jl = 0.5 * flux_jacobian(gas, ul, n);
    let mut jr = 0.5 * flux_jacobian(gas, ur, n);
    for k in 0..4 {
        jl[(k, k)] += 0.5 * lambda;
        jr[(k, k)] -= 0.5 * lambda;
    }
    // dλ/du lives on whichever side carries the maximum.
    if lam_l >= lam_r {
        let dlam = grad_wave_speed(gas, &ql, n);
        jl -= 0.5 * du * dlam.transpose();
    } else {
        let dlam = grad_wave_speed(gas, &qr, n);
        jr -= 0.5 * du * dlam.transpose();
    }
    (jl, jr)
}
