//! Numerical fluxes for the compressible Euler equations.
//!
//! Each variant computes the conservative normal flux across a face and
//! its block Jacobians for implicit assembly. The variants form a closed
//! set selected from configuration; dispatch is a plain `match` so call
//! sites inline.

pub mod euler;
mod hll;
mod llf;
mod roe;
mod van_leer;

use afv_core::{AfvError, AfvResult};
use afv_physics::{Block, Gas, State, Vec2};

pub use euler::{flux_jacobian, max_wave_speed, physical_flux};

/// Default Harten entropy-fix fraction of the Roe sound speed.
pub const DEFAULT_ENTROPY_FIX: f64 = 0.125;

/// Numerical flux selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumFlux {
    /// Local Lax-Friedrichs (Rusanov).
    Llf,
    /// Van Leer flux-vector splitting.
    VanLeer,
    Hll,
    Hllc,
    Roe { entropy_fix: f64 },
}

impl NumFlux {
    /// Parse a configuration name (case-insensitive).
    pub fn from_name(name: &str) -> AfvResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "llf" => Ok(Self::Llf),
            "vanleer" | "van_leer" => Ok(Self::VanLeer),
            "hll" => Ok(Self::Hll),
            "hllc" => Ok(Self::Hllc),
            "roe" => Ok(Self::Roe {
                entropy_fix: DEFAULT_ENTROPY_FIX,
            }),
            other => Err(AfvError::config(format!(
                "unknown inviscid flux '{other}' (expected LLF, VanLeer, HLL, HLLC or Roe)"
            ))),
        }
    }

    /// Conservative normal flux across a face with unit normal `n`.
    pub fn flux(&self, gas: &Gas, ul: &State, ur: &State, n: Vec2) -> State {
        match *self {
            Self::Llf => llf::flux(gas, ul, ur, n),
            Self::VanLeer => van_leer::flux(gas, ul, ur, n),
            Self::Hll => hll::hll_flux(gas, ul, ur, n),
            Self::Hllc => hll::hllc_flux(gas, ul, ur, n),
            Self::Roe { entropy_fix } => roe::flux(gas, ul, ur, n, entropy_fix),
        }
    }

    /// Block Jacobians (∂F/∂u_L, ∂F/∂u_R).
    ///
    /// LLF and Van Leer are exact linearizations; HLL, HLLC and Roe freeze
    /// their wave-speed coefficients.
    pub fn jacobian(&self, gas: &Gas, ul: &State, ur: &State, n: Vec2) -> (Block, Block) {
        match *self {
            Self::Llf => llf::jacobian(gas, ul, ur, n),
            Self::VanLeer => van_leer::jacobian(gas, ul, ur, n),
            Self::Hll => hll::hll_jacobian(gas, ul, ur, n),
            Self::Hllc => hll::hllc_jacobian(gas, ul, ur, n),
            Self::Roe { entropy_fix } => roe::jacobian(gas, ul, ur, n, entropy_fix),
        }
    }

    pub const ALL: [NumFlux; 5] = [
        Self::Llf,
        Self::VanLeer,
        Self::Hll,
        Self::Hllc,
        Self::Roe {
            entropy_fix: DEFAULT_ENTROPY_FIX,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn gas() -> Gas {
        Gas::new(1.4, 0.8).unwrap()
    }

    fn state(rho: f64, vx: f64, vy: f64, p: f64) -> State {
        gas().prim_p_to_cons(&State::new(rho, vx, vy, p))
    }

    fn normals() -> [Vec2; 3] {
        [
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.6, 0.8),
        ]
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(NumFlux::from_name("hllc").unwrap(), NumFlux::Hllc);
        assert_eq!(NumFlux::from_name("HLLC").unwrap(), NumFlux::Hllc);
        assert_eq!(NumFlux::from_name("VanLeer").unwrap(), NumFlux::VanLeer);
        assert!(NumFlux::from_name("roee").is_err());
    }

    #[test]
    fn all_fluxes_are_consistent() {
        // F(u, u, n) must equal the physical flux.
        let g = gas();
        let u = state(1.3, 0.4, -0.2, 0.8);
        for n in normals() {
            let exact = physical_flux(&g, &u, n);
            for scheme in NumFlux::ALL {
                let f = scheme.flux(&g, &u, &u, n);
                for k in 0..4 {
                    assert_relative_eq!(
                        f[k],
                        exact[k],
                        epsilon = 1e-12,
                        max_relative = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn all_fluxes_are_conservative() {
        // F(uL, uR, n) + F(uR, uL, -n) = 0.
        let g = gas();
        let ul = state(1.0, 0.3, 0.1, 0.7);
        let ur = state(0.8, -0.2, 0.4, 1.1);
        for n in normals() {
            for scheme in NumFlux::ALL {
                let f = scheme.flux(&g, &ul, &ur, n);
                let fback = scheme.flux(&g, &ur, &ul, -n);
                for k in 0..4 {
                    assert_relative_eq!(f[k] + fback[k], 0.0, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn exact_jacobians_match_directional_finite_differences() {
        let g = gas();
        let cases = [
            // Subsonic, both sides.
            (state(1.0, 0.3, 0.1, 0.9), state(0.9, 0.25, 0.15, 0.85)),
            // Supersonic left-to-right.
            (state(1.0, 2.6, 0.0, 0.4), state(0.95, 2.5, 0.05, 0.42)),
        ];
        let dir_l = State::new(0.01, -0.02, 0.015, 0.03);
        let dir_r = State::new(-0.015, 0.01, 0.02, -0.025);
        for scheme in [NumFlux::Llf, NumFlux::VanLeer] {
            for (ul, ur) in cases {
                for n in normals() {
                    let (jl, jr) = scheme.jacobian(&g, &ul, &ur, n);
                    let eps = 1e-6;
                    let fp = scheme.flux(&g, &(ul + eps * dir_l), &(ur + eps * dir_r), n);
                    let fm = scheme.flux(&g, &(ul - eps * dir_l), &(ur - eps * dir_r), n);
                    let fd = (fp - fm) / (2.0 * eps);
                    let lin = jl * dir_l + jr * dir_r;
                    for k in 0..4 {
                        assert_relative_eq!(lin[k], fd[k], epsilon = 1e-6, max_relative = 1e-5);
                    }
                }
            }
        }
    }

    #[test]
    fn jacobians_sum_to_the_physical_jacobian_at_equal_states() {
        // With uL = uR the numerical flux reduces to the physical flux, so
        // the two block Jacobians must sum to A(u, n) for every variant.
        let g = gas();
        let u = state(1.1, 0.5, -0.3, 0.95);
        for n in normals() {
            let a = flux_jacobian(&g, &u, n);
            for scheme in NumFlux::ALL {
                let (jl, jr) = scheme.jacobian(&g, &u, &u, n);
                let sum = jl + jr;
                for i in 0..4 {
                    for j in 0..4 {
                        assert_relative_eq!(
                            sum[(i, j)],
                            a[(i, j)],
                            epsilon = 1e-9,
                            max_relative = 1e-9
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn upwinding_picks_the_supersonic_side() {
        let g = gas();
        // Strongly supersonic flow along +n: the upwind-aware schemes must
        // return the left physical flux. (LLF keeps its symmetric
        // dissipation and is deliberately excluded.)
        let ul = state(1.0, 2.8, 0.0, 0.5);
        let ur = state(0.5, 2.9, 0.1, 0.3);
        let n = Vec2::new(1.0, 0.0);
        let exact = physical_flux(&g, &ul, n);
        for scheme in [
            NumFlux::VanLeer,
            NumFlux::Hll,
            NumFlux::Hllc,
            NumFlux::Roe {
                entropy_fix: DEFAULT_ENTROPY_FIX,
            },
        ] {
            let f = scheme.flux(&g, &ul, &ur, n);
            for k in 0..4 {
                assert_relative_eq!(f[k], exact[k], epsilon = 1e-10, max_relative = 1e-10);
            }
        }
    }

    proptest! {
        #[test]
        fn conservation_holds_for_random_states(
            rl in 0.2f64..3.0, pl in 0.1f64..3.0, vxl in -1.5f64..1.5, vyl in -1.5f64..1.5,
            rr in 0.2f64..3.0, pr in 0.1f64..3.0, vxr in -1.5f64..1.5, vyr in -1.5f64..1.5,
            theta in 0.0f64..std::f64::consts::TAU,
        ) {
            let g = gas();
            let ul = state(rl, vxl, vyl, pl);
            let ur = state(rr, vxr, vyr, pr);
            let n = Vec2::new(theta.cos(), theta.sin());
            for scheme in NumFlux::ALL {
                let f = scheme.flux(&g, &ul, &ur, n);
                let fback = scheme.flux(&g, &ur, &ul, -n);
                for k in 0..4 {
                    prop_assert!((f[k] + fback[k]).abs() < 1e-10 * (1.0 + f[k].abs()));
                }
            }
        }
    }
}
