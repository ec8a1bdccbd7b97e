//! Boundary closures: the per-marker rule that produces the ghost state
//! from the interior state and the face normal.

use afv_core::{AfvError, AfvResult};
use afv_physics::{Gas, State, Vec2};

/// Ghost-state rule attached to a boundary marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BcRule {
    /// Mirror the normal momentum, keep density and energy.
    SlipWall,
    /// No-slip wall with zero heat flux; the wall may translate
    /// tangentially.
    AdiabaticWall { tangential_velocity: f64 },
    /// No-slip wall at a prescribed temperature.
    IsothermalWall { wall_temperature: f64 },
    /// No-slip wall at a prescribed temperature and pressure.
    IsothermalPressureWall {
        wall_temperature: f64,
        wall_pressure: f64,
    },
    /// Free-stream state everywhere.
    Farfield,
    /// Subsonic in/outflow handled as far field.
    InflowOutflow,
    /// Experimental characteristic in/outflow, selected by the interior
    /// normal Mach number. Must be enabled explicitly in configuration.
    Characteristic,
    /// Handled through the mesh's periodic pairing; no ghost rule.
    Periodic,
}

/// One configured boundary: marker plus rule.
#[derive(Clone, Copy, Debug)]
pub struct BoundarySpec {
    pub marker: i32,
    pub rule: BcRule,
}

impl BcRule {
    /// Compute the ghost state from the interior state `ul` and the
    /// outward unit normal `n`.
    pub fn ghost_state(&self, gas: &Gas, uinf: &State, ul: &State, n: Vec2) -> State {
        match *self {
            Self::SlipWall => {
                let mn = ul[1] * n.x + ul[2] * n.y;
                State::new(ul[0], ul[1] - 2.0 * mn * n.x, ul[2] - 2.0 * mn * n.y, ul[3])
            }
            Self::AdiabaticWall {
                tangential_velocity,
            } => {
                let tangent = Vec2::new(-n.y, n.x);
                let v_wall = tangential_velocity * tangent;
                let v_int = Vec2::new(ul[1] / ul[0], ul[2] / ul[0]);
                let v_ghost = 2.0 * v_wall - v_int;
                let t_int = gas.temperature(ul);
                gas.prim_t_to_cons(&State::new(ul[0], v_ghost.x, v_ghost.y, t_int))
            }
            Self::IsothermalWall { wall_temperature } => {
                let v_int = Vec2::new(ul[1] / ul[0], ul[2] / ul[0]);
                gas.prim_t_to_cons(&State::new(ul[0], -v_int.x, -v_int.y, wall_temperature))
            }
            Self::IsothermalPressureWall {
                wall_temperature,
                wall_pressure,
            } => {
                let rho = gas.gamma * gas.mach_inf * gas.mach_inf * wall_pressure
                    / wall_temperature;
                let v_int = Vec2::new(ul[1] / ul[0], ul[2] / ul[0]);
                gas.prim_t_to_cons(&State::new(rho, -v_int.x, -v_int.y, wall_temperature))
            }
            Self::Farfield | Self::InflowOutflow => *uinf,
            Self::Characteristic => characteristic_ghost(gas, uinf, ul, n),
            // Periodic faces never reach the ghost rule; the mesh links
            // them to their partner cell.
            Self::Periodic => *ul,
        }
    }

    /// Exact ∂u_g/∂u_L where the rule is linear in the interior state;
    /// `None` means the assembler falls back to the identity
    /// approximation.
    pub fn ghost_jacobian(&self, n: Vec2) -> Option<afv_physics::Block> {
        match *self {
            Self::Farfield | Self::InflowOutflow => Some(afv_physics::Block::zeros()),
            Self::SlipWall => {
                // Momentum block I - 2 n nᵀ, identity elsewhere.
                let mut m = afv_physics::Block::identity();
                m[(1, 1)] = 1.0 - 2.0 * n.x * n.x;
                m[(1, 2)] = -2.0 * n.x * n.y;
                m[(2, 1)] = -2.0 * n.x * n.y;
                m[(2, 2)] = 1.0 - 2.0 * n.y * n.y;
                Some(m)
            }
            _ => None,
        }
    }

    /// True for rules describing a solid wall (used for surface-force
    /// output).
    pub fn is_wall(&self) -> bool {
        matches!(
            self,
            Self::SlipWall
                | Self::AdiabaticWall { .. }
                | Self::IsothermalWall { .. }
                | Self::IsothermalPressureWall { .. }
        )
    }
}

/// Characteristic in/outflow by interior normal Mach number: fully
/// supersonic states are taken whole, subsonic ones split pressure from
/// the remaining quantities.
// TODO: replace the pressure/density splitting with one-dimensional
// Riemann invariants along the face normal.
fn characteristic_ghost(gas: &Gas, uinf: &State, ul: &State, n: Vec2) -> State {
    let vn = (ul[1] * n.x + ul[2] * n.y) / ul[0];
    let mach_n = vn / gas.sound_speed(ul);
    if mach_n <= -1.0 {
        // Supersonic inflow: everything from the free stream.
        *uinf
    } else if mach_n >= 1.0 {
        // Supersonic outflow: extrapolate everything.
        *ul
    } else if vn >= 0.0 {
        // Subsonic outflow: free-stream pressure, interior for the rest.
        let mut prim = gas.cons_to_prim_p(ul);
        prim[3] = gas.p_inf();
        gas.prim_p_to_cons(&prim)
    } else {
        // Subsonic inflow: interior pressure, free stream for the rest.
        let mut prim = gas.cons_to_prim_p(uinf);
        prim[3] = gas.pressure(ul);
        gas.prim_p_to_cons(&prim)
    }
}

/// Marker-to-rule lookup table, validated against the mesh.
#[derive(Clone, Debug, Default)]
pub struct BoundaryTable {
    specs: Vec<BoundarySpec>,
}

impl BoundaryTable {
    pub fn new(specs: Vec<BoundarySpec>) -> AfvResult<Self> {
        for (k, spec) in specs.iter().enumerate() {
            if specs[..k].iter().any(|other| other.marker == spec.marker) {
                return Err(AfvError::config(format!(
                    "boundary marker {} is configured twice",
                    spec.marker
                )));
            }
        }
        Ok(Self { specs })
    }

    pub fn rule(&self, marker: i32) -> Option<BcRule> {
        self.specs
            .iter()
            .find(|spec| spec.marker == marker)
            .map(|spec| spec.rule)
    }

    pub fn specs(&self) -> &[BoundarySpec] {
        &self.specs
    }

    pub fn markers(&self) -> Vec<i32> {
        self.specs.iter().map(|spec| spec.marker).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gas() -> Gas {
        Gas::new(1.4, 0.5).unwrap()
    }

    #[test]
    fn slip_wall_mirrors_normal_momentum() {
        let g = gas();
        let uinf = g.free_stream(0.0);
        let ul = g.prim_p_to_cons(&State::new(1.1, 0.4, 0.3, 0.8));
        let n = Vec2::new(0.0, 1.0);
        let ug = BcRule::SlipWall.ghost_state(&g, &uinf, &ul, n);
        assert_relative_eq!(ug[0], ul[0]);
        assert_relative_eq!(ug[1], ul[1]); // tangential momentum kept
        assert_relative_eq!(ug[2], -ul[2]); // normal momentum mirrored
        assert_relative_eq!(ug[3], ul[3]);
        // Average normal velocity at the face vanishes.
        assert_relative_eq!((ul[2] + ug[2]) / 2.0, 0.0);
    }

    #[test]
    fn adiabatic_wall_reverses_velocity_and_keeps_temperature() {
        let g = gas();
        let uinf = g.free_stream(0.0);
        let ul = g.prim_p_to_cons(&State::new(1.0, 0.5, -0.2, 0.9));
        let n = Vec2::new(1.0, 0.0);
        let rule = BcRule::AdiabaticWall {
            tangential_velocity: 0.0,
        };
        let ug = rule.ghost_state(&g, &uinf, &ul, n);
        assert_relative_eq!(ug[1], -ul[1], epsilon = 1e-14);
        assert_relative_eq!(ug[2], -ul[2], epsilon = 1e-14);
        assert_relative_eq!(g.temperature(&ug), g.temperature(&ul), epsilon = 1e-12);
    }

    #[test]
    fn isothermal_wall_imposes_the_setpoint() {
        let g = gas();
        let uinf = g.free_stream(0.0);
        let ul = g.prim_p_to_cons(&State::new(1.0, 0.5, 0.0, 0.9));
        let rule = BcRule::IsothermalWall {
            wall_temperature: 1.3,
        };
        let ug = rule.ghost_state(&g, &uinf, &ul, Vec2::new(0.0, -1.0));
        assert_relative_eq!(g.temperature(&ug), 1.3, epsilon = 1e-12);
        assert_relative_eq!(ug[0], ul[0]);
    }

    #[test]
    fn isothermal_pressure_wall_imposes_both_setpoints() {
        let g = gas();
        let uinf = g.free_stream(0.0);
        let ul = g.prim_p_to_cons(&State::new(1.0, 0.5, 0.0, 0.9));
        let rule = BcRule::IsothermalPressureWall {
            wall_temperature: 1.2,
            wall_pressure: 0.8,
        };
        let ug = rule.ghost_state(&g, &uinf, &ul, Vec2::new(0.0, -1.0));
        assert_relative_eq!(g.temperature(&ug), 1.2, epsilon = 1e-12);
        assert_relative_eq!(g.pressure(&ug), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn far_field_returns_free_stream() {
        let g = gas();
        let uinf = g.free_stream(0.1);
        let ul = g.prim_p_to_cons(&State::new(2.0, -0.5, 0.2, 1.5));
        let ug = BcRule::Farfield.ghost_state(&g, &uinf, &ul, Vec2::new(1.0, 0.0));
        assert_eq!(ug, uinf);
    }

    #[test]
    fn characteristic_picks_regime_by_normal_mach() {
        let g = Gas::new(1.4, 2.0).unwrap();
        let uinf = g.free_stream(0.0);
        let n = Vec2::new(1.0, 0.0);

        // Supersonic outflow extrapolates.
        let ul = g.prim_p_to_cons(&State::new(1.0, 2.0, 0.0, 0.3));
        assert_eq!(BcRule::Characteristic.ghost_state(&g, &uinf, &ul, n), ul);

        // Supersonic inflow takes the free stream.
        let ul = g.prim_p_to_cons(&State::new(1.0, -2.0, 0.0, 0.3));
        assert_eq!(BcRule::Characteristic.ghost_state(&g, &uinf, &ul, n), uinf);

        // Subsonic outflow carries the free-stream pressure.
        let ul = g.prim_p_to_cons(&State::new(1.0, 0.2, 0.0, 0.4));
        let ug = BcRule::Characteristic.ghost_state(&g, &uinf, &ul, n);
        assert_relative_eq!(g.pressure(&ug), g.p_inf(), epsilon = 1e-12);
        assert_relative_eq!(ug[0], ul[0], epsilon = 1e-12);
    }

    #[test]
    fn duplicate_markers_are_rejected() {
        let specs = vec![
            BoundarySpec {
                marker: 2,
                rule: BcRule::SlipWall,
            },
            BoundarySpec {
                marker: 2,
                rule: BcRule::Farfield,
            },
        ];
        assert!(BoundaryTable::new(specs).is_err());
    }
}
