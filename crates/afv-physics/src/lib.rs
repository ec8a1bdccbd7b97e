//! Ideal-gas model in nondimensional form.
//!
//! Conservative variables are (ρ, ρv_x, ρv_y, ρE); primitives are
//! (ρ, v_x, v_y, T) with p = ρT/(γ M∞²), or the pressure form
//! (ρ, v_x, v_y, p) used by reconstruction. The free stream is scaled so
//! that ρ∞ = 1 and |v∞| = 1.

mod gas;

pub use gas::{Gas, sutherland_viscosity};

/// Number of conservative variables of the flow system.
pub const NVARS: usize = 4;

/// Conservative or primitive state tuple.
pub type State = nalgebra::SVector<f64, NVARS>;

/// NVARS x NVARS Jacobian block.
pub type Block = nalgebra::SMatrix<f64, NVARS, NVARS>;

/// 2D geometric vector.
pub type Vec2 = nalgebra::Vector2<f64>;
