//! Shared primitives for the aerofv solver: error taxonomy, numeric
//! helpers, and run timing data.

pub mod error;
pub mod numeric;
pub mod timing;

pub use error::{AfvError, AfvResult};
pub use numeric::{Real, Tolerances, ensure_finite, nearly_equal};
pub use timing::{TimingData, WallTimer};
