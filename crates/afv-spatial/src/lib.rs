//! Spatial discretization of the compressible flow equations: boundary
//! closures, gradient reconstruction, slope limiting, viscous terms, and
//! residual/Jacobian assembly over a borrowed mesh view.

pub mod bc;
pub mod config;
pub mod gradient;
pub mod limiter;
pub mod linear;
pub mod residual;
pub mod scheme;
pub mod viscous;

pub use bc::{BcRule, BoundarySpec, BoundaryTable};
pub use config::{FlowNumericsConfig, FlowPhysicsConfig};
pub use gradient::{CellGradient, GradientMethod, compute_gradients};
pub use limiter::SlopeLimiter;
pub use linear::{Apply, LinearOperator, StorageKind, SubmitSlot};
pub use residual::FlowScheme;
pub use scheme::SpatialScheme;
pub use viscous::ViscousModel;
