//! Linear-operator storage, Krylov backend, matrix-free Jacobian
//! products, and the pseudo-time steady driver.

pub mod krylov;
pub mod matrix_free;
pub mod operator;
pub mod steady;

pub use krylov::{BlockJacobi, LinearSolveOutcome, LinearSolveParams, bicgstab};
pub use matrix_free::MatrixFreeJacobian;
pub use operator::{FaceBsr, GeneralBsr};
pub use steady::{
    PseudoTimeConfig, PseudoTimeMode, SmoothingParams, SolveReport, SolveState, Stage,
    StageParams, StepRecord, SteadySolver, residual_norm,
};
