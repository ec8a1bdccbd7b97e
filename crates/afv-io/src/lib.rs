//! Control-file parsing, typed options, and solver output: VTU volumes,
//! surface coefficients, residual history, and run reports.

pub mod control;
pub mod history;
pub mod options;
pub mod post;
pub mod report;
pub mod surface;
pub mod vtu;

pub use control::{ConfigBlock, ConfigValue, parse_control_file, parse_control_str};
pub use history::HistoryWriter;
pub use options::{IoOptions, SolverOptions};
pub use post::{NodalField, entropy_error_l2, nodal_field};
pub use report::RunReport;
pub use surface::{SurfaceCoefficients, surface_coefficients, write_surface_file};
pub use vtu::write_vtu;
