use thiserror::Error;

pub type AfvResult<T> = Result<T, AfvError>;

/// Top-level error taxonomy for a solver run.
///
/// Configuration and mesh errors are fatal at startup; numeric errors
/// abort the run; linear-solver non-convergence within a step is reported
/// by the driver as a warning, not through this type.
#[derive(Error, Debug)]
pub enum AfvError {
    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Mesh error: {what}")]
    Mesh { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Linear solver error: {what}")]
    LinearSolver { what: String },

    #[error("I/O error for {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

impl AfvError {
    pub fn config(what: impl Into<String>) -> Self {
        Self::Config { what: what.into() }
    }

    pub fn mesh(what: impl Into<String>) -> Self {
        Self::Mesh { what: what.into() }
    }

    pub fn numeric(what: impl Into<String>) -> Self {
        Self::Numeric { what: what.into() }
    }

    pub fn linear_solver(what: impl Into<String>) -> Self {
        Self::LinearSolver { what: what.into() }
    }

    pub fn io(what: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            what: what.into(),
            source,
        }
    }

    /// Stable short tag for the error kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Mesh { .. } => "mesh",
            Self::Numeric { .. } | Self::NonFinite { .. } => "numeric",
            Self::LinearSolver { .. } => "linear-solver",
            Self::Io { .. } => "io",
            Self::InvalidArg { .. } => "invalid-arg",
        }
    }
}
