//! Machine-readable run summary.

use std::path::Path;

use afv_core::{AfvError, AfvResult};
use afv_solver::SolveReport;
use serde::Serialize;

/// JSON-serializable summary of a finished run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub case: String,
    pub converged: bool,
    pub total_steps: usize,
    pub final_rel_residual: f64,
    pub total_linear_iters: usize,
    pub avg_linear_iters: f64,
    pub assembly_wall_s: f64,
    pub precond_build_wall_s: f64,
    pub precond_apply_wall_s: f64,
    pub linear_solve_wall_s: f64,
    pub total_wall_s: f64,
    /// Entropy-error norm, where the case defines one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy_error: Option<f64>,
}

impl RunReport {
    pub fn from_solve(case: &str, report: &SolveReport, entropy_error: Option<f64>) -> Self {
        Self {
            case: case.to_string(),
            converged: report.converged,
            total_steps: report.total_steps,
            final_rel_residual: report.final_rel_residual,
            total_linear_iters: report.timing.total_linear_iters,
            avg_linear_iters: report.timing.avg_linear_iters(),
            assembly_wall_s: report.timing.assembly_wall_s,
            precond_build_wall_s: report.timing.precond_build_wall_s,
            precond_apply_wall_s: report.timing.precond_apply_wall_s,
            linear_solve_wall_s: report.timing.linear_solve_wall_s,
            total_wall_s: report.timing.total_wall_s,
            entropy_error,
        }
    }

    pub fn write_json(&self, path: &Path) -> AfvResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AfvError::config(format!("cannot serialize run report: {e}")))?;
        std::fs::write(path, text)
            .map_err(|e| AfvError::io(format!("report file {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afv_core::TimingData;
    use afv_solver::SolveState;

    #[test]
    fn report_round_trips_through_json() {
        let solve = SolveReport {
            state: SolveState::Converged,
            converged: true,
            total_steps: 123,
            final_rel_residual: 3.2e-6,
            timing: TimingData {
                num_timesteps: 123,
                total_linear_iters: 600,
                ..Default::default()
            },
        };
        let report = RunReport::from_solve("cylinder", &solve, Some(1e-4));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["case"], "cylinder");
        assert_eq!(value["total_steps"], 123);
        assert_eq!(value["total_linear_iters"], 600);
        assert!(value["entropy_error"].is_number());
    }
}
