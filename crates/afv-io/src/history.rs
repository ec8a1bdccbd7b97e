//! Residual-history log (`<prefix>.tlog`).

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use afv_core::{AfvError, AfvResult};
use afv_solver::StepRecord;

/// Line-per-step convergence history writer.
pub struct HistoryWriter {
    path: PathBuf,
    out: BufWriter<std::fs::File>,
}

impl HistoryWriter {
    pub fn create(log_file_prefix: &str) -> AfvResult<Self> {
        let path = PathBuf::from(format!("{log_file_prefix}.tlog"));
        let file = std::fs::File::create(&path)
            .map_err(|e| AfvError::io(format!("history file {}", path.display()), e))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "# step  CFL  rel_residual  wall_time_s")
            .map_err(|e| AfvError::io(format!("history file {}", path.display()), e))?;
        Ok(Self { path, out })
    }

    pub fn record(&mut self, rec: &StepRecord) -> AfvResult<()> {
        writeln!(
            self.out,
            "{} {:.6e} {:.9e} {:.6e}",
            rec.step, rec.cfl, rec.rel_residual, rec.wall_time_s
        )
        .map_err(|e| AfvError::io(format!("history file {}", self.path.display()), e))
    }

    pub fn finish(mut self) -> AfvResult<()> {
        self.out
            .flush()
            .map_err(|e| AfvError::io(format!("history file {}", self.path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afv_solver::Stage;

    #[test]
    fn writes_one_line_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("case").to_string_lossy().into_owned();
        let mut writer = HistoryWriter::create(&prefix).unwrap();
        for step in 0..3 {
            writer
                .record(&StepRecord {
                    stage: Stage::Main,
                    step,
                    cfl: 100.0,
                    rel_residual: 10f64.powi(-(step as i32)),
                    wall_time_s: 0.1 * step as f64,
                    linear_iters: 5,
                })
                .unwrap();
        }
        writer.finish().unwrap();

        let text = std::fs::read_to_string(format!("{prefix}.tlog")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 steps
        assert!(lines[0].starts_with('#'));
        assert!(lines[1].starts_with("0 "));
    }
}
