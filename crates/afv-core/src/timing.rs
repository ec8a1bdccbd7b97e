//! Run timing data: step counts, linear-iteration totals, and wall-time
//! splits for the pieces of an implicit step.

use std::time::Instant;

/// Counters and wall-time splits accumulated by the pseudo-time driver.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimingData {
    /// Number of pseudo-time steps taken.
    pub num_timesteps: usize,
    /// Total linear-solver iterations across all implicit steps.
    pub total_linear_iters: usize,
    /// Wall time spent in residual/Jacobian assembly [s].
    pub assembly_wall_s: f64,
    /// Wall time spent building the preconditioner [s].
    pub precond_build_wall_s: f64,
    /// Wall time spent applying the preconditioner [s].
    pub precond_apply_wall_s: f64,
    /// Wall time spent inside the linear solver [s].
    pub linear_solve_wall_s: f64,
    /// Total wall time of the run [s].
    pub total_wall_s: f64,
}

impl TimingData {
    /// Average linear iterations per implicit step.
    pub fn avg_linear_iters(&self) -> f64 {
        if self.num_timesteps == 0 {
            0.0
        } else {
            self.total_linear_iters as f64 / self.num_timesteps as f64
        }
    }

    /// Merge counters from another run segment (starter + main stages).
    pub fn absorb(&mut self, other: &TimingData) {
        self.num_timesteps += other.num_timesteps;
        self.total_linear_iters += other.total_linear_iters;
        self.assembly_wall_s += other.assembly_wall_s;
        self.precond_build_wall_s += other.precond_build_wall_s;
        self.precond_apply_wall_s += other.precond_apply_wall_s;
        self.linear_solve_wall_s += other.linear_solve_wall_s;
        self.total_wall_s += other.total_wall_s;
    }
}

/// Wall-clock timer for accumulating into a [`TimingData`] field.
pub struct WallTimer {
    start: Instant,
}

impl WallTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed seconds since `start`.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop and add the elapsed time to `slot`.
    pub fn stop_into(self, slot: &mut f64) {
        *slot += self.elapsed_s();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_linear_iters_handles_zero_steps() {
        let timing = TimingData::default();
        assert_eq!(timing.avg_linear_iters(), 0.0);
    }

    #[test]
    fn absorb_sums_counters() {
        let mut a = TimingData {
            num_timesteps: 10,
            total_linear_iters: 50,
            ..Default::default()
        };
        let b = TimingData {
            num_timesteps: 5,
            total_linear_iters: 30,
            ..Default::default()
        };
        a.absorb(&b);
        assert_eq!(a.num_timesteps, 15);
        assert_eq!(a.total_linear_iters, 80);
        assert!((a.avg_linear_iters() - 80.0 / 15.0).abs() < 1e-14);
    }

    #[test]
    fn wall_timer_accumulates() {
        let mut slot = 0.0;
        WallTimer::start().stop_into(&mut slot);
        assert!(slot >= 0.0);
    }
}
