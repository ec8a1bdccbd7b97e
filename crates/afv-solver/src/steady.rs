//! Pseudo-time continuation to a steady state.
//!
//! Explicit forward Euler or implicit backward Euler with a linear CFL
//! ramp, optional low-fidelity starter stage, positivity backtracking on
//! implicit updates, and per-run timing data.

use std::time::Instant;

use afv_core::{AfvError, AfvResult, TimingData, WallTimer};
use afv_physics::{Block, State};
use afv_spatial::{LinearOperator, SpatialScheme};
use tracing::{debug, info, warn};

use crate::krylov::{BlockJacobi, LinearSolveParams, bicgstab};
use crate::matrix_free::MatrixFreeJacobian;

/// Cap applied to the physical time step of an isolated cell with zero
/// wave-speed integral.
const DT_CAP: f64 = 1e12;

/// Time stepping flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PseudoTimeMode {
    Explicit,
    Implicit,
}

/// CFL ramp and stopping rule for one stage.
#[derive(Clone, Copy, Debug)]
pub struct StageParams {
    pub cfl_min: f64,
    pub cfl_max: f64,
    /// Step at which the ramp leaves `cfl_min`.
    pub ramp_start: usize,
    /// Step at which the ramp reaches `cfl_max`.
    pub ramp_end: usize,
    /// Relative residual tolerance ‖R‖/‖R₀‖.
    pub tolerance: f64,
    pub max_steps: usize,
}

impl StageParams {
    pub fn cfl_at(&self, step: usize) -> f64 {
        if step < self.ramp_start || self.ramp_end <= self.ramp_start {
            if step >= self.ramp_end {
                self.cfl_max
            } else {
                self.cfl_min
            }
        } else if step >= self.ramp_end {
            self.cfl_max
        } else {
            let frac = (step - self.ramp_start) as f64
                / (self.ramp_end - self.ramp_start) as f64;
            self.cfl_min + frac * (self.cfl_max - self.cfl_min)
        }
    }
}

/// Jacobi residual smoothing for the explicit mode.
#[derive(Clone, Copy, Debug)]
pub struct SmoothingParams {
    pub coefficient: f64,
    pub sweeps: usize,
}

/// Full driver configuration.
#[derive(Clone, Debug)]
pub struct PseudoTimeConfig {
    pub mode: PseudoTimeMode,
    pub main: StageParams,
    /// Loose-tolerance starter stage run on the starter scheme.
    pub starter: Option<StageParams>,
    pub smoothing: Option<SmoothingParams>,
    pub linear: LinearSolveParams,
    /// Use the finite-difference Jacobian-vector product for the Krylov
    /// operator; the assembled matrix still preconditions.
    pub matrix_free: bool,
    /// Backtracking budget when an implicit update loses positivity.
    pub positivity_retries: usize,
}

impl PseudoTimeConfig {
    pub fn implicit(main: StageParams) -> Self {
        Self {
            mode: PseudoTimeMode::Implicit,
            main,
            starter: None,
            smoothing: None,
            linear: LinearSolveParams::default(),
            matrix_free: false,
            positivity_retries: 6,
        }
    }

    pub fn explicit(main: StageParams) -> Self {
        Self {
            mode: PseudoTimeMode::Explicit,
            main,
            starter: None,
            smoothing: None,
            linear: LinearSolveParams::default(),
            matrix_free: false,
            positivity_retries: 6,
        }
    }
}

/// Driver state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveState {
    Idle,
    StarterRunning,
    MainRunning,
    Converged,
    Diverged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Starter,
    Main,
}

/// One line of convergence history.
#[derive(Clone, Copy, Debug)]
pub struct StepRecord {
    pub stage: Stage,
    pub step: usize,
    pub cfl: f64,
    pub rel_residual: f64,
    pub wall_time_s: f64,
    pub linear_iters: usize,
}

/// Outcome of a full solve.
#[derive(Clone, Debug)]
pub struct SolveReport {
    pub state: SolveState,
    /// Main stage reached its tolerance (max_steps without NaN still
    /// returns a report, with this false).
    pub converged: bool,
    pub total_steps: usize,
    pub final_rel_residual: f64,
    pub timing: TimingData,
}

type Observer<'o> = Option<&'o mut dyn FnMut(&StepRecord)>;

/// Steady-state pseudo-time driver over borrowed spatial discretizations.
pub struct SteadySolver<'a, S: SpatialScheme> {
    main: &'a S,
    starter: Option<&'a S>,
    config: PseudoTimeConfig,
}

struct StageOutcome {
    converged: bool,
    rel_residual: f64,
    steps: usize,
}

impl<'a, S: SpatialScheme> SteadySolver<'a, S> {
    pub fn new(main: &'a S, starter: Option<&'a S>, config: PseudoTimeConfig) -> Self {
        Self {
            main,
            starter,
            config,
        }
    }

    /// Drive `u` toward R(u) = 0. The operator is required in implicit
    /// mode; the observer sees one record per step.
    pub fn solve(
        &self,
        u: &mut [State],
        mut op: Option<&mut dyn LinearOperator>,
        mut observer: Observer,
    ) -> AfvResult<SolveReport> {
        if self.config.mode == PseudoTimeMode::Implicit && op.is_none() {
            return Err(AfvError::InvalidArg {
                what: "implicit pseudo-time stepping needs a linear operator",
            });
        }
        let run_start = Instant::now();
        let mut timing = TimingData::default();
        let mut state = SolveState::Idle;
        debug!(?state, "pseudo-time driver starting");

        if let (Some(starter), Some(params)) = (self.starter, self.config.starter) {
            state = SolveState::StarterRunning;
            info!(
                ?state,
                max_steps = params.max_steps,
                tolerance = params.tolerance,
                "starter stage"
            );
            let outcome = self.run_stage(
                starter,
                &params,
                Stage::Starter,
                u,
                &mut op,
                &mut observer,
                &mut timing,
                run_start,
            );
            match outcome {
                Ok(out) => {
                    info!(
                        steps = out.steps,
                        rel_residual = out.rel_residual,
                        "starter stage finished"
                    );
                }
                Err(err) => {
                    timing.total_wall_s = run_start.elapsed().as_secs_f64();
                    warn!(stage = ?state, "starter diverged: {err}");
                    return Err(err);
                }
            }
        }

        state = SolveState::MainRunning;
        debug!(?state, "entering main stage");
        let params = self.config.main;
        let outcome = self.run_stage(
            self.main,
            &params,
            Stage::Main,
            u,
            &mut op,
            &mut observer,
            &mut timing,
            run_start,
        );
        timing.total_wall_s = run_start.elapsed().as_secs_f64();
        match outcome {
            Ok(out) => {
                state = SolveState::Converged;
                if !out.converged {
                    warn!(
                        rel_residual = out.rel_residual,
                        max_steps = params.max_steps,
                        "main stage hit the step limit before the tolerance"
                    );
                }
                Ok(SolveReport {
                    state,
                    converged: out.converged,
                    total_steps: timing.num_timesteps,
                    final_rel_residual: out.rel_residual,
                    timing,
                })
            }
            Err(err) => {
                state = SolveState::Diverged;
                warn!(?state, "main stage diverged: {err}");
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_stage(
        &self,
        scheme: &S,
        params: &StageParams,
        stage: Stage,
        u: &mut [State],
        op: &mut Option<&mut dyn LinearOperator>,
        observer: &mut Observer,
        timing: &mut TimingData,
        run_start: Instant,
    ) -> AfvResult<StageOutcome> {
        let n = scheme.n_cells();
        if u.len() != n {
            return Err(AfvError::InvalidArg {
                what: "state vector must have one entry per cell",
            });
        }
        let mut r = vec![State::zeros(); n];
        let mut wave = vec![0.0; n];
        let mut dt = vec![0.0; n];
        let mut r0_norm: Option<f64> = None;
        let mut rel = 1.0;

        for step in 0..params.max_steps {
            let cfl = params.cfl_at(step);

            let timer = WallTimer::start();
            scheme.residual(u, &mut r, &mut wave)?;
            timer.stop_into(&mut timing.assembly_wall_s);

            let rnorm = residual_norm(&r);
            if !rnorm.is_finite() {
                return Err(AfvError::NonFinite {
                    what: "residual norm",
                    value: rnorm,
                });
            }
            let r0 = *r0_norm.get_or_insert(rnorm.max(f64::MIN_POSITIVE));
            rel = rnorm / r0;

            let mut linear_iters = 0;
            if rel < params.tolerance {
                self.emit(observer, stage, step, cfl, rel, run_start, 0);
                debug!(?stage, step, rel, "stage converged");
                return Ok(StageOutcome {
                    converged: true,
                    rel_residual: rel,
                    steps: step,
                });
            }

            for i in 0..n {
                let dt_phys = if wave[i] <= f64::MIN_POSITIVE {
                    DT_CAP
                } else {
                    (scheme.cell_volume(i) / wave[i]).min(DT_CAP)
                };
                dt[i] = cfl * dt_phys;
            }

            match self.config.mode {
                PseudoTimeMode::Explicit => {
                    if let Some(smoothing) = self.config.smoothing {
                        scheme.smooth_residual(&mut r, smoothing.coefficient, smoothing.sweeps);
                    }
                    for i in 0..n {
                        u[i] -= dt[i] / scheme.cell_volume(i) * r[i];
                    }
                }
                PseudoTimeMode::Implicit => {
                    let operator = op
                        .as_mut()
                        .expect("checked at solve entry");
                    linear_iters =
                        self.implicit_step(scheme, u, &r, &dt, &mut **operator, timing)?;
                }
            }
            timing.num_timesteps += 1;
            timing.total_linear_iters += linear_iters;
            self.emit(observer, stage, step, cfl, rel, run_start, linear_iters);
        }
        Ok(StageOutcome {
            converged: rel < params.tolerance,
            rel_residual: rel,
            steps: params.max_steps,
        })
    }

    /// One backward-Euler update: assemble (V/∆t + ∂R/∂u) ∆u = -R, solve,
    /// and apply with positivity backtracking.
    fn implicit_step(
        &self,
        scheme: &S,
        u: &mut [State],
        r: &[State],
        dt: &[f64],
        op: &mut dyn LinearOperator,
        timing: &mut TimingData,
    ) -> AfvResult<usize> {
        let n = scheme.n_cells();

        let timer = WallTimer::start();
        op.reset();
        let mut diag_dt = vec![0.0; n];
        for i in 0..n {
            diag_dt[i] = scheme.cell_volume(i) / dt[i];
            op.update_diag_block(i, &(diag_dt[i] * Block::identity()));
        }
        scheme.assemble_jacobian(u, op)?;
        timer.stop_into(&mut timing.assembly_wall_s);

        let timer = WallTimer::start();
        let precond = BlockJacobi::build(op);
        timer.stop_into(&mut timing.precond_build_wall_s);

        let rhs: Vec<State> = r.iter().map(|ri| -ri).collect();
        let mut du = vec![State::zeros(); n];
        let timer = WallTimer::start();
        let outcome = if self.config.matrix_free {
            let mf = MatrixFreeJacobian::new(scheme, u, r, Some(&diag_dt));
            bicgstab(&mf, &precond, &rhs, &mut du, &self.config.linear)
        } else {
            bicgstab(&*op, &precond, &rhs, &mut du, &self.config.linear)
        };
        timer.stop_into(&mut timing.linear_solve_wall_s);
        timing.precond_apply_wall_s += precond.apply_seconds();
        if !outcome.converged {
            // Continue with the partial update.
            warn!(
                iterations = outcome.iterations,
                residual_ratio = outcome.residual_ratio,
                "linear solver did not converge; continuing with the partial update"
            );
        }

        // Backtrack the update until the state stays physical.
        let mut alpha = 1.0;
        for attempt in 0..=self.config.positivity_retries {
            let ok = (0..n).all(|i| scheme.is_physical(&(u[i] + alpha * du[i])));
            if ok {
                if attempt > 0 {
                    warn!(alpha, "update backtracked to preserve positivity");
                }
                for i in 0..n {
                    u[i] += alpha * du[i];
                }
                return Ok(outcome.iterations);
            }
            alpha *= 0.5;
        }
        Err(AfvError::numeric(
            "implicit update lost positivity past the backtracking budget",
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        observer: &mut Observer,
        stage: Stage,
        step: usize,
        cfl: f64,
        rel: f64,
        run_start: Instant,
        linear_iters: usize,
    ) {
        if let Some(obs) = observer.as_mut() {
            obs(&StepRecord {
                stage,
                step,
                cfl,
                rel_residual: rel,
                wall_time_s: run_start.elapsed().as_secs_f64(),
                linear_iters,
            });
        }
    }
}

/// ‖R‖₂ over all cells and components.
pub fn residual_norm(r: &[State]) -> f64 {
    r.iter().map(|ri| ri.norm_squared()).sum::<f64>().sqrt()
}
