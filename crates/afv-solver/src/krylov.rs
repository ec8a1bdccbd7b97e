//! Block-Jacobi preconditioned BiCGStab over the apply contract.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use afv_physics::{Block, State};
use afv_spatial::{Apply, LinearOperator};
use tracing::{debug, warn};

/// Tolerance and iteration cap for one linear solve.
#[derive(Clone, Copy, Debug)]
pub struct LinearSolveParams {
    pub rel_tol: f64,
    pub max_iters: usize,
}

impl Default for LinearSolveParams {
    fn default() -> Self {
        Self {
            rel_tol: 1e-4,
            max_iters: 200,
        }
    }
}

/// What one linear solve did.
#[derive(Clone, Copy, Debug)]
pub struct LinearSolveOutcome {
    pub iterations: usize,
    pub converged: bool,
    pub residual_ratio: f64,
}

/// Inverted diagonal blocks, applied as M⁻¹.
pub struct BlockJacobi {
    inv_diag: Vec<Block>,
    apply_ns: AtomicU64,
}

impl BlockJacobi {
    /// Invert every diagonal block of the assembled operator. A singular
    /// block falls back to the identity with a warning.
    pub fn build(op: &dyn LinearOperator) -> Self {
        let inv_diag = op
            .diag_blocks()
            .iter()
            .enumerate()
            .map(|(i, d)| {
                d.try_inverse().unwrap_or_else(|| {
                    warn!(cell = i, "singular diagonal block; preconditioning with identity");
                    Block::identity()
                })
            })
            .collect();
        Self {
            inv_diag,
            apply_ns: AtomicU64::new(0),
        }
    }

    pub fn apply(&self, x: &[State], y: &mut [State]) {
        let start = Instant::now();
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.inv_diag[i] * x[i];
        }
        self.apply_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }

    /// Total wall time spent in `apply` [s].
    pub fn apply_seconds(&self) -> f64 {
        self.apply_ns.load(Ordering::Relaxed) as f64 / 1e9
    }
}

fn dot(a: &[State], b: &[State]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.dot(y)).sum()
}

fn norm(a: &[State]) -> f64 {
    dot(a, a).sqrt()
}

/// Solve A x = b with right block-Jacobi preconditioning. `x` enters as
/// the initial guess and leaves holding the best iterate; non-convergence
/// is reported, not an error, so the caller can continue with the partial
/// update.
pub fn bicgstab(
    a: &dyn Apply,
    precond: &BlockJacobi,
    b: &[State],
    x: &mut [State],
    params: &LinearSolveParams,
) -> LinearSolveOutcome {
    let n = b.len();
    let b_norm = norm(b);
    if b_norm == 0.0 {
        x.iter_mut().for_each(|xi| *xi = State::zeros());
        return LinearSolveOutcome {
            iterations: 0,
            converged: true,
            residual_ratio: 0.0,
        };
    }

    let mut r = vec![State::zeros(); n];
    a.apply(x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }
    let rhat = r.clone();

    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut p = vec![State::zeros(); n];
    let mut v = vec![State::zeros(); n];
    let mut phat = vec![State::zeros(); n];
    let mut shat = vec![State::zeros(); n];
    let mut t = vec![State::zeros(); n];
    let mut ratio = norm(&r) / b_norm;

    for iter in 0..params.max_iters {
        if ratio < params.rel_tol {
            debug!(iterations = iter, ratio, "linear solve converged");
            return LinearSolveOutcome {
                iterations: iter,
                converged: true,
                residual_ratio: ratio,
            };
        }

        let rho_new = dot(&rhat, &r);
        if rho_new.abs() < f64::MIN_POSITIVE || omega == 0.0 {
            // Breakdown; report what we have.
            return LinearSolveOutcome {
                iterations: iter,
                converged: false,
                residual_ratio: ratio,
            };
        }
        let beta = (rho_new / rho) * (alpha / omega);
        for i in 0..n {
            p[i] = r[i] + beta * (p[i] - omega * v[i]);
        }
        precond.apply(&p, &mut phat);
        a.apply(&phat, &mut v);
        let denom = dot(&rhat, &v);
        if denom.abs() < f64::MIN_POSITIVE {
            return LinearSolveOutcome {
                iterations: iter,
                converged: false,
                residual_ratio: ratio,
            };
        }
        alpha = rho_new / denom;

        // s lives in r from here on.
        for i in 0..n {
            r[i] -= alpha * v[i];
        }
        if norm(&r) / b_norm < params.rel_tol {
            for i in 0..n {
                x[i] += alpha * phat[i];
            }
            return LinearSolveOutcome {
                iterations: iter + 1,
                converged: true,
                residual_ratio: norm(&r) / b_norm,
            };
        }
        precond.apply(&r, &mut shat);
        a.apply(&shat, &mut t);
        let tt = dot(&t, &t);
        if tt < f64::MIN_POSITIVE {
            return LinearSolveOutcome {
                iterations: iter + 1,
                converged: false,
                residual_ratio: ratio,
            };
        }
        omega = dot(&t, &r) / tt;
        for i in 0..n {
            x[i] += alpha * phat[i] + omega * shat[i];
            r[i] -= omega * t[i];
        }
        rho = rho_new;
        ratio = norm(&r) / b_norm;
    }

    LinearSolveOutcome {
        iterations: params.max_iters,
        converged: ratio < params.rel_tol,
        residual_ratio: ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::GeneralBsr;
    use afv_spatial::SubmitSlot;
    use approx::assert_relative_eq;

    /// Diagonally dominant 3-cell block system.
    fn test_system() -> (GeneralBsr, Vec<State>) {
        let mut op = GeneralBsr::new(3);
        for i in 0..3 {
            let mut d = 4.0 * Block::identity();
            d[(0, 1)] = 0.5;
            d[(2, 3)] = -0.25;
            op.update_diag_block(i, &d);
        }
        let mut off = Block::zeros();
        for k in 0..4 {
            off[(k, k)] = -1.0;
        }
        op.submit_block(0, 1, &off, SubmitSlot::Pair);
        op.submit_block(1, 0, &off, SubmitSlot::Pair);
        op.submit_block(1, 2, &off, SubmitSlot::Pair);
        op.submit_block(2, 1, &off, SubmitSlot::Pair);
        let b = vec![
            State::new(1.0, 0.0, -2.0, 1.5),
            State::new(0.5, 1.0, 0.0, -1.0),
            State::new(-0.25, 2.0, 1.0, 0.0),
        ];
        (op, b)
    }

    #[test]
    fn solves_block_tridiagonal_system() {
        let (op, b) = test_system();
        let precond = BlockJacobi::build(&op);
        let mut x = vec![State::zeros(); 3];
        let params = LinearSolveParams {
            rel_tol: 1e-12,
            max_iters: 100,
        };
        let outcome = bicgstab(&op, &precond, &b, &mut x, &params);
        assert!(outcome.converged, "ratio {}", outcome.residual_ratio);

        let mut ax = vec![State::zeros(); 3];
        op.apply(&x, &mut ax);
        for i in 0..3 {
            for k in 0..4 {
                assert_relative_eq!(ax[i][k], b[i][k], epsilon = 1e-9, max_relative = 1e-9);
            }
        }
        assert!(precond.apply_seconds() >= 0.0);
    }

    #[test]
    fn zero_rhs_returns_zero() {
        let (op, _) = test_system();
        let precond = BlockJacobi::build(&op);
        let b = vec![State::zeros(); 3];
        let mut x = vec![State::from_element(7.0); 3];
        let outcome = bicgstab(&op, &precond, &b, &mut x, &LinearSolveParams::default());
        assert!(outcome.converged);
        assert!(x.iter().all(|xi| *xi == State::zeros()));
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let (op, b) = test_system();
        let precond = BlockJacobi::build(&op);
        let mut x = vec![State::zeros(); 3];
        let params = LinearSolveParams {
            rel_tol: 1e-14,
            max_iters: 1,
        };
        let outcome = bicgstab(&op, &precond, &b, &mut x, &params);
        assert!(!outcome.converged);
        assert!(outcome.iterations <= 1);
    }
}
