//! Matrix-free Jacobian-vector product by finite differencing the
//! residual.

use afv_physics::State;
use afv_spatial::{Apply, SpatialScheme};

/// J v ≈ (R(u + h v) - R(u)) / h with h = ε/‖v‖ and ε = √(machine
/// epsilon)/10, optionally composed with the pseudo-time diagonal
/// A_i/∆t_i.
pub struct MatrixFreeJacobian<'a, S: SpatialScheme> {
    scheme: &'a S,
    u: &'a [State],
    r0: &'a [State],
    /// Pseudo-time diagonal entries A_i/∆t_i, if the product should
    /// include them.
    diag: Option<&'a [f64]>,
    eps: f64,
}

impl<'a, S: SpatialScheme> MatrixFreeJacobian<'a, S> {
    pub fn new(scheme: &'a S, u: &'a [State], r0: &'a [State], diag: Option<&'a [f64]>) -> Self {
        Self {
            scheme,
            u,
            r0,
            diag,
            eps: f64::EPSILON.sqrt() / 10.0,
        }
    }
}

impl<S: SpatialScheme> Apply for MatrixFreeJacobian<'_, S> {
    fn apply(&self, v: &[State], y: &mut [State]) {
        let n = self.u.len();
        let vnorm = v.iter().map(|vi| vi.norm_squared()).sum::<f64>().sqrt();
        if vnorm == 0.0 {
            y.iter_mut().for_each(|yi| *yi = State::zeros());
            return;
        }
        let h = self.eps / vnorm;

        let mut perturbed = self.u.to_vec();
        for i in 0..n {
            perturbed[i] += h * v[i];
        }
        let mut r = vec![State::zeros(); n];
        let mut wave = vec![0.0; n];
        self.scheme
            .residual(&perturbed, &mut r, &mut wave)
            .expect("buffer sizes fixed at construction");

        for i in 0..n {
            y[i] = (r[i] - self.r0[i]) / h;
            if let Some(diag) = self.diag {
                y[i] += diag[i] * v[i];
            }
        }
    }
}
