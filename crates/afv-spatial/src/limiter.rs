//! Slope limiting for the second-order face reconstruction.
//!
//! Barth-Jespersen and Venkatakrishnan produce per-cell factors that
//! scale the reconstructed increment; WENO blends the cell gradient with
//! its neighbors' gradients by smoothness; Van Albada limits each face
//! pair along the cell-to-cell line.

use afv_core::{AfvError, AfvResult};
use afv_mesh::Mesh;
use afv_physics::State;
use rayon::prelude::*;

use crate::gradient::CellGradient;

/// Slope limiter variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlopeLimiter {
    #[default]
    None,
    Weno,
    VanAlbada,
    BarthJespersen,
    Venkatakrishnan,
}

impl SlopeLimiter {
    pub fn from_name(name: &str) -> AfvResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "weno" => Ok(Self::Weno),
            "vanalbada" | "van_albada" => Ok(Self::VanAlbada),
            "barthjespersen" | "barth_jespersen" => Ok(Self::BarthJespersen),
            "venkatakrishnan" => Ok(Self::Venkatakrishnan),
            other => Err(AfvError::config(format!(
                "unknown limiter '{other}' (expected none, WENO, VanAlbada, \
                 BarthJespersen or Venkatakrishnan)"
            ))),
        }
    }
}

/// Relative weight of the central gradient in the WENO blend.
const WENO_CENTRAL_WEIGHT: f64 = 1.0e3;
const WENO_EPS: f64 = 1.0e-12;

/// Blend each cell's gradient with its interior neighbors' gradients,
/// weighted by inverse smoothness. Ghost neighbors carry no gradient and
/// are skipped.
pub fn weno_smooth_gradients(mesh: &Mesh, grads: &[CellGradient]) -> Vec<CellGradient> {
    (0..mesh.n_cells())
        .into_par_iter()
        .map(|i| {
            let mut out = [State::zeros(); 2];
            for k in 0..4 {
                let weight_of = |cell: usize, boost: f64| {
                    let gx = grads[cell][0][k];
                    let gy = grads[cell][1][k];
                    let smoothness = gx * gx + gy * gy;
                    boost / ((smoothness + WENO_EPS) * (smoothness + WENO_EPS))
                };
                let mut wsum = weight_of(i, WENO_CENTRAL_WEIGHT);
                let mut gx = wsum * grads[i][0][k];
                let mut gy = wsum * grads[i][1][k];
                for &(face, _) in mesh.cell_faces(i) {
                    if !mesh.is_interior_face(face) {
                        continue;
                    }
                    let f = mesh.face(face);
                    let j = if f.left == i { f.right } else { f.left };
                    let wj = weight_of(j, 1.0);
                    wsum += wj;
                    gx += wj * grads[j][0][k];
                    gy += wj * grads[j][1][k];
                }
                out[0][k] = gx / wsum;
                out[1][k] = gy / wsum;
            }
            out
        })
        .collect()
}

/// Van Albada limited slope from the upwind-biased and central
/// differences across a face pair.
pub fn van_albada_pair(a: f64, b: f64) -> f64 {
    const EPS: f64 = 1.0e-14;
    if a * b <= 0.0 {
        0.0
    } else {
        (a * (b * b + EPS) + b * (a * a + EPS)) / (a * a + b * b + 2.0 * EPS)
    }
}

/// Per-cell limiter factors for Barth-Jespersen and Venkatakrishnan.
///
/// `param` is Venkatakrishnan's K; it is unused by Barth-Jespersen.
pub fn cell_limiter_factors(
    mesh: &Mesh,
    limiter: SlopeLimiter,
    w: &[State],
    wg: &[State],
    grads: &[CellGradient],
    param: f64,
) -> Vec<State> {
    debug_assert!(matches!(
        limiter,
        SlopeLimiter::BarthJespersen | SlopeLimiter::Venkatakrishnan
    ));
    (0..mesh.n_cells())
        .into_par_iter()
        .map(|i| {
            let ri = mesh.cell_centroid(i);

            // Neighborhood bounds, ghosts included.
            let mut wmin = w[i];
            let mut wmax = w[i];
            for &(face, _) in mesh.cell_faces(i) {
                let wj = if mesh.is_interior_face(face) {
                    let f = mesh.face(face);
                    let j = if f.left == i { f.right } else { f.left };
                    w[j]
                } else {
                    wg[face]
                };
                for k in 0..4 {
                    wmin[k] = wmin[k].min(wj[k]);
                    wmax[k] = wmax[k].max(wj[k]);
                }
            }

            let eps2 = {
                let h = mesh.cell_area(i).sqrt();
                let kh = param * h;
                kh * kh * kh
            };

            let mut phi = State::from_element(1.0);
            for &(face, _) in mesh.cell_faces(i) {
                let gp = mesh.face_gauss_point(face, 0, 1);
                let dr = gp - ri;
                for k in 0..4 {
                    let d = grads[i][0][k] * dr.x + grads[i][1][k] * dr.y;
                    if d.abs() <= 1e-14 {
                        continue;
                    }
                    let bound = if d > 0.0 {
                        wmax[k] - w[i][k]
                    } else {
                        wmin[k] - w[i][k]
                    };
                    let factor = match limiter {
                        SlopeLimiter::BarthJespersen => (bound / d).min(1.0),
                        SlopeLimiter::Venkatakrishnan => {
                            let num = (bound * bound + eps2) * d + 2.0 * d * d * bound;
                            let den = bound * bound + 2.0 * d * d + bound * d + eps2;
                            num / (den * d)
                        }
                        _ => 1.0,
                    };
                    phi[k] = phi[k].min(factor.max(0.0));
                }
            }
            phi
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use afv_mesh::GhostPolicy;
    use afv_mesh::structured::{RectMarkers, rect_mesh};
    use crate::gradient::{GradientMethod, compute_gradients};
    use approx::assert_relative_eq;

    fn mesh() -> Mesh {
        let markers = RectMarkers {
            left: 1,
            right: 1,
            bottom: 1,
            top: 1,
        };
        Mesh::build(
            rect_mesh(6, 1, 6.0, 1.0, markers),
            GhostPolicy::ReflectMidpoint,
            None,
        )
        .unwrap()
    }

    fn step_values(mesh: &Mesh) -> (Vec<State>, Vec<State>) {
        // Discontinuous step in the first component, constant elsewhere.
        let value = |x: f64| if x < 3.0 { 0.0 } else { 1.0 };
        let w: Vec<State> = (0..mesh.n_cells())
            .map(|i| State::new(value(mesh.cell_centroid(i).x), 1.0, 0.0, 2.0))
            .collect();
        let wg: Vec<State> = (0..mesh.n_boundary_faces())
            .map(|bf| State::new(value(mesh.ghost_center(bf).x), 1.0, 0.0, 2.0))
            .collect();
        (w, wg)
    }

    #[test]
    fn names_parse() {
        assert_eq!(SlopeLimiter::from_name("WENO").unwrap(), SlopeLimiter::Weno);
        assert_eq!(
            SlopeLimiter::from_name("venkatakrishnan").unwrap(),
            SlopeLimiter::Venkatakrishnan
        );
        assert!(SlopeLimiter::from_name("superbee").is_err());
    }

    #[test]
    fn van_albada_properties() {
        // Opposite signs clip to zero; equal slopes pass through.
        assert_eq!(van_albada_pair(1.0, -0.5), 0.0);
        assert_relative_eq!(van_albada_pair(0.7, 0.7), 0.7, epsilon = 1e-10);
        // Result lies between the two arguments.
        let s = van_albada_pair(0.2, 1.0);
        assert!(s > 0.2 && s < 1.0);
    }

    #[test]
    fn limited_face_values_stay_within_neighborhood_bounds() {
        let mesh = mesh();
        let (w, wg) = step_values(&mesh);
        let grads = compute_gradients(&mesh, GradientMethod::LeastSquares, &w, &wg);
        for limiter in [SlopeLimiter::BarthJespersen, SlopeLimiter::Venkatakrishnan] {
            let phi = cell_limiter_factors(&mesh, limiter, &w, &wg, &grads, 1.0);
            for i in 0..mesh.n_cells() {
                for &(face, _) in mesh.cell_faces(i) {
                    let gp = mesh.face_gauss_point(face, 0, 1);
                    let dr = gp - mesh.cell_centroid(i);
                    for k in 0..4 {
                        let d = grads[i][0][k] * dr.x + grads[i][1][k] * dr.y;
                        let val = w[i][k] + phi[i][k] * d;
                        // Bounds with a little slack for Venkatakrishnan's
                        // smooth cutoff.
                        assert!(val >= -0.05 && val <= 1.05 || k > 0,
                            "cell {i} component {k} reconstructed {val}");
                    }
                }
            }
        }
    }

    #[test]
    fn barth_jespersen_keeps_smooth_slopes() {
        // Linear data must not be clipped away from the extrema cells.
        let mesh = mesh();
        let w: Vec<State> = (0..mesh.n_cells())
            .map(|i| State::from_element(mesh.cell_centroid(i).x))
            .collect();
        let wg: Vec<State> = (0..mesh.n_boundary_faces())
            .map(|bf| State::from_element(mesh.ghost_center(bf).x))
            .collect();
        let grads = compute_gradients(&mesh, GradientMethod::LeastSquares, &w, &wg);
        let phi =
            cell_limiter_factors(&mesh, SlopeLimiter::BarthJespersen, &w, &wg, &grads, 1.0);
        for i in 0..mesh.n_cells() {
            for k in 0..4 {
                assert_relative_eq!(phi[i][k], 1.0, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn weno_smoothing_preserves_uniform_gradients() {
        let mesh = mesh();
        let uniform: Vec<CellGradient> =
            vec![[State::from_element(0.5), State::from_element(-0.25)]; mesh.n_cells()];
        let smoothed = weno_smooth_gradients(&mesh, &uniform);
        for g in &smoothed {
            for k in 0..4 {
                assert_relative_eq!(g[0][k], 0.5, epsilon = 1e-12);
                assert_relative_eq!(g[1][k], -0.25, epsilon = 1e-12);
            }
        }
    }
}
