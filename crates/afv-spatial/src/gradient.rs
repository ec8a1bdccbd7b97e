//! Cell-gradient reconstruction over cell averages and boundary ghost
//! values.

use afv_core::{AfvError, AfvResult};
use afv_mesh::{Mesh, Point};
use afv_physics::State;
use rayon::prelude::*;

/// Per-cell gradient: d/dx and d/dy of each state component.
pub type CellGradient = [State; 2];

/// Gradient reconstruction variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientMethod {
    /// Zero gradients; selects a first-order scheme.
    None,
    /// Weighted least squares over face neighbors (1/r² weights).
    #[default]
    LeastSquares,
    /// Green-Gauss contour integral.
    GreenGauss,
}

impl GradientMethod {
    pub fn from_name(name: &str) -> AfvResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "leastsquares" | "least_squares" => Ok(Self::LeastSquares),
            "greengauss" | "green_gauss" => Ok(Self::GreenGauss),
            other => Err(AfvError::config(format!(
                "unknown gradient method '{other}' (expected none, leastSquares or greenGauss)"
            ))),
        }
    }
}

/// Neighbor of a cell across one of its faces: position and value, ghost
/// entries included.
fn neighbor(mesh: &Mesh, w: &[State], wg: &[State], face: usize, cell: usize) -> (Point, State) {
    let f = mesh.face(face);
    if mesh.is_interior_face(face) {
        let j = if f.left == cell { f.right } else { f.left };
        (mesh.cell_centroid(j), w[j])
    } else {
        // Boundary (or periodic) face: the ghost center and ghost value.
        (mesh.ghost_center(face), wg[face])
    }
}

/// Compute per-cell gradients of `w` given ghost values `wg` (indexed by
/// boundary face).
pub fn compute_gradients(
    mesh: &Mesh,
    method: GradientMethod,
    w: &[State],
    wg: &[State],
) -> Vec<CellGradient> {
    match method {
        GradientMethod::None => vec![[State::zeros(); 2]; mesh.n_cells()],
        GradientMethod::LeastSquares => least_squares(mesh, w, wg),
        GradientMethod::GreenGauss => green_gauss(mesh, w, wg),
    }
}

fn least_squares(mesh: &Mesh, w: &[State], wg: &[State]) -> Vec<CellGradient> {
    (0..mesh.n_cells())
        .into_par_iter()
        .map(|i| {
            let ri = mesh.cell_centroid(i);
            let (mut a11, mut a12, mut a22) = (0.0, 0.0, 0.0);
            let mut bx = State::zeros();
            let mut by = State::zeros();
            for &(face, _) in mesh.cell_faces(i) {
                let (rj, wj) = neighbor(mesh, w, wg, face, i);
                let d = rj - ri;
                let r2 = d.norm_squared();
                if r2 <= f64::EPSILON {
                    continue;
                }
                let weight = 1.0 / r2;
                a11 += weight * d.x * d.x;
                a12 += weight * d.x * d.y;
                a22 += weight * d.y * d.y;
                let dw = wj - w[i];
                bx += weight * d.x * dw;
                by += weight * d.y * dw;
            }
            let det = a11 * a22 - a12 * a12;
            if det.abs() <= f64::EPSILON {
                return [State::zeros(); 2];
            }
            let gx = (a22 * bx - a12 * by) / det;
            let gy = (a11 * by - a12 * bx) / det;
            [gx, gy]
        })
        .collect()
}

fn green_gauss(mesh: &Mesh, w: &[State], wg: &[State]) -> Vec<CellGradient> {
    (0..mesh.n_cells())
        .into_par_iter()
        .map(|i| {
            let mut gx = State::zeros();
            let mut gy = State::zeros();
            for &(face, sign) in mesh.cell_faces(i) {
                let f = mesh.face(face);
                let (_, wj) = neighbor(mesh, w, wg, face, i);
                let avg = 0.5 * (w[i] + wj);
                gx += sign * f.normal.x * f.length * avg;
                gy += sign * f.normal.y * f.length * avg;
            }
            let inv_area = 1.0 / mesh.cell_area(i);
            [inv_area * gx, inv_area * gy]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use afv_mesh::structured::{RectMarkers, rect_mesh};
    use afv_mesh::GhostPolicy;
    use approx::assert_relative_eq;

    fn linear_field(p: Point) -> State {
        // w = a + b x + c y per component, different coefficients each.
        State::new(
            1.0 + 2.0 * p.x - 1.0 * p.y,
            0.5 - 0.3 * p.x + 0.7 * p.y,
            -0.2 + 1.1 * p.x + 0.4 * p.y,
            3.0 + 0.9 * p.x - 2.2 * p.y,
        )
    }

    const GX: [f64; 4] = [2.0, -0.3, 1.1, 0.9];
    const GY: [f64; 4] = [-1.0, 0.7, 0.4, -2.2];

    fn setup() -> (Mesh, Vec<State>, Vec<State>) {
        let markers = RectMarkers {
            left: 1,
            right: 1,
            bottom: 1,
            top: 1,
        };
        let mesh = Mesh::build(
            rect_mesh(5, 4, 1.0, 1.0, markers),
            GhostPolicy::ReflectMidpoint,
            None,
        )
        .unwrap();
        let w: Vec<State> = (0..mesh.n_cells())
            .map(|i| linear_field(mesh.cell_centroid(i)))
            .collect();
        let wg: Vec<State> = (0..mesh.n_boundary_faces())
            .map(|bf| linear_field(mesh.ghost_center(bf)))
            .collect();
        (mesh, w, wg)
    }

    #[test]
    fn least_squares_is_exact_for_linear_fields() {
        let (mesh, w, wg) = setup();
        let grads = compute_gradients(&mesh, GradientMethod::LeastSquares, &w, &wg);
        for g in &grads {
            for k in 0..4 {
                assert_relative_eq!(g[0][k], GX[k], epsilon = 1e-10);
                assert_relative_eq!(g[1][k], GY[k], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn green_gauss_is_exact_for_linear_fields_on_uniform_quads() {
        let (mesh, w, wg) = setup();
        let grads = compute_gradients(&mesh, GradientMethod::GreenGauss, &w, &wg);
        for g in &grads {
            for k in 0..4 {
                assert_relative_eq!(g[0][k], GX[k], epsilon = 1e-10);
                assert_relative_eq!(g[1][k], GY[k], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn none_returns_zero_gradients() {
        let (mesh, w, wg) = setup();
        let grads = compute_gradients(&mesh, GradientMethod::None, &w, &wg);
        assert!(grads.iter().all(|g| g[0] == State::zeros() && g[1] == State::zeros()));
    }

    #[test]
    fn names_parse() {
        assert_eq!(
            GradientMethod::from_name("leastSquares").unwrap(),
            GradientMethod::LeastSquares
        );
        assert_eq!(
            GradientMethod::from_name("GREENGAUSS").unwrap(),
            GradientMethod::GreenGauss
        );
        assert!(GradientMethod::from_name("cubic").is_err());
    }
}
