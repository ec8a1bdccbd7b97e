//! Post-processed fields: nodal averages for volume output and the
//! entropy-error norm for verification cases.

use afv_mesh::Mesh;
use afv_physics::{Gas, State};

/// Node-centered output fields.
#[derive(Clone, Debug)]
pub struct NodalField {
    pub density: Vec<f64>,
    pub mach: Vec<f64>,
    pub pressure: Vec<f64>,
    pub velocity: Vec<[f64; 2]>,
}

/// Inverse-distance average of the cell-centered solution onto the nodes.
pub fn nodal_field(mesh: &Mesh, gas: &Gas, u: &[State]) -> NodalField {
    let n_nodes = mesh.n_nodes();
    let mut weight_sum = vec![0.0; n_nodes];
    let mut density = vec![0.0; n_nodes];
    let mut mach = vec![0.0; n_nodes];
    let mut pressure = vec![0.0; n_nodes];
    let mut velocity = vec![[0.0; 2]; n_nodes];

    for i in 0..mesh.n_cells() {
        let center = mesh.cell_centroid(i);
        let prim = gas.cons_to_prim_p(&u[i]);
        let cell_mach = gas.mach(&u[i]);
        for &node in mesh.cell_nodes(i) {
            let d = (mesh.node(node) - center).norm().max(f64::MIN_POSITIVE);
            let w = 1.0 / d;
            weight_sum[node] += w;
            density[node] += w * prim[0];
            mach[node] += w * cell_mach;
            pressure[node] += w * prim[3];
            velocity[node][0] += w * prim[1];
            velocity[node][1] += w * prim[2];
        }
    }
    for node in 0..n_nodes {
        let w = weight_sum[node].max(f64::MIN_POSITIVE);
        density[node] /= w;
        mach[node] /= w;
        pressure[node] /= w;
        velocity[node][0] /= w;
        velocity[node][1] /= w;
    }
    NodalField {
        density,
        mach,
        pressure,
        velocity,
    }
}

/// Area-weighted L2 norm of the relative entropy error s/s∞ - 1.
pub fn entropy_error_l2(mesh: &Mesh, gas: &Gas, u: &[State], uinf: &State) -> f64 {
    let s_inf = gas.entropy(uinf);
    let mut num = 0.0;
    let mut area = 0.0;
    for i in 0..mesh.n_cells() {
        let err = gas.entropy(&u[i]) / s_inf - 1.0;
        num += mesh.cell_area(i) * err * err;
        area += mesh.cell_area(i);
    }
    (num / area).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use afv_mesh::GhostPolicy;
    use afv_mesh::structured::{RectMarkers, rect_mesh};
    use approx::assert_relative_eq;

    fn setup() -> (Mesh, Gas) {
        let markers = RectMarkers {
            left: 1,
            right: 1,
            bottom: 1,
            top: 1,
        };
        let mesh = Mesh::build(
            rect_mesh(3, 3, 1.0, 1.0, markers),
            GhostPolicy::ReflectMidpoint,
            None,
        )
        .unwrap();
        (mesh, Gas::new(1.4, 0.5).unwrap())
    }

    #[test]
    fn uniform_state_averages_to_itself() {
        let (mesh, gas) = setup();
        let uinf = gas.free_stream(0.0);
        let u = vec![uinf; mesh.n_cells()];
        let field = nodal_field(&mesh, &gas, &u);
        for node in 0..mesh.n_nodes() {
            assert_relative_eq!(field.density[node], 1.0, epsilon = 1e-12);
            assert_relative_eq!(field.pressure[node], gas.p_inf(), epsilon = 1e-12);
            assert_relative_eq!(field.mach[node], 0.5, epsilon = 1e-12);
            assert_relative_eq!(field.velocity[node][0], 1.0, epsilon = 1e-12);
            assert_relative_eq!(field.velocity[node][1], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn entropy_error_vanishes_for_the_free_stream() {
        let (mesh, gas) = setup();
        let uinf = gas.free_stream(0.0);
        let u = vec![uinf; mesh.n_cells()];
        assert_relative_eq!(entropy_error_l2(&mesh, &gas, &u, &uinf), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn entropy_error_grows_with_deviation() {
        let (mesh, gas) = setup();
        let uinf = gas.free_stream(0.0);
        let mut u = vec![uinf; mesh.n_cells()];
        // Heat one cell: entropy rises there.
        u[0] = gas.prim_p_to_cons(&State::new(1.0, 1.0, 0.0, 2.0 * gas.p_inf()));
        assert!(entropy_error_l2(&mesh, &gas, &u, &uinf) > 1e-3);
    }
}
