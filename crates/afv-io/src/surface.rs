//! Surface force coefficients on wall boundaries.

use std::io::Write;
use std::path::PathBuf;

use afv_core::{AfvError, AfvResult};
use afv_mesh::{Mesh, Point};
use afv_physics::{Gas, State, Vec2};
use afv_spatial::ViscousModel;

/// Lift and drag coefficients of one wall marker, referenced to the
/// dynamic pressure ½ ρ∞ |v∞|² and unit chord.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceCoefficients {
    pub marker: i32,
    pub cl: f64,
    pub cd: f64,
}

/// Integrate pressure (and, for viscous runs, an approximate wall shear
/// from the near-wall velocity) over the faces of `marker`.
pub fn surface_coefficients(
    mesh: &Mesh,
    gas: &Gas,
    u: &[State],
    marker: i32,
    alpha_rad: f64,
    viscous: Option<&ViscousModel>,
) -> SurfaceCoefficients {
    let mut force = Point::zeros();
    for bf in 0..mesh.n_boundary_faces() {
        let face = mesh.face(bf);
        if face.marker != marker {
            continue;
        }
        let ul = &u[face.left];
        let n = face.normal;
        let p = gas.pressure(ul);
        force += p * face.length * n;

        if let Some(model) = viscous {
            // Wall shear from the interior tangential velocity over the
            // wall-normal distance (the wall itself is treated at rest).
            let tangent = Vec2::new(-n.y, n.x);
            let v = Vec2::new(ul[1] / ul[0], ul[2] / ul[0]);
            let vt = v.dot(&tangent);
            let mid = face.midpoint(mesh);
            let dn = (mid - mesh.cell_centroid(face.left)).dot(&n).abs();
            let mu = model.viscosity(gas.temperature(ul));
            let tau_w = mu * vt / dn.max(f64::MIN_POSITIVE);
            force -= tau_w * face.length * tangent;
        }
    }
    // q∞ = ½ ρ∞ |v∞|² = ½ in the nondimensionalization; chord = 1.
    let q_inf = 0.5;
    let drag_dir = Vec2::new(alpha_rad.cos(), alpha_rad.sin());
    let lift_dir = Vec2::new(-alpha_rad.sin(), alpha_rad.cos());
    SurfaceCoefficients {
        marker,
        cl: force.dot(&lift_dir) / q_inf,
        cd: force.dot(&drag_dir) / q_inf,
    }
}

/// Write one `<prefix>-<marker>.dat` coefficient file.
pub fn write_surface_file(prefix: &str, coeffs: &SurfaceCoefficients) -> AfvResult<PathBuf> {
    let path = PathBuf::from(format!("{prefix}-{}.dat", coeffs.marker));
    let mut file = std::fs::File::create(&path)
        .map_err(|e| AfvError::io(format!("surface file {}", path.display()), e))?;
    writeln!(file, "# marker CL CD")
        .and_then(|()| writeln!(file, "{} {:.9e} {:.9e}", coeffs.marker, coeffs.cl, coeffs.cd))
        .map_err(|e| AfvError::io(format!("surface file {}", path.display()), e))?;
    Ok(path)
}
