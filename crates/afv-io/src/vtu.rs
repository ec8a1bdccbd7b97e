//! VTU (VTK XML unstructured grid) volume output.

use std::io::Write;
use std::path::Path;

use afv_core::{AfvError, AfvResult};
use afv_mesh::Mesh;

use crate::post::NodalField;

const VTK_TRIANGLE: u8 = 5;
const VTK_QUAD: u8 = 9;

/// Write the nodal solution as ASCII VTU.
pub fn write_vtu(path: &Path, mesh: &Mesh, field: &NodalField) -> AfvResult<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| AfvError::io(format!("solution file {}", path.display()), e))?;
    let mut out = std::io::BufWriter::new(file);
    write_vtu_to(&mut out, mesh, field)
        .map_err(|e| AfvError::io(format!("solution file {}", path.display()), e))
}

fn write_vtu_to<W: Write>(out: &mut W, mesh: &Mesh, field: &NodalField) -> std::io::Result<()> {
    writeln!(
        out,
        "<VTKFile type=\"UnstructuredGrid\" version=\"0.1\" byte_order=\"LittleEndian\">"
    )?;
    writeln!(out, "  <UnstructuredGrid>")?;
    writeln!(
        out,
        "    <Piece NumberOfPoints=\"{}\" NumberOfCells=\"{}\">",
        mesh.n_nodes(),
        mesh.n_cells()
    )?;

    writeln!(out, "      <PointData Scalars=\"density\" Vectors=\"velocity\">")?;
    scalar_array(out, "density", &field.density)?;
    scalar_array(out, "mach", &field.mach)?;
    scalar_array(out, "pressure", &field.pressure)?;
    writeln!(
        out,
        "        <DataArray type=\"Float64\" Name=\"velocity\" NumberOfComponents=\"3\" format=\"ascii\">"
    )?;
    for v in &field.velocity {
        writeln!(out, "          {:.12e} {:.12e} 0", v[0], v[1])?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </PointData>")?;

    writeln!(out, "      <Points>")?;
    writeln!(
        out,
        "        <DataArray type=\"Float64\" NumberOfComponents=\"3\" format=\"ascii\">"
    )?;
    for node in 0..mesh.n_nodes() {
        let p = mesh.node(node);
        writeln!(out, "          {:.12e} {:.12e} 0", p.x, p.y)?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Points>")?;

    writeln!(out, "      <Cells>")?;
    writeln!(
        out,
        "        <DataArray type=\"Int64\" Name=\"connectivity\" format=\"ascii\">"
    )?;
    for i in 0..mesh.n_cells() {
        let nodes: Vec<String> = mesh.cell_nodes(i).iter().map(|n| n.to_string()).collect();
        writeln!(out, "          {}", nodes.join(" "))?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(
        out,
        "        <DataArray type=\"Int64\" Name=\"offsets\" format=\"ascii\">"
    )?;
    let mut offset = 0usize;
    for i in 0..mesh.n_cells() {
        offset += mesh.cell_nodes(i).len();
        writeln!(out, "          {offset}")?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(
        out,
        "        <DataArray type=\"UInt8\" Name=\"types\" format=\"ascii\">"
    )?;
    for i in 0..mesh.n_cells() {
        let t = if mesh.cell_nodes(i).len() == 3 {
            VTK_TRIANGLE
        } else {
            VTK_QUAD
        };
        writeln!(out, "          {t}")?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Cells>")?;

    writeln!(out, "    </Piece>")?;
    writeln!(out, "  </UnstructuredGrid>")?;
    writeln!(out, "</VTKFile>")?;
    Ok(())
}

fn scalar_array<W: Write>(out: &mut W, name: &str, values: &[f64]) -> std::io::Result<()> {
    writeln!(
        out,
        "        <DataArray type=\"Float64\" Name=\"{name}\" format=\"ascii\">"
    )?;
    for v in values {
        writeln!(out, "          {v:.12e}")?;
    }
    writeln!(out, "        </DataArray>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::nodal_field;
    use afv_mesh::GhostPolicy;
    use afv_mesh::structured::{RectMarkers, rect_mesh};
    use afv_physics::Gas;

    #[test]
    fn writes_well_formed_vtu() {
        let markers = RectMarkers {
            left: 1,
            right: 1,
            bottom: 1,
            top: 1,
        };
        let mesh = Mesh::build(
            rect_mesh(2, 2, 1.0, 1.0, markers),
            GhostPolicy::ReflectMidpoint,
            None,
        )
        .unwrap();
        let gas = Gas::new(1.4, 0.5).unwrap();
        let u = vec![gas.free_stream(0.0); mesh.n_cells()];
        let field = nodal_field(&mesh, &gas, &u);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vtu");
        write_vtu(&path, &mesh, &field).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<VTKFile"));
        assert!(text.contains("NumberOfPoints=\"9\""));
        assert!(text.contains("NumberOfCells=\"4\""));
        for name in ["density", "mach", "pressure", "velocity"] {
            assert!(text.contains(&format!("Name=\"{name}\"")), "missing {name}");
        }
        assert!(text.trim_end().ends_with("</VTKFile>"));
    }
}
