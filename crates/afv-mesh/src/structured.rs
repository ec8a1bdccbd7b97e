//! Structured quadrilateral mesh generation for verification cases.

use crate::{MeshData, Point};

/// Boundary markers assigned to the four sides of a rectangle.
#[derive(Clone, Copy, Debug)]
pub struct RectMarkers {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

/// Uniform `nx` x `ny` quadrilateral mesh of the rectangle [0,lx] x [0,ly].
pub fn rect_mesh(nx: usize, ny: usize, lx: f64, ly: f64, markers: RectMarkers) -> MeshData {
    rect_mesh_stretched(nx, ny, lx, ly, 1.0, markers)
}

/// Rectangle mesh with one-sided geometric stretching in y.
///
/// `stretch` is the ratio between successive row heights; 1.0 gives a
/// uniform mesh, values > 1 cluster rows toward y = 0 (boundary layers).
pub fn rect_mesh_stretched(
    nx: usize,
    ny: usize,
    lx: f64,
    ly: f64,
    stretch: f64,
    markers: RectMarkers,
) -> MeshData {
    assert!(nx > 0 && ny > 0, "mesh extents must be positive");
    assert!(stretch > 0.0, "stretch ratio must be positive");

    // Row heights h, h*r, h*r^2, ... summing to ly.
    let mut ys = Vec::with_capacity(ny + 1);
    if (stretch - 1.0).abs() < 1e-14 {
        for j in 0..=ny {
            ys.push(ly * j as f64 / ny as f64);
        }
    } else {
        let h0 = ly * (1.0 - stretch) / (1.0 - stretch.powi(ny as i32));
        let mut y = 0.0;
        ys.push(0.0);
        for j in 0..ny {
            y += h0 * stretch.powi(j as i32);
            ys.push(y);
        }
        // Guard against accumulation drift on the last row.
        ys[ny] = ly;
    }

    let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            nodes.push(Point::new(lx * i as f64 / nx as f64, ys[j]));
        }
    }
    let nid = |i: usize, j: usize| j * (nx + 1) + i;

    let mut cells = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            cells.push(vec![nid(i, j), nid(i + 1, j), nid(i + 1, j + 1), nid(i, j + 1)]);
        }
    }

    let mut boundary_edges = Vec::with_capacity(2 * (nx + ny));
    for i in 0..nx {
        boundary_edges.push(([nid(i, 0), nid(i + 1, 0)], markers.bottom));
        boundary_edges.push(([nid(i, ny), nid(i + 1, ny)], markers.top));
    }
    for j in 0..ny {
        boundary_edges.push(([nid(0, j), nid(0, j + 1)], markers.left));
        boundary_edges.push(([nid(nx, j), nid(nx, j + 1)], markers.right));
    }

    MeshData {
        nodes,
        cells,
        boundary_edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GhostPolicy, Mesh};
    use approx::assert_relative_eq;

    #[test]
    fn rect_mesh_counts_and_area() {
        let markers = RectMarkers {
            left: 1,
            right: 2,
            bottom: 3,
            top: 4,
        };
        let mesh = Mesh::build(
            rect_mesh(4, 3, 2.0, 1.5, markers),
            GhostPolicy::ReflectMidpoint,
            None,
        )
        .unwrap();
        assert_eq!(mesh.n_cells(), 12);
        assert_eq!(mesh.n_boundary_faces(), 2 * (4 + 3));
        let total: f64 = (0..mesh.n_cells()).map(|i| mesh.cell_area(i)).sum();
        assert_relative_eq!(total, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn stretched_rows_grow_by_the_ratio() {
        let markers = RectMarkers {
            left: 1,
            right: 2,
            bottom: 3,
            top: 4,
        };
        let data = rect_mesh_stretched(1, 4, 1.0, 1.0, 2.0, markers);
        let h0 = data.nodes[2].y - data.nodes[0].y;
        let h1 = data.nodes[4].y - data.nodes[2].y;
        assert_relative_eq!(h1 / h0, 2.0, epsilon = 1e-10);
        assert_relative_eq!(data.nodes.last().unwrap().y, 1.0, epsilon = 1e-14);
    }
}
