//! Read-only mesh view for the cell-centered finite-volume solver.
//!
//! A [`Mesh`] is built once from raw connectivity ([`MeshData`], either
//! parsed from a Gmsh file or generated) and then only queried: cells with
//! areas and centroids, boundary-first faces with unit normals and lengths,
//! per-cell face incidence, ghost-cell centers, and periodic links.

pub mod gmsh;
pub mod structured;
mod topology;

use afv_core::{AfvError, AfvResult};

/// 2D point / vector in mesh coordinates.
pub type Point = nalgebra::Vector2<f64>;

/// Marker value carried by interior faces.
pub const INTERIOR_MARKER: i32 = -1;

/// How the ghost cell center is placed for a boundary face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GhostPolicy {
    /// Reflect the interior centroid about the face midpoint.
    #[default]
    ReflectMidpoint,
    /// Reflect the interior centroid about the face line.
    ReflectFaceLine,
}

/// Axis along which a periodic marker pair is matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeriodicAxis {
    X,
    Y,
}

/// Periodic boundary request: all faces with `marker` are paired across
/// the domain along `axis`.
#[derive(Clone, Copy, Debug)]
pub struct PeriodicSpec {
    pub marker: i32,
    pub axis: PeriodicAxis,
}

/// Raw mesh connectivity, before topology and geometry construction.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub nodes: Vec<Point>,
    /// Cell -> node indices (3 for triangles, 4 for quadrilaterals).
    pub cells: Vec<Vec<usize>>,
    /// Boundary edges with their physical marker.
    pub boundary_edges: Vec<([usize; 2], i32)>,
}

/// One face of the mesh. Boundary faces are stored before interior faces.
#[derive(Clone, Copy, Debug)]
pub struct Face {
    /// Left cell; always an interior cell index.
    pub left: usize,
    /// Right cell: interior cell for interior faces, the periodic partner
    /// cell for periodic faces, otherwise `n_cells + bface_index`.
    pub right: usize,
    /// Endpoint node indices.
    pub nodes: [usize; 2],
    /// Unit normal, oriented from `left` to `right`.
    pub normal: Point,
    /// Face length.
    pub length: f64,
    /// Boundary marker, or [`INTERIOR_MARKER`].
    pub marker: i32,
}

impl Face {
    pub fn midpoint(&self, mesh: &Mesh) -> Point {
        0.5 * (mesh.node(self.nodes[0]) + mesh.node(self.nodes[1]))
    }
}

/// Immutable adjacency and geometry of a 2D hybrid mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    nodes: Vec<Point>,
    cell_nodes: Vec<Vec<usize>>,
    cell_area: Vec<f64>,
    cell_centroid: Vec<Point>,
    faces: Vec<Face>,
    n_bfaces: usize,
    /// Per cell: (face index, +1 if this cell is the face's left cell).
    cell_faces: Vec<Vec<(usize, f64)>>,
    /// Per boundary face: ghost (or translated periodic neighbor) center.
    ghost_centers: Vec<Point>,
    /// Per boundary face: true when linked to a periodic partner cell.
    periodic: Vec<bool>,
}

impl Mesh {
    /// Build the mesh view from raw connectivity.
    pub fn build(
        data: MeshData,
        policy: GhostPolicy,
        periodic: Option<PeriodicSpec>,
    ) -> AfvResult<Self> {
        topology::build(data, policy, periodic)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cell_nodes.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.n_bfaces
    }

    pub fn node(&self, i: usize) -> Point {
        self.nodes[i]
    }

    pub fn face(&self, f: usize) -> &Face {
        &self.faces[f]
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn is_interior_face(&self, f: usize) -> bool {
        f >= self.n_bfaces
    }

    pub fn cell_area(&self, i: usize) -> f64 {
        self.cell_area[i]
    }

    pub fn cell_centroid(&self, i: usize) -> Point {
        self.cell_centroid[i]
    }

    pub fn cell_nodes(&self, i: usize) -> &[usize] {
        &self.cell_nodes[i]
    }

    /// Faces incident on cell `i` with their orientation sign: +1 when the
    /// cell is the face's left cell, -1 when it is the right cell.
    pub fn cell_faces(&self, i: usize) -> &[(usize, f64)] {
        &self.cell_faces[i]
    }

    /// Ghost cell center for boundary face `bf`. For a periodic face this
    /// is the partner centroid translated back across the domain.
    pub fn ghost_center(&self, bf: usize) -> Point {
        self.ghost_centers[bf]
    }

    /// Periodic partner cell for boundary face `bf`, if any.
    pub fn periodic_partner(&self, bf: usize) -> Option<usize> {
        if self.periodic[bf] {
            Some(self.faces[bf].right)
        } else {
            None
        }
    }

    /// Gauss point `i` of `ngauss` on face `f`, at parameter
    /// (i+1)/(ngauss+1) along the segment.
    pub fn face_gauss_point(&self, f: usize, i: usize, ngauss: usize) -> Point {
        let face = &self.faces[f];
        let a = self.node(face.nodes[0]);
        let b = self.node(face.nodes[1]);
        let t = (i + 1) as f64 / (ngauss + 1) as f64;
        a + t * (b - a)
    }

    /// Check that every marker in `required` is present on some boundary face.
    pub fn check_markers(&self, required: &[i32]) -> AfvResult<()> {
        for &m in required {
            let present = self.faces[..self.n_bfaces].iter().any(|f| f.marker == m);
            if !present {
                return Err(AfvError::mesh(format!(
                    "boundary marker {m} referenced by the configuration is absent from the mesh"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn from_parts(
        nodes: Vec<Point>,
        cell_nodes: Vec<Vec<usize>>,
        cell_area: Vec<f64>,
        cell_centroid: Vec<Point>,
        faces: Vec<Face>,
        n_bfaces: usize,
        cell_faces: Vec<Vec<(usize, f64)>>,
        ghost_centers: Vec<Point>,
        periodic: Vec<bool>,
    ) -> Self {
        Self {
            nodes,
            cell_nodes,
            cell_area,
            cell_centroid,
            faces,
            n_bfaces,
            cell_faces,
            ghost_centers,
            periodic,
        }
    }
}
