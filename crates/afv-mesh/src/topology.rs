//! Construction of the mesh view from raw connectivity: cell orientation,
//! face extraction with boundary faces first, geometry, ghost centers, and
//! periodic pairing.

use std::collections::HashMap;

use afv_core::{AfvError, AfvResult};
use tracing::debug;

use crate::{
    Face, GhostPolicy, INTERIOR_MARKER, Mesh, MeshData, PeriodicAxis, PeriodicSpec, Point,
};

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Signed area of a simple polygon (positive for counter-clockwise order).
fn signed_area(nodes: &[Point], cell: &[usize]) -> f64 {
    let n = cell.len();
    let mut acc = 0.0;
    for k in 0..n {
        let p = nodes[cell[k]];
        let q = nodes[cell[(k + 1) % n]];
        acc += p.x * q.y - q.x * p.y;
    }
    0.5 * acc
}

fn centroid(nodes: &[Point], cell: &[usize], area: f64) -> Point {
    let n = cell.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for k in 0..n {
        let p = nodes[cell[k]];
        let q = nodes[cell[(k + 1) % n]];
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    Point::new(cx, cy) / (6.0 * area)
}

pub(crate) fn build(
    mut data: MeshData,
    policy: GhostPolicy,
    periodic: Option<PeriodicSpec>,
) -> AfvResult<Mesh> {
    let n_nodes = data.nodes.len();
    let n_cells = data.cells.len();
    if n_cells == 0 {
        return Err(AfvError::mesh("mesh has no cells"));
    }

    // Orient every cell counter-clockwise and compute its area/centroid.
    let mut cell_area = Vec::with_capacity(n_cells);
    let mut cell_centroid = Vec::with_capacity(n_cells);
    for (i, cell) in data.cells.iter_mut().enumerate() {
        if cell.len() < 3 || cell.len() > 4 {
            return Err(AfvError::mesh(format!(
                "cell {i} has {} nodes; only triangles and quadrilaterals are supported",
                cell.len()
            )));
        }
        if let Some(&bad) = cell.iter().find(|&&n| n >= n_nodes) {
            return Err(AfvError::mesh(format!(
                "cell {i} references node {bad} but the mesh has {n_nodes} nodes"
            )));
        }
        let mut area = signed_area(&data.nodes, cell);
        if area < 0.0 {
            cell.reverse();
            area = -area;
        }
        if area <= f64::EPSILON {
            return Err(AfvError::mesh(format!("cell {i} is degenerate (area {area:e})")));
        }
        cell_centroid.push(centroid(&data.nodes, cell, area));
        cell_area.push(area);
    }

    // Edge map: undirected edge -> incident cells with their CCW direction.
    let mut edges: HashMap<(usize, usize), Vec<(usize, [usize; 2])>> = HashMap::new();
    for (i, cell) in data.cells.iter().enumerate() {
        let n = cell.len();
        for k in 0..n {
            let a = cell[k];
            let b = cell[(k + 1) % n];
            edges.entry(edge_key(a, b)).or_default().push((i, [a, b]));
        }
    }
    for (key, incident) in &edges {
        if incident.len() > 2 {
            return Err(AfvError::mesh(format!(
                "edge {key:?} is shared by {} cells",
                incident.len()
            )));
        }
    }

    // Marker lookup for declared boundary edges.
    let mut markers: HashMap<(usize, usize), i32> = HashMap::new();
    for &([a, b], m) in &data.boundary_edges {
        let key = edge_key(a, b);
        if let Some(&prev) = markers.get(&key) {
            if prev != m {
                return Err(AfvError::mesh(format!(
                    "boundary edge {key:?} declared with conflicting markers {prev} and {m}"
                )));
            }
        }
        markers.insert(key, m);
    }

    // Faces, boundary first. Iterating cells in index order keeps the face
    // ordering deterministic.
    let mut faces: Vec<Face> = Vec::new();
    let mut interior: Vec<Face> = Vec::new();
    for (i, cell) in data.cells.iter().enumerate() {
        let n = cell.len();
        for k in 0..n {
            let a = cell[k];
            let b = cell[(k + 1) % n];
            let key = edge_key(a, b);
            let incident = &edges[&key];
            let pa = data.nodes[a];
            let pb = data.nodes[b];
            let d = pb - pa;
            let length = d.norm();
            if length <= f64::EPSILON {
                return Err(AfvError::mesh(format!("face {a}-{b} has zero length")));
            }
            // Outward normal of the CCW edge (a, b).
            let normal = Point::new(d.y, -d.x) / length;
            if incident.len() == 1 {
                let marker = *markers.get(&key).ok_or_else(|| {
                    AfvError::mesh(format!(
                        "boundary edge {key:?} of cell {i} carries no boundary marker"
                    ))
                })?;
                faces.push(Face {
                    left: i,
                    right: usize::MAX, // patched to n_cells + bface index below
                    nodes: [a, b],
                    normal,
                    length,
                    marker,
                });
            } else {
                let other = incident
                    .iter()
                    .map(|&(c, _)| c)
                    .find(|&c| c != i)
                    .expect("two distinct incident cells");
                if markers.contains_key(&key) {
                    return Err(AfvError::mesh(format!(
                        "edge {key:?} carries a boundary marker but lies between cells {i} and {other}"
                    )));
                }
                // Create the interior face once, from its lower-index side.
                if i < other {
                    interior.push(Face {
                        left: i,
                        right: other,
                        nodes: [a, b],
                        normal,
                        length,
                        marker: INTERIOR_MARKER,
                    });
                }
            }
        }
    }

    let n_bfaces = faces.len();
    for (bf, face) in faces.iter_mut().enumerate() {
        face.right = n_cells + bf;
    }
    faces.extend(interior);
    debug!(
        n_cells,
        n_faces = faces.len(),
        n_bfaces,
        "mesh topology constructed"
    );

    // Ghost centers, midpoint-reflection by default.
    let mut ghost_centers = Vec::with_capacity(n_bfaces);
    for face in &faces[..n_bfaces] {
        let mid = 0.5 * (data.nodes[face.nodes[0]] + data.nodes[face.nodes[1]]);
        let rl = cell_centroid[face.left];
        let rg = match policy {
            GhostPolicy::ReflectMidpoint => 2.0 * mid - rl,
            GhostPolicy::ReflectFaceLine => rl + 2.0 * (mid - rl).dot(&face.normal) * face.normal,
        };
        ghost_centers.push(rg);
    }

    let mut periodic_flags = vec![false; n_bfaces];
    if let Some(spec) = periodic {
        link_periodic(
            &mut faces,
            &mut ghost_centers,
            &mut periodic_flags,
            &data.nodes,
            &cell_centroid,
            n_bfaces,
            spec,
        )?;
    }

    // Per-cell face incidence with orientation signs.
    let mut cell_faces: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_cells];
    for (f, face) in faces.iter().enumerate() {
        cell_faces[face.left].push((f, 1.0));
        if f >= n_bfaces {
            cell_faces[face.right].push((f, -1.0));
        }
    }

    Ok(Mesh::from_parts(
        data.nodes,
        data.cells,
        cell_area,
        cell_centroid,
        faces,
        n_bfaces,
        cell_faces,
        ghost_centers,
        periodic_flags,
    ))
}

/// Pair the faces of the periodic marker across the domain along the given
/// axis, point each face's right cell at its partner's interior cell, and
/// move the ghost center onto the translated partner centroid.
fn link_periodic(
    faces: &mut [Face],
    ghost_centers: &mut [Point],
    periodic_flags: &mut [bool],
    nodes: &[Point],
    cell_centroid: &[Point],
    n_bfaces: usize,
    spec: PeriodicSpec,
) -> AfvResult<()> {
    let mids: Vec<Point> = faces[..n_bfaces]
        .iter()
        .map(|f| 0.5 * (nodes[f.nodes[0]] + nodes[f.nodes[1]]))
        .collect();
    let along = |p: &Point| match spec.axis {
        PeriodicAxis::X => p.x,
        PeriodicAxis::Y => p.y,
    };
    let across = |p: &Point| match spec.axis {
        PeriodicAxis::X => p.y,
        PeriodicAxis::Y => p.x,
    };

    let members: Vec<usize> = (0..n_bfaces)
        .filter(|&bf| faces[bf].marker == spec.marker)
        .collect();
    if members.is_empty() {
        return Err(AfvError::mesh(format!(
            "periodic marker {} has no boundary faces",
            spec.marker
        )));
    }
    if members.len() % 2 != 0 {
        return Err(AfvError::mesh(format!(
            "periodic marker {} has an odd number of faces ({})",
            spec.marker,
            members.len()
        )));
    }

    let mean = members.iter().map(|&bf| along(&mids[bf])).sum::<f64>() / members.len() as f64;
    let mut low: Vec<usize> = members
        .iter()
        .copied()
        .filter(|&bf| along(&mids[bf]) < mean)
        .collect();
    let mut high: Vec<usize> = members
        .iter()
        .copied()
        .filter(|&bf| along(&mids[bf]) >= mean)
        .collect();
    if low.len() != high.len() {
        return Err(AfvError::mesh(format!(
            "periodic marker {}: {} faces on one side, {} on the other",
            spec.marker,
            low.len(),
            high.len()
        )));
    }
    let sort_key = |bf: &usize| across(&mids[*bf]);
    low.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));
    high.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));

    for (&fa, &fb) in low.iter().zip(&high) {
        let tol = 1e-8 * faces[fa].length.max(faces[fb].length);
        if (across(&mids[fa]) - across(&mids[fb])).abs() > tol.max(1e-12) {
            return Err(AfvError::mesh(format!(
                "periodic marker {}: faces {fa} and {fb} do not line up across the axis",
                spec.marker
            )));
        }
        let t = mids[fb] - mids[fa];
        faces[fa].right = faces[fb].left;
        faces[fb].right = faces[fa].left;
        ghost_centers[fa] = cell_centroid[faces[fb].left] - t;
        ghost_centers[fb] = cell_centroid[faces[fa].left] + t;
        periodic_flags[fa] = true;
        periodic_flags[fb] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured::{RectMarkers, rect_mesh};
    use approx::assert_relative_eq;

    fn unit_square_pair() -> MeshData {
        // Two triangles covering the unit square.
        MeshData {
            nodes: vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
            cells: vec![vec![0, 1, 2], vec![0, 2, 3]],
            boundary_edges: vec![
                ([0, 1], 1),
                ([1, 2], 1),
                ([2, 3], 1),
                ([3, 0], 1),
            ],
        }
    }

    #[test]
    fn builds_two_triangle_square() {
        let mesh = Mesh::build(unit_square_pair(), GhostPolicy::ReflectMidpoint, None).unwrap();
        assert_eq!(mesh.n_cells(), 2);
        assert_eq!(mesh.n_boundary_faces(), 4);
        assert_eq!(mesh.n_faces(), 5);
        assert_relative_eq!(mesh.cell_area(0) + mesh.cell_area(1), 1.0, epsilon = 1e-14);

        // The single interior face is the diagonal.
        let f = mesh.face(4);
        assert_eq!(f.marker, INTERIOR_MARKER);
        assert_relative_eq!(f.length, std::f64::consts::SQRT_2, epsilon = 1e-14);
    }

    #[test]
    fn cell_orientation_is_fixed_up() {
        let mut data = unit_square_pair();
        data.cells[0].reverse(); // clockwise input
        let mesh = Mesh::build(data, GhostPolicy::ReflectMidpoint, None).unwrap();
        assert!(mesh.cell_area(0) > 0.0);
    }

    #[test]
    fn boundary_normals_point_outward() {
        let mesh = Mesh::build(unit_square_pair(), GhostPolicy::ReflectMidpoint, None).unwrap();
        for bf in 0..mesh.n_boundary_faces() {
            let face = mesh.face(bf);
            let mid = face.midpoint(&mesh);
            let out = mid - mesh.cell_centroid(face.left);
            assert!(out.dot(&face.normal) > 0.0, "normal of face {bf} points inward");
        }
    }

    #[test]
    fn ghost_center_midpoint_reflection_symmetry() {
        let mesh = Mesh::build(unit_square_pair(), GhostPolicy::ReflectMidpoint, None).unwrap();
        for bf in 0..mesh.n_boundary_faces() {
            let face = mesh.face(bf);
            let mid = face.midpoint(&mesh);
            let rg = mesh.ghost_center(bf);
            let rl = mesh.cell_centroid(face.left);
            assert_relative_eq!((rg + rl).x, (2.0 * mid).x, epsilon = 1e-14);
            assert_relative_eq!((rg + rl).y, (2.0 * mid).y, epsilon = 1e-14);
        }
    }

    #[test]
    fn face_line_reflection_preserves_tangential_position() {
        let mesh = Mesh::build(unit_square_pair(), GhostPolicy::ReflectFaceLine, None).unwrap();
        for bf in 0..mesh.n_boundary_faces() {
            let face = mesh.face(bf);
            let rl = mesh.cell_centroid(face.left);
            let rg = mesh.ghost_center(bf);
            let tangent = Point::new(-face.normal.y, face.normal.x);
            assert_relative_eq!(rg.dot(&tangent), rl.dot(&tangent), epsilon = 1e-14);
        }
    }

    #[test]
    fn missing_marker_is_an_error() {
        let mut data = unit_square_pair();
        data.boundary_edges.pop();
        let err = Mesh::build(data, GhostPolicy::ReflectMidpoint, None).unwrap_err();
        assert_eq!(err.kind(), "mesh");
    }

    #[test]
    fn periodic_pairing_links_opposite_sides() {
        let data = rect_mesh(
            4,
            2,
            2.0,
            1.0,
            RectMarkers {
                left: 7,
                right: 7,
                bottom: 2,
                top: 3,
            },
        );
        let spec = PeriodicSpec {
            marker: 7,
            axis: PeriodicAxis::X,
        };
        let mesh = Mesh::build(data, GhostPolicy::ReflectMidpoint, Some(spec)).unwrap();
        let mut linked = 0;
        for bf in 0..mesh.n_boundary_faces() {
            if let Some(partner) = mesh.periodic_partner(bf) {
                linked += 1;
                assert!(partner < mesh.n_cells());
                // The translated partner centroid must sit just outside this face.
                let face = mesh.face(bf);
                let out = mesh.ghost_center(bf) - face.midpoint(&mesh);
                assert!(out.dot(&face.normal) > 0.0);
            }
        }
        assert_eq!(linked, 4);
    }

    #[test]
    fn incidence_signs_are_consistent() {
        let mesh = Mesh::build(unit_square_pair(), GhostPolicy::ReflectMidpoint, None).unwrap();
        for i in 0..mesh.n_cells() {
            for &(f, sign) in mesh.cell_faces(i) {
                let face = mesh.face(f);
                if sign > 0.0 {
                    assert_eq!(face.left, i);
                } else {
                    assert_eq!(face.right, i);
                }
            }
        }
    }
}
