//! Gmsh v2 ASCII mesh reader.
//!
//! Only the pieces the solver needs are read: 2D nodes (z discarded),
//! triangle/quadrilateral cells, and 2-node line elements whose first
//! physical tag becomes the boundary marker.

use std::path::Path;

use afv_core::{AfvError, AfvResult};
use tracing::debug;

use crate::{MeshData, Point};

const ELEM_LINE: u32 = 1;
const ELEM_TRIANGLE: u32 = 2;
const ELEM_QUAD: u32 = 3;

/// Read a Gmsh v2 ASCII file from disk.
pub fn read_gmsh(path: &Path) -> AfvResult<MeshData> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AfvError::io(format!("mesh file {}", path.display()), e))?;
    parse_gmsh(&text)
}

/// Parse Gmsh v2 ASCII content.
pub fn parse_gmsh(text: &str) -> AfvResult<MeshData> {
    let mut lines = text.lines().enumerate().peekable();
    let mut node_ids: Vec<u64> = Vec::new();
    let mut data = MeshData::default();
    let mut skipped = 0usize;

    let bad = |lineno: usize, what: &str| {
        AfvError::mesh(format!("gmsh line {}: {what}", lineno + 1))
    };

    while let Some((lineno, raw)) = lines.next() {
        let line = raw.trim();
        match line {
            "$MeshFormat" => {
                let (no, fmt) = lines
                    .next()
                    .ok_or_else(|| bad(lineno, "truncated $MeshFormat"))?;
                let version = fmt
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| bad(no, "empty format line"))?;
                if !version.starts_with("2.") {
                    return Err(bad(no, &format!("unsupported gmsh format {version}; need 2.x")));
                }
            }
            "$Nodes" => {
                let (no, count) = lines.next().ok_or_else(|| bad(lineno, "truncated $Nodes"))?;
                let n: usize = count
                    .trim()
                    .parse()
                    .map_err(|_| bad(no, "bad node count"))?;
                for _ in 0..n {
                    let (no, entry) = lines.next().ok_or_else(|| bad(no, "truncated node list"))?;
                    let mut it = entry.split_whitespace();
                    let id: u64 = it
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| bad(no, "bad node id"))?;
                    let x: f64 = it
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| bad(no, "bad node x"))?;
                    let y: f64 = it
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| bad(no, "bad node y"))?;
                    node_ids.push(id);
                    data.nodes.push(Point::new(x, y));
                }
            }
            "$Elements" => {
                let (no, count) = lines
                    .next()
                    .ok_or_else(|| bad(lineno, "truncated $Elements"))?;
                let n: usize = count
                    .trim()
                    .parse()
                    .map_err(|_| bad(no, "bad element count"))?;
                // Node ids need not be contiguous; map id -> index.
                let lookup: std::collections::HashMap<u64, usize> = node_ids
                    .iter()
                    .enumerate()
                    .map(|(i, &id)| (id, i))
                    .collect();
                let resolve = |no: usize, id: u64| {
                    lookup
                        .get(&id)
                        .copied()
                        .ok_or_else(|| bad(no, &format!("element references unknown node {id}")))
                };
                for _ in 0..n {
                    let (no, entry) =
                        lines.next().ok_or_else(|| bad(no, "truncated element list"))?;
                    let fields: Vec<&str> = entry.split_whitespace().collect();
                    if fields.len() < 3 {
                        return Err(bad(no, "short element record"));
                    }
                    let etype: u32 = fields[1].parse().map_err(|_| bad(no, "bad element type"))?;
                    let ntags: usize = fields[2].parse().map_err(|_| bad(no, "bad tag count"))?;
                    let nodes = &fields[3 + ntags..];
                    let node = |k: usize| -> AfvResult<usize> {
                        let id: u64 = nodes
                            .get(k)
                            .and_then(|s| s.parse().ok())
                            .ok_or_else(|| bad(no, "missing element node"))?;
                        resolve(no, id)
                    };
                    match etype {
                        ELEM_LINE => {
                            let marker: i32 = fields
                                .get(3)
                                .and_then(|s| s.parse().ok())
                                .ok_or_else(|| bad(no, "line element without a physical tag"))?;
                            data.boundary_edges.push(([node(0)?, node(1)?], marker));
                        }
                        ELEM_TRIANGLE => {
                            data.cells.push(vec![node(0)?, node(1)?, node(2)?]);
                        }
                        ELEM_QUAD => {
                            data.cells.push(vec![node(0)?, node(1)?, node(2)?, node(3)?]);
                        }
                        _ => skipped += 1,
                    }
                }
            }
            _ => {
                // Other sections ($PhysicalNames, $Periodic, ...) are not needed.
            }
        }
    }

    if data.nodes.is_empty() {
        return Err(AfvError::mesh("gmsh file contains no $Nodes section"));
    }
    if data.cells.is_empty() {
        return Err(AfvError::mesh("gmsh file contains no 2D cells"));
    }
    if skipped > 0 {
        debug!(skipped, "ignored gmsh elements of unsupported type");
    }
    Ok(data)
}
