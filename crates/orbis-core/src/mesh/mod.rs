//! Voronoi cell mesh: the shared topological substrate.
//!
//! Cells, vertices and edges live in flat arenas addressed by stable
//! 0-based ids; every cross-reference is an index, never a pointer. The
//! mesh is built once from the jittered point scatter and handed read-only
//! to every later stage.

pub mod points;
pub mod voronoi;

use std::collections::HashMap;

use crate::config::WorldConfig;
use crate::error::GenError;
use crate::rng::{StageRng, MESH_SALT};

/// Full cell/vertex/edge adjacency of the map.
///
/// Invariants:
/// - neighbour relations are symmetric; `neighbors_of_cell[c][k]` and
///   `edges_of_cell[c][k]` describe the same boundary segment;
/// - every edge appears in exactly the edge lists of its owning cells;
/// - `areas_km2[c] > 0` for every cell.
pub struct CellMesh {
    pub width_km: f64,
    pub height_km: f64,
    /// Interior grid spacing; also the nominal cell diameter.
    pub spacing_km: f64,
    /// Cells `0..interior_count` are interior; the rest form the padding
    /// ring and are flagged in `is_boundary`.
    pub interior_count: usize,

    // Cells.
    pub centers: Vec<(f64, f64)>,
    /// Counter-clockwise Voronoi vertex fan per cell.
    pub vertices_of_cell: Vec<Vec<u32>>,
    /// Cell across each fan segment, aligned with `vertices_of_cell`
    /// (segment k runs from fan vertex k to k+1); −1 for the open side of
    /// a padding cell.
    pub neighbors_of_cell: Vec<Vec<i32>>,
    /// Edge id of each fan segment, same alignment.
    pub edges_of_cell: Vec<Vec<u32>>,
    pub is_boundary: Vec<bool>,
    pub areas_km2: Vec<f64>,

    // Vertices.
    pub vertex_positions: Vec<(f64, f64)>,
    pub cells_at_vertex: Vec<[u32; 3]>,
    /// Up to three adjacent Voronoi vertices.
    pub neighbors_of_vertex: Vec<Vec<u32>>,

    // Edges.
    pub edge_endpoints: Vec<(u32, u32)>,
    /// Owning cells; `.1 == -1` only for boundary edges.
    pub edge_cells: Vec<(i32, i32)>,

    pub(crate) edge_lookup: HashMap<(u32, u32), u32>,
    pub(crate) nearest: NearestGrid,
}

impl CellMesh {
    pub fn cell_count(&self) -> usize {
        self.centers.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_endpoints.len()
    }

    /// Edge id between two adjacent Voronoi vertices, if any.
    pub fn edge_between_vertices(&self, v0: u32, v1: u32) -> Option<u32> {
        self.edge_lookup.get(&(v0.min(v1), v0.max(v1))).copied()
    }

    /// Index of the cell whose centre is closest to `(x, y)`.
    ///
    /// Uniform-grid accelerated; equidistant candidates resolve to the
    /// lower id, matching a linear scan.
    pub fn nearest_cell(&self, x: f64, y: f64) -> usize {
        self.nearest.nearest(&self.centers, x, y) as usize
    }

    pub fn center_distance(&self, a: usize, b: usize) -> f64 {
        let (ax, ay) = self.centers[a];
        let (bx, by) = self.centers[b];
        ((ax - bx) * (ax - bx) + (ay - by) * (ay - by)).sqrt()
    }
}

/// Build the mesh for a validated config.
pub fn build_mesh(config: &WorldConfig) -> Result<CellMesh, GenError> {
    let (width_km, height_km) = config.extent_km();
    let mut rng = StageRng::new(config.seed, MESH_SALT);
    let set = points::scatter_points(width_km, height_km, config.cell_count, &mut rng);
    voronoi::dualize(&set, width_km, height_km)
}

// ── Nearest-cell uniform grid ─────────────────────────────────────────────────

/// Uniform bin grid over cell centres. Padding centres outside the map
/// rectangle clamp into the border bins.
pub(crate) struct NearestGrid {
    bin_size: f64,
    cols: usize,
    rows: usize,
    bins: Vec<Vec<u32>>,
}

impl NearestGrid {
    pub(crate) fn build(
        points: &[(f64, f64)],
        width_km: f64,
        height_km: f64,
        spacing_km: f64,
    ) -> Self {
        let bin_size = spacing_km.max(1e-9);
        let cols = ((width_km / bin_size).ceil() as usize).max(1);
        let rows = ((height_km / bin_size).ceil() as usize).max(1);
        let mut bins = vec![Vec::new(); cols * rows];
        for (id, &(x, y)) in points.iter().enumerate() {
            let bx = ((x / bin_size) as isize).clamp(0, cols as isize - 1) as usize;
            let by = ((y / bin_size) as isize).clamp(0, rows as isize - 1) as usize;
            bins[by * cols + bx].push(id as u32);
        }
        Self { bin_size, cols, rows, bins }
    }

    pub(crate) fn nearest(&self, points: &[(f64, f64)], x: f64, y: f64) -> u32 {
        let bx = ((x / self.bin_size) as isize).clamp(0, self.cols as isize - 1);
        let by = ((y / self.bin_size) as isize).clamp(0, self.rows as isize - 1);

        let mut best_id = 0u32;
        let mut best_d2 = f64::INFINITY;
        let max_ring = self.cols.max(self.rows) as isize;

        for ring in 0..=max_ring {
            // Once a candidate is found, rings further than the current
            // best distance cannot improve on it.
            let ring_floor = (ring - 1).max(0) as f64 * self.bin_size;
            if best_d2.is_finite() && ring_floor * ring_floor > best_d2 {
                break;
            }
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue; // interior of the ring was already scanned
                    }
                    let cx = bx + dx;
                    let cy = by + dy;
                    if cx < 0 || cy < 0 || cx >= self.cols as isize || cy >= self.rows as isize {
                        continue;
                    }
                    for &id in &self.bins[cy as usize * self.cols + cx as usize] {
                        let (px, py) = points[id as usize];
                        let d2 = (px - x) * (px - x) + (py - y) * (py - y);
                        if d2 < best_d2 || (d2 == best_d2 && id < best_id) {
                            best_d2 = d2;
                            best_id = id;
                        }
                    }
                }
            }
        }
        best_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn small_mesh() -> CellMesh {
        let config = WorldConfig { cell_count: 400, ..WorldConfig::default() };
        build_mesh(&config).expect("mesh build")
    }

    #[test]
    fn all_cell_areas_positive() {
        let mesh = small_mesh();
        for (c, &a) in mesh.areas_km2.iter().enumerate() {
            assert!(a > 0.0, "cell {c} area {a} must be positive");
        }
    }

    #[test]
    fn interior_areas_near_nominal_cell_size() {
        let mesh = small_mesh();
        let nominal = mesh.spacing_km * mesh.spacing_km;
        for c in 0..mesh.interior_count {
            let a = mesh.areas_km2[c];
            assert!(
                a > 0.2 * nominal && a < 5.0 * nominal,
                "interior cell {c} area {a} far from nominal {nominal}"
            );
        }
    }

    #[test]
    fn neighbor_lists_align_with_edge_lists() {
        let mesh = small_mesh();
        for c in 0..mesh.cell_count() {
            assert_eq!(
                mesh.neighbors_of_cell[c].len(),
                mesh.edges_of_cell[c].len(),
                "cell {c}: neighbour/edge lists must align"
            );
            assert_eq!(
                mesh.neighbors_of_cell[c].len(),
                mesh.vertices_of_cell[c].len(),
                "cell {c}: one neighbour slot per fan segment"
            );
        }
    }

    #[test]
    fn neighbor_relation_symmetric_through_shared_edge() {
        let mesh = small_mesh();
        for c in 0..mesh.cell_count() {
            for (k, &nb) in mesh.neighbors_of_cell[c].iter().enumerate() {
                if nb < 0 {
                    continue;
                }
                let e = mesh.edges_of_cell[c][k];
                let back = mesh.neighbors_of_cell[nb as usize]
                    .iter()
                    .position(|&n| n == c as i32);
                let back = back
                    .unwrap_or_else(|| panic!("cell {nb} must list {c} back as neighbour"));
                assert_eq!(
                    mesh.edges_of_cell[nb as usize][back], e,
                    "cells {c} and {nb} must share edge {e} at their aligned slots"
                );
            }
        }
    }

    #[test]
    fn interior_edges_know_both_cells() {
        let mesh = small_mesh();
        for e in 0..mesh.edge_count() {
            let (c0, c1) = mesh.edge_cells[e];
            assert!(c0 >= 0, "edge {e} must have a first owner");
            if c1 >= 0 {
                assert!(
                    mesh.edges_of_cell[c0 as usize].contains(&(e as u32))
                        && mesh.edges_of_cell[c1 as usize].contains(&(e as u32)),
                    "edge {e} must appear in both owners' edge lists"
                );
            }
        }
    }

    #[test]
    fn vertex_cells_are_mutual() {
        let mesh = small_mesh();
        for v in 0..mesh.vertex_count() {
            for &c in &mesh.cells_at_vertex[v] {
                assert!(
                    mesh.vertices_of_cell[c as usize].contains(&(v as u32))
                        || mesh.vertices_of_cell[c as usize].is_empty(),
                    "cell {c} should list vertex {v} in its fan"
                );
            }
        }
    }

    #[test]
    fn vertex_neighbors_share_an_edge_record() {
        let mesh = small_mesh();
        for v in 0..mesh.vertex_count() {
            for &n in &mesh.neighbors_of_vertex[v] {
                assert!(
                    mesh.edge_between_vertices(v as u32, n).is_some(),
                    "adjacent vertices {v} and {n} must map to an edge"
                );
            }
        }
    }

    #[test]
    fn padding_cells_flagged_as_boundary() {
        let mesh = small_mesh();
        assert!(mesh.interior_count < mesh.cell_count());
        for c in 0..mesh.cell_count() {
            assert_eq!(mesh.is_boundary[c], c >= mesh.interior_count);
        }
    }

    #[test]
    fn nearest_cell_matches_linear_scan() {
        let mesh = small_mesh();
        let queries = [
            (0.0, 0.0),
            (mesh.width_km * 0.5, mesh.height_km * 0.5),
            (mesh.width_km, mesh.height_km),
            (mesh.width_km * 0.21, mesh.height_km * 0.87),
        ];
        for (x, y) in queries {
            let fast = mesh.nearest_cell(x, y);
            let slow = mesh
                .centers
                .iter()
                .enumerate()
                .min_by(|(ai, a), (bi, b)| {
                    let da = (a.0 - x).powi(2) + (a.1 - y).powi(2);
                    let db = (b.0 - x).powi(2) + (b.1 - y).powi(2);
                    da.total_cmp(&db).then(ai.cmp(bi))
                })
                .map(|(i, _)| i)
                .expect("non-empty mesh");
            assert_eq!(fast, slow, "nearest lookup at ({x}, {y})");
        }
    }

    #[test]
    fn same_config_builds_identical_mesh() {
        let a = small_mesh();
        let b = small_mesh();
        assert_eq!(a.centers, b.centers);
        assert_eq!(a.vertices_of_cell, b.vertices_of_cell);
        assert_eq!(a.neighbors_of_cell, b.neighbors_of_cell);
        assert_eq!(a.edge_endpoints, b.edge_endpoints);
        assert_eq!(a.areas_km2, b.areas_km2);
    }
}
