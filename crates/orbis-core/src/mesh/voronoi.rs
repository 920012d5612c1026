//! Dualization of the Delaunay half-edge triangulation into the Voronoi
//! cell mesh.
//!
//! Voronoi vertices are triangle circumcentres, so vertex ids are triangle
//! ids and adjacency falls straight out of the half-edge structure: the
//! Voronoi edge dual to a Delaunay edge connects the circumcentres of the
//! two triangles sharing it, and separates the cells of its two endpoints.
//! Padding guarantees every interior cell has a closed fan; open (hull)
//! fans belong to padding cells only.

use std::collections::HashMap;

use rayon::prelude::*;
use voronator::delaunator::{triangulate, Point, Triangulation, INVALID_INDEX};

use super::points::PointSet;
use super::{CellMesh, NearestGrid};
use crate::error::GenError;

#[inline]
fn next_halfedge(e: usize) -> usize {
    if e % 3 == 2 { e - 2 } else { e + 1 }
}

#[inline]
fn prev_halfedge(e: usize) -> usize {
    if e % 3 == 0 { e + 2 } else { e - 1 }
}

/// Circumcentre of a triangle; centroid fallback for near-degenerate ones.
fn circumcenter(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> (f64, f64) {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-12 {
        return ((a.0 + b.0 + c.0) / 3.0, (a.1 + b.1 + c.1) / 3.0);
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    (ux, uy)
}

/// Signed shoelace area of a vertex fan (positive = counter-clockwise).
fn signed_area(fan: &[u32], positions: &[(f64, f64)]) -> f64 {
    let m = fan.len();
    if m < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for k in 0..m {
        let (x0, y0) = positions[fan[k] as usize];
        let (x1, y1) = positions[fan[(k + 1) % m] as usize];
        acc += x0 * y1 - x1 * y0;
    }
    acc / 2.0
}

/// Build the full cell mesh from a scattered point set.
pub fn dualize(set: &PointSet, width_km: f64, height_km: f64) -> Result<CellMesh, GenError> {
    let n_cells = set.points.len();
    let sites: Vec<Point> = set.points.iter().map(|&(x, y)| Point { x, y }).collect();
    let tri: Triangulation =
        triangulate(&sites).ok_or(GenError::Triangulation { points: n_cells })?;

    let n_vertices = tri.triangles.len() / 3;

    // ── Voronoi vertices: one circumcentre per triangle ──────────────────────
    let vertex_positions: Vec<(f64, f64)> = (0..n_vertices)
        .map(|t| {
            let a = set.points[tri.triangles[3 * t]];
            let b = set.points[tri.triangles[3 * t + 1]];
            let c = set.points[tri.triangles[3 * t + 2]];
            circumcenter(a, b, c)
        })
        .collect();

    let cells_at_vertex: Vec<[u32; 3]> = (0..n_vertices)
        .map(|t| {
            [
                tri.triangles[3 * t] as u32,
                tri.triangles[3 * t + 1] as u32,
                tri.triangles[3 * t + 2] as u32,
            ]
        })
        .collect();

    let mut neighbors_of_vertex: Vec<Vec<u32>> = vec![Vec::with_capacity(3); n_vertices];
    for t in 0..n_vertices {
        for h in 3 * t..3 * t + 3 {
            let twin = tri.halfedges[h];
            if twin != INVALID_INDEX {
                neighbors_of_vertex[t].push((twin / 3) as u32);
            }
        }
    }

    // ── Per-cell fans ────────────────────────────────────────────────────────
    // One outgoing half-edge per site; hull sites must start at the edge
    // whose backward rotation leaves the triangulation, so the walk covers
    // the whole fan.
    let mut start_edge = vec![INVALID_INDEX; n_cells];
    for e in 0..tri.triangles.len() {
        let p = tri.triangles[e];
        if start_edge[p] == INVALID_INDEX {
            start_edge[p] = e;
        }
        if tri.halfedges[prev_halfedge(e)] == INVALID_INDEX {
            start_edge[p] = e;
        }
    }

    let mut vertices_of_cell: Vec<Vec<u32>> = vec![Vec::new(); n_cells];
    let mut neighbors_of_cell: Vec<Vec<i32>> = vec![Vec::new(); n_cells];
    for p in 0..n_cells {
        let s = start_edge[p];
        if s == INVALID_INDEX {
            continue; // collinear/duplicate site never entered the triangulation
        }
        let fan = &mut vertices_of_cell[p];
        let nbs = &mut neighbors_of_cell[p];
        let mut e = s;
        loop {
            fan.push((e / 3) as u32);
            nbs.push(tri.triangles[next_halfedge(e)] as i32);
            let twin = tri.halfedges[e];
            if twin == INVALID_INDEX {
                // Open hull fan: the closing segment has no dual neighbour.
                let m = nbs.len();
                nbs[m - 1] = -1;
                break;
            }
            e = next_halfedge(twin);
            if e == s {
                break;
            }
        }

        // Normalise to counter-clockwise. Reversing the fan maps segment k
        // to m-2-k and keeps the closing segment at m-1, so the aligned
        // neighbour list is remapped the same way.
        if signed_area(fan, &vertex_positions) < 0.0 {
            fan.reverse();
            let m = nbs.len();
            if m > 2 {
                let closing = nbs[m - 1];
                nbs[..m - 1].reverse();
                nbs[m - 1] = closing;
            }
        }
    }

    // ── Edge arena ───────────────────────────────────────────────────────────
    // Deterministic creation order (cell-major, then segment); the map is a
    // lookup only and is never iterated.
    let mut edge_lookup: HashMap<(u32, u32), u32> = HashMap::new();
    let mut edge_endpoints: Vec<(u32, u32)> = Vec::new();
    let mut edge_cells: Vec<(i32, i32)> = Vec::new();
    let mut edges_of_cell: Vec<Vec<u32>> = vec![Vec::new(); n_cells];

    for c in 0..n_cells {
        if vertices_of_cell[c].len() < 2 {
            // A padding corner can end up with a single incident triangle;
            // such a cell has no usable polygon.
            vertices_of_cell[c].clear();
            neighbors_of_cell[c].clear();
            continue;
        }
        let fan = &vertices_of_cell[c];
        let m = fan.len();
        for k in 0..m {
            let a = fan[k];
            let b = fan[(k + 1) % m];
            let key = (a.min(b), a.max(b));
            let id = match edge_lookup.get(&key) {
                Some(&id) => {
                    let cells = &mut edge_cells[id as usize];
                    if cells.0 != c as i32 && cells.1 == -1 {
                        cells.1 = c as i32;
                    }
                    id
                }
                None => {
                    let id = edge_endpoints.len() as u32;
                    edge_endpoints.push((a, b));
                    edge_cells.push((c as i32, -1));
                    edge_lookup.insert(key, id);
                    id
                }
            };
            edges_of_cell[c].push(id);
        }
    }

    // ── Areas (shoelace), parallel over cells ────────────────────────────────
    let areas_km2: Vec<f64> = vertices_of_cell
        .par_iter()
        .map(|fan| signed_area(fan, &vertex_positions).abs().max(1e-6))
        .collect();

    let is_boundary: Vec<bool> = (0..n_cells).map(|c| c >= set.interior_count).collect();
    let nearest = NearestGrid::build(&set.points, width_km, height_km, set.spacing_km);

    Ok(CellMesh {
        width_km,
        height_km,
        spacing_km: set.spacing_km,
        interior_count: set.interior_count,
        centers: set.points.clone(),
        vertices_of_cell,
        neighbors_of_cell,
        edges_of_cell,
        is_boundary,
        areas_km2,
        vertex_positions,
        cells_at_vertex,
        neighbors_of_vertex,
        edge_endpoints,
        edge_cells,
        edge_lookup,
        nearest,
    })
}
