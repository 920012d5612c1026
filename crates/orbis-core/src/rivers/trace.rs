//! River extraction: mouths, greedy upstream traces, tributary BFS.

use std::collections::VecDeque;

/// One extracted river polyline. `vertices` is ordered source → mouth and
/// ends with the junction or ocean vertex the mouth drains into, appended
/// for display continuity.
#[derive(Debug, Clone, PartialEq)]
pub struct River {
    pub id: u32,
    pub vertices: Vec<u32>,
    pub mouth_vertex: u32,
    pub source_vertex: u32,
    pub discharge: f64,
}

pub struct TraceResult {
    pub rivers: Vec<River>,
    pub is_river_vertex: Vec<bool>,
}

/// Extract rivers from the accumulated flow graph.
///
/// Main stems start at ocean-draining vertices with flux above the river
/// threshold, richest first, and greedily follow their largest qualifying
/// inflow upstream. Tributaries then spawn breadth-first off every stem
/// vertex at the lower trace threshold. Rivers shorter than
/// `min_vertices` are discarded (their vertices stay claimed).
pub fn extract_rivers(
    vertex_elev: &[f32],
    vertex_flux: &[f32],
    flow_target: &[i32],
    river_threshold: f64,
    trace_threshold: f64,
    min_vertices: usize,
) -> TraceResult {
    let v = vertex_elev.len();
    let is_ocean = |i: usize| vertex_elev[i] <= 0.0;

    // Reverse flow graph: donors[t] = vertices draining into t.
    let mut donors: Vec<Vec<u32>> = vec![Vec::new(); v];
    for i in 0..v {
        let t = flow_target[i];
        if t >= 0 && !is_ocean(i) {
            donors[t as usize].push(i as u32);
        }
    }

    let mut mouths: Vec<u32> = (0..v as u32)
        .filter(|&i| {
            let i = i as usize;
            if is_ocean(i) {
                return false;
            }
            let t = flow_target[i];
            t >= 0 && is_ocean(t as usize) && (vertex_flux[i] as f64) >= river_threshold
        })
        .collect();
    mouths.sort_unstable_by(|&a, &b| {
        vertex_flux[b as usize]
            .total_cmp(&vertex_flux[a as usize])
            .then(a.cmp(&b))
    });

    let mut claimed = vec![false; v];
    let mut rivers: Vec<River> = Vec::new();
    let mut is_river_vertex = vec![false; v];
    let mut stem_queue: VecDeque<u32> = VecDeque::new();

    // Main stems.
    for &mouth in &mouths {
        if claimed[mouth as usize] {
            continue;
        }
        let path = trace_upstream(mouth, river_threshold, vertex_flux, &donors, &mut claimed);
        push_river(
            path, min_vertices, vertex_flux, flow_target, &mut rivers,
            &mut is_river_vertex, &mut stem_queue,
        );
    }

    // Tributaries, breadth-first off the claimed network.
    while let Some(stem_vertex) = stem_queue.pop_front() {
        loop {
            let Some(branch) = best_inflow(
                stem_vertex as usize,
                trace_threshold,
                vertex_flux,
                &donors,
                &claimed,
            ) else {
                break;
            };
            let path = trace_upstream(branch, trace_threshold, vertex_flux, &donors, &mut claimed);
            push_river(
                path, min_vertices, vertex_flux, flow_target, &mut rivers,
                &mut is_river_vertex, &mut stem_queue,
            );
        }
    }

    TraceResult { rivers, is_river_vertex }
}

/// Register one traced path as a river, unless it is too short. The path
/// arrives mouth → source and is stored reversed, with the mouth's drain
/// target appended for display continuity. Its vertices join the stem
/// queue so tributaries can branch off them.
fn push_river(
    path: Vec<u32>,
    min_vertices: usize,
    vertex_flux: &[f32],
    flow_target: &[i32],
    rivers: &mut Vec<River>,
    is_river_vertex: &mut [bool],
    stem_queue: &mut VecDeque<u32>,
) {
    if path.len() < min_vertices {
        return;
    }
    let mouth = path[0];
    let source = *path.last().unwrap_or(&mouth);
    let discharge = vertex_flux[mouth as usize] as f64;
    let mut vertices: Vec<u32> = path.iter().rev().copied().collect();
    if flow_target[mouth as usize] >= 0 {
        vertices.push(flow_target[mouth as usize] as u32);
    }
    for &p in &path {
        is_river_vertex[p as usize] = true;
        stem_queue.push_back(p);
    }
    rivers.push(River {
        id: rivers.len() as u32 + 1,
        vertices,
        mouth_vertex: mouth,
        source_vertex: source,
        discharge,
    });
}

/// Highest-flux unclaimed donor above the threshold (ties: lower id).
fn best_inflow(
    target: usize,
    threshold: f64,
    vertex_flux: &[f32],
    donors: &[Vec<u32>],
    claimed: &[bool],
) -> Option<u32> {
    let mut best: Option<u32> = None;
    for &d in &donors[target] {
        if claimed[d as usize] || (vertex_flux[d as usize] as f64) < threshold {
            continue;
        }
        match best {
            None => best = Some(d),
            Some(b) => {
                let richer = vertex_flux[d as usize]
                    .total_cmp(&vertex_flux[b as usize])
                    .then(b.cmp(&d));
                if richer == std::cmp::Ordering::Greater {
                    best = Some(d);
                }
            }
        }
    }
    best
}

/// Claim and collect vertices mouth → source by always following the
/// richest qualifying inflow.
fn trace_upstream(
    start: u32,
    threshold: f64,
    vertex_flux: &[f32],
    donors: &[Vec<u32>],
    claimed: &mut [bool],
) -> Vec<u32> {
    let mut path = vec![start];
    claimed[start as usize] = true;
    let mut cur = start as usize;
    while let Some(next) = best_inflow(cur, threshold, vertex_flux, donors, claimed) {
        claimed[next as usize] = true;
        path.push(next);
        cur = next as usize;
    }
    path
}
