//! Flow accumulation and per-edge flux.
//!
//! Land vertices are processed in descending water level (ties: lower
//! terrain elevation, then lower id, so lake interiors drain before their
//! rims). A vertex still lacking a flow target takes the neighbour with
//! the smallest water level — terrain elevation for ocean neighbours —
//! restricted to neighbours processed after it, which keeps the flow
//! graph acyclic across exactly-level plateaus and guarantees a vertex's
//! flux is final before it is pushed downstream.

use crate::mesh::CellMesh;

pub struct FlowAccumulation {
    pub vertex_flux: Vec<f32>,
    pub flow_target: Vec<i32>,
    pub edge_flux: Vec<f32>,
}

pub fn accumulate_flow(
    mesh: &CellMesh,
    vertex_elev: &[f32],
    vertex_precip_flux: &[f32],
    water_level: &[f32],
    flow_target_in: &[i32],
) -> FlowAccumulation {
    let v = mesh.vertex_count();
    let is_ocean = |i: usize| vertex_elev[i] <= 0.0;

    let mut order: Vec<usize> = (0..v).filter(|&i| !is_ocean(i)).collect();
    order.sort_unstable_by(|&a, &b| {
        water_level[b]
            .total_cmp(&water_level[a])
            .then(vertex_elev[a].total_cmp(&vertex_elev[b]))
            .then(a.cmp(&b))
    });
    let mut rank = vec![usize::MAX; v];
    for (pos, &i) in order.iter().enumerate() {
        rank[i] = pos;
    }

    let mut flux = vec![0.0f32; v];
    let mut flow_target = flow_target_in.to_vec();

    for &i in &order {
        flux[i] += vertex_precip_flux[i];

        if flow_target[i] < 0 {
            // Ocean neighbours key on terrain; land neighbours on water
            // level. Only later-ranked candidates keep the graph acyclic.
            let mut best: Option<(f32, u32)> = None;
            for &nb in &mesh.neighbors_of_vertex[i] {
                let nbu = nb as usize;
                if !is_ocean(nbu) && rank[nbu] <= rank[i] {
                    continue;
                }
                let key = if is_ocean(nbu) { vertex_elev[nbu] } else { water_level[nbu] };
                let candidate = (key, nb);
                if best.map_or(true, |cur| candidate < cur) {
                    best = Some(candidate);
                }
            }
            if let Some((_, nb)) = best {
                flow_target[i] = nb as i32;
            }
        }

        let target = flow_target[i];
        if target >= 0 && !is_ocean(target as usize) {
            flux[target as usize] += flux[i];
        }
    }

    // Exactly-level plateaus can leave a vertex with no later-ranked
    // candidate. Route each one through the cheapest neighbour whose chain
    // verifiably reaches the ocean without coming back.
    for &i in &order {
        if flow_target[i] >= 0 {
            continue;
        }
        let mut candidates: Vec<(f32, u32)> = mesh.neighbors_of_vertex[i]
            .iter()
            .map(|&nb| {
                let nbu = nb as usize;
                let key = if is_ocean(nbu) { vertex_elev[nbu] } else { water_level[nbu] };
                (key, nb)
            })
            .collect();
        candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (_, nb) in candidates {
            if chain_reaches_ocean(nb as usize, i, &flow_target, vertex_elev, v) {
                flow_target[i] = nb as i32;
                break;
            }
        }
    }

    // Deposit each land vertex's flux onto the edge it drains across.
    let mut edge_flux = vec![0.0f32; mesh.edge_count()];
    for &i in &order {
        let target = flow_target[i];
        if target < 0 {
            continue;
        }
        if let Some(e) = mesh.edge_between_vertices(i as u32, target as u32) {
            edge_flux[e as usize] += flux[i];
        }
    }

    FlowAccumulation { vertex_flux: flux, flow_target, edge_flux }
}

/// Follow flow targets from `start` and report whether the chain reaches
/// an ocean vertex without passing `avoid` (or running out of graph).
fn chain_reaches_ocean(
    start: usize,
    avoid: usize,
    flow_target: &[i32],
    vertex_elev: &[f32],
    vertex_count: usize,
) -> bool {
    let mut cur = start;
    for _ in 0..vertex_count {
        if vertex_elev[cur] <= 0.0 {
            return true;
        }
        if cur == avoid {
            return false;
        }
        match flow_target[cur] {
            t if t >= 0 => cur = t as usize,
            _ => return false,
        }
    }
    false
}
