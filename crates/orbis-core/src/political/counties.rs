//! Global county formation: population-balanced frontier growth, straggler
//! attachment, orphan merging and contiguous renumbering.

use crate::biomes::BiomeField;
use crate::config::WorldConfig;
use crate::heap::MinHeap;
use crate::mesh::CellMesh;
use crate::political::cost::CostModel;
use crate::political::seeding::farthest_point_seeds;
use crate::rivers::RiverField;

/// Stale-priority tolerance for the county frontier heap.
const FRONTIER_STALE_EPSILON: f64 = 1e-3;

/// Orphan criteria: a county this small and this underpopulated merges
/// into a neighbour.
const ORPHAN_MAX_CELLS: u32 = 2;
const ORPHAN_POPULATION_FACTOR: f64 = 0.85;
const ORPHAN_MERGE_PASSES: usize = 4;

pub struct Counties {
    /// 0 = unassigned; otherwise 1-based contiguous county id.
    pub county_id: Vec<u32>,
    /// Seat cell per county, indexed by id − 1.
    pub seats: Vec<u32>,
    pub count: u32,
}

#[derive(Clone, Copy)]
struct CountyState {
    population: f64,
    cells: u32,
}

/// Balance multiplier applied to a frontier candidate's path cost.
/// Underpopulated counties grow cheaply; over-full or over-sized ones pay
/// steep premiums; very small counties sitting on a dense hub are held
/// back so single-cell population centres survive as their own county.
fn balance(state: CountyState, target_population: f64, target_cells: f64) -> f64 {
    let pop_ratio = state.population / target_population;
    let cell_ratio = state.cells as f64 / target_cells;
    let population_term = if pop_ratio < 1.0 {
        0.55 + 0.45 * pop_ratio
    } else {
        1.0 + 4.0 * (pop_ratio - 1.0)
    };
    let cell_term = if cell_ratio > 1.0 { 1.0 + 1.5 * (cell_ratio - 1.0) } else { 1.0 };
    let hub_term = if state.cells <= 2 && pop_ratio >= 0.9 { 6.0 } else { 1.0 };
    population_term * cell_term * hub_term
}

/// Form counties globally across every cell holding a culture.
pub fn form_counties(
    mesh: &CellMesh,
    biomes: &BiomeField,
    rivers: &RiverField,
    cost_model: &CostModel,
    config: &WorldConfig,
    culture_id: &[u32],
) -> Counties {
    let n = mesh.cell_count();
    let profile = config.tuning_profile();
    let domain: Vec<bool> = culture_id.iter().map(|&c| c > 0).collect();
    let land_cells = domain.iter().filter(|&&d| d).count();
    if land_cells == 0 {
        return Counties { county_id: vec![0; n], seats: Vec::new(), count: 0 };
    }

    // ── Seeds ────────────────────────────────────────────────────────────────
    let target = ((land_cells as f64 / 120.0 * profile.county_target).round() as i64)
        .clamp(1, 4096) as usize;
    let total_area: f64 = (0..n).filter(|&i| domain[i]).map(|i| mesh.areas_km2[i]).sum();
    let spacing =
        0.18 * (total_area / target as f64).sqrt() * profile.county_spacing;
    let pool: Vec<u32> = (0..n as u32).filter(|&i| domain[i as usize]).collect();
    let seeds = farthest_point_seeds(
        &pool,
        |c| mesh.centers[c as usize],
        |c| {
            1.25 * biomes.population[c as usize] as f64
                + 0.4 * biomes.suitability[c as usize] as f64
        },
        target,
        spacing,
    );

    let total_population: f64 =
        (0..n).filter(|&i| domain[i]).map(|i| biomes.population[i] as f64).sum();
    let target_population = (total_population / seeds.len() as f64).max(1.0);
    let target_cells = land_cells as f64 / seeds.len() as f64;

    // ── Population-balanced frontier growth ──────────────────────────────────
    let mut owner = vec![0u32; n];
    let mut states: Vec<CountyState> = vec![CountyState { population: 0.0, cells: 0 }; seeds.len()];
    // Payload: (county, path_cost); the key is the balance-scaled priority.
    let mut heap: MinHeap<(u32, f64)> = MinHeap::with_capacity(n);

    for (k, &seed) in seeds.iter().enumerate() {
        let county = k as u32 + 1;
        owner[seed as usize] = county;
        states[k] = CountyState {
            population: biomes.population[seed as usize] as f64,
            cells: 1,
        };
    }
    for (k, &seed) in seeds.iter().enumerate() {
        let county = k as u32 + 1;
        push_frontier(
            mesh, biomes, rivers, cost_model, &domain, &owner, &states[k], county, seed as usize,
            0.0, target_population, target_cells, &mut heap,
        );
    }

    while let Some((stored_priority, cell, (county, path_cost))) = heap.pop() {
        let cell_idx = cell as usize;
        if owner[cell_idx] != 0 {
            continue;
        }
        let state = states[(county - 1) as usize];
        let fresh_priority = path_cost * balance(state, target_population, target_cells);
        if fresh_priority > stored_priority + FRONTIER_STALE_EPSILON {
            // The county grew since this entry was queued; re-rank it.
            heap.push(fresh_priority, cell, (county, path_cost));
            continue;
        }
        owner[cell_idx] = county;
        let state = &mut states[(county - 1) as usize];
        state.population += biomes.population[cell_idx] as f64;
        state.cells += 1;
        let state = states[(county - 1) as usize];
        push_frontier(
            mesh, biomes, rivers, cost_model, &domain, &owner, &state, county, cell_idx,
            path_cost, target_population, target_cells, &mut heap,
        );
    }

    // ── Straggler attachment ─────────────────────────────────────────────────
    loop {
        let mut changed = false;
        for i in 0..n {
            if !domain[i] || owner[i] != 0 {
                continue;
            }
            let mut best: Option<(f64, u32)> = None;
            for (k, &nb) in mesh.neighbors_of_cell[i].iter().enumerate() {
                if nb < 0 || owner[nb as usize] == 0 {
                    continue;
                }
                let edge = mesh.edges_of_cell[i][k];
                let cost = cost_model.edge_cost(mesh, biomes, rivers, i, nb as usize, edge);
                let candidate = (cost, owner[nb as usize]);
                if best.map_or(true, |cur| candidate < cur) {
                    best = Some(candidate);
                }
            }
            if let Some((_, county)) = best {
                owner[i] = county;
                let state = &mut states[(county - 1) as usize];
                state.population += biomes.population[i] as f64;
                state.cells += 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Remnants on unreachable islands: nearest seed by straight distance.
    for i in 0..n {
        if !domain[i] || owner[i] != 0 {
            continue;
        }
        let (x, y) = mesh.centers[i];
        let nearest = seeds
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| {
                let (ax, ay) = mesh.centers[a as usize];
                let (bx, by) = mesh.centers[b as usize];
                let da = (ax - x).powi(2) + (ay - y).powi(2);
                let db = (bx - x).powi(2) + (by - y).powi(2);
                da.total_cmp(&db).then(a.cmp(&b))
            })
            .map(|(k, _)| k as u32 + 1);
        if let Some(county) = nearest {
            owner[i] = county;
            let state = &mut states[(county - 1) as usize];
            state.population += biomes.population[i] as f64;
            state.cells += 1;
        }
    }

    // ── Orphan merge ─────────────────────────────────────────────────────────
    let orphan_pop_floor =
        ORPHAN_POPULATION_FACTOR * target_population * profile.orphan_threshold;
    for _ in 0..ORPHAN_MERGE_PASSES {
        let merges = plan_orphan_merges(
            mesh, biomes, rivers, cost_model, &domain, &owner, &states, orphan_pop_floor,
        );
        if merges.is_empty() {
            break;
        }
        for (orphan, into) in merges {
            let moved = states[(orphan - 1) as usize];
            for o in owner.iter_mut() {
                if *o == orphan {
                    *o = into;
                }
            }
            states[(orphan - 1) as usize] = CountyState { population: 0.0, cells: 0 };
            let state = &mut states[(into - 1) as usize];
            state.population += moved.population;
            state.cells += moved.cells;
        }
    }

    // ── Contiguous renumbering and seats ─────────────────────────────────────
    let mut remap = vec![0u32; seeds.len() + 1];
    let mut next = 0u32;
    for k in 0..seeds.len() {
        if states[k].cells > 0 {
            next += 1;
            remap[k + 1] = next;
        }
    }
    let mut county_id = vec![0u32; n];
    for i in 0..n {
        if owner[i] != 0 {
            county_id[i] = remap[owner[i] as usize];
        }
    }

    let count = next;
    let mut seats = vec![u32::MAX; count as usize];
    let mut seat_pop = vec![f64::NEG_INFINITY; count as usize];
    for i in 0..n {
        let c = county_id[i];
        if c == 0 {
            continue;
        }
        let k = (c - 1) as usize;
        let pop = biomes.population[i] as f64;
        if pop > seat_pop[k] || (pop == seat_pop[k] && (i as u32) < seats[k]) {
            seat_pop[k] = pop;
            seats[k] = i as u32;
        }
    }

    log::info!("counties: {count} formed from {} seeds over {land_cells} cells", seeds.len());
    Counties { county_id, seats, count }
}

#[allow(clippy::too_many_arguments)]
fn push_frontier(
    mesh: &CellMesh,
    biomes: &BiomeField,
    rivers: &RiverField,
    cost_model: &CostModel,
    domain: &[bool],
    owner: &[u32],
    state: &CountyState,
    county: u32,
    cell: usize,
    path_cost: f64,
    target_population: f64,
    target_cells: f64,
    heap: &mut MinHeap<(u32, f64)>,
) {
    for (k, &nb) in mesh.neighbors_of_cell[cell].iter().enumerate() {
        if nb < 0 {
            continue;
        }
        let nb = nb as usize;
        if !domain[nb] || owner[nb] != 0 {
            continue;
        }
        let edge = mesh.edges_of_cell[cell][k];
        let step = cost_model.edge_cost(mesh, biomes, rivers, cell, nb, edge);
        let next_cost = path_cost + step;
        let priority = next_cost * balance(*state, target_population, target_cells);
        heap.push(priority, nb as u32, (county, next_cost));
    }
}

/// One merge pass: every orphan county picks the neighbour county behind
/// its cheapest connecting edge, preferring stable neighbours.
#[allow(clippy::too_many_arguments)]
fn plan_orphan_merges(
    mesh: &CellMesh,
    biomes: &BiomeField,
    rivers: &RiverField,
    cost_model: &CostModel,
    domain: &[bool],
    owner: &[u32],
    states: &[CountyState],
    orphan_pop_floor: f64,
) -> Vec<(u32, u32)> {
    let is_orphan = |county: u32| {
        let s = states[(county - 1) as usize];
        s.cells > 0 && s.cells <= ORPHAN_MAX_CELLS && s.population < orphan_pop_floor
    };

    let mut merges = Vec::new();
    for county in 1..=states.len() as u32 {
        if !is_orphan(county) {
            continue;
        }
        // Cheapest connecting edge per neighbouring county, stable first.
        let mut best: Option<(bool, f64, u32)> = None; // (unstable?, cost, county)
        for i in 0..mesh.cell_count() {
            if owner[i] != county {
                continue;
            }
            for (k, &nb) in mesh.neighbors_of_cell[i].iter().enumerate() {
                if nb < 0 {
                    continue;
                }
                let nb = nb as usize;
                if !domain[nb] {
                    continue;
                }
                let other = owner[nb];
                if other == 0 || other == county {
                    continue;
                }
                let edge = mesh.edges_of_cell[i][k];
                let cost = cost_model.edge_cost(mesh, biomes, rivers, i, nb, edge);
                let unstable = is_orphan(other);
                let candidate = (unstable, cost, other);
                if best.map_or(true, |cur| candidate < cur) {
                    best = Some(candidate);
                }
            }
        }
        if let Some((_, _, into)) = best {
            merges.push((county, into));
        }
    }

    // Drop chains: if an orphan's target is itself merging this pass, let
    // the next pass reconcile the pair.
    let merging: std::collections::HashSet<u32> = merges.iter().map(|&(o, _)| o).collect();
    merges.retain(|&(_, into)| !merging.contains(&into));
    merges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::compute_climate;
    use crate::config::WorldConfig;
    use crate::heightmap::ElevationField;
    use crate::mesh::build_mesh;
    use crate::political::cost::CostModel;
    use crate::political::cultures::spread_cultures;
    use crate::political::landmass::detect_landmasses;
    use crate::rivers::compute_rivers;

    fn county_world() -> (crate::mesh::CellMesh, Counties, Vec<u32>, BiomeField) {
        let config = WorldConfig { cell_count: 900, ..WorldConfig::default() };
        let mesh = build_mesh(&config).expect("mesh");
        let mut field = ElevationField::new(mesh.cell_count(), 5000.0, 1250.0);
        let (cx, cy) = (mesh.width_km / 2.0, mesh.height_km / 2.0);
        for i in 0..mesh.cell_count() {
            let (x, y) = mesh.centers[i];
            let r = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            let rim = mesh.width_km * 0.34;
            if r < rim {
                field.set(i, 1200.0 * (1.0 - r / rim) + 25.0);
            }
        }
        let climate = compute_climate(&mesh, &field, &config);
        let rivers = compute_rivers(&mesh, &field, &climate, &config);
        let biomes = crate::biomes::compute_biomes(&mesh, &field, &climate, &rivers, &config);
        let candidate: Vec<bool> = (0..mesh.cell_count())
            .map(|i| biomes.is_habitable_land(&field, i))
            .collect();
        let landmasses = detect_landmasses(&mesh, &candidate, &biomes.population);
        let cost_model = CostModel::build(&mesh, &biomes, &rivers, &candidate);
        let cultures = spread_cultures(
            &mesh, &biomes, &rivers, &landmasses, &cost_model, &config, &candidate,
        );
        let counties =
            form_counties(&mesh, &biomes, &rivers, &cost_model, &config, &cultures.culture_id);
        (mesh, counties, cultures.culture_id, biomes)
    }

    #[test]
    fn every_cultured_cell_lands_in_a_county() {
        let (mesh, counties, culture_id, _) = county_world();
        for i in 0..mesh.cell_count() {
            if culture_id[i] > 0 {
                assert!(counties.county_id[i] > 0, "cultured cell {i} must join a county");
            } else {
                assert_eq!(counties.county_id[i], 0, "uncultured cell {i} must stay zero");
            }
        }
    }

    #[test]
    fn county_ids_are_contiguous_from_one() {
        let (mesh, counties, _, _) = county_world();
        let mut seen = vec![false; counties.count as usize + 1];
        for i in 0..mesh.cell_count() {
            let c = counties.county_id[i];
            if c > 0 {
                assert!(c <= counties.count, "county id {c} above count {}", counties.count);
                seen[c as usize] = true;
            }
        }
        for c in 1..=counties.count as usize {
            assert!(seen[c], "county id {c} must be in use");
        }
    }

    #[test]
    fn seats_sit_inside_their_counties() {
        let (_, counties, _, biomes) = county_world();
        for (k, &seat) in counties.seats.iter().enumerate() {
            assert_eq!(
                counties.county_id[seat as usize],
                k as u32 + 1,
                "seat of county {} must belong to it",
                k + 1
            );
            assert!(biomes.population[seat as usize] >= 0.0);
        }
    }

    #[test]
    fn no_single_giant_county() {
        let (mesh, counties, culture_id, _) = county_world();
        let land = (0..mesh.cell_count()).filter(|&i| culture_id[i] > 0).count();
        assert!(counties.count >= 2, "a ~{land}-cell island should split into counties");
        let mut sizes = vec![0usize; counties.count as usize];
        for i in 0..mesh.cell_count() {
            if counties.county_id[i] > 0 {
                sizes[(counties.county_id[i] - 1) as usize] += 1;
            }
        }
        let biggest = sizes.iter().max().copied().unwrap_or(0);
        assert!(
            biggest < land,
            "the balance term must prevent one county from absorbing the island"
        );
    }

    #[test]
    fn counties_are_deterministic() {
        let (_, a, _, _) = county_world();
        let (_, b, _, _) = county_world();
        assert_eq!(a.county_id, b.county_id);
        assert_eq!(a.seats, b.seats);
    }
}
