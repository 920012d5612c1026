//! Culture spreading: realm-eligible landmasses, capital seeding, and a
//! competitive Dijkstra flood over the transport-cost graph.

use crate::biomes::BiomeField;
use crate::config::WorldConfig;
use crate::heap::MinHeap;
use crate::mesh::CellMesh;
use crate::political::cost::CostModel;
use crate::political::landmass::Landmasses;
use crate::political::seeding::farthest_point_seeds;
use crate::rivers::RiverField;

/// Cost difference below which two competing claims count as a tie.
pub const DIJKSTRA_TIE_EPSILON: f64 = 1e-4;

pub struct CultureSpread {
    /// 0 = unassigned; otherwise 1-based culture id.
    pub culture_id: Vec<u32>,
    /// Capital cell per culture, indexed by culture id − 1.
    pub capitals: Vec<u32>,
}

/// Spread cultures over all habitable land cells.
pub fn spread_cultures(
    mesh: &CellMesh,
    biomes: &BiomeField,
    rivers: &RiverField,
    landmasses: &Landmasses,
    cost_model: &CostModel,
    config: &WorldConfig,
    candidate: &[bool],
) -> CultureSpread {
    let profile = config.tuning_profile();

    // ── Realm-eligible landmasses ────────────────────────────────────────────
    let total_population: f64 = landmasses.populations.iter().sum();
    let floor = config.politics.min_realm_population_fraction * total_population;
    let mut eligible: Vec<usize> = (0..landmasses.count as usize)
        .filter(|&m| {
            landmasses.cell_counts[m] >= config.politics.min_realm_cells
                && landmasses.populations[m] >= floor
        })
        .collect();
    if eligible.is_empty() && landmasses.count > 0 {
        // Fallback: the most populous landmass (ties: most cells, lower id).
        let best = (0..landmasses.count as usize)
            .min_by(|&a, &b| {
                landmasses.populations[b]
                    .total_cmp(&landmasses.populations[a])
                    .then(landmasses.cell_counts[b].cmp(&landmasses.cell_counts[a]))
                    .then(a.cmp(&b))
            })
            .unwrap_or(0);
        eligible.push(best);
        log::debug!("cultures: no eligible landmass, falling back to mass {}", best + 1);
    }
    let eligible_mask: Vec<bool> = (0..landmasses.count as usize)
        .map(|m| eligible.contains(&m))
        .collect();

    let eligible_cells: u32 = eligible.iter().map(|&m| landmasses.cell_counts[m]).sum();
    let eligible_area: f64 = eligible.iter().map(|&m| landmasses.areas_km2[m]).sum();
    let target =
        ((eligible_cells as f64 / 900.0 * profile.realm_target).round() as i64).clamp(1, 24)
            as usize;

    // ── Capitals: farthest-point over cells of eligible landmasses ───────────
    let pool: Vec<u32> = (0..mesh.cell_count() as u32)
        .filter(|&i| {
            let i = i as usize;
            candidate[i]
                && landmasses.landmass_id[i] > 0
                && eligible_mask[(landmasses.landmass_id[i] - 1) as usize]
        })
        .collect();
    let spacing = (eligible_area / target.max(1) as f64).sqrt() * 0.35
        * profile.capital_spacing;
    let score =
        |c: u32| biomes.suitability[c as usize] as f64 + 0.02 * biomes.population[c as usize] as f64;
    let mut capitals =
        farthest_point_seeds(&pool, |c| mesh.centers[c as usize], &score, target, spacing);

    // Every eligible landmass must host at least one capital.
    for &m in &eligible {
        let covered = capitals
            .iter()
            .any(|&c| landmasses.landmass_id[c as usize] == m as i32 + 1);
        if covered {
            continue;
        }
        let best = pool
            .iter()
            .filter(|&&c| landmasses.landmass_id[c as usize] == m as i32 + 1)
            .max_by(|&&a, &&b| score(a).total_cmp(&score(b)).then(b.cmp(&a)));
        if let Some(&cell) = best {
            capitals.push(cell);
            log::debug!("cultures: added capital {cell} to uncovered landmass {}", m + 1);
        }
    }

    // ── Competitive Dijkstra over the transport graph ────────────────────────
    let n = mesh.cell_count();
    let mut culture_id = vec![0u32; n];
    let mut best_cost = vec![f64::INFINITY; n];
    let mut heap: MinHeap<u32> = MinHeap::with_capacity(n);
    for (k, &cap) in capitals.iter().enumerate() {
        heap.push(0.0, cap, k as u32 + 1);
    }

    while let Some((cost, cell, culture)) = heap.pop() {
        let cell = cell as usize;
        let claim = if culture_id[cell] == 0 {
            true
        } else if cost + DIJKSTRA_TIE_EPSILON < best_cost[cell] {
            true
        } else {
            (cost - best_cost[cell]).abs() <= DIJKSTRA_TIE_EPSILON && culture < culture_id[cell]
        };
        if !claim {
            continue;
        }
        culture_id[cell] = culture;
        best_cost[cell] = cost;
        for (k, &nb) in mesh.neighbors_of_cell[cell].iter().enumerate() {
            if nb < 0 || !candidate[nb as usize] {
                continue;
            }
            let nb = nb as usize;
            let edge = mesh.edges_of_cell[cell][k];
            let step = cost_model.edge_cost(mesh, biomes, rivers, cell, nb, edge);
            let next = cost + step;
            if next < best_cost[nb] + DIJKSTRA_TIE_EPSILON {
                heap.push(next, nb as u32, culture);
            }
        }
    }

    // ── Euclidean fallback for islands no capital can reach ──────────────────
    for i in 0..n {
        if !candidate[i] || culture_id[i] != 0 {
            continue;
        }
        let (x, y) = mesh.centers[i];
        let nearest = capitals
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
        if let Some(culture) = nearest {
            culture_id[i] = culture;
        }
    }

    log::info!("cultures: {} capitals over {} eligible cells", capitals.len(), eligible_cells);
    CultureSpread { culture_id, capitals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::compute_climate;
    use crate::config::WorldConfig;
    use crate::heightmap::ElevationField;
    use crate::mesh::build_mesh;
    use crate::political::landmass::detect_landmasses;
    use crate::rivers::compute_rivers;

    fn two_island_world() -> (
        crate::mesh::CellMesh,
        ElevationField,
        BiomeField,
        RiverField,
        WorldConfig,
    ) {
        let config = WorldConfig { cell_count: 700, ..WorldConfig::default() };
        let mesh = build_mesh(&config).expect("mesh");
        let mut field = ElevationField::new(mesh.cell_count(), 5000.0, 1250.0);
        let centers = [
            (mesh.width_km * 0.25, mesh.height_km * 0.5),
            (mesh.width_km * 0.75, mesh.height_km * 0.5),
        ];
        for i in 0..mesh.cell_count() {
            let (x, y) = mesh.centers[i];
            for &(cx, cy) in &centers {
                let r = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
                let rim = mesh.width_km * 0.16;
                if r < rim {
                    field.set(i, 900.0 * (1.0 - r / rim) + 40.0);
                }
            }
        }
        let climate = compute_climate(&mesh, &field, &config);
        let rivers = compute_rivers(&mesh, &field, &climate, &config);
        let biomes = crate::biomes::compute_biomes(&mesh, &field, &climate, &rivers, &config);
        (mesh, field, biomes, rivers, config)
    }

    fn spread(
        mesh: &crate::mesh::CellMesh,
        field: &ElevationField,
        biomes: &BiomeField,
        rivers: &RiverField,
        config: &WorldConfig,
    ) -> (CultureSpread, Vec<bool>, Landmasses) {
        let candidate: Vec<bool> = (0..mesh.cell_count())
            .map(|i| biomes.is_habitable_land(field, i))
            .collect();
        let landmasses = detect_landmasses(mesh, &candidate, &biomes.population);
        let cost_model = CostModel::build(mesh, biomes, rivers, &candidate);
        let spread =
            spread_cultures(mesh, biomes, rivers, &landmasses, &cost_model, config, &candidate);
        (spread, candidate, landmasses)
    }

    #[test]
    fn every_habitable_cell_gets_a_culture() {
        let (mesh, field, biomes, rivers, config) = two_island_world();
        let (spread, candidate, _) = spread(&mesh, &field, &biomes, &rivers, &config);
        for i in 0..mesh.cell_count() {
            if candidate[i] {
                assert!(spread.culture_id[i] > 0, "candidate cell {i} must carry a culture");
            } else {
                assert_eq!(spread.culture_id[i], 0, "non-candidate cell {i} must stay zero");
            }
        }
    }

    #[test]
    fn capitals_sit_on_their_own_culture() {
        let (mesh, field, biomes, rivers, config) = two_island_world();
        let (spread, _, _) = spread(&mesh, &field, &biomes, &rivers, &config);
        for (k, &cap) in spread.capitals.iter().enumerate() {
            assert_eq!(
                spread.culture_id[cap as usize],
                k as u32 + 1,
                "capital {k} must own its seat"
            );
        }
    }

    #[test]
    fn both_eligible_islands_host_a_capital() {
        let (mesh, field, biomes, rivers, config) = two_island_world();
        let (spread, _, landmasses) = spread(&mesh, &field, &biomes, &rivers, &config);
        if landmasses.count >= 2 {
            let masses: std::collections::HashSet<i32> = spread
                .capitals
                .iter()
                .map(|&c| landmasses.landmass_id[c as usize])
                .collect();
            assert!(
                masses.len() >= 2,
                "two sizeable islands must not share all their capitals"
            );
        }
    }

    #[test]
    fn culture_spread_is_deterministic() {
        let (mesh, field, biomes, rivers, config) = two_island_world();
        let (a, _, _) = spread(&mesh, &field, &biomes, &rivers, &config);
        let (b, _, _) = spread(&mesh, &field, &biomes, &rivers, &config);
        assert_eq!(a.culture_id, b.culture_id);
        assert_eq!(a.capitals, b.capitals);
    }
}
