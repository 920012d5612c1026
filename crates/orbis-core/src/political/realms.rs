//! Realm derivation from county-level culture majority, and province
//! partition by competitive Dijkstra on the county-adjacency graph.

use std::collections::HashMap;

use crate::biomes::BiomeField;
use crate::config::WorldConfig;
use crate::heap::MinHeap;
use crate::mesh::CellMesh;
use crate::political::counties::Counties;
use crate::political::cultures::DIJKSTRA_TIE_EPSILON;
use crate::political::seeding::farthest_point_seeds;

pub struct RealmPartition {
    /// Realm per cell; realm ids equal culture ids.
    pub realm_id: Vec<u32>,
    /// Realm per county, indexed by county id − 1.
    pub realm_of_county: Vec<u32>,
    pub realm_count: u32,
}

/// Each county votes with its cells; the majority culture becomes the
/// county's realm (ties: lower culture id). Realms are therefore
/// bijective with cultures.
pub fn derive_realms(
    mesh: &CellMesh,
    culture_id: &[u32],
    counties: &Counties,
    culture_count: u32,
) -> RealmPartition {
    let n = mesh.cell_count();
    let mut votes: Vec<HashMap<u32, u32>> = vec![HashMap::new(); counties.count as usize];
    for i in 0..n {
        let county = counties.county_id[i];
        if county == 0 || culture_id[i] == 0 {
            continue;
        }
        *votes[(county - 1) as usize].entry(culture_id[i]).or_insert(0) += 1;
    }

    let realm_of_county: Vec<u32> = votes
        .iter()
        .map(|tally| {
            tally
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(&culture, _)| culture)
                .unwrap_or(0)
        })
        .collect();

    let mut realm_id = vec![0u32; n];
    for i in 0..n {
        let county = counties.county_id[i];
        if county > 0 {
            realm_id[i] = realm_of_county[(county - 1) as usize];
        }
    }

    RealmPartition { realm_id, realm_of_county, realm_count: culture_count }
}

pub struct ProvincePartition {
    /// Province per cell, globally contiguous from 1.
    pub province_id: Vec<u32>,
    /// Province per county, indexed by county id − 1.
    pub province_of_county: Vec<u32>,
    pub province_count: u32,
}

/// Partition each realm's counties into provinces.
///
/// The county-adjacency graph connects counties sharing any mesh edge;
/// inter-county steps cost seat distance times the mean seat movement
/// cost. Seeds are farthest-point on county population; unreached
/// counties fall back to the nearest seed by seat distance.
pub fn partition_provinces(
    mesh: &CellMesh,
    biomes: &BiomeField,
    counties: &Counties,
    realms: &RealmPartition,
    config: &WorldConfig,
) -> ProvincePartition {
    let profile = config.tuning_profile();
    let county_count = counties.count as usize;
    let n = mesh.cell_count();

    // ── County adjacency (two counties touch iff any cells do) ───────────────
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); county_count];
    let mut seen: std::collections::HashSet<(u32, u32)> = std::collections::HashSet::new();
    for i in 0..n {
        let a = counties.county_id[i];
        if a == 0 {
            continue;
        }
        for &nb in &mesh.neighbors_of_cell[i] {
            if nb < 0 {
                continue;
            }
            let b = counties.county_id[nb as usize];
            if b == 0 || b == a {
                continue;
            }
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                adjacency[(a - 1) as usize].push(b);
                adjacency[(b - 1) as usize].push(a);
            }
        }
    }
    for list in &mut adjacency {
        list.sort_unstable();
    }

    let seat = |county: u32| counties.seats[(county - 1) as usize] as usize;
    let seat_distance = |a: u32, b: u32| mesh.center_distance(seat(a), seat(b));
    let step_cost = |a: u32, b: u32| {
        let move_mean = 0.5
            * (biomes.movement_cost[seat(a)] as f64 + biomes.movement_cost[seat(b)] as f64);
        seat_distance(a, b) * move_mean
    };

    // County population and area, for seeding targets.
    let mut county_population = vec![0.0f64; county_count];
    let mut county_cells = vec![0u32; county_count];
    let mut county_area = vec![0.0f64; county_count];
    for i in 0..n {
        let c = counties.county_id[i];
        if c > 0 {
            county_population[(c - 1) as usize] += biomes.population[i] as f64;
            county_cells[(c - 1) as usize] += 1;
            county_area[(c - 1) as usize] += mesh.areas_km2[i];
        }
    }

    // ── Per-realm competitive Dijkstra on the county graph ───────────────────
    let mut province_of_county = vec![0u32; county_count];
    let mut next_province = 0u32;

    for realm in 1..=realms.realm_count {
        let members: Vec<u32> = (1..=counties.count)
            .filter(|&c| realms.realm_of_county[(c - 1) as usize] == realm)
            .collect();
        if members.is_empty() {
            continue;
        }
        let realm_cells: u32 = members.iter().map(|&c| county_cells[(c - 1) as usize]).sum();
        let realm_area: f64 = members.iter().map(|&c| county_area[(c - 1) as usize]).sum();
        let target = ((realm_cells as f64 / 450.0 * profile.province_target).round() as i64)
            .clamp(1, 18) as usize;
        let spacing =
            0.25 * (realm_area / target as f64).sqrt() * profile.province_spacing;

        let seeds = farthest_point_seeds(
            &members,
            |c| mesh.centers[seat(c)],
            |c| county_population[(c - 1) as usize],
            target,
            spacing,
        );

        // Local province index per seed; global ids assigned afterwards in
        // seed order, keeping them contiguous across realms.
        let mut local: HashMap<u32, u32> = HashMap::new();
        let mut best_cost: HashMap<u32, f64> = HashMap::new();
        let mut heap: MinHeap<u32> = MinHeap::new();
        for (k, &seed_county) in seeds.iter().enumerate() {
            heap.push(0.0, seed_county, k as u32);
        }
        while let Some((cost, county, province)) = heap.pop() {
            let claim = match local.get(&county) {
                None => true,
                Some(&cur) => {
                    let known = best_cost[&county];
                    cost + DIJKSTRA_TIE_EPSILON < known
                        || ((cost - known).abs() <= DIJKSTRA_TIE_EPSILON && province < cur)
                }
            };
            if !claim {
                continue;
            }
            local.insert(county, province);
            best_cost.insert(county, cost);
            for &nb in &adjacency[(county - 1) as usize] {
                if realms.realm_of_county[(nb - 1) as usize] != realm {
                    continue;
                }
                let next = cost + step_cost(county, nb);
                if best_cost.get(&nb).map_or(true, |&cur| next < cur + DIJKSTRA_TIE_EPSILON) {
                    heap.push(next, nb, province);
                }
            }
        }

        // Unreached members: nearest seed by seat distance.
        for &county in &members {
            if local.contains_key(&county) {
                continue;
            }
            let nearest = seeds
                .iter()
                .enumerate()
                .min_by(|(_, &a), (_, &b)| {
                    seat_distance(county, a)
                        .total_cmp(&seat_distance(county, b))
                        .then(a.cmp(&b))
                })
                .map(|(k, _)| k as u32);
            if let Some(province) = nearest {
                local.insert(county, province);
            }
        }

        for (k, _) in seeds.iter().enumerate() {
            let global = next_province + k as u32 + 1;
            for (&county, &province) in &local {
                if province == k as u32 {
                    province_of_county[(county - 1) as usize] = global;
                }
            }
        }
        next_province += seeds.len() as u32;
    }

    // ── Compact ids (a realm's seed may win no county at all) ────────────────
    let mut used: Vec<u32> = province_of_county.iter().copied().filter(|&p| p > 0).collect();
    used.sort_unstable();
    used.dedup();
    let mut compact = HashMap::new();
    for (k, &p) in used.iter().enumerate() {
        compact.insert(p, k as u32 + 1);
    }
    for p in &mut province_of_county {
        if *p > 0 {
            *p = compact[&*p];
        }
    }
    let province_count = used.len() as u32;

    let mut province_id = vec![0u32; n];
    for i in 0..n {
        let c = counties.county_id[i];
        if c > 0 {
            province_id[i] = province_of_county[(c - 1) as usize];
        }
    }

    log::info!("provinces: {province_count} across {} realms", realms.realm_count);
    ProvincePartition { province_id, province_of_county, province_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::political::counties::Counties;

    /// Six counties in a 2×3 grid of cells is overkill to build a mesh
    /// for, so realm tests run on a tiny synthetic county layout built
    /// from a real mesh's cells.
    fn tiny_world() -> (crate::mesh::CellMesh, Counties, Vec<u32>) {
        let config = crate::config::WorldConfig {
            cell_count: 300,
            ..crate::config::WorldConfig::default()
        };
        let mesh = crate::mesh::build_mesh(&config).expect("mesh");
        let n = mesh.cell_count();
        // Split interior cells into 4 quadrant counties.
        let mut county_id = vec![0u32; n];
        for i in 0..mesh.interior_count {
            let (x, y) = mesh.centers[i];
            let east = x > mesh.width_km / 2.0;
            let north = y > mesh.height_km / 2.0;
            county_id[i] = match (east, north) {
                (false, false) => 1,
                (true, false) => 2,
                (false, true) => 3,
                (true, true) => 4,
            };
        }
        let mut seats = vec![u32::MAX; 4];
        for i in 0..n {
            let c = county_id[i];
            if c > 0 && seats[(c - 1) as usize] == u32::MAX {
                seats[(c - 1) as usize] = i as u32;
            }
        }
        let counties = Counties { county_id: county_id.clone(), seats, count: 4 };
        // Cultures: west = 1, east = 2.
        let culture_id: Vec<u32> = (0..n)
            .map(|i| {
                if county_id[i] == 0 {
                    0
                } else if mesh.centers[i].0 <= mesh.width_km / 2.0 {
                    1
                } else {
                    2
                }
            })
            .collect();
        (mesh, counties, culture_id)
    }

    #[test]
    fn majority_vote_assigns_each_county_to_one_realm() {
        let (mesh, counties, culture_id) = tiny_world();
        let realms = derive_realms(&mesh, &culture_id, &counties, 2);
        assert_eq!(realms.realm_count, 2);
        // Quadrant counties are culturally homogeneous: west counties
        // (1, 3) vote culture 1, east counties (2, 4) vote culture 2.
        assert_eq!(realms.realm_of_county, vec![1, 2, 1, 2]);
        for i in 0..mesh.cell_count() {
            let county = counties.county_id[i];
            if county > 0 {
                assert_eq!(
                    realms.realm_id[i],
                    realms.realm_of_county[(county - 1) as usize],
                    "cell {i} must wear its county's realm"
                );
            } else {
                assert_eq!(realms.realm_id[i], 0);
            }
        }
    }

    #[test]
    fn provinces_never_straddle_realms() {
        let (mesh, counties, culture_id) = tiny_world();
        let realms = derive_realms(&mesh, &culture_id, &counties, 2);
        let config = crate::config::WorldConfig::default();
        let biomes = fake_biomes(&mesh);
        let provinces = partition_provinces(&mesh, &biomes, &counties, &realms, &config);
        assert!(provinces.province_count >= 1);
        // Map each province to the set of realms its counties belong to.
        let mut realm_of_province: HashMap<u32, u32> = HashMap::new();
        for county in 1..=counties.count {
            let p = provinces.province_of_county[(county - 1) as usize];
            let r = realms.realm_of_county[(county - 1) as usize];
            if p == 0 {
                continue;
            }
            if let Some(&prev) = realm_of_province.get(&p) {
                assert_eq!(prev, r, "province {p} must stay inside one realm");
            } else {
                realm_of_province.insert(p, r);
            }
        }
    }

    #[test]
    fn province_ids_are_contiguous() {
        let (mesh, counties, culture_id) = tiny_world();
        let realms = derive_realms(&mesh, &culture_id, &counties, 2);
        let config = crate::config::WorldConfig::default();
        let biomes = fake_biomes(&mesh);
        let provinces = partition_provinces(&mesh, &biomes, &counties, &realms, &config);
        let mut used: Vec<u32> =
            provinces.province_of_county.iter().copied().filter(|&p| p > 0).collect();
        used.sort_unstable();
        used.dedup();
        assert_eq!(
            used,
            (1..=provinces.province_count).collect::<Vec<u32>>(),
            "province ids must be 1..=count"
        );
    }

    fn fake_biomes(mesh: &crate::mesh::CellMesh) -> BiomeField {
        let n = mesh.cell_count();
        BiomeField {
            is_lake_cell: vec![false; n],
            feature_id: vec![0; n],
            features: Vec::new(),
            coast_distance_cells: vec![1; n],
            slope: vec![0.0; n],
            biome_id: vec![crate::biomes::BiomeId::Grassland; n],
            habitability: vec![50.0; n],
            movement_cost: vec![20.0; n],
            suitability: vec![50.0; n],
            population: vec![10.0; n],
        }
    }
}
