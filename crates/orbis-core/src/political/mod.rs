//! Political hierarchy stage, bottom-up: cultures are spread first,
//! counties are formed globally, realms derive from county-level culture
//! majority, and provinces partition each realm on the county graph.

pub mod cost;
pub mod counties;
pub mod cultures;
pub mod landmass;
pub mod realms;
pub mod seeding;

use crate::biomes::BiomeField;
use crate::config::WorldConfig;
use crate::heightmap::ElevationField;
use crate::mesh::CellMesh;
use crate::rivers::RiverField;

/// Full political output.
#[derive(Debug, Clone, PartialEq)]
pub struct PoliticalField {
    /// −1 on water/lake cells, else 1-based landmass id.
    pub landmass_id: Vec<i32>,
    pub landmass_count: u32,
    /// 0 = unassigned, else 1-based and contiguous.
    pub culture_id: Vec<u32>,
    pub realm_id: Vec<u32>,
    pub province_id: Vec<u32>,
    pub county_id: Vec<u32>,
    /// Capital cell per culture/realm, indexed by id − 1.
    pub capitals: Vec<u32>,
    /// Seat cell per county, indexed by id − 1.
    pub county_seats: Vec<u32>,
    pub realm_count: u32,
    pub county_count: u32,
    pub province_count: u32,
}

/// Run the political stage.
pub fn compute_political(
    mesh: &CellMesh,
    elevation: &ElevationField,
    biomes: &BiomeField,
    rivers: &RiverField,
    config: &WorldConfig,
) -> PoliticalField {
    let candidate: Vec<bool> = (0..mesh.cell_count())
        .map(|i| biomes.is_habitable_land(elevation, i))
        .collect();

    let masses = landmass::detect_landmasses(mesh, &candidate, &biomes.population);
    let cost_model = cost::CostModel::build(mesh, biomes, rivers, &candidate);
    let spread = cultures::spread_cultures(
        mesh, biomes, rivers, &masses, &cost_model, config, &candidate,
    );
    let counties =
        counties::form_counties(mesh, biomes, rivers, &cost_model, config, &spread.culture_id);
    let realm_partition = realms::derive_realms(
        mesh,
        &spread.culture_id,
        &counties,
        spread.capitals.len() as u32,
    );
    let provinces =
        realms::partition_provinces(mesh, biomes, &counties, &realm_partition, config);

    log::info!(
        "political: {} landmasses, {} realms, {} provinces, {} counties",
        masses.count,
        realm_partition.realm_count,
        provinces.province_count,
        counties.count,
    );

    PoliticalField {
        landmass_id: masses.landmass_id,
        landmass_count: masses.count,
        culture_id: spread.culture_id,
        realm_id: realm_partition.realm_id,
        province_id: provinces.province_id,
        county_id: counties.county_id,
        capitals: spread.capitals,
        county_seats: counties.seats,
        realm_count: realm_partition.realm_count,
        county_count: counties.count,
        province_count: provinces.province_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::compute_climate;
    use crate::config::WorldConfig;
    use crate::heightmap::ElevationField;
    use crate::mesh::build_mesh;
    use crate::rivers::compute_rivers;

    fn political_world() -> (crate::mesh::CellMesh, ElevationField, BiomeField, PoliticalField) {
        let config = WorldConfig { cell_count: 800, ..WorldConfig::default() };
        let mesh = build_mesh(&config).expect("mesh");
        let mut field = ElevationField::new(mesh.cell_count(), 5000.0, 1250.0);
        let centers = [
            (mesh.width_km * 0.3, mesh.height_km * 0.5),
            (mesh.width_km * 0.72, mesh.height_km * 0.45),
        ];
        for i in 0..mesh.cell_count() {
            let (x, y) = mesh.centers[i];
            for &(cx, cy) in &centers {
                let r = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
                let rim = mesh.width_km * 0.17;
                if r < rim {
                    field.set(i, 1000.0 * (1.0 - r / rim) + 35.0);
                }
            }
        }
        let climate = compute_climate(&mesh, &field, &config);
        let rivers = compute_rivers(&mesh, &field, &climate, &config);
        let biomes = crate::biomes::compute_biomes(&mesh, &field, &climate, &rivers, &config);
        let political = compute_political(&mesh, &field, &biomes, &rivers, &config);
        (mesh, field, biomes, political)
    }

    #[test]
    fn habitable_cells_carry_the_full_hierarchy() {
        let (mesh, field, biomes, pol) = political_world();
        for i in 0..mesh.cell_count() {
            if biomes.is_habitable_land(&field, i) {
                assert!(pol.culture_id[i] > 0, "cell {i} culture");
                assert!(pol.realm_id[i] > 0, "cell {i} realm");
                assert!(pol.province_id[i] > 0, "cell {i} province");
                assert!(pol.county_id[i] > 0, "cell {i} county");
                assert!(pol.landmass_id[i] > 0, "cell {i} landmass");
            } else {
                assert_eq!(pol.culture_id[i], 0, "cell {i} culture");
                assert_eq!(pol.realm_id[i], 0, "cell {i} realm");
                assert_eq!(pol.province_id[i], 0, "cell {i} province");
                assert_eq!(pol.county_id[i], 0, "cell {i} county");
                assert_eq!(pol.landmass_id[i], -1, "cell {i} landmass");
            }
        }
    }

    #[test]
    fn realms_are_bijective_with_cultures() {
        let (mesh, _, _, pol) = political_world();
        assert_eq!(pol.realm_count as usize, pol.capitals.len());
        for i in 0..mesh.cell_count() {
            assert!(pol.realm_id[i] <= pol.realm_count, "cell {i} realm id in range");
            assert!(pol.culture_id[i] <= pol.realm_count, "cell {i} culture id in range");
        }
    }

    #[test]
    fn counties_nest_inside_exactly_one_realm_and_province() {
        let (mesh, _, _, pol) = political_world();
        let mut realm_of_county = vec![0u32; pol.county_count as usize];
        let mut province_of_county = vec![0u32; pol.county_count as usize];
        for i in 0..mesh.cell_count() {
            let county = pol.county_id[i];
            if county == 0 {
                continue;
            }
            let k = (county - 1) as usize;
            if realm_of_county[k] == 0 {
                realm_of_county[k] = pol.realm_id[i];
                province_of_county[k] = pol.province_id[i];
            } else {
                assert_eq!(realm_of_county[k], pol.realm_id[i], "county {county} realm split");
                assert_eq!(
                    province_of_county[k], pol.province_id[i],
                    "county {county} province split"
                );
            }
        }
    }

    #[test]
    fn id_spaces_are_contiguous() {
        let (_, _, _, pol) = political_world();
        for (name, ids, count) in [
            ("county", &pol.county_id, pol.county_count),
            ("province", &pol.province_id, pol.province_count),
        ] {
            let mut seen = vec![false; count as usize + 1];
            for &id in ids.iter() {
                if id > 0 {
                    assert!(id <= count, "{name} id {id} above count {count}");
                    seen[id as usize] = true;
                }
            }
            for id in 1..=count as usize {
                assert!(seen[id], "{name} id {id} unused");
            }
        }
    }

    #[test]
    fn capitals_and_seats_are_on_map() {
        let (mesh, field, biomes, pol) = political_world();
        for &cap in &pol.capitals {
            assert!(biomes.is_habitable_land(&field, cap as usize), "capital {cap}");
        }
        for (k, &seat) in pol.county_seats.iter().enumerate() {
            assert_eq!(pol.county_id[seat as usize], k as u32 + 1, "seat {seat}");
        }
        let _ = mesh;
    }

    #[test]
    fn political_stage_is_deterministic() {
        let (_, _, _, a) = political_world();
        let (_, _, _, b) = political_world();
        assert_eq!(a, b);
    }
}
