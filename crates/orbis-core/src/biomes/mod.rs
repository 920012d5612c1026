//! Biome stage: water features, coast distance, slope, pseudo-soil
//! classification, habitability, movement cost, suitability, population.

use std::collections::VecDeque;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::climate::ClimateField;
use crate::config::{TuningProfile, WorldConfig};
use crate::heightmap::ElevationField;
use crate::mesh::CellMesh;
use crate::rivers::RiverField;

/// Closed biome set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomeId {
    Glacier,
    Tundra,
    SaltFlat,
    CoastalMarsh,
    AlpineBarren,
    MountainShrub,
    Floodplain,
    Wetland,
    HotDesert,
    ColdDesert,
    Scrubland,
    TropicalRainforest,
    TropicalDryForest,
    Savanna,
    BorealForest,
    TemperateForest,
    Grassland,
    Woodland,
    Lake,
}

impl BiomeId {
    pub const ALL: [BiomeId; 19] = [
        BiomeId::Glacier,
        BiomeId::Tundra,
        BiomeId::SaltFlat,
        BiomeId::CoastalMarsh,
        BiomeId::AlpineBarren,
        BiomeId::MountainShrub,
        BiomeId::Floodplain,
        BiomeId::Wetland,
        BiomeId::HotDesert,
        BiomeId::ColdDesert,
        BiomeId::Scrubland,
        BiomeId::TropicalRainforest,
        BiomeId::TropicalDryForest,
        BiomeId::Savanna,
        BiomeId::BorealForest,
        BiomeId::TemperateForest,
        BiomeId::Grassland,
        BiomeId::Woodland,
        BiomeId::Lake,
    ];

    /// Baseline habitability before situational bonuses.
    pub fn base_habitability(self) -> f64 {
        match self {
            BiomeId::Glacier => 0.0,
            BiomeId::Tundra => 10.0,
            BiomeId::SaltFlat => 5.0,
            BiomeId::CoastalMarsh => 18.0,
            BiomeId::AlpineBarren => 4.0,
            BiomeId::MountainShrub => 22.0,
            BiomeId::Floodplain => 82.0,
            BiomeId::Wetland => 30.0,
            BiomeId::HotDesert => 6.0,
            BiomeId::ColdDesert => 8.0,
            BiomeId::Scrubland => 30.0,
            BiomeId::TropicalRainforest => 48.0,
            BiomeId::TropicalDryForest => 60.0,
            BiomeId::Savanna => 52.0,
            BiomeId::BorealForest => 28.0,
            BiomeId::TemperateForest => 68.0,
            BiomeId::Grassland => 62.0,
            BiomeId::Woodland => 64.0,
            BiomeId::Lake => 0.0,
        }
    }

    /// Baseline overland movement cost before slope penalties.
    pub fn base_movement_cost(self) -> f64 {
        match self {
            BiomeId::Glacier => 90.0,
            BiomeId::Tundra => 60.0,
            BiomeId::SaltFlat => 50.0,
            BiomeId::CoastalMarsh => 65.0,
            BiomeId::AlpineBarren => 85.0,
            BiomeId::MountainShrub => 55.0,
            BiomeId::Floodplain => 25.0,
            BiomeId::Wetland => 70.0,
            BiomeId::HotDesert => 55.0,
            BiomeId::ColdDesert => 55.0,
            BiomeId::Scrubland => 35.0,
            BiomeId::TropicalRainforest => 70.0,
            BiomeId::TropicalDryForest => 45.0,
            BiomeId::Savanna => 25.0,
            BiomeId::BorealForest => 50.0,
            BiomeId::TemperateForest => 35.0,
            BiomeId::Grassland => 20.0,
            BiomeId::Woodland => 30.0,
            BiomeId::Lake => 95.0,
        }
    }
}

/// Pseudo-soil: intermediate key of the biome decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoilType {
    Permafrost,
    Saline,
    Lithosol,
    Alluvial,
    Aridisol,
    Laterite,
    Podzol,
    Chernozem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterFeatureType {
    Ocean,
    Lake,
}

/// One connected component of water cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterFeature {
    pub id: u32,
    pub kind: WaterFeatureType,
    pub touches_border: bool,
    pub cell_count: u32,
}

/// Output of the biome stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeField {
    pub is_lake_cell: Vec<bool>,
    /// Water body id per cell, 0 on land.
    pub feature_id: Vec<u32>,
    pub features: Vec<WaterFeature>,
    /// Signed BFS distance: +k on land k cells from the coast, −k on
    /// water, 0 only on maps with no coast at all.
    pub coast_distance_cells: Vec<i32>,
    /// Max neighbour relief capped at 1 km, in [0, 1].
    pub slope: Vec<f32>,
    pub biome_id: Vec<BiomeId>,
    pub habitability: Vec<f32>,
    pub movement_cost: Vec<f32>,
    pub suitability: Vec<f32>,
    pub population: Vec<f32>,
}

impl BiomeField {
    /// Land cell that is not a lake: the substrate of the political stage.
    #[inline]
    pub fn is_habitable_land(&self, elevation: &ElevationField, cell: usize) -> bool {
        elevation.is_land(cell) && !self.is_lake_cell[cell]
    }
}

/// Run the biome stage.
pub fn compute_biomes(
    mesh: &CellMesh,
    elevation: &ElevationField,
    climate: &ClimateField,
    rivers: &RiverField,
    config: &WorldConfig,
) -> BiomeField {
    let n = mesh.cell_count();
    let profile = config.tuning_profile();

    let is_lake_cell = find_lake_cells(mesh, elevation, rivers);
    let (feature_id, features) = find_water_features(mesh, elevation, &is_lake_cell);
    let coast_distance_cells = compute_coast_distance(mesh, elevation);
    let slope = compute_slope(mesh, elevation);

    // Per-cell classification is a pure function of earlier fields.
    let biome_id: Vec<BiomeId> = (0..n)
        .into_par_iter()
        .map(|i| {
            if is_lake_cell[i] {
                BiomeId::Lake
            } else if !elevation.is_land(i) {
                BiomeId::CoastalMarsh
            } else {
                let soil = classify_soil(
                    mesh,
                    elevation,
                    climate,
                    rivers,
                    &slope,
                    &coast_distance_cells,
                    &profile,
                    config,
                    i,
                );
                biome_for(soil, climate, elevation, config, &profile, i)
            }
        })
        .collect();

    let habitability: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut hab = biome_id[i].base_habitability() * profile.habitability;
            if cell_on_river(mesh, rivers, i) {
                hab += 10.0;
            }
            if coast_distance_cells[i] == 1 {
                hab += 8.0;
            }
            hab.clamp(0.0, 100.0) as f32
        })
        .collect();

    let movement_cost: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| {
            (biome_id[i].base_movement_cost() + 15.0 * slope[i] as f64).clamp(0.0, 100.0) as f32
        })
        .collect();

    let suitability: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| {
            let altitude_penalty = ((elevation.signed_m[i] as f64 - 2600.0) / 180.0).max(0.0);
            (habitability[i] as f64 - 22.0 * slope[i] as f64 - altitude_penalty)
                .clamp(0.0, 100.0) as f32
        })
        .collect();

    let population: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| {
            if elevation.is_land(i) && !is_lake_cell[i] {
                (suitability[i] as f64 * mesh.areas_km2[i] * 0.08) as f32
            } else {
                0.0
            }
        })
        .collect();

    log::info!(
        "biomes: {} water features, total population {:.0}",
        features.len(),
        population.iter().map(|&p| p as f64).sum::<f64>(),
    );

    BiomeField {
        is_lake_cell,
        feature_id,
        features,
        coast_distance_cells,
        slope,
        biome_id,
        habitability,
        movement_cost,
        suitability,
        population,
    }
}

/// A water cell with at least half of its polygon vertices flooded above
/// lake depth becomes a lake cell.
fn find_lake_cells(mesh: &CellMesh, elevation: &ElevationField, rivers: &RiverField) -> Vec<bool> {
    (0..mesh.cell_count())
        .map(|i| {
            if elevation.is_land(i) {
                return false;
            }
            let fan = &mesh.vertices_of_cell[i];
            if fan.is_empty() {
                return false;
            }
            let lake = fan.iter().filter(|&&v| rivers.is_lake_vertex[v as usize]).count();
            lake * 2 >= fan.len()
        })
        .collect()
}

/// Flood-fill connected water components into features. A component that
/// touches no boundary cell and consists entirely of lake cells is a
/// Lake; everything else is Ocean.
fn find_water_features(
    mesh: &CellMesh,
    elevation: &ElevationField,
    is_lake_cell: &[bool],
) -> (Vec<u32>, Vec<WaterFeature>) {
    let n = mesh.cell_count();
    let mut feature_id = vec![0u32; n];
    let mut features = Vec::new();

    for start in 0..n {
        if elevation.is_land(start) || feature_id[start] != 0 {
            continue;
        }
        let id = features.len() as u32 + 1;
        let mut touches_border = false;
        let mut all_lake = true;
        let mut cell_count = 0u32;
        let mut queue = VecDeque::from([start]);
        feature_id[start] = id;
        while let Some(cur) = queue.pop_front() {
            cell_count += 1;
            if mesh.is_boundary[cur] {
                touches_border = true;
            }
            if !is_lake_cell[cur] {
                all_lake = false;
            }
            for &nb in &mesh.neighbors_of_cell[cur] {
                if nb < 0 {
                    continue;
                }
                let nb = nb as usize;
                if !elevation.is_land(nb) && feature_id[nb] == 0 {
                    feature_id[nb] = id;
                    queue.push_back(nb);
                }
            }
        }
        let kind = if !touches_border && all_lake {
            WaterFeatureType::Lake
        } else {
            WaterFeatureType::Ocean
        };
        features.push(WaterFeature { id, kind, touches_border, cell_count });
    }

    (feature_id, features)
}

/// Two concurrent BFS waves: +1, +2, … inland and −1, −2, … seaward.
fn compute_coast_distance(mesh: &CellMesh, elevation: &ElevationField) -> Vec<i32> {
    let n = mesh.cell_count();
    let mut distance = vec![0i32; n];
    let mut land_queue = VecDeque::new();
    let mut water_queue = VecDeque::new();

    for i in 0..n {
        let land = elevation.is_land(i);
        let coastal = mesh.neighbors_of_cell[i]
            .iter()
            .any(|&nb| nb >= 0 && elevation.is_land(nb as usize) != land);
        if coastal {
            if land {
                distance[i] = 1;
                land_queue.push_back(i);
            } else {
                distance[i] = -1;
                water_queue.push_back(i);
            }
        }
    }

    while let Some(cur) = land_queue.pop_front() {
        for &nb in &mesh.neighbors_of_cell[cur] {
            if nb < 0 {
                continue;
            }
            let nb = nb as usize;
            if elevation.is_land(nb) && distance[nb] == 0 {
                distance[nb] = distance[cur] + 1;
                land_queue.push_back(nb);
            }
        }
    }
    while let Some(cur) = water_queue.pop_front() {
        for &nb in &mesh.neighbors_of_cell[cur] {
            if nb < 0 {
                continue;
            }
            let nb = nb as usize;
            if !elevation.is_land(nb) && distance[nb] == 0 {
                distance[nb] = distance[cur] - 1;
                water_queue.push_back(nb);
            }
        }
    }

    distance
}

fn compute_slope(mesh: &CellMesh, elevation: &ElevationField) -> Vec<f32> {
    (0..mesh.cell_count())
        .into_par_iter()
        .map(|i| {
            let mut max_dh = 0.0f64;
            for &nb in &mesh.neighbors_of_cell[i] {
                if nb >= 0 {
                    let dh =
                        (elevation.signed_m[i] - elevation.signed_m[nb as usize]).abs() as f64;
                    max_dh = max_dh.max(dh);
                }
            }
            (max_dh / 1000.0).min(1.0) as f32
        })
        .collect()
}

/// Mean flux of the cell's polygon vertices.
fn cell_flux(mesh: &CellMesh, rivers: &RiverField, cell: usize) -> f64 {
    let fan = &mesh.vertices_of_cell[cell];
    if fan.is_empty() {
        return 0.0;
    }
    fan.iter().map(|&v| rivers.vertex_flux[v as usize] as f64).sum::<f64>() / fan.len() as f64
}

fn cell_on_river(mesh: &CellMesh, rivers: &RiverField, cell: usize) -> bool {
    mesh.vertices_of_cell[cell]
        .iter()
        .any(|&v| rivers.is_river_vertex[v as usize])
}

/// Coastal salt proxy by BFS ring.
fn salt_proxy(coast_distance: i32) -> f64 {
    match coast_distance {
        1 => 1.0,
        2 => 0.45,
        3 => 0.25,
        _ => 0.0,
    }
}

#[allow(clippy::too_many_arguments)]
fn classify_soil(
    mesh: &CellMesh,
    elevation: &ElevationField,
    climate: &ClimateField,
    rivers: &RiverField,
    slope: &[f32],
    coast_distance: &[i32],
    profile: &TuningProfile,
    config: &WorldConfig,
    cell: usize,
) -> SoilType {
    let temp = climate.temperature_c[cell] as f64;
    let precip_pct =
        climate.precip_mm_year[cell] as f64 / config.climate.max_annual_precip_mm;
    let elev_pct = (elevation.signed_m[cell] as f64).max(0.0) / elevation.max_elevation_m;
    let steep = slope[cell] as f64 * profile.slope_weight;
    let salt = salt_proxy(coast_distance[cell]) * profile.salt_reach;
    let flux = cell_flux(mesh, rivers, cell);

    if temp < -8.0 * profile.glacier_temp {
        SoilType::Permafrost
    } else if salt >= 0.45 && elev_pct < 0.08 {
        SoilType::Saline
    } else if steep > 0.6 || elev_pct > 0.55 * profile.rock_elevation {
        SoilType::Lithosol
    } else if flux > 40.0 * profile.wetland_flux || (precip_pct > 0.65 && elev_pct < 0.12) {
        SoilType::Alluvial
    } else if precip_pct < 0.16 * profile.desert_precip {
        SoilType::Aridisol
    } else if temp > 22.0 {
        SoilType::Laterite
    } else if temp < 3.0 {
        SoilType::Podzol
    } else {
        SoilType::Chernozem
    }
}

/// Fixed soil → biome decision tree.
fn biome_for(
    soil: SoilType,
    climate: &ClimateField,
    elevation: &ElevationField,
    config: &WorldConfig,
    profile: &TuningProfile,
    cell: usize,
) -> BiomeId {
    let temp = climate.temperature_c[cell] as f64;
    let precip_pct =
        climate.precip_mm_year[cell] as f64 / config.climate.max_annual_precip_mm;
    let elev_pct = (elevation.signed_m[cell] as f64).max(0.0) / elevation.max_elevation_m;

    match soil {
        SoilType::Permafrost => {
            if temp < -14.0 {
                BiomeId::Glacier
            } else {
                BiomeId::Tundra
            }
        }
        SoilType::Saline => {
            if temp > 18.0 && precip_pct < 0.3 {
                BiomeId::SaltFlat
            } else {
                BiomeId::CoastalMarsh
            }
        }
        SoilType::Lithosol => {
            if elev_pct > 0.7 || temp < -2.0 {
                BiomeId::AlpineBarren
            } else {
                BiomeId::MountainShrub
            }
        }
        SoilType::Alluvial => {
            if temp >= 14.0 {
                BiomeId::Floodplain
            } else {
                BiomeId::Wetland
            }
        }
        SoilType::Aridisol => {
            if temp > 18.0 {
                BiomeId::HotDesert
            } else if temp < 6.0 {
                BiomeId::ColdDesert
            } else {
                BiomeId::Scrubland
            }
        }
        SoilType::Laterite => {
            if precip_pct > 0.55 * profile.rainforest_precip {
                BiomeId::TropicalRainforest
            } else if precip_pct > 0.3 {
                BiomeId::TropicalDryForest
            } else {
                BiomeId::Savanna
            }
        }
        SoilType::Podzol => {
            if temp < -4.0 {
                BiomeId::Tundra
            } else {
                BiomeId::BorealForest
            }
        }
        SoilType::Chernozem => {
            if precip_pct > 0.45 {
                BiomeId::TemperateForest
            } else if precip_pct < 0.22 {
                BiomeId::Grassland
            } else {
                BiomeId::Woodland
            }
        }
    }
}
