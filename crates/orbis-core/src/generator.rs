//! Pipeline orchestrator: runs all generation stages in dependency order,
//! plus the `compare` regression surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::biomes::{compute_biomes, BiomeField};
use crate::climate::{compute_climate, ClimateField};
use crate::config::{WorldConfig, WorldMetadata};
use crate::error::GenError;
use crate::heightmap::{
    apply_land_homeostasis, dsl, ops, templates, ElevationField,
};
use crate::mesh::{build_mesh, CellMesh};
use crate::political::{compute_political, PoliticalField};
use crate::rivers::{compute_rivers, RiverField};
use crate::rng::{StageRng, ELEVATION_SALT};

/// Full output of the world generation pipeline, returned by value.
pub struct MapGenResult {
    pub config: WorldConfig,
    pub metadata: WorldMetadata,
    pub mesh: CellMesh,
    pub elevation: ElevationField,
    pub climate: ClimateField,
    pub rivers: RiverField,
    pub biomes: BiomeField,
    pub political: PoliticalField,
    /// The annotated template script the elevation stage executed.
    pub template_script: String,
}

/// The pipeline driver. Stateless; every run is a pure function of its
/// config.
pub struct WorldGenerator;

impl WorldGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline.
    ///
    /// Stage order:
    ///   1. Mesh build
    ///   2. Elevation DSL + land-ratio homeostasis
    ///   3. Climate
    ///   4. Hydrography
    ///   5. Biomes / suitability / population
    ///   6. Political hierarchy
    pub fn generate(&self, config: &WorldConfig) -> Result<MapGenResult, GenError> {
        config.validate()?;

        let mesh = build_mesh(config)?;
        log::info!(
            "mesh: {} cells ({} interior), {} vertices, {} edges",
            mesh.cell_count(),
            mesh.interior_count,
            mesh.vertex_count(),
            mesh.edge_count(),
        );

        let template_script = templates::get_template(config.template, config);
        let ops = dsl::parse(&template_script)?;
        let mut elevation =
            ElevationField::new(mesh.cell_count(), config.max_elevation_m, config.max_depth_m);
        let mut rng = StageRng::new(config.seed, ELEVATION_SALT);
        let profile = config.tuning_profile();
        ops::execute(&mut elevation, &mesh, &ops, &mut rng, &profile, config.shape_span_km());
        apply_land_homeostasis(&mut elevation, templates::land_band(config.template));
        log::info!(
            "elevation: {} land ratio {:.3}",
            config.template.name(),
            elevation.land_ratio()
        );

        let climate = compute_climate(&mesh, &elevation, config);
        let rivers = compute_rivers(&mesh, &elevation, &climate, config);
        let biomes = compute_biomes(&mesh, &elevation, &climate, &rivers, config);
        let political = compute_political(&mesh, &elevation, &biomes, &rivers, config);

        Ok(MapGenResult {
            metadata: config.metadata(),
            config: config.clone(),
            mesh,
            elevation,
            climate,
            rivers,
            biomes,
            political,
            template_script,
        })
    }
}

impl Default for WorldGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience entry point.
pub fn generate(config: &WorldConfig) -> Result<MapGenResult, GenError> {
    WorldGenerator::new().generate(config)
}

/// Reference DSL interpreter over an existing field and mesh.
pub fn execute_dsl(
    field: &mut ElevationField,
    mesh: &CellMesh,
    script: &str,
    seed: u64,
) -> Result<(), crate::error::DslError> {
    let parsed = dsl::parse(script)?;
    let mut rng = StageRng::new(seed, ELEVATION_SALT);
    ops::execute(
        field,
        mesh,
        &parsed,
        &mut rng,
        &crate::config::TuningProfile::identity(),
        mesh.width_km,
    );
    Ok(())
}

// ── Comparison metrics ────────────────────────────────────────────────────────

/// Aggregate metrics of one generated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMetrics {
    pub land_ratio: f64,
    /// Fraction of map-edge cells (interior cells touching the padding
    /// ring) that are land.
    pub edge_land_ratio: f64,
    /// Fraction of interior edges separating land from water.
    pub coast_edge_ratio: f64,
    pub elevation_p10_m: f64,
    pub elevation_p50_m: f64,
    pub elevation_p90_m: f64,
    pub river_count: usize,
    /// Fraction of vertices claimed by the river network.
    pub river_vertex_coverage: f64,
    pub landmass_count: u32,
    pub realm_count: u32,
    pub province_count: u32,
    pub county_count: u32,
    pub biome_cells: BTreeMap<String, usize>,
    pub total_population: f64,
}

impl WorldMetrics {
    pub fn from_result(result: &MapGenResult) -> Self {
        let mesh = &result.mesh;
        let n = mesh.cell_count();

        let mut edge_cells = 0usize;
        let mut edge_land = 0usize;
        for i in 0..n {
            if mesh.is_boundary[i] {
                continue;
            }
            let touches_ring = mesh.neighbors_of_cell[i]
                .iter()
                .any(|&nb| nb >= 0 && mesh.is_boundary[nb as usize]);
            if touches_ring {
                edge_cells += 1;
                if result.elevation.is_land(i) {
                    edge_land += 1;
                }
            }
        }

        let mut interior_edges = 0usize;
        let mut coast_edges = 0usize;
        for e in 0..mesh.edge_count() {
            let (c0, c1) = mesh.edge_cells[e];
            if c0 < 0 || c1 < 0 {
                continue;
            }
            interior_edges += 1;
            if result.elevation.is_land(c0 as usize) != result.elevation.is_land(c1 as usize) {
                coast_edges += 1;
            }
        }

        let mut sorted = result.elevation.signed_m.clone();
        sorted.sort_unstable_by(f32::total_cmp);
        let pct = |q: f64| sorted[((sorted.len() - 1) as f64 * q) as usize] as f64;

        let claimed = result.rivers.is_river_vertex.iter().filter(|&&r| r).count();

        let mut biome_cells = BTreeMap::new();
        for &b in &result.biomes.biome_id {
            *biome_cells.entry(format!("{b:?}")).or_insert(0) += 1;
        }

        Self {
            land_ratio: result.elevation.land_ratio(),
            edge_land_ratio: if edge_cells > 0 {
                edge_land as f64 / edge_cells as f64
            } else {
                0.0
            },
            coast_edge_ratio: if interior_edges > 0 {
                coast_edges as f64 / interior_edges as f64
            } else {
                0.0
            },
            elevation_p10_m: pct(0.1),
            elevation_p50_m: pct(0.5),
            elevation_p90_m: pct(0.9),
            river_count: result.rivers.rivers.len(),
            river_vertex_coverage: claimed as f64 / mesh.vertex_count().max(1) as f64,
            landmass_count: result.political.landmass_count,
            realm_count: result.political.realm_count,
            province_count: result.political.province_count,
            county_count: result.political.county_count,
            biome_cells,
            total_population: result
                .biomes
                .population
                .iter()
                .map(|&p| p as f64)
                .sum(),
        }
    }
}

/// Structured comparison of two runs: the regression-testing surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub a: WorldMetrics,
    pub b: WorldMetrics,
    /// Fraction of cells with the same biome, when both runs share a cell
    /// arena; `None` otherwise.
    pub biome_overlap: Option<f64>,
}

/// Run both configs and compare their aggregates.
pub fn compare(
    config_a: &WorldConfig,
    config_b: &WorldConfig,
) -> Result<ComparisonMetrics, GenError> {
    let result_a = generate(config_a)?;
    let result_b = generate(config_b)?;
    let a = WorldMetrics::from_result(&result_a);
    let b = WorldMetrics::from_result(&result_b);
    let biome_overlap = if result_a.mesh.cell_count() == result_b.mesh.cell_count() {
        let same = result_a
            .biomes
            .biome_id
            .iter()
            .zip(result_b.biomes.biome_id.iter())
            .filter(|(x, y)| x == y)
            .count();
        Some(same as f64 / result_a.mesh.cell_count().max(1) as f64)
    } else {
        None
    };
    Ok(ComparisonMetrics { a, b, biome_overlap })
}
