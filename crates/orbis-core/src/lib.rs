//! Deterministic procedural world generation.
//!
//! From a single integer seed and a small configuration record the
//! pipeline produces a complete planetary map: a Voronoi cell mesh, a
//! signed-meter elevation field shaped by a small template DSL, climate
//! (temperature and precipitation), hydrography (flow graph, per-edge
//! flux, river polylines), biomes with suitability and population, and a
//! political hierarchy (landmasses, cultures, realms, provinces,
//! counties). Every stage is a pure function of the seed and config;
//! repeated runs are bit-identical.
//!
//! Public surface:
//! - [`generate`] — run the full pipeline.
//! - [`get_template`] — the annotated shaping script for a built-in id.
//! - [`execute_dsl`] — reference DSL interpreter over an elevation field.
//! - [`compare`] — run two configs and emit structured metrics.

pub mod biomes;
pub mod climate;
pub mod config;
pub mod error;
pub mod generator;
pub mod heap;
pub mod heightmap;
pub mod mesh;
pub mod political;
pub mod rivers;
pub mod rng;

pub use biomes::{BiomeField, BiomeId, SoilType, WaterFeature, WaterFeatureType};
pub use climate::ClimateField;
pub use config::{
    ClimateConfig, HeightmapTemplate, PoliticsConfig, RiverConfig, TuningProfile, WindBand,
    WorldConfig, WorldMetadata,
};
pub use error::{ConfigError, DslError, GenError};
pub use generator::{
    compare, execute_dsl, generate, ComparisonMetrics, MapGenResult, WorldGenerator, WorldMetrics,
};
pub use heightmap::ElevationField;
pub use mesh::CellMesh;
pub use political::PoliticalField;
pub use rivers::{River, RiverField};

/// The annotated DSL script for a built-in template id.
pub fn get_template(template: HeightmapTemplate, config: &WorldConfig) -> String {
    heightmap::templates::get_template(template, config)
}
