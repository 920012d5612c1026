//! Hydrography stage over the Voronoi vertex graph: depression fill,
//! flow accumulation, per-edge flux and river extraction.

pub mod fill;
pub mod flux;
pub mod trace;

use crate::climate::ClimateField;
use crate::config::WorldConfig;
use crate::heightmap::ElevationField;
use crate::mesh::CellMesh;

pub use trace::River;

/// Water level must exceed terrain by this much for a vertex to count as
/// lake surface.
pub const LAKE_DEPTH_M: f32 = 25.0;

/// Reference cell count the river thresholds are calibrated at.
const THRESHOLD_REFERENCE_CELLS: f64 = 5000.0;

/// All per-vertex and per-edge hydrography plus the extracted rivers.
#[derive(Debug, Clone, PartialEq)]
pub struct RiverField {
    pub vertex_elev_m: Vec<f32>,
    pub vertex_precip_flux: Vec<f32>,
    pub water_level_m: Vec<f32>,
    pub vertex_flux: Vec<f32>,
    /// −1 for ocean vertices and vertices with no outlet.
    pub flow_target: Vec<i32>,
    pub edge_flux: Vec<f32>,
    pub is_lake_vertex: Vec<bool>,
    pub is_river_vertex: Vec<bool>,
    pub rivers: Vec<River>,
    pub effective_river_threshold: f64,
    pub effective_trace_threshold: f64,
    pub effective_min_river_vertices: usize,
}

impl RiverField {
    #[inline]
    pub fn is_ocean_vertex(&self, v: usize) -> bool {
        self.vertex_elev_m[v] <= 0.0
    }
}

/// Run the hydrography stage.
pub fn compute_rivers(
    mesh: &CellMesh,
    elevation: &ElevationField,
    climate: &ClimateField,
    config: &WorldConfig,
) -> RiverField {
    let profile = config.tuning_profile();
    // Resolution independence: thresholds grow with sqrt of cell count.
    let scale = (config.cell_count as f64 / THRESHOLD_REFERENCE_CELLS).sqrt();
    let river_threshold = config.rivers.river_threshold * scale * profile.river_threshold;
    let trace_threshold = config.rivers.trace_threshold * scale * profile.trace_threshold;
    let min_vertices = ((config.rivers.min_river_vertices as f64 * profile.min_river_vertices)
        .round() as usize)
        .max(2);

    let (vertex_elev_m, vertex_precip_flux) = fill::interpolate_vertex_fields(
        mesh,
        elevation,
        climate,
        config.climate.max_annual_precip_mm,
    );
    let filled = fill::priority_flood(mesh, &vertex_elev_m);
    let accumulation = flux::accumulate_flow(
        mesh,
        &vertex_elev_m,
        &vertex_precip_flux,
        &filled.water_level_m,
        &filled.flow_target,
    );
    let traced = trace::extract_rivers(
        &vertex_elev_m,
        &accumulation.vertex_flux,
        &accumulation.flow_target,
        river_threshold,
        trace_threshold,
        min_vertices,
    );

    let is_lake_vertex: Vec<bool> = (0..mesh.vertex_count())
        .map(|v| {
            vertex_elev_m[v] > 0.0 && filled.water_level_m[v] - vertex_elev_m[v] > LAKE_DEPTH_M
        })
        .collect();

    log::info!(
        "rivers: {} extracted ({} lake vertices, mouth threshold {river_threshold:.0})",
        traced.rivers.len(),
        is_lake_vertex.iter().filter(|&&l| l).count(),
    );

    RiverField {
        vertex_elev_m,
        vertex_precip_flux,
        water_level_m: filled.water_level_m,
        vertex_flux: accumulation.vertex_flux,
        flow_target: accumulation.flow_target,
        edge_flux: accumulation.edge_flux,
        is_lake_vertex,
        is_river_vertex: traced.is_river_vertex,
        rivers: traced.rivers,
        effective_river_threshold: river_threshold,
        effective_trace_threshold: trace_threshold,
        effective_min_river_vertices: min_vertices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::heightmap::ElevationField;
    use crate::mesh::build_mesh;

    fn rainy_island() -> (crate::mesh::CellMesh, WorldConfig, RiverField) {
        let config = WorldConfig { cell_count: 600, ..WorldConfig::default() };
        let mesh = build_mesh(&config).expect("mesh");
        let mut field = ElevationField::new(mesh.cell_count(), 5000.0, 1250.0);
        let (cx, cy) = (mesh.width_km / 2.0, mesh.height_km / 2.0);
        for i in 0..mesh.cell_count() {
            let (x, y) = mesh.centers[i];
            let r = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            let rim = mesh.width_km * 0.32;
            if r < rim {
                field.set(i, 2800.0 * (1.0 - r / rim) + 20.0);
            }
        }
        let climate = crate::climate::ClimateField {
            temperature_c: vec![15.0; mesh.cell_count()],
            precip_mm_year: vec![1800.0; mesh.cell_count()],
        };
        let rivers = compute_rivers(&mesh, &field, &climate, &config);
        (mesh, config, rivers)
    }

    #[test]
    fn rainy_island_grows_at_least_one_river() {
        let (_, _, rivers) = rainy_island();
        assert!(
            !rivers.rivers.is_empty(),
            "a rainy 2800 m island must shed at least one river"
        );
    }

    #[test]
    fn rivers_meet_length_and_mouth_contracts() {
        let (_, _, rf) = rainy_island();
        for river in &rf.rivers {
            // Appended terminus sits on top of the core trace.
            assert!(
                river.vertices.len() > rf.effective_min_river_vertices,
                "river {}: {} vertices vs minimum {}",
                river.id,
                river.vertices.len(),
                rf.effective_min_river_vertices
            );
            assert_eq!(river.discharge, rf.vertex_flux[river.mouth_vertex as usize] as f64);
            let mouth_target = rf.flow_target[river.mouth_vertex as usize];
            assert!(mouth_target >= 0, "river {} mouth must drain somewhere", river.id);
            let into_ocean = rf.is_ocean_vertex(mouth_target as usize);
            let into_network = rf.is_river_vertex[mouth_target as usize];
            assert!(
                into_ocean || into_network,
                "river {} must end in the ocean or join the network",
                river.id
            );
        }
    }

    #[test]
    fn river_vertices_carry_at_least_trace_flux() {
        let (_, _, rf) = rainy_island();
        for river in &rf.rivers {
            // All but the appended terminus belong to the traced network.
            for &v in &river.vertices[..river.vertices.len() - 1] {
                assert!(
                    rf.vertex_flux[v as usize] as f64 >= rf.effective_trace_threshold,
                    "river {} vertex {v} below the trace threshold",
                    river.id
                );
            }
        }
    }

    #[test]
    fn consecutive_river_vertices_are_flow_linked() {
        let (_, _, rf) = rainy_island();
        for river in &rf.rivers {
            for pair in river.vertices.windows(2) {
                let (up, down) = (pair[0] as usize, pair[1] as i32);
                assert_eq!(
                    rf.flow_target[up], down,
                    "river {}: vertex {up} must drain into {down}",
                    river.id
                );
            }
        }
    }

    #[test]
    fn hydrography_is_deterministic() {
        let (_, _, a) = rainy_island();
        let (_, _, b) = rainy_island();
        assert_eq!(a, b);
    }

    #[test]
    fn threshold_scaling_follows_cell_count() {
        let small = WorldConfig { cell_count: 1250, ..WorldConfig::default() };
        let big = WorldConfig { cell_count: 20000, ..WorldConfig::default() };
        let scale_small = (small.cell_count as f64 / 5000.0).sqrt();
        let scale_big = (big.cell_count as f64 / 5000.0).sqrt();
        assert!((scale_small - 0.5).abs() < 1e-12);
        assert!((scale_big - 2.0).abs() < 1e-12);
    }
}
