//! Cell-level transport edge cost: movement cost scaled by distance, plus
//! a river-crossing penalty derived from edge flux.

use crate::biomes::BiomeField;
use crate::mesh::CellMesh;
use crate::rivers::RiverField;

/// Precomputed normalisation constants for the transport cost.
pub struct CostModel {
    pub nominal_neighbor_distance_km: f64,
    pub nominal_movement_cost: f64,
    pub trace_threshold: f64,
    pub major_threshold: f64,
}

impl CostModel {
    /// Averages are taken over adjacent candidate-cell pairs and candidate
    /// cells respectively.
    pub fn build(
        mesh: &CellMesh,
        biomes: &BiomeField,
        rivers: &RiverField,
        candidate: &[bool],
    ) -> Self {
        let mut dist_sum = 0.0f64;
        let mut dist_count = 0usize;
        let mut move_sum = 0.0f64;
        let mut move_count = 0usize;
        for a in 0..mesh.cell_count() {
            if !candidate[a] {
                continue;
            }
            move_sum += biomes.movement_cost[a] as f64;
            move_count += 1;
            for &nb in &mesh.neighbors_of_cell[a] {
                if nb >= 0 && (nb as usize) > a && candidate[nb as usize] {
                    dist_sum += mesh.center_distance(a, nb as usize);
                    dist_count += 1;
                }
            }
        }
        let nominal_neighbor_distance_km = if dist_count > 0 {
            dist_sum / dist_count as f64
        } else {
            mesh.spacing_km
        };
        let nominal_movement_cost =
            if move_count > 0 { move_sum / move_count as f64 } else { 10.0 };
        let trace_threshold = rivers.effective_trace_threshold;
        let major_threshold =
            (8.0 * trace_threshold).max(rivers.effective_river_threshold);
        Self {
            nominal_neighbor_distance_km,
            nominal_movement_cost,
            trace_threshold,
            major_threshold,
        }
    }

    /// Crossing penalty for the Voronoi edge separating two cells.
    pub fn river_penalty(&self, edge_flux: f64) -> f64 {
        if edge_flux <= self.trace_threshold {
            return 0.0;
        }
        let span = (self.major_threshold - self.trace_threshold).max(f64::EPSILON);
        let t = ((edge_flux - self.trace_threshold) / span).clamp(0.0, 1.0);
        let m = self.nominal_movement_cost.clamp(5.0, 120.0);
        0.15 * m + 0.65 * m * t
    }

    /// Full transport cost of stepping between adjacent cells `a` and `b`
    /// across mesh edge `edge`.
    pub fn edge_cost(
        &self,
        mesh: &CellMesh,
        biomes: &BiomeField,
        rivers: &RiverField,
        a: usize,
        b: usize,
        edge: u32,
    ) -> f64 {
        let base = 0.5
            * ((biomes.movement_cost[a] as f64).max(1.0)
                + (biomes.movement_cost[b] as f64).max(1.0));
        let dist = mesh.center_distance(a, b);
        let factor = (dist / self.nominal_neighbor_distance_km).clamp(0.5, 2.5);
        base * factor + self.river_penalty(rivers.edge_flux[edge as usize] as f64)
    }
}
