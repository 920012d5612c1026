//! Vertex field interpolation and priority-flood depression fill.

use crate::climate::ClimateField;
use crate::heap::MinHeap;
use crate::heightmap::ElevationField;
use crate::mesh::CellMesh;

/// Mean-of-incident-cells vertex elevation and dimensionless
/// precipitation flux (mean cell precipitation as a percentage of the
/// annual cap).
pub fn interpolate_vertex_fields(
    mesh: &CellMesh,
    elevation: &ElevationField,
    climate: &ClimateField,
    max_annual_precip_mm: f64,
) -> (Vec<f32>, Vec<f32>) {
    let v = mesh.vertex_count();
    let mut vertex_elev = Vec::with_capacity(v);
    let mut vertex_precip = Vec::with_capacity(v);
    for i in 0..v {
        let cells = &mesh.cells_at_vertex[i];
        let mut elev_sum = 0.0f64;
        let mut precip_sum = 0.0f64;
        for &c in cells {
            elev_sum += elevation.signed_m[c as usize] as f64;
            precip_sum += climate.precip_mm_year[c as usize] as f64;
        }
        vertex_elev.push((elev_sum / 3.0) as f32);
        vertex_precip.push((precip_sum / 3.0 / max_annual_precip_mm * 100.0) as f32);
    }
    (vertex_elev, vertex_precip)
}

/// Result of the depression fill: raised water levels and the flow
/// targets assigned to pit-filled vertices (they drain back through their
/// outlet).
pub struct FilledSurface {
    pub water_level_m: Vec<f32>,
    pub flow_target: Vec<i32>,
}

/// Priority-flood over the vertex graph. Ocean vertices (terrain ≤ 0) are
/// fixed; the flood grows inward from land vertices adjacent to ocean or
/// touching a boundary cell, always expanding the lowest water level
/// first (ties: lower vertex id).
pub fn priority_flood(mesh: &CellMesh, vertex_elev: &[f32]) -> FilledSurface {
    let v = mesh.vertex_count();
    let mut water_level: Vec<f32> = vertex_elev.to_vec();
    let mut flow_target = vec![-1i32; v];
    let mut visited = vec![false; v];

    let is_ocean = |i: usize| vertex_elev[i] <= 0.0;
    for i in 0..v {
        if is_ocean(i) {
            visited[i] = true;
        }
    }

    let mut heap: MinHeap<()> = MinHeap::with_capacity(v / 4);
    for i in 0..v {
        if visited[i] {
            continue;
        }
        let near_ocean = mesh.neighbors_of_vertex[i].iter().any(|&nb| is_ocean(nb as usize));
        let near_border = mesh.cells_at_vertex[i]
            .iter()
            .any(|&c| mesh.is_boundary[c as usize]);
        if near_ocean || near_border {
            visited[i] = true;
            heap.push(water_level[i] as f64, i as u32, ());
        }
    }

    while let Some((_, cur, ())) = heap.pop() {
        let cur = cur as usize;
        for &nb in &mesh.neighbors_of_vertex[cur] {
            let nb = nb as usize;
            if visited[nb] {
                continue;
            }
            visited[nb] = true;
            let raised = vertex_elev[nb].max(water_level[cur]);
            water_level[nb] = raised;
            if raised > vertex_elev[nb] {
                // Pit interior: drains uphill through its outlet.
                flow_target[nb] = cur as i32;
            }
            heap.push(raised as f64, nb as u32, ());
        }
    }

    FilledSurface { water_level_m: water_level, flow_target }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::heightmap::ElevationField;
    use crate::mesh::build_mesh;

    fn test_mesh() -> crate::mesh::CellMesh {
        let config = WorldConfig { cell_count: 400, ..WorldConfig::default() };
        build_mesh(&config).expect("mesh")
    }

    /// Island with a closed crater basin in the middle.
    fn crater_field(mesh: &crate::mesh::CellMesh) -> ElevationField {
        let mut field = ElevationField::new(mesh.cell_count(), 5000.0, 1250.0);
        let (cx, cy) = (mesh.width_km / 2.0, mesh.height_km / 2.0);
        for i in 0..mesh.cell_count() {
            let (x, y) = mesh.centers[i];
            let r = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            let rim = mesh.width_km * 0.25;
            if r < rim * 0.3 {
                field.set(i, 200.0); // crater floor, below the rim
            } else if r < rim {
                field.set(i, 1500.0); // rim
            } // else: deep water floor
        }
        field
    }

    #[test]
    fn water_level_never_below_terrain() {
        let mesh = test_mesh();
        let field = crater_field(&mesh);
        let climate = crate::climate::ClimateField {
            temperature_c: vec![10.0; mesh.cell_count()],
            precip_mm_year: vec![500.0; mesh.cell_count()],
        };
        let (vertex_elev, _) = interpolate_vertex_fields(&mesh, &field, &climate, 2500.0);
        let filled = priority_flood(&mesh, &vertex_elev);
        for v in 0..mesh.vertex_count() {
            assert!(
                filled.water_level_m[v] >= vertex_elev[v],
                "vertex {v}: water {} below terrain {}",
                filled.water_level_m[v],
                vertex_elev[v]
            );
        }
    }

    #[test]
    fn crater_floor_is_flooded_to_rim_level() {
        let mesh = test_mesh();
        let field = crater_field(&mesh);
        let climate = crate::climate::ClimateField {
            temperature_c: vec![10.0; mesh.cell_count()],
            precip_mm_year: vec![500.0; mesh.cell_count()],
        };
        let (vertex_elev, _) = interpolate_vertex_fields(&mesh, &field, &climate, 2500.0);
        let filled = priority_flood(&mesh, &vertex_elev);
        let raised = (0..mesh.vertex_count())
            .filter(|&v| filled.water_level_m[v] > vertex_elev[v] + 25.0)
            .count();
        assert!(raised > 0, "the crater interior must flood above its terrain");
        // Every raised vertex got an outlet to drain through.
        for v in 0..mesh.vertex_count() {
            if filled.water_level_m[v] > vertex_elev[v] {
                assert!(filled.flow_target[v] >= 0, "flooded vertex {v} needs an outlet");
            }
        }
    }

    #[test]
    fn vertex_interpolation_averages_incident_cells() {
        let mesh = test_mesh();
        let mut field = ElevationField::new(mesh.cell_count(), 5000.0, 1250.0);
        for i in 0..mesh.cell_count() {
            field.set(i, 900.0);
        }
        let climate = crate::climate::ClimateField {
            temperature_c: vec![10.0; mesh.cell_count()],
            precip_mm_year: vec![1250.0; mesh.cell_count()],
        };
        let (vertex_elev, vertex_precip) =
            interpolate_vertex_fields(&mesh, &field, &climate, 2500.0);
        for v in 0..mesh.vertex_count() {
            assert!((vertex_elev[v] - 900.0).abs() < 1e-3);
            assert!((vertex_precip[v] - 50.0).abs() < 1e-3, "50% of the annual cap");
        }
    }
}
