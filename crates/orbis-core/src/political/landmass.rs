//! Landmass detection: connected components of habitable land cells.

use std::collections::VecDeque;

use crate::mesh::CellMesh;

/// Landmass partition plus per-mass aggregates. Ids are 1-based;
/// water and lake cells carry −1.
pub struct Landmasses {
    pub landmass_id: Vec<i32>,
    pub count: u32,
    /// Cells per landmass, indexed by id − 1.
    pub cell_counts: Vec<u32>,
    /// Population per landmass, indexed by id − 1.
    pub populations: Vec<f64>,
    /// Area (km²) per landmass, indexed by id − 1.
    pub areas_km2: Vec<f64>,
}

/// BFS over habitable land cells (`candidate`), numbering components in
/// scan order.
pub fn detect_landmasses(
    mesh: &CellMesh,
    candidate: &[bool],
    population: &[f32],
) -> Landmasses {
    let n = mesh.cell_count();
    let mut landmass_id = vec![-1i32; n];
    let mut cell_counts = Vec::new();
    let mut populations = Vec::new();
    let mut areas_km2 = Vec::new();

    for start in 0..n {
        if !candidate[start] || landmass_id[start] != -1 {
            continue;
        }
        let id = cell_counts.len() as i32 + 1;
        let mut cells = 0u32;
        let mut pop = 0.0f64;
        let mut area = 0.0f64;
        let mut queue = VecDeque::from([start]);
        landmass_id[start] = id;
        while let Some(cur) = queue.pop_front() {
            cells += 1;
            pop += population[cur] as f64;
            area += mesh.areas_km2[cur];
            for &nb in &mesh.neighbors_of_cell[cur] {
                if nb < 0 {
                    continue;
                }
                let nb = nb as usize;
                if candidate[nb] && landmass_id[nb] == -1 {
                    landmass_id[nb] = id;
                    queue.push_back(nb);
                }
            }
        }
        cell_counts.push(cells);
        populations.push(pop);
        areas_km2.push(area);
    }

    Landmasses {
        landmass_id,
        count: cell_counts.len() as u32,
        cell_counts,
        populations,
        areas_km2,
    }
}
