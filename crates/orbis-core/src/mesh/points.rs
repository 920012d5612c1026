//! Jittered-grid point scatter with boundary padding.
//!
//! Interior points sit on a square grid of spacing `s = sqrt(W*H/N)`,
//! displaced per axis by up to ±0.9·(s/2) and clamped to the map rectangle.
//! A single outer ring on spacing 2s (at y = -s, y = H+s, x = -s, x = W+s)
//! closes every interior Voronoi polygon; ring cells become boundary cells.

use crate::rng::StageRng;

/// Scatter output: interior points first, padding ring after.
pub struct PointSet {
    pub points: Vec<(f64, f64)>,
    pub interior_count: usize,
    pub spacing_km: f64,
}

/// Emit the jittered interior grid plus the padding ring.
///
/// Draw order is row-major, dx before dy, so the point cloud is a pure
/// function of the stage RNG stream.
pub fn scatter_points(
    width_km: f64,
    height_km: f64,
    target_cells: u32,
    rng: &mut StageRng,
) -> PointSet {
    let spacing = (width_km * height_km / target_cells as f64).sqrt();
    let radius = spacing / 2.0;
    let jitter = 0.9 * radius;

    let mut points = Vec::with_capacity(target_cells as usize + 64);
    let mut y = radius;
    while y <= height_km + 1e-9 {
        let mut x = radius;
        while x <= width_km + 1e-9 {
            let jx = rng.uniform(-jitter, jitter);
            let jy = rng.uniform(-jitter, jitter);
            points.push(((x + jx).clamp(0.0, width_km), (y + jy).clamp(0.0, height_km)));
            x += spacing;
        }
        y += spacing;
    }
    let interior_count = points.len();

    push_boundary_ring(&mut points, width_km, height_km, spacing);

    PointSet { points, interior_count, spacing_km: spacing }
}

/// Evenly spaced ring just outside the rectangle, roughly on spacing 2s.
fn push_boundary_ring(points: &mut Vec<(f64, f64)>, width_km: f64, height_km: f64, spacing: f64) {
    let offset = -spacing;
    let ring_spacing = spacing * 2.0;
    let w = width_km - 2.0 * offset;
    let h = height_km - 2.0 * offset;
    let number_x = ((w / ring_spacing).ceil() as usize).max(2) - 1;
    let number_y = ((h / ring_spacing).ceil() as usize).max(2) - 1;

    for i in 0..number_x {
        let x = w * (i as f64 + 0.5) / number_x as f64 + offset;
        points.push((x, offset));
        points.push((x, height_km - offset));
    }
    for i in 0..number_y {
        let y = h * (i as f64 + 0.5) / number_y as f64 + offset;
        points.push((offset, y));
        points.push((width_km - offset, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{StageRng, MESH_SALT};

    fn scatter(n: u32) -> PointSet {
        let mut rng = StageRng::new(42, MESH_SALT);
        scatter_points(160.0, 90.0, n, &mut rng)
    }

    #[test]
    fn interior_count_close_to_target() {
        let set = scatter(1000);
        let n = set.interior_count as f64;
        assert!(
            (900.0..=1100.0).contains(&n),
            "interior count {n} should be within 10% of the 1000-cell target"
        );
    }

    #[test]
    fn interior_points_stay_inside_rectangle() {
        let set = scatter(500);
        for &(x, y) in &set.points[..set.interior_count] {
            assert!((0.0..=160.0).contains(&x) && (0.0..=90.0).contains(&y), "({x}, {y})");
        }
    }

    #[test]
    fn padding_points_sit_one_spacing_outside() {
        let set = scatter(500);
        let s = set.spacing_km;
        for &(x, y) in &set.points[set.interior_count..] {
            let outside_x = (x - -s).abs() < 1e-9 || (x - (160.0 + s)).abs() < 1e-9;
            let outside_y = (y - -s).abs() < 1e-9 || (y - (90.0 + s)).abs() < 1e-9;
            assert!(
                outside_x || outside_y,
                "padding point ({x}, {y}) must lie on the ring at distance {s}"
            );
        }
    }

    #[test]
    fn same_seed_scatters_identically() {
        let a = scatter(800);
        let b = scatter(800);
        assert_eq!(a.points, b.points);
    }
}
