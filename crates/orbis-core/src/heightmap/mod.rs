//! Per-cell signed elevation field, shape-unit conversions, land-ratio
//! homeostasis and envelope rescaling.
//!
//! The shaping DSL works in "shape units": `unit_m = (max_elev + max_depth)
//! / 100`, with sea level pinned at 20 units for every envelope. Because
//! the unit field evolves identically whatever the envelope, widening the
//! envelope rescales elevations without moving the coastline.

pub mod dsl;
pub mod ops;
pub mod templates;

use serde::{Deserialize, Serialize};

/// Sea level in shape units. At the canonical 4:1 elevation:depth envelope
/// the unit domain is exactly [0, 100].
pub const SEA_LEVEL_UNIT: f64 = 20.0;

/// Signed elevation in meters per cell. Land ⇔ value > 0. Every write
/// clamps into `[-max_depth, +max_elevation]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationField {
    pub signed_m: Vec<f32>,
    pub max_elevation_m: f64,
    pub max_depth_m: f64,
}

impl ElevationField {
    /// A fresh field starts at the deep-water floor, the canvas every
    /// template paints onto.
    pub fn new(cell_count: usize, max_elevation_m: f64, max_depth_m: f64) -> Self {
        Self {
            signed_m: vec![-max_depth_m as f32; cell_count],
            max_elevation_m,
            max_depth_m,
        }
    }

    pub fn len(&self) -> usize {
        self.signed_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signed_m.is_empty()
    }

    /// Meters per shape unit.
    pub fn unit_m(&self) -> f64 {
        (self.max_elevation_m + self.max_depth_m) / 100.0
    }

    #[inline]
    pub fn is_land(&self, cell: usize) -> bool {
        self.signed_m[cell] > 0.0
    }

    pub fn land_count(&self) -> usize {
        self.signed_m.iter().filter(|&&h| h > 0.0).count()
    }

    pub fn land_ratio(&self) -> f64 {
        if self.signed_m.is_empty() {
            return 0.0;
        }
        self.land_count() as f64 / self.signed_m.len() as f64
    }

    #[inline]
    pub fn clamp_m(&self, value: f64) -> f32 {
        value.clamp(-self.max_depth_m, self.max_elevation_m) as f32
    }

    #[inline]
    pub fn set(&mut self, cell: usize, value_m: f64) {
        self.signed_m[cell] = self.clamp_m(value_m);
    }

    /// Shape-unit image of a signed elevation.
    #[inline]
    pub fn to_units(&self, value_m: f64) -> f64 {
        SEA_LEVEL_UNIT + value_m / self.unit_m()
    }

    /// Signed elevation of a shape-unit value, clamped to the envelope.
    #[inline]
    pub fn from_units(&self, units: f64) -> f32 {
        self.clamp_m((units - SEA_LEVEL_UNIT) * self.unit_m())
    }

    /// Valid shape-unit interval: the unit image of the envelope
    /// intersected with [0, 100].
    pub fn unit_domain(&self) -> (f64, f64) {
        let lo = (SEA_LEVEL_UNIT - self.max_depth_m / self.unit_m()).max(0.0);
        let hi = (SEA_LEVEL_UNIT + self.max_elevation_m / self.unit_m()).min(100.0);
        (lo, hi)
    }

    /// Rescale to a new envelope preserving shape units, so the land mask
    /// is unchanged and elevations scale by the unit ratio. Identity when
    /// the envelope is unchanged.
    pub fn rescale_elevation_domain(&mut self, new_max_elevation_m: f64, new_max_depth_m: f64) {
        let old_unit = self.unit_m();
        let new_unit = (new_max_elevation_m + new_max_depth_m) / 100.0;
        let ratio = new_unit / old_unit;
        self.max_elevation_m = new_max_elevation_m;
        self.max_depth_m = new_max_depth_m;
        if ratio != 1.0 {
            for h in &mut self.signed_m {
                *h = (*h as f64 * ratio)
                    .clamp(-new_max_depth_m, new_max_elevation_m) as f32;
            }
        } else {
            for h in &mut self.signed_m {
                *h = (*h as f64).clamp(-new_max_depth_m, new_max_elevation_m) as f32;
            }
        }
    }
}

// ── Land-ratio homeostasis ────────────────────────────────────────────────────

/// Shift the whole field so the land fraction falls inside the template's
/// band. At most three iterations; each computes the uniform shift that
/// moves the land/water cutoff to the near band edge (by percentile) and
/// biases it by ±1 mm to break ties.
pub fn apply_land_homeostasis(field: &mut ElevationField, band: (f64, f64)) {
    let (min_land, max_land) = band;
    let n = field.len();
    if n == 0 {
        return;
    }
    for _ in 0..3 {
        let ratio = field.land_ratio();
        if ratio >= min_land && ratio <= max_land {
            break;
        }
        let target = ratio.clamp(min_land, max_land);
        let mut sorted: Vec<f32> = field.signed_m.clone();
        sorted.sort_unstable_by(f32::total_cmp);
        let idx = (((1.0 - target) * n as f64).floor() as usize).min(n - 1);
        let bias = if ratio < target { 1e-3 } else { -1e-3 };
        let delta = -(sorted[idx] as f64) + bias;
        log::debug!(
            "homeostasis: land ratio {ratio:.3} outside [{min_land:.2}, {max_land:.2}], shifting by {delta:.2} m"
        );
        for i in 0..n {
            let v = field.signed_m[i] as f64 + delta;
            field.signed_m[i] = field.clamp_m(v);
        }
    }
    ensure_non_degenerate(field);
}

/// Guarantee at least one land cell and one water cell: force the extreme
/// cells to ±10% of their envelope edges when a side is empty.
pub fn ensure_non_degenerate(field: &mut ElevationField) {
    let n = field.len();
    if n == 0 {
        return;
    }
    if field.land_count() == 0 {
        let top = field
            .signed_m
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        field.signed_m[top] = (0.1 * field.max_elevation_m) as f32;
        log::debug!("homeostasis: no land, raised cell {top}");
    }
    if field.land_count() == n {
        let bottom = field
            .signed_m
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1).then(a.0.cmp(&b.0)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        field.signed_m[bottom] = (-0.1 * field.max_depth_m) as f32;
        log::debug!("homeostasis: no water, sank cell {bottom}");
    }
}
