//! Interpreter for the shaping DSL.
//!
//! All ops run in shape-unit space (sea level pinned at 20 units) on a
//! scratch buffer and convert back to signed meters once at the end.
//! Every random draw happens on the driver thread in BFS / wave / list
//! order, so repeated runs are bit-identical; the only parallel regions
//! are pure per-cell recomputations (Smooth, Invert).

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::config::TuningProfile;
use crate::heightmap::dsl::{Axis, BandSelector, Orientation, Quantity, ShapeOp, Suffix};
use crate::heightmap::{ElevationField, SEA_LEVEL_UNIT};
use crate::mesh::CellMesh;
use crate::rng::StageRng;

/// Blob falloff exponent by cell count. Coarser meshes need steeper decay
/// to keep hill footprints proportionate.
fn blob_power(cells: usize) -> f64 {
    match cells {
        0..=1000 => 0.93,
        1001..=2000 => 0.95,
        2001..=5000 => 0.97,
        5001..=10000 => 0.98,
        10001..=20000 => 0.99,
        20001..=30000 => 0.991,
        30001..=40000 => 0.993,
        40001..=50000 => 0.994,
        50001..=60000 => 0.995,
        60001..=70000 => 0.9955,
        70001..=80000 => 0.996,
        80001..=90000 => 0.9964,
        _ => 0.9973,
    }
}

/// Ridge-wave decay exponent by cell count.
fn line_power(cells: usize) -> f64 {
    match cells {
        0..=1000 => 0.75,
        1001..=2000 => 0.77,
        2001..=5000 => 0.79,
        5001..=10000 => 0.81,
        10001..=20000 => 0.84,
        20001..=30000 => 0.86,
        30001..=40000 => 0.87,
        40001..=50000 => 0.88,
        50001..=60000 => 0.89,
        60001..=70000 => 0.90,
        70001..=80000 => 0.91,
        80001..=90000 => 0.92,
        _ => 0.93,
    }
}

struct Shaper<'a> {
    mesh: &'a CellMesh,
    profile: TuningProfile,
    shape_span_km: f64,
    /// Working field in shape units.
    u: Vec<f64>,
    /// Valid unit interval (envelope image ∩ [0, 100]).
    lo: f64,
    hi: f64,
    unit_m: f64,
    blob_power: f64,
    line_power: f64,
}

/// Execute parsed ops against an elevation field. Infallible: every
/// violation is caught at parse time.
pub fn execute(
    field: &mut ElevationField,
    mesh: &CellMesh,
    ops: &[ShapeOp],
    rng: &mut StageRng,
    profile: &TuningProfile,
    shape_span_km: f64,
) {
    let (lo, hi) = field.unit_domain();
    let mut shaper = Shaper {
        mesh,
        profile: *profile,
        shape_span_km,
        u: field.signed_m.iter().map(|&h| field.to_units(h as f64)).collect(),
        lo,
        hi,
        unit_m: field.unit_m(),
        blob_power: blob_power(mesh.interior_count),
        line_power: line_power(mesh.interior_count),
    };

    for op in ops {
        match op {
            ShapeOp::Hill { count, height, x, y } => shaper.hill(rng, count, height, x, y),
            ShapeOp::Pit { count, depth, x, y } => shaper.pit(rng, count, depth, x, y),
            ShapeOp::Range { count, height, x, y } => {
                shaper.ridge(rng, count, height, x, y, /*raise=*/ true)
            }
            ShapeOp::Trough { count, depth, x, y } => {
                shaper.ridge(rng, count, depth, x, y, /*raise=*/ false)
            }
            ShapeOp::Mask { factor } => shaper.mask(*factor),
            ShapeOp::Strait { width, orientation } => shaper.strait(rng, width, *orientation),
            ShapeOp::Add { delta, band } => shaper.add(rng, delta, *band),
            ShapeOp::Multiply { factor, band } => shaper.multiply(rng, factor, *band),
            ShapeOp::Smooth { strength } => shaper.smooth(*strength),
            ShapeOp::Invert { probability, axis } => shaper.invert(rng, *probability, *axis),
        }
    }

    for (h, &units) in field.signed_m.iter_mut().zip(shaper.u.iter()) {
        *h = ((units - SEA_LEVEL_UNIT) * shaper.unit_m)
            .clamp(-field.max_depth_m, field.max_elevation_m) as f32;
    }
}

impl Shaper<'_> {
    #[inline]
    fn lim(&self, units: f64) -> f64 {
        units.clamp(self.lo, self.hi)
    }

    /// Fractional instance counts contribute their integer part plus one
    /// more with probability equal to the fraction.
    fn resolve_count(&self, rng: &mut StageRng, q: &Quantity) -> usize {
        let value = resolve(rng, q).max(0.0);
        let whole = value.floor();
        let frac = value - whole;
        let extra = if frac > 0.0 && rng.chance(frac) { 1 } else { 0 };
        whole as usize + extra
    }

    /// Magnitudes: `%` and bare numbers are shape units, `m` converts.
    fn resolve_magnitude(&self, rng: &mut StageRng, q: &Quantity) -> f64 {
        let value = resolve(rng, q);
        match q.suffix {
            Suffix::Meters => value / self.unit_m,
            _ => value,
        }
    }

    /// Map-relative coordinate from a percent quantity.
    fn resolve_point(&self, rng: &mut StageRng, x: &Quantity, y: &Quantity) -> (f64, f64) {
        let px = resolve(rng, x) / 100.0 * self.mesh.width_km;
        let py = resolve(rng, y) / 100.0 * self.mesh.height_km;
        (px, py)
    }

    // ── Hill ─────────────────────────────────────────────────────────────────

    fn hill(&mut self, rng: &mut StageRng, count: &Quantity, height: &Quantity, x: &Quantity, y: &Quantity) {
        let n = self.resolve_count(rng, count);
        for _ in 0..n {
            let h = self.resolve_magnitude(rng, height) * self.profile.hill_height;

            let mut seed = 0usize;
            for _ in 0..50 {
                let (px, py) = self.resolve_point(rng, x, y);
                seed = self.mesh.nearest_cell(px, py);
                if self.u[seed] + h <= 90.0 {
                    break;
                }
            }

            let cell_total = self.mesh.cell_count();
            let mut change = vec![0.0f64; cell_total];
            let mut visited = vec![false; cell_total];
            change[seed] = h;
            visited[seed] = true;
            let mut queue = VecDeque::from([seed]);
            while let Some(cur) = queue.pop_front() {
                for &nb in &self.mesh.neighbors_of_cell[cur] {
                    if nb < 0 || visited[nb as usize] {
                        continue;
                    }
                    let nb = nb as usize;
                    visited[nb] = true;
                    // The floor is what shapes the falloff: decay stalls at
                    // integer steps and dies at 1.
                    let decayed =
                        (change[cur].powf(self.blob_power) * rng.uniform(0.9, 1.1)).floor();
                    change[nb] = decayed;
                    if decayed > 1.0 {
                        queue.push_back(nb);
                    }
                }
            }

            for i in 0..cell_total {
                if change[i] > 0.0 {
                    self.u[i] = self.lim(self.u[i] + change[i]);
                }
            }
        }
    }

    // ── Pit ──────────────────────────────────────────────────────────────────

    fn pit(&mut self, rng: &mut StageRng, count: &Quantity, depth: &Quantity, x: &Quantity, y: &Quantity) {
        let n = self.resolve_count(rng, count);
        for _ in 0..n {
            let h = self.resolve_magnitude(rng, depth) * self.profile.pit_depth;

            let mut seed = 0usize;
            for _ in 0..50 {
                let (px, py) = self.resolve_point(rng, x, y);
                seed = self.mesh.nearest_cell(px, py);
                if self.u[seed] > SEA_LEVEL_UNIT {
                    break;
                }
            }

            let cell_total = self.mesh.cell_count();
            let mut change = vec![0.0f64; cell_total];
            let mut visited = vec![false; cell_total];
            change[seed] = h;
            visited[seed] = true;
            let mut queue = VecDeque::from([seed]);
            while let Some(cur) = queue.pop_front() {
                for &nb in &self.mesh.neighbors_of_cell[cur] {
                    if nb < 0 || visited[nb as usize] {
                        continue;
                    }
                    let nb = nb as usize;
                    visited[nb] = true;
                    // Unlike Hill the decay stays floating-point.
                    let decayed = change[cur].powf(self.blob_power) * rng.uniform(0.9, 1.1);
                    change[nb] = decayed;
                    if decayed > 1.0 {
                        queue.push_back(nb);
                    }
                }
            }

            for i in 0..cell_total {
                if change[i] > 0.0 {
                    self.u[i] = self.lim(self.u[i] - change[i]);
                }
            }
        }
    }

    // ── Range / Trough ───────────────────────────────────────────────────────

    fn ridge(
        &mut self,
        rng: &mut StageRng,
        count: &Quantity,
        magnitude: &Quantity,
        x: &Quantity,
        y: &Quantity,
        raise: bool,
    ) {
        let n = self.resolve_count(rng, count);
        let (dist_hi_div, halve_chance, scale) = if raise {
            (3.0, 0.15, self.profile.range_height)
        } else {
            (2.0, 0.20, self.profile.trough_depth)
        };
        let dist_lo = self.shape_span_km / 8.0;
        let dist_hi = self.shape_span_km / dist_hi_div;

        for _ in 0..n {
            let h0 = self.resolve_magnitude(rng, magnitude) * scale;
            let (x1, y1) = self.resolve_point(rng, x, y);

            // Endpoint from the same bands; up to 50 attempts for a
            // distance inside [span/8, span/k], else the least-bad one.
            let mut best = (x1, y1);
            let mut best_violation = f64::INFINITY;
            for _ in 0..50 {
                let (x2, y2) = self.resolve_point(rng, x, y);
                let dist = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
                let violation = (dist - dist.clamp(dist_lo, dist_hi)).abs();
                if violation < best_violation {
                    best_violation = violation;
                    best = (x2, y2);
                }
                if violation == 0.0 {
                    break;
                }
            }

            let start = self.mesh.nearest_cell(x1, y1);
            let end = self.mesh.nearest_cell(best.0, best.1);
            let path = self.greedy_path(rng, start, end, halve_chance);

            // Frontier waves around the ridge line.
            let cell_total = self.mesh.cell_count();
            let mut visited = vec![false; cell_total];
            for &c in &path {
                visited[c] = true;
            }
            let mut wave = path.clone();
            let mut h = h0;
            let mut waves_run = 0usize;
            loop {
                for &c in &wave {
                    let delta = h * rng.uniform(0.85, 1.15);
                    let next = if raise { self.u[c] + delta } else { self.u[c] - delta };
                    self.u[c] = self.lim(next);
                }
                waves_run += 1;
                h = h.powf(self.line_power) - 1.0;
                if h < 2.0 {
                    break;
                }
                let mut next_wave = Vec::new();
                for &c in &wave {
                    for &nb in &self.mesh.neighbors_of_cell[c] {
                        if nb >= 0 && !visited[nb as usize] {
                            visited[nb as usize] = true;
                            next_wave.push(nb as usize);
                        }
                    }
                }
                if next_wave.is_empty() {
                    break;
                }
                wave = next_wave;
            }

            // Prominences: every 6th ridge cell bleeds downhill for as many
            // steps as the expansion ran waves.
            for (d, &cell) in path.iter().enumerate() {
                if d % 6 != 0 {
                    continue;
                }
                let mut cur = cell;
                for _ in 0..waves_run {
                    let mut lowest: Option<usize> = None;
                    for &nb in &self.mesh.neighbors_of_cell[cur] {
                        if nb < 0 {
                            continue;
                        }
                        let nb = nb as usize;
                        match lowest {
                            None => lowest = Some(nb),
                            Some(best_nb) if self.u[nb] < self.u[best_nb] => lowest = Some(nb),
                            _ => {}
                        }
                    }
                    let Some(low) = lowest else { break };
                    self.u[low] = self.lim((self.u[cur] * 2.0 + self.u[low]) / 3.0);
                    cur = low;
                }
            }
        }
    }

    /// Greedy walk start → end minimising squared distance to the target,
    /// with a per-candidate chance of halving the measure to roughen the
    /// line. Stops early if boxed in.
    fn greedy_path(
        &self,
        rng: &mut StageRng,
        start: usize,
        end: usize,
        halve_chance: f64,
    ) -> Vec<usize> {
        let (ex, ey) = self.mesh.centers[end];
        let mut visited = vec![false; self.mesh.cell_count()];
        let mut path = vec![start];
        visited[start] = true;
        let mut cur = start;
        while cur != end {
            let mut best: Option<(f64, usize)> = None;
            for &nb in &self.mesh.neighbors_of_cell[cur] {
                if nb < 0 || visited[nb as usize] {
                    continue;
                }
                let nb = nb as usize;
                let (nx, ny) = self.mesh.centers[nb];
                let mut diff = (ex - nx).powi(2) + (ey - ny).powi(2);
                if rng.chance(halve_chance) {
                    diff /= 2.0;
                }
                if best.map_or(true, |(d, _)| diff < d) {
                    best = Some((diff, nb));
                }
            }
            let Some((_, next)) = best else { break };
            visited[next] = true;
            path.push(next);
            cur = next;
        }
        path
    }

    // ── Mask ─────────────────────────────────────────────────────────────────

    fn mask(&mut self, factor: f64) {
        let factor = factor * self.profile.mask_strength;
        let fr = factor.abs().max(1.0);
        for i in 0..self.mesh.cell_count() {
            let (x, y) = self.mesh.centers[i];
            let nx = 2.0 * x / self.mesh.width_km - 1.0;
            let ny = 2.0 * y / self.mesh.height_km - 1.0;
            let mut distance = (1.0 - nx * nx) * (1.0 - ny * ny);
            if factor < 0.0 {
                distance = 1.0 - distance;
            }
            let h = self.u[i];
            self.u[i] = self.lim((h * (fr - 1.0) + h * distance) / fr);
        }
    }

    // ── Strait ───────────────────────────────────────────────────────────────

    fn strait(&mut self, rng: &mut StageRng, width: &Quantity, orientation: Orientation) {
        let mut w = self.resolve_magnitude(rng, width) * self.profile.strait_width;
        if w < 1.0 {
            if !rng.chance(w.max(0.0)) {
                return;
            }
            w = 1.0;
        }
        let grid_cols = self.mesh.width_km / self.mesh.spacing_km;
        let rings = (w.min(grid_cols / 3.0)) as usize;
        if rings == 0 {
            return;
        }

        let (start, end) = match orientation {
            Orientation::Vertical => {
                let sx = rng.uniform(0.3, 0.7) * self.mesh.width_km;
                let ex = rng.uniform(0.3, 0.7) * self.mesh.width_km;
                (
                    self.mesh.nearest_cell(sx, 0.0),
                    self.mesh.nearest_cell(ex, self.mesh.height_km),
                )
            }
            Orientation::Horizontal => {
                let sy = rng.uniform(0.3, 0.7) * self.mesh.height_km;
                let ey = rng.uniform(0.3, 0.7) * self.mesh.height_km;
                (
                    self.mesh.nearest_cell(0.0, sy),
                    self.mesh.nearest_cell(self.mesh.width_km, ey),
                )
            }
        };

        let path = self.greedy_path(rng, start, end, 0.2);
        let mut visited = vec![false; self.mesh.cell_count()];
        for &c in &path {
            visited[c] = true;
        }
        let mut ring = path;
        for _ in 0..rings {
            for &c in &ring {
                let mut carved = self.u[c].powf(0.8);
                if carved > 100.0 {
                    carved = 5.0;
                }
                self.u[c] = self.lim(carved);
            }
            let mut next_ring = Vec::new();
            for &c in &ring {
                for &nb in &self.mesh.neighbors_of_cell[c] {
                    if nb >= 0 && !visited[nb as usize] {
                        visited[nb as usize] = true;
                        next_ring.push(nb as usize);
                    }
                }
            }
            if next_ring.is_empty() {
                break;
            }
            ring = next_ring;
        }
    }

    // ── Add / Multiply ───────────────────────────────────────────────────────

    fn in_band(&self, units: f64, band: BandSelector) -> bool {
        match band {
            BandSelector::Land => units > SEA_LEVEL_UNIT,
            BandSelector::Water => units <= SEA_LEVEL_UNIT,
            BandSelector::All => true,
            BandSelector::Range { min_m, max_m } => {
                let lo = SEA_LEVEL_UNIT + min_m / self.unit_m;
                let hi = SEA_LEVEL_UNIT + max_m / self.unit_m;
                units >= lo && units <= hi
            }
        }
    }

    fn add(&mut self, rng: &mut StageRng, delta: &Quantity, band: BandSelector) {
        // Bare Add deltas are meters, the DSL's only meter-default argument.
        let value = resolve(rng, delta);
        let delta_units = match delta.suffix {
            Suffix::Percent => value,
            _ => value / self.unit_m,
        };
        for i in 0..self.u.len() {
            if !self.in_band(self.u[i], band) {
                continue;
            }
            let mut next = self.lim(self.u[i] + delta_units);
            if band == BandSelector::Land {
                // Never submerge land by adding to it.
                next = next.max(SEA_LEVEL_UNIT);
            }
            self.u[i] = next;
        }
    }

    fn multiply(&mut self, rng: &mut StageRng, factor: &Quantity, band: BandSelector) {
        let k = resolve(rng, factor);
        for i in 0..self.u.len() {
            if !self.in_band(self.u[i], band) {
                continue;
            }
            self.u[i] = self.lim(SEA_LEVEL_UNIT + (self.u[i] - SEA_LEVEL_UNIT) * k);
        }
    }

    // ── Smooth ───────────────────────────────────────────────────────────────

    fn smooth(&mut self, strength: f64) {
        let r = (strength * self.profile.smooth_strength).max(1.0);
        let u = &self.u;
        let mesh = self.mesh;
        let lo = self.lo;
        let hi = self.hi;
        let next: Vec<f64> = (0..u.len())
            .into_par_iter()
            .map(|i| {
                let mut sum = u[i];
                let mut cnt = 1.0;
                for &nb in &mesh.neighbors_of_cell[i] {
                    if nb >= 0 {
                        sum += u[nb as usize];
                        cnt += 1.0;
                    }
                }
                let mean = sum / cnt;
                ((u[i] * (r - 1.0) + mean) / r).clamp(lo, hi)
            })
            .collect();
        self.u = next;
    }

    // ── Invert ───────────────────────────────────────────────────────────────

    fn invert(&mut self, rng: &mut StageRng, probability: f64, axis: Axis) {
        if !rng.chance(probability) {
            return;
        }
        let mesh = self.mesh;
        let u = &self.u;
        let next: Vec<f64> = (0..u.len())
            .into_par_iter()
            .map(|i| {
                let (x, y) = mesh.centers[i];
                let (rx, ry) = match axis {
                    Axis::X => (mesh.width_km - x, y),
                    Axis::Y => (x, mesh.height_km - y),
                    Axis::Both => (mesh.width_km - x, mesh.height_km - y),
                };
                u[mesh.nearest_cell(rx, ry)]
            })
            .collect();
        self.u = next;
    }
}

fn resolve(rng: &mut StageRng, q: &Quantity) -> f64 {
    if q.lo == q.hi {
        q.lo
    } else {
        rng.uniform(q.lo, q.hi)
    }
}
