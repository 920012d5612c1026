//! Climate stage: latitude-driven temperature and a per-wind-band
//! moisture sweep for precipitation.
//!
//! Temperature is a pure per-cell function (parallel). Precipitation is
//! inherently sequential per band: cells are visited in upwind order and
//! humidity advects from already-visited neighbours.

use rayon::prelude::*;

use crate::config::{WorldConfig, WindBand};
use crate::heightmap::ElevationField;
use crate::mesh::CellMesh;

/// Tropical plateau half-width in degrees: sea-level temperature is flat
/// within ±15° and falls off as a cosine beyond.
const TROPICAL_PLATEAU_DEG: f64 = 15.0;

/// Per-cell temperature (°C) and annual precipitation (mm).
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateField {
    pub temperature_c: Vec<f32>,
    pub precip_mm_year: Vec<f32>,
}

/// Run the climate stage.
pub fn compute_climate(
    mesh: &CellMesh,
    elevation: &ElevationField,
    config: &WorldConfig,
) -> ClimateField {
    let temperature_c = compute_temperature(mesh, elevation, config);
    let precip_mm_year = compute_precipitation(mesh, elevation, &temperature_c, config);
    log::info!(
        "climate: {} cells, mean T {:.1} °C, max precip {:.0} mm",
        mesh.cell_count(),
        temperature_c.iter().map(|&t| t as f64).sum::<f64>() / mesh.cell_count().max(1) as f64,
        precip_mm_year.iter().cloned().fold(0.0f32, f32::max),
    );
    ClimateField { temperature_c, precip_mm_year }
}

/// Cell latitude from its y position.
fn cell_latitude(mesh: &CellMesh, config: &WorldConfig, cell: usize) -> f64 {
    let south = config.latitude_south_deg;
    let north = config.latitude_north_deg();
    south + (mesh.centers[cell].1 / mesh.height_km) * (north - south)
}

fn sea_level_temperature(lat_deg: f64, config: &WorldConfig) -> f64 {
    let lat_abs = lat_deg.abs();
    let equator = config.climate.equator_temp_c;
    if lat_abs <= TROPICAL_PLATEAU_DEG {
        return equator;
    }
    let pole = config.climate.pole_temp_c;
    let t = (lat_abs - TROPICAL_PLATEAU_DEG) / (90.0 - TROPICAL_PLATEAU_DEG);
    pole + (equator - pole) * (t * std::f64::consts::FRAC_PI_2).cos()
}

fn compute_temperature(
    mesh: &CellMesh,
    elevation: &ElevationField,
    config: &WorldConfig,
) -> Vec<f32> {
    (0..mesh.cell_count())
        .into_par_iter()
        .map(|i| {
            let lat = cell_latitude(mesh, config, i);
            let sea = sea_level_temperature(lat, config);
            let lapse =
                config.climate.lapse_c_per_km * (elevation.signed_m[i] as f64).max(0.0) / 1000.0;
            (sea - lapse) as f32
        })
        .collect()
}

/// Saturation proxy: how much moisture air at temperature `t` can hold.
fn moisture_capacity(t_c: f64) -> f64 {
    (2.0f64).powf(t_c / 10.0).clamp(0.05, 4.0)
}

fn compute_precipitation(
    mesh: &CellMesh,
    elevation: &ElevationField,
    temperature_c: &[f32],
    config: &WorldConfig,
) -> Vec<f32> {
    let n = mesh.cell_count();
    let south = config.latitude_south_deg;
    let north = config.latitude_north_deg();
    let span = (north - south).max(1e-9);

    let mut summed = vec![0.0f64; n];
    for band in &config.climate.wind_bands {
        let overlap = band.lat_max.min(north) - band.lat_min.max(south);
        if overlap <= 0.0 {
            continue;
        }
        let weight = overlap / span;
        let band_precip = sweep_band(mesh, elevation, temperature_c, config, band);
        for (acc, p) in summed.iter_mut().zip(band_precip.iter()) {
            *acc += weight * p;
        }
    }

    // Flatten the heavy tail and normalise to the configured annual cap.
    let cap = config.climate.max_annual_precip_mm;
    let max = summed.iter().cloned().fold(0.0f64, f64::max);
    if max <= 0.0 {
        return vec![0.0; n];
    }
    let max_pow = max.powf(0.225);
    summed
        .iter()
        .map(|&p| ((p.powf(0.225) / max_pow * cap).clamp(0.0, cap)) as f32)
        .collect()
}

/// One directional sweep: sort cells along the wind vector and advect a
/// humidity budget from upwind neighbours, depositing over land.
fn sweep_band(
    mesh: &CellMesh,
    elevation: &ElevationField,
    temperature_c: &[f32],
    config: &WorldConfig,
    band: &WindBand,
) -> Vec<f64> {
    let n = mesh.cell_count();
    // Compass is the direction the wind travels: 0° = north (+y),
    // positive clockwise.
    let theta = band.compass_deg.to_radians();
    let wind = (theta.sin(), theta.cos());
    let along = |cell: usize| {
        let (x, y) = mesh.centers[cell];
        x * wind.0 + y * wind.1
    };

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_unstable_by(|&a, &b| along(a).total_cmp(&along(b)).then(a.cmp(&b)));

    let mut humidity = vec![0.0f64; n];
    let mut precip = vec![0.0f64; n];
    let mut visited = vec![false; n];

    for &i in &order {
        let t = temperature_c[i] as f64;
        let cap = moisture_capacity(t);
        let (cx, cy) = mesh.centers[i];

        // Humidity interpolated from visited upwind neighbours, weighted
        // by the squared upwind projection.
        let mut weight_sum = 0.0;
        let mut humidity_sum = 0.0;
        let mut coastal = false;
        let mut uphill_dh = 0.0f64;
        for &nb in &mesh.neighbors_of_cell[i] {
            if nb < 0 {
                continue;
            }
            let nb = nb as usize;
            if elevation.signed_m[nb] <= 0.0 {
                coastal = true;
            }
            let (nx, ny) = mesh.centers[nb];
            let upwind = (cx - nx) * wind.0 + (cy - ny) * wind.1;
            if !visited[nb] || upwind <= 0.0 {
                continue;
            }
            let w = upwind * upwind;
            weight_sum += w;
            humidity_sum += w * humidity[nb];
            uphill_dh = uphill_dh
                .max(elevation.signed_m[i] as f64 - elevation.signed_m[nb] as f64);
        }
        let mut hum = if weight_sum > 0.0 {
            humidity_sum / weight_sum
        } else {
            0.9 * cap
        };

        if elevation.signed_m[i] <= 0.0 {
            // Open water: pick up moisture, no deposition.
            hum += 0.08 * cap;
        } else {
            let slope = uphill_dh.clamp(0.0, 1000.0) / 1000.0;
            let alt_factor = (elevation.signed_m[i] as f64).max(0.0) / elevation.max_elevation_m;
            let mut deposit = 0.025 * hum
                + if coastal { 0.05 * hum } else { 0.0 }
                + hum * 0.25 * slope * (0.5 + alt_factor);
            deposit = deposit.min(hum);
            precip[i] = deposit;
            hum -= deposit;
        }

        hum = hum.min(cap);
        if t < -5.0 {
            hum *= 0.1;
        }
        humidity[i] = hum.max(0.0);
        visited[i] = true;
    }

    precip
}
