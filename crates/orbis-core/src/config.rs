//! World configuration, derived metadata, and pre-flight validation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Kilometres per degree of latitude, used to derive the northern edge of
/// the map from its southern latitude and physical height.
pub const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Built-in heightmap template ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeightmapTemplate {
    Volcano,
    LowIsland,
    Archipelago,
    Continents,
    Pangea,
    HighIsland,
    Peninsula,
    Shattered,
    OldWorld,
}

impl HeightmapTemplate {
    pub const ALL: [HeightmapTemplate; 9] = [
        HeightmapTemplate::Volcano,
        HeightmapTemplate::LowIsland,
        HeightmapTemplate::Archipelago,
        HeightmapTemplate::Continents,
        HeightmapTemplate::Pangea,
        HeightmapTemplate::HighIsland,
        HeightmapTemplate::Peninsula,
        HeightmapTemplate::Shattered,
        HeightmapTemplate::OldWorld,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeightmapTemplate::Volcano => "Volcano",
            HeightmapTemplate::LowIsland => "LowIsland",
            HeightmapTemplate::Archipelago => "Archipelago",
            HeightmapTemplate::Continents => "Continents",
            HeightmapTemplate::Pangea => "Pangea",
            HeightmapTemplate::HighIsland => "HighIsland",
            HeightmapTemplate::Peninsula => "Peninsula",
            HeightmapTemplate::Shattered => "Shattered",
            HeightmapTemplate::OldWorld => "OldWorld",
        }
    }
}

/// One latitudinal wind band. `compass_deg` is the direction the wind
/// travels: 0° = north, positive clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindBand {
    pub lat_min: f64,
    pub lat_max: f64,
    pub compass_deg: f64,
}

impl WindBand {
    pub const fn new(lat_min: f64, lat_max: f64, compass_deg: f64) -> Self {
        Self { lat_min, lat_max, compass_deg }
    }
}

/// Climate constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateConfig {
    pub equator_temp_c: f64,
    pub pole_temp_c: f64,
    pub lapse_c_per_km: f64,
    pub max_annual_precip_mm: f64,
    pub wind_bands: Vec<WindBand>,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            equator_temp_c: 27.0,
            pole_temp_c: -28.0,
            lapse_c_per_km: 6.5,
            max_annual_precip_mm: 2500.0,
            // Earth-like circulation: trades, westerlies and polar
            // easterlies, mirrored across the equator.
            wind_bands: vec![
                WindBand::new(60.0, 90.0, 225.0),
                WindBand::new(30.0, 60.0, 45.0),
                WindBand::new(0.0, 30.0, 225.0),
                WindBand::new(-30.0, 0.0, 315.0),
                WindBand::new(-60.0, -30.0, 135.0),
                WindBand::new(-90.0, -60.0, 315.0),
            ],
        }
    }
}

/// River extraction thresholds, expressed in dimensionless vertex flux.
/// Effective values scale by `sqrt(cell_count / 5000)` and by the active
/// tuning profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiverConfig {
    /// Minimum mouth flux for a main-stem river.
    pub river_threshold: f64,
    /// Minimum flux followed while tracing tributaries.
    pub trace_threshold: f64,
    /// Rivers shorter than this many vertices are dropped.
    pub min_river_vertices: usize,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self { river_threshold: 300.0, trace_threshold: 60.0, min_river_vertices: 3 }
    }
}

/// Realm eligibility floors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoliticsConfig {
    /// A landmass must hold at least this many cells to host realms.
    pub min_realm_cells: u32,
    /// ... and at least this fraction of the world population.
    pub min_realm_population_fraction: f64,
}

impl Default for PoliticsConfig {
    fn default() -> Self {
        Self { min_realm_cells: 40, min_realm_population_fraction: 0.02 }
    }
}

/// Per-template tuning profile: 25 scalar multipliers applied on top of the
/// base constants. The identity profile (all 1.0) is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningProfile {
    // Terrain magnitude.
    pub hill_height: f64,
    pub pit_depth: f64,
    pub range_height: f64,
    pub trough_depth: f64,
    pub strait_width: f64,
    pub smooth_strength: f64,
    pub mask_strength: f64,
    // River thresholds.
    pub river_threshold: f64,
    pub trace_threshold: f64,
    pub min_river_vertices: f64,
    // Political targets.
    pub realm_target: f64,
    pub county_target: f64,
    pub province_target: f64,
    pub capital_spacing: f64,
    pub county_spacing: f64,
    pub province_spacing: f64,
    pub orphan_threshold: f64,
    // Biome thresholds.
    pub glacier_temp: f64,
    pub desert_precip: f64,
    pub rainforest_precip: f64,
    pub wetland_flux: f64,
    pub rock_elevation: f64,
    pub salt_reach: f64,
    pub slope_weight: f64,
    pub habitability: f64,
}

impl TuningProfile {
    pub const fn identity() -> Self {
        Self {
            hill_height: 1.0,
            pit_depth: 1.0,
            range_height: 1.0,
            trough_depth: 1.0,
            strait_width: 1.0,
            smooth_strength: 1.0,
            mask_strength: 1.0,
            river_threshold: 1.0,
            trace_threshold: 1.0,
            min_river_vertices: 1.0,
            realm_target: 1.0,
            county_target: 1.0,
            province_target: 1.0,
            capital_spacing: 1.0,
            county_spacing: 1.0,
            province_spacing: 1.0,
            orphan_threshold: 1.0,
            glacier_temp: 1.0,
            desert_precip: 1.0,
            rainforest_precip: 1.0,
            wetland_flux: 1.0,
            rock_elevation: 1.0,
            salt_reach: 1.0,
            slope_weight: 1.0,
            habitability: 1.0,
        }
    }
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self::identity()
    }
}

/// Full input record of the pipeline. Together with the seed this
/// determines every output bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub seed: u64,
    /// Target interior cell count (the jittered grid emits close to this).
    pub cell_count: u32,
    /// Width / height.
    pub aspect_ratio: f64,
    pub cell_size_km: f64,
    pub template: HeightmapTemplate,
    pub latitude_south_deg: f64,
    pub max_elevation_m: f64,
    pub max_depth_m: f64,
    /// Reference span for terrain-shape distances. `None` uses the map
    /// width, so default-size maps are unaffected.
    pub shape_reference_km: Option<f64>,
    pub climate: ClimateConfig,
    pub rivers: RiverConfig,
    pub politics: PoliticsConfig,
    /// Overrides the template's own tuning profile when set.
    pub tuning: Option<TuningProfile>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cell_count: 5000,
            aspect_ratio: 16.0 / 9.0,
            cell_size_km: 2.5,
            template: HeightmapTemplate::Continents,
            latitude_south_deg: 30.0,
            max_elevation_m: 5000.0,
            max_depth_m: 1250.0,
            shape_reference_km: None,
            climate: ClimateConfig::default(),
            rivers: RiverConfig::default(),
            politics: PoliticsConfig::default(),
            tuning: None,
        }
    }
}

impl WorldConfig {
    /// Map extent in km derived from cell count, cell size and aspect.
    pub fn extent_km(&self) -> (f64, f64) {
        let area = self.cell_count as f64 * self.cell_size_km * self.cell_size_km;
        let height = (area / self.aspect_ratio).sqrt();
        let width = self.aspect_ratio * height;
        (width, height)
    }

    /// Northern latitude derived from the southern edge and map height.
    pub fn latitude_north_deg(&self) -> f64 {
        let (_, height_km) = self.extent_km();
        self.latitude_south_deg + height_km / KM_PER_DEGREE_LAT
    }

    /// Reference span for terrain-shape distances (ridge lengths, strait
    /// paths).
    pub fn shape_span_km(&self) -> f64 {
        self.shape_reference_km.unwrap_or_else(|| self.extent_km().0)
    }

    /// Active tuning profile: the explicit override, or the template's own.
    pub fn tuning_profile(&self) -> TuningProfile {
        self.tuning
            .unwrap_or_else(|| crate::heightmap::templates::tuning_for(self.template))
    }

    pub fn metadata(&self) -> WorldMetadata {
        let (width_km, height_km) = self.extent_km();
        WorldMetadata {
            width_km,
            height_km,
            latitude_south_deg: self.latitude_south_deg,
            latitude_north_deg: self.latitude_north_deg(),
            min_elevation_m: -self.max_depth_m,
            sea_level_m: 0.0,
            max_elevation_m: self.max_elevation_m,
        }
    }

    /// Pre-flight validation. Runs before any field is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_count == 0 {
            return Err(ConfigError::ZeroCellCount(self.cell_count));
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(ConfigError::BadAspectRatio(self.aspect_ratio));
        }
        if !(self.cell_size_km.is_finite() && self.cell_size_km > 0.0) {
            return Err(ConfigError::BadCellSize(self.cell_size_km));
        }
        if !self.latitude_south_deg.is_finite() {
            return Err(ConfigError::NonFiniteLatitude(self.latitude_south_deg));
        }
        let north = self.latitude_north_deg();
        if !north.is_finite() || self.latitude_south_deg < -90.0 || north > 90.0 {
            return Err(ConfigError::LatitudeSpanOutOfRange {
                south: self.latitude_south_deg,
                north,
            });
        }
        if !(self.max_elevation_m.is_finite() && self.max_elevation_m > 0.0)
            || !(self.max_depth_m.is_finite() && self.max_depth_m > 0.0)
        {
            return Err(ConfigError::BadElevationEnvelope {
                max_elevation_m: self.max_elevation_m,
                max_depth_m: self.max_depth_m,
            });
        }
        if !(self.climate.max_annual_precip_mm.is_finite()
            && self.climate.max_annual_precip_mm > 0.0)
        {
            return Err(ConfigError::BadPrecipitationCap(self.climate.max_annual_precip_mm));
        }
        if self.climate.wind_bands.is_empty() {
            return Err(ConfigError::NoWindBands);
        }
        for band in &self.climate.wind_bands {
            if !band.lat_min.is_finite()
                || !band.lat_max.is_finite()
                || !band.compass_deg.is_finite()
                || band.lat_min >= band.lat_max
            {
                return Err(ConfigError::BadWindBand {
                    lat_min: band.lat_min,
                    lat_max: band.lat_max,
                });
            }
        }
        Ok(())
    }
}

/// Derived world metadata handed to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub width_km: f64,
    pub height_km: f64,
    pub latitude_south_deg: f64,
    pub latitude_north_deg: f64,
    pub min_elevation_m: f64,
    pub sea_level_m: f64,
    pub max_elevation_m: f64,
}
