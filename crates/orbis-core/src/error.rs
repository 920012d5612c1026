//! Error types for the generation pipeline.
//!
//! Only two kinds of failure ever surface: configuration violations caught
//! before any field is allocated, and template/DSL violations raised while
//! the shaping script runs. Internal degeneracies (no land, no eligible
//! landmass, unreached cells) are recovered silently and deterministically.

use thiserror::Error;

/// Pre-flight configuration violation. The pipeline returns before doing
/// any work when one of these is detected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("cell count must be positive, got {0}")]
    ZeroCellCount(u32),
    #[error("aspect ratio must be positive and finite, got {0}")]
    BadAspectRatio(f64),
    #[error("cell size must be positive and finite, got {0} km")]
    BadCellSize(f64),
    #[error("southern latitude must be finite, got {0}")]
    NonFiniteLatitude(f64),
    #[error("derived latitude span [{south}, {north}] exceeds [-90, +90]")]
    LatitudeSpanOutOfRange { south: f64, north: f64 },
    #[error("elevation envelope must be positive: max_elevation {max_elevation_m} m, max_depth {max_depth_m} m")]
    BadElevationEnvelope { max_elevation_m: f64, max_depth_m: f64 },
    #[error("maximum annual precipitation must be positive, got {0} mm")]
    BadPrecipitationCap(f64),
    #[error("wind band list is empty")]
    NoWindBands,
    #[error("wind band [{lat_min}, {lat_max}] is inverted or non-finite")]
    BadWindBand { lat_min: f64, lat_max: f64 },
}

/// Template / DSL violation raised while parsing or executing a shaping
/// script. The elevation stage fails; no output field is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DslError {
    #[error("line {line}: unknown opcode '{opcode}'")]
    UnknownOpcode { line: usize, opcode: String },
    #[error("line {line}: '{opcode}' expects at least {expected} arguments, got {got}")]
    TooFewArguments { line: usize, opcode: &'static str, expected: usize, got: usize },
    #[error("line {line}: malformed numeric token '{token}'")]
    BadNumber { line: usize, token: String },
    #[error("line {line}: malformed range token '{token}'")]
    BadRange { line: usize, token: String },
    #[error("line {line}: unknown band selector '{token}'")]
    BadBandSelector { line: usize, token: String },
    #[error("line {line}: unknown axis '{token}' (expected x, y or both)")]
    BadAxis { line: usize, token: String },
    #[error("line {line}: unknown orientation '{token}' (expected horizontal or vertical)")]
    BadOrientation { line: usize, token: String },
}

/// Umbrella error for the public API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dsl(#[from] DslError),
    /// The point set degenerated below what the triangulator accepts.
    /// Unreachable for any config that passes validation; kept so the mesh
    /// builder never panics.
    #[error("mesh triangulation failed for {points} input points")]
    Triangulation { points: usize },
}
