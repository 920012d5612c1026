//! Built-in heightmap templates.
//!
//! Scripts are generated per config so explicit bands and deltas carry
//! meter annotations matching the elevation envelope, while heights and
//! coordinates stay in percent and survive envelope rescaling untouched.

use crate::config::{HeightmapTemplate, TuningProfile, WorldConfig};

/// Land-ratio band each template is corrected into after shaping.
pub fn land_band(template: HeightmapTemplate) -> (f64, f64) {
    match template {
        HeightmapTemplate::Volcano => (0.15, 0.70),
        HeightmapTemplate::LowIsland => (0.10, 0.60),
        HeightmapTemplate::Archipelago => (0.12, 0.45),
        HeightmapTemplate::Continents => (0.25, 0.82),
        HeightmapTemplate::Pangea => (0.45, 0.85),
        HeightmapTemplate::HighIsland => (0.22, 0.70),
        HeightmapTemplate::Peninsula => (0.20, 0.65),
        HeightmapTemplate::Shattered => (0.15, 0.55),
        HeightmapTemplate::OldWorld => (0.25, 0.75),
    }
}

/// Per-template tuning profile. Mostly identity; fragmented layouts push
/// their political targets up so small landmasses still partition.
pub fn tuning_for(template: HeightmapTemplate) -> TuningProfile {
    let identity = TuningProfile::identity();
    match template {
        HeightmapTemplate::Archipelago => TuningProfile {
            realm_target: 2.0,
            county_target: 1.15,
            ..identity
        },
        HeightmapTemplate::Shattered => TuningProfile { realm_target: 1.3, ..identity },
        HeightmapTemplate::Pangea => TuningProfile { province_target: 1.2, ..identity },
        HeightmapTemplate::Volcano => TuningProfile { river_threshold: 0.85, ..identity },
        _ => identity,
    }
}

/// The annotated script for a built-in template id.
pub fn get_template(template: HeightmapTemplate, config: &WorldConfig) -> String {
    let unit_m = (config.max_elevation_m + config.max_depth_m) / 100.0;
    // Absolute band bound: shape units → signed meters.
    let band = |units: f64| format!("{:.0}m", (units - 20.0) * unit_m);
    // Relative delta: shape units → meters.
    let delta = |units: f64| format!("{:.0}m", units * unit_m);

    match template {
        HeightmapTemplate::Volcano => format!(
            "Hill 1 90-100% 44-56% 40-60%\n\
             Multiply 0.8 {b50}-{b100}\n\
             Range 1.5 30-55% 45-55% 40-60%\n\
             Smooth 3\n\
             Hill 1.5 25-35% 25-30% 20-75%\n\
             Hill 1 25-35% 75-80% 25-75%\n\
             Hill 0.5 20-25% 10-15% 20-25%\n\
             Mask 3\n",
            b50 = band(50.0),
            b100 = band(100.0),
        ),
        HeightmapTemplate::LowIsland => format!(
            "Hill 1 90-99% 60-80% 45-55%\n\
             Hill 4-5 25-35% 20-65% 40-60%\n\
             Range 1 40-50% 45-55% 45-55%\n\
             Smooth 3\n\
             Trough 1.5 20-30% 15-85% 20-30%\n\
             Trough 1.5 20-30% 15-85% 70-80%\n\
             Hill 1.5 10-15% 5-15% 20-80%\n\
             Hill 1 10-15% 85-95% 70-80%\n\
             Pit 3-5 10-15% 15-85% 20-80%\n\
             Multiply 0.4 {b20}-{b100}\n\
             Mask 4\n",
            b20 = band(20.0),
            b100 = band(100.0),
        ),
        HeightmapTemplate::Archipelago => format!(
            "Add {d11} all\n\
             Range 2-3 40-60% 20-80% 20-80%\n\
             Hill 5 15-20% 10-90% 30-70%\n\
             Hill 2 10-15% 10-30% 20-80%\n\
             Hill 2 10-15% 60-90% 20-80%\n\
             Smooth 3\n\
             Trough 10 20-30% 5-95% 5-95%\n\
             Strait 2 vertical\n\
             Strait 2 horizontal\n",
            d11 = delta(11.0),
        ),
        HeightmapTemplate::Continents => format!(
            "Hill 1 80-85% 75-80% 40-60%\n\
             Hill 1 80-85% 20-25% 40-60%\n\
             Multiply 0.22 {b20}-{b100}\n\
             Hill 5-6 15-20% 25-75% 20-82%\n\
             Range 0.8 30-60% 5-15% 20-45%\n\
             Range 0.8 30-60% 5-15% 55-80%\n\
             Range 0-3 30-60% 80-90% 20-80%\n\
             Trough 3-4 15-20% 15-85% 20-80%\n\
             Strait 2 vertical\n\
             Smooth 2\n\
             Add {d5} all\n\
             Mask 2\n",
            b20 = band(20.0),
            b100 = band(100.0),
            d5 = delta(5.0),
        ),
        HeightmapTemplate::Pangea => "Hill 1-2 25-40% 15-50% 0-10%\n\
             Hill 1-2 5-40% 50-85% 0-10%\n\
             Hill 1-2 25-40% 50-85% 90-100%\n\
             Hill 1-2 5-40% 15-50% 90-100%\n\
             Hill 8-12 20-40% 20-80% 48-52%\n\
             Smooth 2\n\
             Multiply 0.7 land\n\
             Trough 3-4 25-35% 5-95% 10-20%\n\
             Trough 3-4 25-35% 5-95% 80-90%\n\
             Range 5-6 30-40% 10-90% 35-65%\n"
            .to_string(),
        HeightmapTemplate::HighIsland => format!(
            "Hill 1 90-100% 65-75% 47-53%\n\
             Add {d7} all\n\
             Hill 5-6 20-30% 25-55% 45-55%\n\
             Range 1 40-50% 45-55% 45-55%\n\
             Multiply 0.8 land\n\
             Mask 3\n\
             Smooth 2\n\
             Trough 2-3 20-30% 20-30% 20-30%\n\
             Trough 2-3 20-30% 60-80% 70-80%\n\
             Hill 1 10-15% 60% 50%\n\
             Hill 1.5 13-16% 15-20% 20-75%\n",
            d7 = delta(7.0),
        ),
        HeightmapTemplate::Peninsula => format!(
            "Range 2-3 20-35% 40-50% 0-15%\n\
             Add {d5} all\n\
             Hill 1 90-100% 10-90% 0-5%\n\
             Add {d13} all\n\
             Hill 3-4 3-5% 5-95% 80-100%\n\
             Hill 1-2 3-5% 5-95% 40-60%\n\
             Trough 5-6 10-25% 5-95% 5-95%\n\
             Smooth 3\n\
             Invert 0.4 both\n",
            d5 = delta(5.0),
            d13 = delta(13.0),
        ),
        HeightmapTemplate::Shattered => "Hill 8 35-40% 15-85% 30-70%\n\
             Trough 10-20 40-50% 5-95% 5-95%\n\
             Range 5-7 30-40% 10-90% 20-80%\n\
             Strait 2-5 vertical\n\
             Strait 1-3 horizontal\n"
            .to_string(),
        HeightmapTemplate::OldWorld => "Hill 1.5 80-90% 30-70% 35-65%\n\
             Multiply 0.6 land\n\
             Range 2-3 30-50% 20-80% 25-75%\n\
             Pit 4-6 20-30% 20-80% 20-80%\n\
             Trough 2-3 20-30% 10-90% 10-90%\n\
             Hill 3-4 10-20% 10-90% 10-90%\n\
             Strait 1-2 vertical\n\
             Smooth 2\n\
             Mask 2\n"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::heightmap::dsl;

    #[test]
    fn every_template_parses() {
        let config = WorldConfig::default();
        for template in HeightmapTemplate::ALL {
            let script = get_template(template, &config);
            let ops = dsl::parse(&script)
                .unwrap_or_else(|e| panic!("{}: {e}", template.name()));
            assert!(!ops.is_empty(), "{} must contain ops", template.name());
        }
    }

    #[test]
    fn bands_are_ordered_and_sane() {
        for template in HeightmapTemplate::ALL {
            let (lo, hi) = land_band(template);
            assert!(
                0.0 < lo && lo < hi && hi < 1.0,
                "{}: band ({lo}, {hi}) must be a proper sub-interval",
                template.name()
            );
        }
    }

    #[test]
    fn meter_annotations_track_the_envelope() {
        let base = WorldConfig::default();
        let doubled = WorldConfig { max_elevation_m: 10000.0, max_depth_m: 2500.0, ..base.clone() };
        let a = get_template(HeightmapTemplate::Continents, &base);
        let b = get_template(HeightmapTemplate::Continents, &doubled);
        assert!(a.contains("5000m"), "default envelope ceiling should appear: {a}");
        assert!(b.contains("10000m"), "doubled envelope ceiling should appear: {b}");
        // Percent arguments must be identical across envelopes.
        let strip_m = |s: &str| {
            s.split_whitespace().filter(|t| !t.ends_with('m')).collect::<Vec<_>>().join(" ")
        };
        assert_eq!(strip_m(&a), strip_m(&b), "only meter tokens may differ");
    }

    #[test]
    fn spec_band_templates_match_expected_limits() {
        assert_eq!(land_band(HeightmapTemplate::LowIsland), (0.10, 0.60));
        assert_eq!(land_band(HeightmapTemplate::Continents), (0.25, 0.82));
    }

    #[test]
    fn tuning_defaults_to_identity() {
        assert_eq!(tuning_for(HeightmapTemplate::Continents), TuningProfile::identity());
        assert!(tuning_for(HeightmapTemplate::Archipelago).realm_target > 1.0);
    }
}
