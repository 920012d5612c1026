//! Offline harness: generate a world from CLI arguments and print its
//! aggregate metrics, or compare two seeds as JSON.

use anyhow::{bail, Result};
use clap::Parser;

use orbis_core::{compare, generate, HeightmapTemplate, WorldConfig, WorldMetrics};

#[derive(Parser, Debug)]
#[command(name = "orbis", about = "Deterministic world generation harness")]
struct Args {
    /// Master seed.
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Heightmap template id (e.g. Continents, LowIsland, Archipelago).
    #[arg(short, long, default_value = "Continents")]
    template: String,

    /// Target interior cell count.
    #[arg(short, long, default_value_t = 5000)]
    cells: u32,

    /// Compare against a second seed and emit both metric sets as JSON.
    #[arg(long)]
    compare_seed: Option<u64>,

    /// Print the template script instead of generating.
    #[arg(long)]
    show_template: bool,
}

fn parse_template(name: &str) -> Result<HeightmapTemplate> {
    for template in HeightmapTemplate::ALL {
        if template.name().eq_ignore_ascii_case(name) {
            return Ok(template);
        }
    }
    bail!(
        "unknown template '{name}'; expected one of {}",
        HeightmapTemplate::ALL.map(|t| t.name()).join(", ")
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = WorldConfig {
        seed: args.seed,
        cell_count: args.cells,
        template: parse_template(&args.template)?,
        ..WorldConfig::default()
    };

    if args.show_template {
        print!("{}", orbis_core::get_template(config.template, &config));
        return Ok(());
    }

    if let Some(other_seed) = args.compare_seed {
        let other = WorldConfig { seed: other_seed, ..config.clone() };
        let metrics = compare(&config, &other)?;
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let result = generate(&config)?;
    let metrics = WorldMetrics::from_result(&result);
    println!(
        "{} seed {} — {} cells, land {:.1}%",
        config.template.name(),
        config.seed,
        result.mesh.cell_count(),
        100.0 * metrics.land_ratio
    );
    println!(
        "rivers: {} (vertex coverage {:.2}%)",
        metrics.river_count,
        100.0 * metrics.river_vertex_coverage
    );
    println!(
        "politics: {} landmasses, {} realms, {} provinces, {} counties",
        metrics.landmass_count, metrics.realm_count, metrics.province_count, metrics.county_count
    );
    println!("population: {:.0}", metrics.total_population);
    for (biome, cells) in &metrics.biome_cells {
        println!("  {biome:<20} {cells}");
    }
    Ok(())
}
