use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::sync::Arc;

use miller_arrays::config::{BinningStrategy, GriddingParams};
use miller_arrays::interfaces::AnomalousFlag;
use miller_arrays::maps::CrystalGridding;
use miller_arrays::miller::MillerSet;
use miller_arrays::symmetries::CrystalSymmetry;

#[derive(Parser)]
#[command(name = "miller-arrays")]
#[command(about = "Complete Miller index sets, resolution binning and map gridding")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the complete index set to d_min and summarise it
    Summary {
        /// Unit cell a b c alpha beta gamma
        #[arg(long, num_args = 6, value_delimiter = ' ', allow_negative_numbers = true)]
        cell: Vec<f64>,

        /// Space group symbol, e.g. "P 21 21 21"
        #[arg(short, long, default_value = "P 1")]
        space_group: String,

        /// Resolution limit in Angstrom
        #[arg(short, long)]
        d_min: f64,

        /// Keep Friedel mates distinct
        #[arg(short, long)]
        anomalous: bool,

        /// Number of resolution shells (automatic when omitted)
        #[arg(short, long)]
        bins: Option<usize>,
    },
    /// Print the map grid chosen for a symmetry and resolution
    Gridding {
        /// Unit cell a b c alpha beta gamma
        #[arg(long, num_args = 6, value_delimiter = ' ', allow_negative_numbers = true)]
        cell: Vec<f64>,

        /// Space group symbol
        #[arg(short, long, default_value = "P 1")]
        space_group: String,

        /// Resolution limit in Angstrom
        #[arg(short, long)]
        d_min: f64,

        /// Grid spacing as a fraction of d_min
        #[arg(short, long, default_value_t = 1.0 / 3.0)]
        resolution_factor: f64,

        /// Largest prime factor allowed in a grid size
        #[arg(short, long, default_value_t = 5)]
        max_prime: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("Starting miller-arrays v{}", miller_arrays::VERSION);

    match cli.command {
        Commands::Summary {
            cell,
            space_group,
            d_min,
            anomalous,
            bins,
        } => summarise(&cell, &space_group, d_min, anomalous, bins),
        Commands::Gridding {
            cell,
            space_group,
            d_min,
            resolution_factor,
            max_prime,
        } => show_gridding(&cell, &space_group, d_min, resolution_factor, max_prime),
    }
}

fn crystal_symmetry(cell: &[f64], space_group: &str) -> Result<Arc<CrystalSymmetry>> {
    let parameters: [f64; 6] = match cell.try_into() {
        Ok(parameters) => parameters,
        Err(_) => bail!("expected 6 unit cell parameters, got {}", cell.len()),
    };
    let symmetry = CrystalSymmetry::from_symbol(parameters, space_group)
        .with_context(|| format!("building crystal symmetry {space_group:?} with cell {cell:?}"))?;
    Ok(Arc::new(symmetry))
}

fn summarise(cell: &[f64], space_group: &str, d_min: f64, anomalous: bool, bins: Option<usize>) -> Result<()> {
    let symmetry = crystal_symmetry(cell, space_group)?;
    let mut set = MillerSet::build(symmetry, AnomalousFlag::from_bool(anomalous), d_min)
        .context("generating the complete index set")?;
    info!("Generated {} reflections to {d_min} A", set.size());

    let strategy = bins.map_or_else(BinningStrategy::default, BinningStrategy::Bins);
    set.setup_binner(strategy, None, None).context("binning the index set")?;
    print!("{}", set.comprehensive_summary()?);
    println!();
    print!("{}", set.show_completeness_in_bins()?);
    Ok(())
}

fn show_gridding(
    cell: &[f64],
    space_group: &str,
    d_min: f64,
    resolution_factor: f64,
    max_prime: usize,
) -> Result<()> {
    let symmetry = crystal_symmetry(cell, space_group)?;
    let params = GriddingParams {
        resolution_factor,
        d_min: Some(d_min),
        max_prime,
        ..GriddingParams::default()
    };
    let gridding = CrystalGridding::new(symmetry, d_min, &params, None).context("choosing the map grid")?;
    let [n0, n1, n2] = gridding.n_real();
    println!("Grid: {n0} x {n1} x {n2} ({} points)", gridding.n_grid_points());
    Ok(())
}
