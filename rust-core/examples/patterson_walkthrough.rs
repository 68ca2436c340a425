/// Example walking through a small reflection data set
///
/// Builds a complete P 21 21 21 set, fakes redundant intensity measurements,
/// merges them, bins the result by resolution and synthesises a Patterson map.
use std::sync::Arc;

use miller_arrays::config::{BinningStrategy, GriddingParams};
use miller_arrays::interfaces::{AnomalousFlag, ObservationKind};
use miller_arrays::miller::{MillerArray, MillerSet};
use miller_arrays::symmetries::CrystalSymmetry;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Reflection data walkthrough ===\n");

    // 1. The complete unique set to 3 A
    let symmetry = Arc::new(CrystalSymmetry::from_symbol(
        [30.0, 40.0, 50.0, 90.0, 90.0, 90.0],
        "P 21 21 21",
    )?);
    let unique = MillerSet::build(Arc::clone(&symmetry), AnomalousFlag::Merged, 3.0)?;
    println!("1. Complete set:\n{}\n", unique.comprehensive_summary()?);

    // 2. Every reflection measured once per P 1 image, with some noise
    let expanded = unique.expand_to_p1()?;
    let observed = unique.with_indices(expanded.indices().to_vec());
    let intensities: Vec<f64> = (0..observed.size())
        .map(|i| 100.0 + 5.0 * ((i * 7919) % 11) as f64)
        .collect();
    let sigmas = vec![5.0; observed.size()];
    let observations = MillerArray::from_real(observed, intensities, Some(sigmas))?
        .with_observation_kind(ObservationKind::Intensity);
    println!("2. {} observations", observations.size());

    // 3. Merge symmetry equivalents
    let merged = observations.merge_equivalents()?;
    let max_redundancy = merged.redundancies().iter().max().copied().unwrap_or(0);
    println!(
        "3. Merged to {} unique reflections (max redundancy {})\n",
        merged.array().size(),
        max_redundancy
    );

    // 4. Resolution shells
    let mut amplitudes = merged.array().f_sq_as_f()?;
    amplitudes.setup_binner(BinningStrategy::Bins(5), None, None)?;
    println!("4. Mean amplitude per shell:\n{}", amplitudes.mean_binned(false)?);

    // 5. Patterson map with the origin peak removed
    let params = GriddingParams::default();
    let patterson = amplitudes.patterson_map(&params, None, false, true)?;
    let statistics = patterson.statistics()?;
    println!(
        "5. Patterson map on grid {:?}: min {:.2}, max {:.2}, sigma {:.2}",
        patterson.n_real(),
        statistics.min,
        statistics.max,
        statistics.sigma
    );

    Ok(())
}
