use criterion::{criterion_group, criterion_main, Criterion};
use num_complex::Complex64;
use std::hint::black_box;
use std::sync::Arc;
use miller_arrays::config::{BinningStrategy, GriddingParams};
use miller_arrays::interfaces::{AnomalousFlag, ObservationKind};
use miller_arrays::miller::{MillerArray, MillerSet};
use miller_arrays::symmetries::CrystalSymmetry;

fn orthorhombic() -> Arc<CrystalSymmetry> {
    Arc::new(
        CrystalSymmetry::from_symbol([40.0, 50.0, 60.0, 90.0, 90.0, 90.0], "P 21 21 21")
            .expect("valid symmetry"),
    )
}

/// Merging, binning and map synthesis on a complete P 21 21 21 data set at 2.5 A.
/// Redundant observations come from expanding the unique set to P 1 and keeping
/// the original symmetry, so every unique reflection is observed up to four times.
fn bench_reflection_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("reflection_pipeline");
    group.sample_size(20);

    let symmetry = orthorhombic();
    let unique = MillerSet::build(Arc::clone(&symmetry), AnomalousFlag::Merged, 2.5)
        .expect("complete set");
    let expanded = unique.expand_to_p1().expect("P 1 expansion");
    let redundant = unique.with_indices(expanded.indices().to_vec());
    let intensities: Vec<f64> = (0..redundant.size()).map(|i| 10.0 + (i % 17) as f64).collect();
    let sigmas = vec![1.0; redundant.size()];
    let observations = MillerArray::from_real(redundant, intensities, Some(sigmas))
        .expect("observations")
        .with_observation_kind(ObservationKind::Intensity);

    group.bench_function("complete_set_2.5A", |b| {
        b.iter(|| {
            MillerSet::build(black_box(Arc::clone(&symmetry)), AnomalousFlag::Merged, black_box(2.5))
        })
    });

    group.bench_function("map_to_asu", |b| {
        b.iter(|| black_box(&observations).map_to_asu())
    });

    group.bench_function("merge_equivalents", |b| {
        b.iter(|| black_box(&observations).merge_equivalents())
    });

    let merged = observations
        .merge_equivalents()
        .expect("merge")
        .array()
        .clone();

    group.bench_function("setup_binner_auto", |b| {
        b.iter(|| {
            let mut array = merged.clone();
            array.setup_binner(black_box(BinningStrategy::default()), None, None)
        })
    });

    let coefficients = MillerArray::from_complex(
        merged.set().clone(),
        (0..merged.size())
            .map(|i| Complex64::from_polar(1.0 + (i % 7) as f64, i as f64 * 0.37))
            .collect(),
    )
    .expect("coefficients");
    let params = GriddingParams::default();

    group.bench_function("fft_map", |b| {
        b.iter(|| black_box(&coefficients).fft_map(black_box(&params), None))
    });

    let amplitudes = merged.f_sq_as_f().expect("amplitudes");
    group.bench_function("patterson_map", |b| {
        b.iter(|| black_box(&amplitudes).patterson_map(black_box(&params), None, false, true))
    });

    group.finish();
}

criterion_group!(benches, bench_reflection_pipeline);
criterion_main!(benches);
