#[cfg(test)]
mod _tests_fft_map {
    use super::super::fft_map::{structure_factors_from_map, FftMap, MapInput};
    use super::super::gridding::CrystalGridding;
    use crate::config::GriddingParams;
    use crate::error::MillerError;
    use crate::interfaces::{AnomalousFlag, ObservationKind};
    use crate::miller::miller_array::MillerArray;
    use crate::miller::miller_set::MillerSet;
    use crate::symmetries::crystal_symmetry::CrystalSymmetry;
    use num_complex::Complex64;
    use std::sync::Arc;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn symmetry(symbol: &str) -> Arc<CrystalSymmetry> {
        Arc::new(CrystalSymmetry::from_symbol([10.0, 10.0, 10.0, 90.0, 90.0, 90.0], symbol).unwrap())
    }

    fn coefficients(set: MillerSet) -> MillerArray {
        let data = (0..set.size())
            .map(|i| Complex64::new(1.0 + (i % 5) as f64, (i % 3) as f64 - 1.0))
            .collect();
        MillerArray::from_complex(set, data).unwrap()
    }

    fn amplitudes(set: MillerSet) -> MillerArray {
        let data = (0..set.size()).map(|i| 1.0 + (i % 4) as f64).collect();
        MillerArray::from_real(set, data, None)
            .unwrap()
            .with_observation_kind(ObservationKind::Amplitude)
    }

    fn assert_scaled(recovered: &MillerArray, original: &MillerArray, n: f64) {
        let a = recovered.complex_data("test").unwrap();
        let b = original.complex_data("test").unwrap();
        assert_eq!(recovered.indices(), original.indices());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y * n).norm() < 1e-6, "{x} vs {}", y * n);
        }
    }

    #[test]
    fn test_merged_round_trip() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::Merged, 3.0).unwrap();
        let f = coefficients(set.clone());
        let map = f.fft_map(&GriddingParams::default(), None).unwrap();
        assert_eq!(map.n_real(), [10, 10, 10]);
        assert!(map.real_map().is_padded());
        assert!(matches!(
            map.complex_map(),
            Err(MillerError::AnomalousFlagMismatch { .. })
        ));
        let n = 1000.0;
        let padded = structure_factors_from_map(&set, MapInput::Real(&map.real_map())).unwrap();
        assert_scaled(&padded, &f, n);
        let unpadded = structure_factors_from_map(&set, MapInput::Real(&map.real_map_unpadded())).unwrap();
        assert_scaled(&unpadded, &f, n);
    }

    #[test]
    fn test_anomalous_round_trip() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::AnomalousDistinct, 3.0).unwrap();
        let f = coefficients(set.clone());
        let map = f.fft_map(&GriddingParams::default(), None).unwrap();
        let complex = map.complex_map().unwrap();
        let recovered = structure_factors_from_map(&set, MapInput::Complex(complex)).unwrap();
        assert_scaled(&recovered, &f, 1000.0);

        let mut map = map;
        assert!(matches!(
            map.apply_sigma_scaling(),
            Err(MillerError::AnomalousFlagMismatch { .. })
        ));
    }

    #[test]
    fn test_symmetry_expansion_round_trip() {
        init_logging();
        let complete = MillerSet::build(symmetry("P 21 21 21"), AnomalousFlag::Merged, 3.0).unwrap();
        let acentric = complete.apply_selection(&complete.centric_flags(), true).unwrap();
        assert!(!acentric.is_empty());
        let f = coefficients(acentric.clone());
        let map = f.fft_map(&GriddingParams::default(), None).unwrap();
        assert_eq!(map.n_real(), [10, 10, 10]);
        let recovered = structure_factors_from_map(&acentric, MapInput::Real(&map.real_map())).unwrap();
        assert_scaled(&recovered, &f, 1000.0);

        // symmetry mates carry the phase-shifted coefficients
        let p1 = f.expand_to_p1().unwrap();
        let from_map = structure_factors_from_map(p1.set(), MapInput::Real(&map.real_map())).unwrap();
        assert_scaled(&from_map, &p1, 1000.0);
    }

    #[test]
    fn test_f000_sets_map_mean() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::Merged, 3.0).unwrap();
        let f = coefficients(set);
        let map = f.fft_map(&GriddingParams::default(), Some(Complex64::new(5.0, 0.0))).unwrap();
        let statistics = map.statistics().unwrap();
        assert!((statistics.mean - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_sigma_scaling() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::Merged, 3.0).unwrap();
        let mut map = coefficients(set).fft_map(&GriddingParams::default(), None).unwrap();
        assert!(map.statistics().unwrap().sigma > 1.0);
        map.apply_sigma_scaling().unwrap();
        assert!((map.statistics().unwrap().sigma - 1.0).abs() < 1e-9);
        assert!((map.real_map_unpadded().statistics().unwrap().sigma - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_coefficients() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::Merged, 3.0).unwrap();
        let real = amplitudes(set.clone());
        assert!(matches!(
            real.fft_map(&GriddingParams::default(), None),
            Err(MillerError::ValueKindMismatch { .. })
        ));
        let unset = coefficients(set.with_anomalous_flag(AnomalousFlag::Unset));
        assert!(matches!(
            unset.fft_map(&GriddingParams::default(), None),
            Err(MillerError::UnresolvedAnomalousFlag { .. })
        ));

        let coarse = CrystalGridding::new(symmetry("P 1"), 5.0, &GriddingParams::default(), None).unwrap();
        assert_eq!(coarse.n_real(), [6, 6, 6]);
        assert!(matches!(
            FftMap::new(coarse, &coefficients(set.clone()), None),
            Err(MillerError::InvalidArgument(_))
        ));

        let other = CrystalGridding::new(symmetry("P 21 21 21"), 3.0, &GriddingParams::default(), None).unwrap();
        assert!(matches!(
            FftMap::new(other, &coefficients(set), None),
            Err(MillerError::IncompatibleSymmetry(_))
        ));
    }

    #[test]
    fn test_patterson_peak_at_origin() {
        init_logging();
        let set = MillerSet::build(symmetry("P 21 21 21"), AnomalousFlag::Merged, 3.0).unwrap();
        let f = amplitudes(set);
        let patterson = f.patterson_map(&GriddingParams::default(), None, false, false).unwrap();
        assert!(patterson.gridding().space_group().is_patterson_group());
        let map = patterson.real_map_unpadded();
        assert_eq!(map.argmax(), Some([0, 0, 0]));

        let with_f000 = f.patterson_map(&GriddingParams::default(), Some(2.0), false, false).unwrap();
        assert!((with_f000.statistics().unwrap().mean - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_patterson_origin_peak_removal() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::Merged, 3.0).unwrap();
        let f = amplitudes(set);
        let plain = f.patterson_map(&GriddingParams::default(), None, false, false).unwrap();
        let removed = f.patterson_map(&GriddingParams::default(), None, false, true).unwrap();
        let origin_plain = plain.real_map_unpadded().get(0, 0, 0);
        let origin_removed = removed.real_map_unpadded().get(0, 0, 0);
        assert!(origin_plain > 1.0);
        assert!(origin_removed.abs() < 1e-9 * origin_plain);

        let sharpened = f.patterson_map(&GriddingParams::default(), None, true, true).unwrap();
        assert_eq!(sharpened.n_real(), plain.n_real());
    }

    #[test]
    fn test_patterson_preconditions() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::AnomalousDistinct, 3.0).unwrap();
        assert!(matches!(
            amplitudes(set.clone()).patterson_map(&GriddingParams::default(), None, false, false),
            Err(MillerError::AnomalousFlagMismatch { .. })
        ));
        let merged = set.with_anomalous_flag(AnomalousFlag::Merged).map_to_asu();
        let intensities = amplitudes(merged).with_observation_kind(ObservationKind::Intensity);
        assert!(matches!(
            intensities.patterson_map(&GriddingParams::default(), None, false, false),
            Err(MillerError::ObservationKindMismatch { .. })
        ));
    }

    #[test]
    fn test_complex_patterson_input_uses_amplitudes() {
        init_logging();
        let set = MillerSet::build(symmetry("P 1"), AnomalousFlag::Merged, 3.0).unwrap();
        let f = coefficients(set.clone());
        let from_complex = f.patterson_map(&GriddingParams::default(), None, false, false).unwrap();
        let magnitudes = f.amplitudes().unwrap();
        let from_real = magnitudes.patterson_map(&GriddingParams::default(), None, false, false).unwrap();
        for (a, b) in from_complex.real_map().data().iter().zip(from_real.real_map().data()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
