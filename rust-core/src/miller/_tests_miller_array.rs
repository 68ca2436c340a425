#[cfg(test)]
mod _tests_miller_array {
    use super::super::index::MillerIndex;
    use super::super::miller_array::{MillerArray, MillerData};
    use super::super::miller_set::MillerSet;
    use crate::error::MillerError;
    use crate::interfaces::{AnomalousFlag, Hemisphere, ObservationKind, SortKey, ValueKind};
    use crate::symmetries::change_of_basis::ChangeOfBasis;
    use crate::symmetries::crystal_symmetry::CrystalSymmetry;
    use nalgebra::Matrix3;
    use num_complex::Complex64;
    use std::sync::Arc;

    fn idx(h: i32, k: i32, l: i32) -> MillerIndex {
        MillerIndex::new(h, k, l)
    }

    fn set(symbol: &str, indices: Vec<MillerIndex>, anomalous: AnomalousFlag) -> MillerSet {
        let parameters = match symbol {
            "P 1 21 1" => [10.0, 12.0, 14.0, 90.0, 100.0, 90.0],
            "P 21 21 21" => [10.0, 20.0, 30.0, 90.0, 90.0, 90.0],
            _ => [10.0, 10.0, 10.0, 90.0, 90.0, 90.0],
        };
        let symmetry = CrystalSymmetry::from_symbol(parameters, symbol).unwrap();
        MillerSet::new(Arc::new(symmetry), indices, anomalous)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn c_close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn test_construction_checks_lengths() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(0, 1, 0), idx(0, 0, 1)], AnomalousFlag::Merged);
        assert!(matches!(
            MillerArray::from_real(s.clone(), vec![1.0, 2.0], None),
            Err(MillerError::LengthMismatch { .. })
        ));
        assert!(matches!(
            MillerArray::from_real(s.clone(), vec![1.0, 2.0, 3.0], Some(vec![0.1])),
            Err(MillerError::LengthMismatch { .. })
        ));
        let array = MillerArray::from_real(s, vec![1.0, 2.0, 3.0], None)
            .unwrap()
            .with_observation_kind(ObservationKind::Amplitude)
            .with_info("test:F");
        assert!(array.is_real());
        assert!(array.is_amplitude_array());
        assert_eq!(array.info(), Some("test:F"));
        assert_eq!(array.value_kind(), ValueKind::Real);
    }

    #[test]
    fn test_f_sq_as_f() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(0, 1, 0), idx(0, 0, 1)], AnomalousFlag::Merged);
        let intensities = MillerArray::from_real(s, vec![4.0, -1.0, 0.0], Some(vec![0.4, 1.0, 0.25]))
            .unwrap()
            .with_observation_kind(ObservationKind::Intensity);
        let amplitudes = intensities.f_sq_as_f().unwrap();
        assert_eq!(amplitudes.observation_kind(), ObservationKind::Amplitude);
        assert_eq!(amplitudes.data(), &MillerData::Real(vec![2.0, 0.0, 0.0]));
        let sigmas = amplitudes.sigmas().unwrap();
        assert!(close(sigmas[0], 0.1));
        assert!(close(sigmas[1], 1.0));
        assert!(close(sigmas[2], 0.5));

        assert!(matches!(
            amplitudes.f_sq_as_f(),
            Err(MillerError::ObservationKindMismatch { .. })
        ));
        // already amplitudes: unchanged
        assert_eq!(amplitudes.as_amplitude_array().unwrap(), amplitudes);
    }

    #[test]
    fn test_f_sq_as_f_clips_tiny_intensities() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(0, 1, 0)], AnomalousFlag::Merged);
        let intensities = MillerArray::from_real(s, vec![1e-9, 1e-4], Some(vec![1.0, 1e-4]))
            .unwrap()
            .with_observation_kind(ObservationKind::Intensity);
        let amplitudes = intensities.f_sq_as_f().unwrap();
        assert_eq!(amplitudes.data(), &MillerData::Real(vec![0.0, 1e-4f64.sqrt()]));
        let sigmas = amplitudes.sigmas().unwrap();
        assert!(close(sigmas[0], 1.0));
        assert!(close(sigmas[1], 1e-4 / (2.0 * 1e-2)));
    }

    #[test]
    fn test_f_as_f_sq() {
        let s = set("P 1", vec![idx(1, 0, 0)], AnomalousFlag::Merged);
        let amplitudes = MillerArray::from_real(s, vec![2.0], Some(vec![0.1]))
            .unwrap()
            .with_observation_kind(ObservationKind::Amplitude);
        let intensities = amplitudes.f_as_f_sq().unwrap();
        assert!(intensities.is_intensity_array());
        assert_eq!(intensities.data(), &MillerData::Real(vec![4.0]));
        assert!(close(intensities.sigmas().unwrap()[0], 0.4));
        assert!(intensities.f_as_f_sq().is_err());
    }

    #[test]
    fn test_selection_keeps_data_aligned() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(2, 0, 0), idx(3, 0, 0)], AnomalousFlag::Merged);
        let array = MillerArray::from_real(s, vec![10.0, 20.0, 30.0], Some(vec![1.0, 2.0, 3.0])).unwrap();
        let kept = array.apply_selection(&[false, true, true], false).unwrap();
        assert_eq!(kept.indices(), &[idx(2, 0, 0), idx(3, 0, 0)]);
        assert_eq!(kept.data(), &MillerData::Real(vec![20.0, 30.0]));
        assert_eq!(kept.sigmas(), Some(&[2.0, 3.0][..]));
        let picked = array.select(&[2, 0]).unwrap();
        assert_eq!(picked.indices(), &[idx(3, 0, 0), idx(1, 0, 0)]);
        assert_eq!(picked.data(), &MillerData::Real(vec![30.0, 10.0]));
        assert!(array.apply_selection(&[true], false).is_err());
    }

    #[test]
    fn test_sorting() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(3, 0, 0), idx(2, 0, 0)], AnomalousFlag::Merged);
        let array = MillerArray::from_real(s, vec![5.0, -9.0, 7.0], None).unwrap();
        let by_data = array.sort(SortKey::Data, false).unwrap();
        assert_eq!(by_data.data(), &MillerData::Real(vec![7.0, 5.0, -9.0]));
        let by_abs = array.sort(SortKey::Abs, false).unwrap();
        assert_eq!(by_abs.data(), &MillerData::Real(vec![-9.0, 7.0, 5.0]));
        let by_resolution = array.sort(SortKey::Resolution, false).unwrap();
        assert_eq!(by_resolution.indices(), &[idx(1, 0, 0), idx(2, 0, 0), idx(3, 0, 0)]);
        assert_eq!(by_resolution.data(), &MillerData::Real(vec![5.0, 7.0, -9.0]));
    }

    #[test]
    fn test_sigma_filter() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(2, 0, 0), idx(3, 0, 0)], AnomalousFlag::Merged);
        let array = MillerArray::from_real(s.clone(), vec![1.0, 5.0, -6.0], Some(vec![1.0; 3])).unwrap();
        assert_eq!(array.sigma_filter(2.0, false).unwrap().size(), 2);
        assert_eq!(
            array.sigma_filter(2.0, true).unwrap().data(),
            &MillerData::Real(vec![1.0])
        );
        let bare = MillerArray::from_real(s, vec![1.0, 5.0, -6.0], None).unwrap();
        assert!(matches!(
            bare.sigma_filter(2.0, false),
            Err(MillerError::MissingSigmas { .. })
        ));
    }

    #[test]
    fn test_sigma_filter_rejects_non_positive_sigmas() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(2, 0, 0)], AnomalousFlag::Merged);
        let array = MillerArray::from_real(s.clone(), vec![1.0, 2.0], Some(vec![0.0, -1.0])).unwrap();
        assert!(matches!(
            array.sigma_filter(3.0, false),
            Err(MillerError::NonPositiveSigma { position: 0 })
        ));
        let negative = MillerArray::from_real(s.clone(), vec![1.0, 2.0], Some(vec![1.0, -1.0])).unwrap();
        assert!(matches!(
            negative.sigma_filter(3.0, true),
            Err(MillerError::NonPositiveSigma { position: 1 })
        ));
        let infinite = MillerArray::from_real(s, vec![1.0, 2.0], Some(vec![f64::INFINITY, 1.0])).unwrap();
        assert!(infinite.sigma_filter(3.0, false).is_err());
    }

    #[test]
    fn test_eliminate_sys_absent_and_resolution_filter() {
        let s = set("P 21 21 21", vec![idx(1, 0, 0), idx(2, 0, 0), idx(1, 2, 3)], AnomalousFlag::Merged);
        let array = MillerArray::from_real(s, vec![1.0, 2.0, 3.0], None).unwrap();
        let present = array.eliminate_sys_absent().unwrap();
        assert_eq!(present.data(), &MillerData::Real(vec![2.0, 3.0]));
        let low = array.resolution_filter(None, Some(5.5), false).unwrap();
        assert_eq!(low.indices(), &[idx(1, 0, 0), idx(1, 2, 3)]);
    }

    #[test]
    fn test_complex_map_to_asu_shifts_phase() {
        let s = set("P 1 21 1", vec![idx(-1, 1, -1)], AnomalousFlag::Merged);
        let array = MillerArray::from_complex(s, vec![Complex64::new(1.0, 1.0)]).unwrap();
        let asu = array.map_to_asu().unwrap();
        assert_eq!(asu.indices(), &[idx(1, 1, 1)]);
        let data = asu.complex_data("test").unwrap();
        assert!(c_close(data[0], Complex64::new(-1.0, -1.0)));
    }

    #[test]
    fn test_complex_expand_to_p1() {
        let s = set("P 1 21 1", vec![idx(1, 1, 1)], AnomalousFlag::Merged);
        let f = Complex64::new(1.0, 2.0);
        let array = MillerArray::from_complex(s, vec![f]).unwrap();
        let p1 = array.expand_to_p1().unwrap();
        assert_eq!(p1.size(), 2);
        assert_eq!(p1.set().space_group().order_z(), 1);
        let data = p1.complex_data("test").unwrap();
        let at = |h: MillerIndex| {
            let position = p1.indices().iter().position(|x| *x == h).unwrap();
            data[position]
        };
        assert!(c_close(at(idx(1, 1, 1)), f));
        // F(-1,1,-1) = -F(1,1,1), stored as its Friedel mate (1,-1,1)
        assert!(c_close(at(idx(1, -1, 1)), Complex64::new(-1.0, 2.0)));
    }

    #[test]
    fn test_expand_to_p1_carries_sigmas() {
        let s = set("P 21 21 21", vec![idx(1, 2, 3), idx(2, 0, 0)], AnomalousFlag::Merged);
        let array = MillerArray::from_real(s, vec![3.0, 4.0], Some(vec![0.3, 0.4])).unwrap();
        let p1 = array.expand_to_p1().unwrap();
        assert_eq!(p1.size(), 5);
        let data = p1.real_data("test").unwrap();
        assert_eq!(data.iter().filter(|x| **x == 3.0).count(), 4);
        assert_eq!(p1.sigmas().unwrap().iter().filter(|s| **s == 0.4).count(), 1);
    }

    #[test]
    fn test_change_basis_rejects_complex() {
        let cb = ChangeOfBasis::new(Matrix3::new(0, 1, 0, 1, 0, 0, 0, 0, -1)).unwrap();
        let s = set("P 21 21 21", vec![idx(1, 2, 3)], AnomalousFlag::Merged);
        let complex = MillerArray::from_complex(s.clone(), vec![Complex64::new(1.0, 0.0)]).unwrap();
        assert!(matches!(
            complex.change_basis(&cb),
            Err(MillerError::ValueKindMismatch { .. })
        ));
        let real = MillerArray::from_real(s, vec![7.0], None).unwrap();
        let changed = real.change_basis(&cb).unwrap();
        assert_eq!(changed.indices(), &[idx(2, 1, -3)]);
        assert_eq!(changed.data(), &MillerData::Real(vec![7.0]));
    }

    #[test]
    fn test_amplitudes_and_phases() {
        let s = set("P 1", vec![idx(1, 0, 0), idx(0, 1, 0)], AnomalousFlag::Merged);
        let array =
            MillerArray::from_complex(s, vec![Complex64::new(3.0, 4.0), Complex64::new(0.0, 2.0)]).unwrap();
        let amplitudes = array.amplitudes().unwrap();
        assert!(amplitudes.is_amplitude_array());
        assert_eq!(amplitudes.data(), &MillerData::Real(vec![5.0, 2.0]));
        let phases = array.phases(true).unwrap();
        let values = phases.real_data("test").unwrap();
        assert!(close(values[1], 90.0));
        assert!(amplitudes.phases(false).is_err());
    }

    #[test]
    fn test_patterson_symmetry_of_complex_data() {
        let s = set("P 21 21 21", vec![idx(1, 2, 3)], AnomalousFlag::Merged);
        let array = MillerArray::from_complex(s, vec![Complex64::new(3.0, 4.0)]).unwrap();
        let patterson = array.patterson_symmetry().unwrap();
        assert!(patterson.set().is_patterson_symmetry());
        assert!(patterson.is_amplitude_array());
        assert_eq!(patterson.data(), &MillerData::Real(vec![5.0]));
    }

    #[test]
    fn test_add_array_matches_indices() {
        let a = MillerArray::from_real(
            set("P 1", vec![idx(1, 0, 0), idx(2, 0, 0)], AnomalousFlag::Merged),
            vec![1.0, 2.0],
            Some(vec![1.0, 3.0]),
        )
        .unwrap();
        let b = MillerArray::from_real(
            set("P 1", vec![idx(2, 0, 0), idx(3, 0, 0)], AnomalousFlag::Merged),
            vec![10.0, 20.0],
            Some(vec![4.0, 1.0]),
        )
        .unwrap();
        let sum = a.add_array(&b).unwrap();
        assert_eq!(sum.indices(), &[idx(2, 0, 0)]);
        assert_eq!(sum.data(), &MillerData::Real(vec![12.0]));
        assert!(close(sum.sigmas().unwrap()[0], 5.0));

        let complex = MillerArray::from_complex(
            set("P 1", vec![idx(2, 0, 0)], AnomalousFlag::Merged),
            vec![Complex64::new(1.0, 0.0)],
        )
        .unwrap();
        assert!(matches!(
            a.add_array(&complex),
            Err(MillerError::ValueKindMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_add_keeps_sigmas() {
        let array = MillerArray::from_real(
            set("P 1", vec![idx(1, 0, 0)], AnomalousFlag::Merged),
            vec![1.5],
            Some(vec![0.5]),
        )
        .unwrap();
        let shifted = &array + 2.0;
        assert_eq!(shifted.data(), &MillerData::Real(vec![3.5]));
        assert_eq!(shifted.sigmas(), Some(&[0.5][..]));
    }

    #[test]
    fn test_adopt_set_reorders() {
        let array = MillerArray::from_real(
            set("P 1", vec![idx(1, 0, 0), idx(0, 1, 0)], AnomalousFlag::Merged),
            vec![1.0, 2.0],
            None,
        )
        .unwrap();
        let target = array.set().with_indices(vec![idx(0, 1, 0), idx(1, 0, 0)]);
        let adopted = array.adopt_set(&target).unwrap();
        assert_eq!(adopted.indices(), target.indices());
        assert_eq!(adopted.data(), &MillerData::Real(vec![2.0, 1.0]));

        let partial = array.set().with_indices(vec![idx(0, 1, 0), idx(0, 0, 1)]);
        assert!(array.adopt_set(&partial).is_err());
        let distinct = target.with_anomalous_flag(AnomalousFlag::AnomalousDistinct);
        assert!(matches!(
            array.adopt_set(&distinct),
            Err(MillerError::AnomalousFlagMismatch { .. })
        ));
    }

    #[test]
    fn test_common_sets() {
        let a = MillerArray::from_real(
            set("P 1", vec![idx(1, 0, 0), idx(0, 1, 0), idx(0, 0, 1)], AnomalousFlag::Merged),
            vec![1.0, 2.0, 3.0],
            None,
        )
        .unwrap();
        let b = MillerArray::from_real(
            set("P 1", vec![idx(0, 0, 1), idx(2, 0, 0), idx(1, 0, 0)], AnomalousFlag::Merged),
            vec![30.0, 40.0, 10.0],
            None,
        )
        .unwrap();
        let (ca, cb) = a.common_sets(&b).unwrap();
        assert_eq!(ca.indices(), cb.indices());
        assert_eq!(ca.indices(), &[idx(1, 0, 0), idx(0, 0, 1)]);
        assert_eq!(cb.data(), &MillerData::Real(vec![10.0, 30.0]));
        assert_eq!(a.common_set(&b).unwrap().size(), 2);

        let other_group = MillerArray::from_real(
            set("P 21 21 21", vec![idx(2, 0, 0)], AnomalousFlag::Merged),
            vec![1.0],
            None,
        )
        .unwrap();
        assert!(matches!(
            a.common_sets(&other_group),
            Err(MillerError::IncompatibleSymmetry(_))
        ));
    }

    #[test]
    fn test_as_anomalous_adds_conjugate_mates() {
        let array = MillerArray::from_complex(
            set("P 1", vec![idx(1, 2, 3), idx(2, 0, 0)], AnomalousFlag::Merged),
            vec![Complex64::new(1.0, 1.0), Complex64::new(2.0, 0.0)],
        )
        .unwrap();
        let anomalous = array.as_anomalous().unwrap();
        assert_eq!(anomalous.anomalous_flag(), AnomalousFlag::AnomalousDistinct);
        assert_eq!(
            anomalous.indices(),
            &[idx(1, 2, 3), idx(2, 0, 0), idx(-1, -2, -3), idx(-2, 0, 0)]
        );
        let data = anomalous.complex_data("test").unwrap();
        assert!(c_close(data[2], Complex64::new(1.0, -1.0)));

        let unset = MillerArray::from_real(
            set("P 1", vec![idx(1, 0, 0)], AnomalousFlag::Unset),
            vec![1.0],
            None,
        )
        .unwrap();
        assert!(matches!(
            unset.as_anomalous(),
            Err(MillerError::UnresolvedAnomalousFlag { .. })
        ));
    }

    #[test]
    fn test_anomalous_differences() {
        let array = MillerArray::from_real(
            set("P 1", vec![idx(-1, -2, -3), idx(1, 2, 3), idx(3, 0, 0)], AnomalousFlag::AnomalousDistinct),
            vec![3.0, 5.0, 9.0],
            Some(vec![4.0, 3.0, 1.0]),
        )
        .unwrap()
        .with_observation_kind(ObservationKind::Amplitude);
        let differences = array.anomalous_differences().unwrap();
        assert_eq!(differences.anomalous_flag(), AnomalousFlag::Merged);
        assert_eq!(differences.indices(), &[idx(1, 2, 3)]);
        assert_eq!(differences.data(), &MillerData::Real(vec![2.0]));
        assert!(close(differences.sigmas().unwrap()[0], 5.0));

        let (plus, minus) = array.hemispheres().unwrap();
        assert_eq!(plus.indices(), &[idx(1, 2, 3)]);
        assert_eq!(minus.indices(), &[idx(-1, -2, -3)]);
        assert_eq!(array.hemisphere(Hemisphere::Minus).unwrap(), minus);

        let merged = MillerArray::from_real(
            set("P 1", vec![idx(1, 2, 3)], AnomalousFlag::Merged),
            vec![1.0],
            None,
        )
        .unwrap();
        assert!(matches!(
            merged.anomalous_differences(),
            Err(MillerError::AnomalousFlagMismatch { .. })
        ));
    }

    #[test]
    fn test_deep_copy_and_display() {
        let array = MillerArray::from_real(
            set("P 1", vec![idx(1, 0, 0)], AnomalousFlag::Merged),
            vec![1.0],
            None,
        )
        .unwrap()
        .with_observation_kind(ObservationKind::Intensity);
        let copy = array.deep_copy();
        assert_eq!(copy, array);
        assert!(!Arc::ptr_eq(copy.symmetry(), array.symmetry()));
        let text = array.to_string();
        assert!(text.contains("Observation type: Intensity"));
        assert!(text.contains("Number of Miller indices: 1"));
        assert_eq!(array.show_array().lines().count(), 1);
    }
}
