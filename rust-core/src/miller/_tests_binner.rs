#[cfg(test)]
mod _tests_binner {
    use super::super::binner::{Binner, Binning};
    use super::super::index::MillerIndex;
    use crate::config::BinningStrategy;
    use crate::error::MillerError;
    use crate::interfaces::BinSlot;
    use crate::lattice::unit_cell::UnitCell;

    fn cubic() -> UnitCell {
        UnitCell::new([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]).unwrap()
    }

    fn four_indices() -> Vec<MillerIndex> {
        vec![
            MillerIndex::new(1, 0, 0),
            MillerIndex::new(1, 1, 0),
            MillerIndex::new(1, 1, 1),
            MillerIndex::new(2, 0, 0),
        ]
    }

    #[test]
    fn test_two_bins_cover_everything() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 2, &indices, None, None).unwrap();
        let binner = Binner::new(binning, &indices);
        assert_eq!(binner.n_too_coarse(), 0);
        assert_eq!(binner.n_too_fine(), 0);
        assert_eq!(binner.shell_counts().iter().sum::<usize>(), 4);
        assert_eq!(binner.shell_counts(), &[2, 2]);
        assert_eq!(binner.slot(0), BinSlot::Shell(0));
        assert_eq!(binner.slot(3), BinSlot::Shell(1));
    }

    #[test]
    fn test_explicit_window_routes_to_pseudo_shells() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 1, &indices, Some(9.0), Some(6.0)).unwrap();
        let binner = Binner::new(binning, &indices);
        assert_eq!(binner.n_too_coarse(), 1);
        assert_eq!(binner.n_too_fine(), 2);
        assert_eq!(binner.count(BinSlot::Shell(0)), 1);
        assert_eq!(binner.selection(BinSlot::TooCoarse), vec![true, false, false, false]);
        assert_eq!(binner.positions(BinSlot::TooFine), vec![2, 3]);
        let total: usize = binner.all_slots().iter().map(|s| binner.count(*s)).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_shells_ordered_low_to_high_resolution() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 2, &indices, None, None).unwrap();
        let (d_max_0, d_min_0) = binning.d_range(BinSlot::Shell(0));
        let (d_max_1, d_min_1) = binning.d_range(BinSlot::Shell(1));
        assert!(d_max_0.unwrap() > d_min_0.unwrap());
        assert!((d_min_0.unwrap() - d_max_1.unwrap()).abs() < 1e-12);
        assert!(d_max_1.unwrap() > d_min_1.unwrap());
        assert!(d_max_0.unwrap() >= 10.0);
        assert!(d_min_1.unwrap() <= 5.0);
    }

    #[test]
    fn test_limits_equal_reciprocal_volume() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 3, &indices, Some(10.0), Some(5.0)).unwrap();
        let volumes: Vec<f64> = binning.limits().iter().map(|x| x.powf(1.5)).collect();
        let step = volumes[1] - volumes[0];
        for w in volumes.windows(2) {
            assert!(((w[1] - w[0]) - step).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_range_rejected() {
        let indices = vec![MillerIndex::new(0, 0, 0)];
        assert!(Binning::new(&cubic(), 2, &indices, None, None).is_err());
        assert!(Binning::new(&cubic(), 0, &four_indices(), None, None).is_err());
    }

    #[test]
    fn test_interpolate_is_flat_outside_and_linear_inside() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 2, &indices, None, None).unwrap();
        let binner = Binner::new(binning, &indices);
        let values = binner.interpolate(&[1.0, 3.0], 2.0).unwrap();
        assert!((values[0] - 1.0).abs() < 1e-12);
        assert!((values[3] - 3.0).abs() < 1e-12);
        assert!(values[1] > 1.0 && values[1] < values[2]);
        assert!(values[2] < 3.0);
        assert!(matches!(
            binner.interpolate(&[1.0], 2.0),
            Err(MillerError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_interpolate_single_shell_is_constant() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 1, &indices, None, None).unwrap();
        let binner = Binner::new(binning, &indices);
        let values = binner.interpolate(&[7.0], 1.0).unwrap();
        assert!(values.iter().all(|v| (*v - 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_bin_legends() {
        let indices = four_indices();
        let binning = Binning::new(&cubic(), 2, &indices, None, None).unwrap();
        let binner = Binner::new(binning, &indices);
        assert!(binner.bin_legend(BinSlot::Shell(0)).starts_with("bin  1:"));
        assert!(binner.bin_legend(BinSlot::TooCoarse).starts_with("unused:"));
        let summary = binner.summary();
        assert_eq!(summary.lines().count(), 4);
    }

    #[test]
    fn test_binning_strategy() {
        assert_eq!(BinningStrategy::default().n_bins(1000).unwrap(), 8);
        assert_eq!(BinningStrategy::default().n_bins(4000).unwrap(), 20);
        assert_eq!(BinningStrategy::default().n_bins(3).unwrap(), 8);
        assert_eq!(BinningStrategy::ReflectionsPerBin(100).n_bins(250).unwrap(), 3);
        assert_eq!(BinningStrategy::Bins(2).n_bins(4).unwrap(), 2);
        assert!(BinningStrategy::Bins(0).n_bins(4).is_err());
        assert!(BinningStrategy::ReflectionsPerBin(100).n_bins(10).is_err());
    }
}
