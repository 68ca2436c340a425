#[cfg(test)]
mod _tests_fft {
    use super::super::fft::{FourierTransform, RustFftProvider};
    use super::super::grid::{grid_size, ComplexGrid, RealGrid};
    use num_complex::Complex64;

    fn sample(i: usize) -> f64 {
        ((i * 37 + 11) % 17) as f64 - 8.0
    }

    #[test]
    fn test_delta_transforms_to_constant() {
        let mut provider = RustFftProvider::new();
        let mut grid = ComplexGrid::zeros([4, 3, 5]);
        grid.set(0, 0, 0, Complex64::new(1.0, 0.0));
        provider.forward(&mut grid).unwrap();
        for value in grid.data() {
            assert!((value - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_forward_backward_scales_by_size() {
        let mut provider = RustFftProvider::new();
        let shape = [3, 4, 6];
        let values: Vec<Complex64> = (0..grid_size(shape))
            .map(|i| Complex64::new(sample(i), sample(i + 5)))
            .collect();
        let original = ComplexGrid::from_values(shape, values).unwrap();
        let mut grid = original.clone();
        provider.forward(&mut grid).unwrap();
        provider.backward(&mut grid).unwrap();
        let n = grid_size(shape) as f64;
        for (a, b) in grid.data().iter().zip(original.data()) {
            assert!((a - b * n).norm() < 1e-9);
        }
    }

    #[test]
    fn test_phase_convention() {
        // A plane wave exp(+2πi x/n0) lands on h = (1, 0, 0) under the forward transform
        let mut provider = RustFftProvider::new();
        let shape = [8, 2, 2];
        let mut grid = ComplexGrid::zeros(shape);
        for i in 0..8 {
            for j in 0..2 {
                for k in 0..2 {
                    let phase = 2.0 * std::f64::consts::PI * i as f64 / 8.0;
                    grid.set(i, j, k, Complex64::from_polar(1.0, phase));
                }
            }
        }
        provider.forward(&mut grid).unwrap();
        assert!((grid.get(1, 0, 0).re - 32.0).abs() < 1e-9);
        assert!(grid.get(7, 0, 0).norm() < 1e-9);
    }

    #[test]
    fn test_real_transform_matches_complex_transform() {
        let mut provider = RustFftProvider::new();
        let shape = [4, 5, 6];
        let values: Vec<f64> = (0..grid_size(shape)).map(sample).collect();
        let real = RealGrid::from_values(shape, values.clone()).unwrap();
        let half = provider.forward_real(&real).unwrap();
        assert_eq!(half.shape(), [4, 5, 4]);

        let mut full = ComplexGrid::from_values(shape, values.iter().map(|x| Complex64::new(*x, 0.0)).collect())
            .unwrap();
        provider.forward(&mut full).unwrap();
        for i in 0..4 {
            for j in 0..5 {
                for k in 0..4 {
                    assert!((half.get(i, j, k) - full.get(i, j, k)).norm() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_hermitian_backward_inverts_real_forward() {
        let mut provider = RustFftProvider::new();
        for shape in [[4, 5, 6], [3, 3, 7]] {
            let values: Vec<f64> = (0..grid_size(shape)).map(sample).collect();
            let real = RealGrid::from_values(shape, values.clone()).unwrap();
            let half = provider.forward_real(&real).unwrap();
            let back = provider.backward_hermitian(&half, shape).unwrap();
            assert!(back.is_padded());
            assert_eq!(back.storage_shape()[2], 2 * (shape[2] / 2 + 1));
            let n = grid_size(shape) as f64;
            for (a, b) in back.values().zip(&values) {
                assert!((a - b * n).abs() < 1e-9);
            }
            // padded input transforms the same as unpadded input
            let again = provider.forward_real(&back).unwrap();
            for (a, b) in again.data().iter().zip(half.data()) {
                assert!((a - b * n).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_shape_checks() {
        let mut provider = RustFftProvider::new();
        let half = ComplexGrid::zeros([4, 4, 4]);
        assert!(provider.backward_hermitian(&half, [4, 4, 4]).is_err());
        let mut empty = ComplexGrid::zeros([0, 2, 2]);
        assert!(provider.forward(&mut empty).is_err());
    }

    #[test]
    fn test_grid_deserialization_checks_lengths() {
        let mut real = RealGrid::zeros_padded([2, 2, 3]);
        real.set(1, 0, 2, 4.5);
        let json = serde_json::to_string(&real).unwrap();
        let restored: RealGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, real);

        let short = r#"{"focus":[2,2,2],"storage":[2,2,2],"data":[0.0,1.0,2.0]}"#;
        assert!(serde_json::from_str::<RealGrid>(short).is_err());
        let bad_storage = r#"{"focus":[1,1,2],"storage":[1,1,3],"data":[0.0,1.0,2.0]}"#;
        assert!(serde_json::from_str::<RealGrid>(bad_storage).is_err());

        let complex = ComplexGrid::zeros([1, 2, 2]);
        let json = serde_json::to_string(&complex).unwrap();
        let restored: ComplexGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, complex);
        let short = r#"{"shape":[1,2,2],"data":[[0.0,0.0],[1.0,0.0]]}"#;
        assert!(serde_json::from_str::<ComplexGrid>(short).is_err());
    }
}
