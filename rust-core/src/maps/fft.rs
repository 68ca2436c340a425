use log::debug;
use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

use crate::error::MillerError;
use crate::maps::grid::{grid_size, half_complex_shape, ComplexGrid, GridShape, RealGrid};
use crate::Result;

/// Three-dimensional discrete Fourier transforms between grids and coefficients.
///
/// All transforms are unnormalised: forward uses exp(-2πi h·x), backward exp(+2πi h·x),
/// so a forward transform followed by a backward one multiplies by the grid size.
pub trait FourierTransform {
    fn forward(&mut self, grid: &mut ComplexGrid) -> Result<()>;

    fn backward(&mut self, grid: &mut ComplexGrid) -> Result<()>;

    /// Real map (padded or not) to its half-complex transform `(n0, n1, n2/2 + 1)`.
    fn forward_real(&mut self, map: &RealGrid) -> Result<ComplexGrid>;

    /// Half-complex coefficients of a Hermitian transform to a padded real map.
    fn backward_hermitian(&mut self, coefficients: &ComplexGrid, n_real: GridShape) -> Result<RealGrid>;
}

/// Transform provider built on `rustfft`, caching plans across calls.
pub struct RustFftProvider {
    planner: FftPlanner<f64>,
}

impl Default for RustFftProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RustFftProvider {
    pub fn new() -> Self {
        RustFftProvider {
            planner: FftPlanner::new(),
        }
    }

    fn plan(&mut self, len: usize, direction: FftDirection) -> Arc<dyn Fft<f64>> {
        self.planner.plan_fft(len, direction)
    }

    /// Transform every line of `data` running along `axis`.
    fn transform_axis(
        &mut self,
        data: &mut [Complex64],
        shape: GridShape,
        axis: usize,
        direction: FftDirection,
    ) {
        let n = shape[axis];
        let fft = self.plan(n, direction);
        let stride: usize = shape[axis + 1..].iter().product();
        if stride == 1 {
            fft.process(data);
            return;
        }
        let outer: usize = shape[..axis].iter().product();
        let mut lines = Vec::with_capacity(data.len());
        for o in 0..outer {
            for r in 0..stride {
                let base = o * n * stride + r;
                lines.extend((0..n).map(|t| data[base + t * stride]));
            }
        }
        fft.process(&mut lines);
        let mut line = lines.chunks(n);
        for o in 0..outer {
            for r in 0..stride {
                let base = o * n * stride + r;
                if let Some(values) = line.next() {
                    for (t, value) in values.iter().enumerate() {
                        data[base + t * stride] = *value;
                    }
                }
            }
        }
    }

    fn transform_3d(&mut self, grid: &mut ComplexGrid, direction: FftDirection) -> Result<()> {
        let shape = grid.shape();
        check_shape(shape)?;
        debug!("{direction:?} complex transform on grid {shape:?}");
        for axis in 0..3 {
            self.transform_axis(grid.data_mut(), shape, axis, direction);
        }
        Ok(())
    }
}

fn check_shape(shape: GridShape) -> Result<()> {
    if shape.contains(&0) {
        return Err(MillerError::Transform(format!("empty grid {shape:?}")));
    }
    Ok(())
}

impl FourierTransform for RustFftProvider {
    fn forward(&mut self, grid: &mut ComplexGrid) -> Result<()> {
        self.transform_3d(grid, FftDirection::Forward)
    }

    fn backward(&mut self, grid: &mut ComplexGrid) -> Result<()> {
        self.transform_3d(grid, FftDirection::Inverse)
    }

    fn forward_real(&mut self, map: &RealGrid) -> Result<ComplexGrid> {
        let n_real = map.focus();
        check_shape(n_real)?;
        let half_shape = half_complex_shape(n_real);
        let [n0, n1, n2] = n_real;
        debug!("real-to-complex transform on grid {n_real:?}");

        let fft = self.plan(n2, FftDirection::Forward);
        let mut lines: Vec<Complex64> = map.values().map(|x| Complex64::new(x, 0.0)).collect();
        fft.process(&mut lines);
        let mut half = ComplexGrid::zeros(half_shape);
        for i in 0..n0 {
            for j in 0..n1 {
                let line = &lines[(i * n1 + j) * n2..(i * n1 + j + 1) * n2];
                for (k, value) in line.iter().take(half_shape[2]).enumerate() {
                    half.set(i, j, k, *value);
                }
            }
        }
        for axis in 0..2 {
            self.transform_axis(half.data_mut(), half_shape, axis, FftDirection::Forward);
        }
        Ok(half)
    }

    fn backward_hermitian(&mut self, coefficients: &ComplexGrid, n_real: GridShape) -> Result<RealGrid> {
        check_shape(n_real)?;
        let half_shape = half_complex_shape(n_real);
        if coefficients.shape() != half_shape {
            return Err(MillerError::Transform(format!(
                "half-complex grid {:?} does not match real grid {:?}",
                coefficients.shape(),
                n_real
            )));
        }
        let [n0, n1, n2] = n_real;
        debug!("Hermitian complex-to-real transform on grid {n_real:?}");

        let mut work = coefficients.clone();
        for axis in 0..2 {
            self.transform_axis(work.data_mut(), half_shape, axis, FftDirection::Inverse);
        }
        // Each remaining line along the last axis is Hermitian: G(-k) = conj(G(k))
        let mut lines = Vec::with_capacity(grid_size(n_real));
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    let value = if k < half_shape[2] {
                        work.get(i, j, k)
                    } else {
                        work.get(i, j, n2 - k).conj()
                    };
                    lines.push(value);
                }
            }
        }
        let fft = self.plan(n2, FftDirection::Inverse);
        fft.process(&mut lines);
        let mut map = RealGrid::zeros_padded(n_real);
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    map.set(i, j, k, lines[(i * n1 + j) * n2 + k].re);
                }
            }
        }
        Ok(map)
    }
}
