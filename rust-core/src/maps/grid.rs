use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::MillerError;
use crate::Result;

/// Grid extent along the three cell axes, row-major with the last axis fastest.
pub type GridShape = [usize; 3];

/// Number of grid points in a shape.
pub fn grid_size(shape: GridShape) -> usize {
    shape[0] * shape[1] * shape[2]
}

/// Half-complex shape `(n0, n1, n2/2 + 1)` of a real grid's transform.
pub fn half_complex_shape(n_real: GridShape) -> GridShape {
    [n_real[0], n_real[1], n_real[2] / 2 + 1]
}

/// Last-axis storage length of a padded real grid, `2·(n2/2 + 1)`.
pub fn padded_last_dim(n2: usize) -> usize {
    2 * (n2 / 2 + 1)
}

fn flat_index(shape: GridShape, i: usize, j: usize, k: usize) -> usize {
    (i * shape[1] + j) * shape[2] + k
}

/// Summary statistics of a real map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Root-mean-square deviation from the mean.
    pub sigma: f64,
}

impl MapStatistics {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Result<Self> {
        let mut n = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for x in values {
            n += 1;
            min = min.min(x);
            max = max.max(x);
            sum += x;
            sum_sq += x * x;
        }
        if n == 0 {
            return Err(MillerError::Arithmetic("statistics of an empty map".to_string()));
        }
        let mean = sum / n as f64;
        let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
        Ok(MapStatistics {
            min,
            max,
            mean,
            sigma: variance.sqrt(),
        })
    }
}

/// Real-valued map over the unit cell.
///
/// The focus is the logical grid. Storage may be padded along the last axis to
/// `2·(n2/2 + 1)` values, the layout an in-place real transform works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RealGridFields")]
pub struct RealGrid {
    focus: GridShape,
    storage: GridShape,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RealGridFields {
    focus: GridShape,
    storage: GridShape,
    data: Vec<f64>,
}

impl TryFrom<RealGridFields> for RealGrid {
    type Error = MillerError;

    /// Storage is either the focus itself or the focus padded along the last axis.
    fn try_from(fields: RealGridFields) -> Result<Self> {
        let RealGridFields { focus, storage, data } = fields;
        let padded = [focus[0], focus[1], padded_last_dim(focus[2])];
        if storage != focus && storage != padded {
            return Err(MillerError::InvalidArgument(format!(
                "real grid storage {storage:?} does not fit focus {focus:?}"
            )));
        }
        if data.len() != grid_size(storage) {
            return Err(MillerError::LengthMismatch {
                what: "real grid values",
                expected: grid_size(storage),
                actual: data.len(),
            });
        }
        Ok(RealGrid { focus, storage, data })
    }
}

impl RealGrid {
    pub fn zeros(focus: GridShape) -> Self {
        RealGrid {
            focus,
            storage: focus,
            data: vec![0.0; grid_size(focus)],
        }
    }

    pub fn zeros_padded(focus: GridShape) -> Self {
        let storage = [focus[0], focus[1], padded_last_dim(focus[2])];
        RealGrid {
            focus,
            storage,
            data: vec![0.0; grid_size(storage)],
        }
    }

    /// Wrap unpadded row-major values.
    pub fn from_values(focus: GridShape, data: Vec<f64>) -> Result<Self> {
        if data.len() != grid_size(focus) {
            return Err(MillerError::LengthMismatch {
                what: "real grid values",
                expected: grid_size(focus),
                actual: data.len(),
            });
        }
        Ok(RealGrid {
            focus,
            storage: focus,
            data,
        })
    }

    pub fn focus(&self) -> GridShape {
        self.focus
    }

    /// Shape of the underlying storage; differs from the focus when padded.
    pub fn storage_shape(&self) -> GridShape {
        self.storage
    }

    pub fn is_padded(&self) -> bool {
        self.storage != self.focus
    }

    /// Raw storage, padding included.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[flat_index(self.storage, i, j, k)]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let position = flat_index(self.storage, i, j, k);
        self.data[position] = value;
    }

    /// Values inside the focus, in row-major order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let [n0, n1, n2] = self.focus;
        (0..n0).flat_map(move |i| (0..n1).flat_map(move |j| (0..n2).map(move |k| self.get(i, j, k))))
    }

    /// Copy of the focus without padding.
    pub fn unpadded(&self) -> RealGrid {
        if !self.is_padded() {
            return self.clone();
        }
        RealGrid {
            focus: self.focus,
            storage: self.focus,
            data: self.values().collect(),
        }
    }

    pub fn statistics(&self) -> Result<MapStatistics> {
        MapStatistics::from_values(self.values())
    }

    /// Multiply every value by `factor`, padding included.
    pub fn scale(&mut self, factor: f64) {
        for x in &mut self.data {
            *x *= factor;
        }
    }

    /// Grid point holding the largest value.
    pub fn argmax(&self) -> Option<GridShape> {
        let [n0, n1, n2] = self.focus;
        let mut best: Option<(GridShape, f64)> = None;
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    let value = self.get(i, j, k);
                    if best.map_or(true, |(_, max)| value > max) {
                        best = Some(([i, j, k], value));
                    }
                }
            }
        }
        best.map(|(point, _)| point)
    }
}

/// Complex grid, either a full transform or the half-complex transform of a real map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ComplexGridFields")]
pub struct ComplexGrid {
    shape: GridShape,
    data: Vec<Complex64>,
}

#[derive(Deserialize)]
struct ComplexGridFields {
    shape: GridShape,
    data: Vec<Complex64>,
}

impl TryFrom<ComplexGridFields> for ComplexGrid {
    type Error = MillerError;

    fn try_from(fields: ComplexGridFields) -> Result<Self> {
        ComplexGrid::from_values(fields.shape, fields.data)
    }
}

impl ComplexGrid {
    pub fn zeros(shape: GridShape) -> Self {
        ComplexGrid {
            shape,
            data: vec![Complex64::new(0.0, 0.0); grid_size(shape)],
        }
    }

    pub fn from_values(shape: GridShape, data: Vec<Complex64>) -> Result<Self> {
        if data.len() != grid_size(shape) {
            return Err(MillerError::LengthMismatch {
                what: "complex grid values",
                expected: grid_size(shape),
                actual: data.len(),
            });
        }
        Ok(ComplexGrid { shape, data })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Complex64 {
        self.data[flat_index(self.shape, i, j, k)]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: Complex64) {
        let position = flat_index(self.shape, i, j, k);
        self.data[position] = value;
    }

    /// Real parts as an unpadded real grid.
    pub fn real_part(&self) -> RealGrid {
        RealGrid {
            focus: self.shape,
            storage: self.shape,
            data: self.data.iter().map(|z| z.re).collect(),
        }
    }
}
