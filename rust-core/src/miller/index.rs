use std::fmt;
use std::ops::Neg;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// A Miller index (h, k, l).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct MillerIndex(pub [i32; 3]);

impl MillerIndex {
    pub const fn new(h: i32, k: i32, l: i32) -> Self {
        MillerIndex([h, k, l])
    }

    pub fn h(&self) -> i32 {
        self.0[0]
    }

    pub fn k(&self) -> i32 {
        self.0[1]
    }

    pub fn l(&self) -> i32 {
        self.0[2]
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    pub fn as_vector(&self) -> Vector3<i32> {
        Vector3::new(self.0[0], self.0[1], self.0[2])
    }

    pub fn as_vector_f64(&self) -> Vector3<f64> {
        Vector3::new(self.0[0] as f64, self.0[1] as f64, self.0[2] as f64)
    }

    /// Row-vector product h·M, the action of a point-group rotation on an index.
    pub fn times_matrix(&self, matrix: &Matrix3<i32>) -> Self {
        let v = matrix.transpose() * self.as_vector();
        MillerIndex([v[0], v[1], v[2]])
    }

    /// h·t for a fractional translation t.
    pub fn dot_translation(&self, translation: &Vector3<f64>) -> f64 {
        self.as_vector_f64().dot(translation)
    }
}

impl Neg for MillerIndex {
    type Output = MillerIndex;

    fn neg(self) -> Self::Output {
        MillerIndex([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl From<[i32; 3]> for MillerIndex {
    fn from(value: [i32; 3]) -> Self {
        MillerIndex(value)
    }
}

impl From<(i32, i32, i32)> for MillerIndex {
    fn from((h, k, l): (i32, i32, i32)) -> Self {
        MillerIndex([h, k, l])
    }
}

impl fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

/// Bounding box of a list of indices, used to pack indices into sortable scalar keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpan {
    min: [i32; 3],
    max: [i32; 3],
}

impl IndexSpan {
    pub fn new(indices: &[MillerIndex]) -> Self {
        let mut min = [0; 3];
        let mut max = [0; 3];
        for (n, index) in indices.iter().enumerate() {
            for axis in 0..3 {
                let value = index.0[axis];
                if n == 0 || value < min[axis] {
                    min[axis] = value;
                }
                if n == 0 || value > max[axis] {
                    max[axis] = value;
                }
            }
        }
        IndexSpan { min, max }
    }

    pub fn min(&self) -> [i32; 3] {
        self.min
    }

    pub fn max(&self) -> [i32; 3] {
        self.max
    }

    fn range(&self, axis: usize) -> u64 {
        (self.max[axis] - self.min[axis]) as u64 + 1
    }

    /// Pack an index inside the span into a key that orders like (h, k, l).
    pub fn pack(&self, index: &MillerIndex) -> u64 {
        let offset = |axis: usize| (index.0[axis] - self.min[axis]) as u64;
        (offset(0) * self.range(1) + offset(1)) * self.range(2) + offset(2)
    }
}
