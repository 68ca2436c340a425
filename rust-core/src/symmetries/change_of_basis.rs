use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::MillerError;
use crate::miller::index::MillerIndex;
use crate::Result;

/// An integer reindexing `h' = h M`.
///
/// Fractional coordinates transform with `M⁻¹` and the direct basis with `A M`, so
/// structure-factor phases `h·x` are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOfBasis {
    matrix: Matrix3<i32>,
}

impl ChangeOfBasis {
    /// Only unimodular matrices (det ±1) keep the lattice and its centring intact.
    pub fn new(matrix: Matrix3<i32>) -> Result<Self> {
        let det = matrix.map(|x| x as f64).determinant().round() as i32;
        if det != 1 && det != -1 {
            return Err(MillerError::IncompatibleBasis(format!(
                "reindexing matrix has determinant {det}, expected ±1"
            )));
        }
        Ok(ChangeOfBasis { matrix })
    }

    pub fn identity() -> Self {
        ChangeOfBasis {
            matrix: Matrix3::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<i32> {
        &self.matrix
    }

    pub fn inverse_matrix_f64(&self) -> Matrix3<f64> {
        // Unimodular by construction
        self.matrix
            .map(|x| x as f64)
            .try_inverse()
            .unwrap_or_else(Matrix3::identity)
    }

    pub fn apply(&self, index: &MillerIndex) -> MillerIndex {
        index.times_matrix(&self.matrix)
    }

    pub fn apply_all(&self, indices: &[MillerIndex]) -> Vec<MillerIndex> {
        indices.iter().map(|h| self.apply(h)).collect()
    }
}
