use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::TRANSLATION_TOLERANCE;
use crate::error::MillerError;
use crate::miller::index::MillerIndex;
use crate::Result;

/// A single symmetry operation: rotation (integer‐matrix) + translation.
///
/// Acts on fractional coordinates as `x' = R x + t` and on Miller indices as the
/// row-vector product `h' = h R`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryOperation {
    /// Rotation part with determinant ±1
    pub rotation: Matrix3<i32>,
    /// Fractional translation shift
    pub translation: Vector3<f64>,
}

impl SymmetryOperation {
    /// Create a new symmetry operation
    pub fn new(rotation: Matrix3<i32>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create identity operation
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Create the inversion through the origin
    pub fn inversion() -> Self {
        Self {
            rotation: -Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Pure lattice translation
    pub fn translation_only(translation: Vector3<f64>) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation,
        }
    }

    /// Apply symmetry operation to a point
    pub fn apply(&self, point: Vector3<f64>) -> Vector3<f64> {
        let rotation_f64 = self.rotation.map(|x| x as f64);
        rotation_f64 * point + self.translation
    }

    /// Composition `self ∘ other`, i.e. apply `other` first.
    pub fn multiply(&self, other: &SymmetryOperation) -> Self {
        let rotation_f64 = self.rotation.map(|x| x as f64);
        Self {
            rotation: self.rotation * other.rotation,
            translation: rotation_f64 * other.translation + self.translation,
        }
    }

    /// Determinant of the rotation part.
    pub fn determinant(&self) -> i32 {
        self.rotation.map(|x| x as f64).determinant().round() as i32
    }

    /// Inverse operation `(R^-1, -R^-1 t)`.
    pub fn inverse(&self) -> Result<Self> {
        let inverse = self
            .rotation
            .map(|x| x as f64)
            .try_inverse()
            .ok_or_else(|| MillerError::InvalidArgument("singular rotation matrix".to_string()))?;
        let rotation = round_integer_matrix(&inverse).ok_or_else(|| {
            MillerError::InvalidArgument("rotation inverse is not an integer matrix".to_string())
        })?;
        Ok(Self {
            rotation,
            translation: -(inverse * self.translation),
        })
    }

    /// Same operation with the translation reduced into [0, 1).
    pub fn normalized(&self) -> Self {
        Self {
            rotation: self.rotation,
            translation: normalize_translation(&self.translation),
        }
    }

    /// Equality modulo lattice translations.
    pub fn is_equivalent_to(&self, other: &SymmetryOperation) -> bool {
        self.rotation == other.rotation
            && translations_equivalent(&self.translation, &other.translation)
    }

    /// Check if this is the identity operation
    pub fn is_identity(&self) -> bool {
        self.rotation == Matrix3::identity()
            && translations_equivalent(&self.translation, &Vector3::zeros())
    }

    /// Get the order of this symmetry operation modulo lattice translations
    pub fn order(&self) -> usize {
        let mut power = *self;
        for n in 1..=12 {
            if power.is_identity() {
                return n;
            }
            power = self.multiply(&power).normalized();
        }
        // Not a crystallographic operation
        0
    }

    /// Miller index image `h R`.
    pub fn apply_to_index(&self, index: &MillerIndex) -> MillerIndex {
        index.times_matrix(&self.rotation)
    }

    /// Phase shift `h·t` in turns that accompanies `apply_to_index`.
    pub fn phase_shift(&self, index: &MillerIndex) -> f64 {
        index.dot_translation(&self.translation)
    }
}

/// Reduce each component into [0, 1), snapping values within tolerance of 1 to 0.
pub fn normalize_translation(translation: &Vector3<f64>) -> Vector3<f64> {
    translation.map(|x| {
        let reduced = x - x.floor();
        if reduced > 1.0 - TRANSLATION_TOLERANCE || reduced < TRANSLATION_TOLERANCE {
            0.0
        } else {
            reduced
        }
    })
}

/// Whether two translations differ by a lattice vector.
pub fn translations_equivalent(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
    let diff = a - b;
    diff.iter()
        .all(|x| (x - x.round()).abs() < TRANSLATION_TOLERANCE)
}

/// Whether a phase (in turns) is a whole number.
pub fn is_integer_phase(phase: f64) -> bool {
    (phase - phase.round()).abs() < TRANSLATION_TOLERANCE
}

/// Round a float matrix to integers when every entry is already integral.
pub fn round_integer_matrix(matrix: &Matrix3<f64>) -> Option<Matrix3<i32>> {
    if matrix
        .iter()
        .all(|x| (x - x.round()).abs() < TRANSLATION_TOLERANCE)
    {
        Some(matrix.map(|x| x.round() as i32))
    } else {
        None
    }
}
