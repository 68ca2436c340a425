use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::BASE_VECTOR_TOLERANCE;
use crate::error::MillerError;
use crate::miller::index::MillerIndex;
use crate::Result;

/// A crystallographic unit cell.
///
/// Parameters are `(a, b, c, alpha, beta, gamma)` with lengths in Ångström and
/// angles in degrees. The direct basis follows the usual orientation: `a` along x,
/// `b` in the xy-plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCell {
    /// Cell parameters (a, b, c, α, β, γ).
    parameters: [f64; 6],
    /// Real‐space basis vectors (columns).
    direct: Matrix3<f64>,
    /// Metric tensor G = A^T * A.
    metric: Matrix3<f64>,
    /// Reciprocal metric tensor G* = G^-1.
    reciprocal_metric: Matrix3<f64>,
    /// Unit cell volume = det(direct).
    volume: f64,
}

impl UnitCell {
    /// Construct a unit cell from its six parameters.
    pub fn new(parameters: [f64; 6]) -> Result<Self> {
        let [a, b, c, alpha, beta, gamma] = parameters;
        if a <= 0.0 || b <= 0.0 || c <= 0.0 {
            return Err(MillerError::InvalidArgument(format!(
                "cell lengths must be positive, got ({a}, {b}, {c})"
            )));
        }
        for angle in [alpha, beta, gamma] {
            if angle <= 0.0 || angle >= 180.0 {
                return Err(MillerError::InvalidArgument(format!(
                    "cell angle {angle} outside (0, 180)"
                )));
            }
        }

        let (ca, cb, cg) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let sg = gamma.to_radians().sin();
        let v_sq = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if v_sq <= BASE_VECTOR_TOLERANCE {
            return Err(MillerError::InvalidArgument(
                "cell angles do not describe a three-dimensional cell".to_string(),
            ));
        }

        // 1) Direct basis (columns a, b, c)
        let direct = Matrix3::from_columns(&[
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(b * cg, b * sg, 0.0),
            Vector3::new(c * cb, c * (ca - cb * cg) / sg, c * v_sq.sqrt() / sg),
        ]);

        // 2) Metric tensor and volume
        let metric = direct.transpose() * direct;
        let volume = direct.determinant();
        if volume.abs() < BASE_VECTOR_TOLERANCE {
            return Err(MillerError::InvalidArgument(
                "determinant too small, cell is degenerate".to_string(),
            ));
        }

        // 3) Reciprocal metric
        let reciprocal_metric = metric.try_inverse().ok_or_else(|| {
            MillerError::InvalidArgument("metric tensor is singular".to_string())
        })?;

        Ok(UnitCell {
            parameters,
            direct,
            metric,
            reciprocal_metric,
            volume,
        })
    }

    /// Construct a unit cell from a metric tensor G.
    pub fn from_metric(metric: &Matrix3<f64>) -> Result<Self> {
        let a = metric[(0, 0)].sqrt();
        let b = metric[(1, 1)].sqrt();
        let c = metric[(2, 2)].sqrt();
        let alpha = (metric[(1, 2)] / (b * c)).acos().to_degrees();
        let beta = (metric[(0, 2)] / (a * c)).acos().to_degrees();
        let gamma = (metric[(0, 1)] / (a * b)).acos().to_degrees();
        Self::new([a, b, c, alpha, beta, gamma])
    }

    pub fn parameters(&self) -> [f64; 6] {
        self.parameters
    }

    pub fn direct_basis(&self) -> &Matrix3<f64> {
        &self.direct
    }

    pub fn metric_tensor(&self) -> &Matrix3<f64> {
        &self.metric
    }

    pub fn reciprocal_metric_tensor(&self) -> &Matrix3<f64> {
        &self.reciprocal_metric
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Lengths |a*|, |b*|, |c*| of the reciprocal basis vectors.
    pub fn reciprocal_lengths(&self) -> [f64; 3] {
        [
            self.reciprocal_metric[(0, 0)].sqrt(),
            self.reciprocal_metric[(1, 1)].sqrt(),
            self.reciprocal_metric[(2, 2)].sqrt(),
        ]
    }

    /// 1/d² for a Miller index.
    pub fn d_star_sq(&self, index: &MillerIndex) -> f64 {
        let h = index.as_vector_f64();
        (h.transpose() * self.reciprocal_metric * h)[(0, 0)]
    }

    /// Interplanar spacing d. Infinite for (0,0,0).
    pub fn d(&self, index: &MillerIndex) -> f64 {
        let d_star_sq = self.d_star_sq(index);
        if d_star_sq <= 0.0 {
            f64::INFINITY
        } else {
            1.0 / d_star_sq.sqrt()
        }
    }

    /// Largest |h|, |k|, |l| reachable at resolution `d_min`.
    pub fn max_miller_indices(&self, d_min: f64) -> [i32; 3] {
        let [a, b, c, ..] = self.parameters;
        [a, b, c].map(|length| (length / d_min + 1e-9).floor() as i32)
    }

    /// Apply an integer change of basis `M`: the new direct basis is `A * M`.
    pub fn change_basis(&self, matrix: &Matrix3<i32>) -> Result<Self> {
        let m = matrix.map(|x| x as f64);
        let new_metric = m.transpose() * self.metric * m;
        Self::from_metric(&new_metric)
    }

    /// Compare cell parameters within a relative length and absolute angle tolerance.
    pub fn is_similar_to(&self, other: &UnitCell, relative_length_tol: f64, angle_tol_deg: f64) -> bool {
        let (lhs, rhs) = (self.parameters, other.parameters);
        let lengths_ok = (0..3).all(|i| (lhs[i] - rhs[i]).abs() <= relative_length_tol * lhs[i].max(rhs[i]));
        let angles_ok = (3..6).all(|i| (lhs[i] - rhs[i]).abs() <= angle_tol_deg);
        lengths_ok && angles_ok
    }
}
