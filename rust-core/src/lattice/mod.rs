//! Lattice module: unit cell geometry in direct and reciprocal space.
//!
//! Quick reference
//! - Types: [`UnitCell`]
//! - Resolution: [`UnitCell::d_star_sq`], [`UnitCell::d`], [`UnitCell::max_miller_indices`]
//! - Transforms: [`UnitCell::change_basis`], [`UnitCell::from_metric`]

// ======================== MODULE DECLARATIONS ========================
pub mod unit_cell;


// ======================== RE-EXPORTED PUBLIC API (curated) ========================
#[doc(inline)]
pub use unit_cell::UnitCell;
// UnitCell impl methods:
//   new(parameters: [f64; 6]) -> Result<Self>                      - cell from (a, b, c, α, β, γ)
//   from_metric(metric: &Matrix3<f64>) -> Result<Self>            - cell from metric tensor G
//   d_star_sq(&self, index: &MillerIndex) -> f64                  - 1/d² via reciprocal metric
//   d(&self, index: &MillerIndex) -> f64                          - interplanar spacing
//   max_miller_indices(&self, d_min: f64) -> [i32; 3]             - index bounds for a resolution limit
//   change_basis(&self, matrix: &Matrix3<i32>) -> Result<Self>    - cell in a new basis A * M
//   is_similar_to(&self, other, rel_len_tol, angle_tol) -> bool   - parameter comparison
