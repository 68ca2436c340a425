use log::debug;
use std::sync::Arc;

use crate::config::{GriddingParams, TRANSLATION_TOLERANCE};
use crate::error::MillerError;
use crate::lattice::unit_cell::UnitCell;
use crate::maps::grid::{grid_size, GridShape};
use crate::miller::miller_set::MillerSet;
use crate::symmetries::crystal_symmetry::CrystalSymmetry;
use crate::symmetries::space_group::SpaceGroup;
use crate::Result;

// Largest translation denominator looked for (covers 1/2, 1/3, 1/4, 1/6 and their combinations)
const MAX_TRANSLATION_DENOMINATOR: usize = 24;

/// A real-space grid sized for a resolution limit and compatible with the space group.
#[derive(Debug, Clone, PartialEq)]
pub struct CrystalGridding {
    symmetry: Arc<CrystalSymmetry>,
    d_min: f64,
    resolution_factor: f64,
    n_real: GridShape,
}

impl CrystalGridding {
    /// Choose grid sizes for `d_min`.
    ///
    /// Each size is at least `1/(|a*_i|·d_min·resolution_factor)`, and at least
    /// `2·max_index_i + 1` when the largest indices to be placed are known. Sizes are
    /// divisible by the space group's translation denominators and the mandatory
    /// factors, axes mixed by a rotation get equal sizes, and no size has a prime
    /// factor above `max_prime` (0 disables that limit).
    pub fn new(
        symmetry: Arc<CrystalSymmetry>,
        d_min: f64,
        params: &GriddingParams,
        max_index: Option<[i32; 3]>,
    ) -> Result<Self> {
        if !(d_min > 0.0) {
            return Err(MillerError::InvalidArgument(format!(
                "gridding needs a positive d_min, got {d_min}"
            )));
        }
        let resolution_factor = params.resolution_factor;
        if !(resolution_factor > 0.0) {
            return Err(MillerError::InvalidArgument(format!(
                "resolution factor must be positive, got {resolution_factor}"
            )));
        }
        if params.assert_shannon_sampling && resolution_factor > 0.5 {
            return Err(MillerError::InvalidArgument(format!(
                "resolution factor {resolution_factor} violates Shannon sampling (must be <= 0.5)"
            )));
        }
        if params.mandatory_factors.contains(&0) {
            return Err(MillerError::InvalidArgument(
                "mandatory grid factors must be positive".to_string(),
            ));
        }

        let reciprocal_lengths = symmetry.unit_cell().reciprocal_lengths();
        let mut n_min = [0usize; 3];
        for axis in 0..3 {
            let steps = 1.0 / (reciprocal_lengths[axis] * d_min * resolution_factor);
            n_min[axis] = (steps - 1e-6).ceil().max(1.0) as usize;
            if let Some(max) = max_index {
                n_min[axis] = n_min[axis].max(2 * max[axis].unsigned_abs() as usize + 1);
            }
        }

        let translation_factors = translation_denominators(symmetry.space_group())?;
        let mut factors = [1usize; 3];
        for axis in 0..3 {
            factors[axis] = lcm(translation_factors[axis], params.mandatory_factors[axis]);
        }

        let groups = coupled_axes(symmetry.space_group());
        let mut n_real = [0usize; 3];
        for axis in 0..3 {
            let members: Vec<usize> = (0..3).filter(|a| groups[*a] == groups[axis]).collect();
            let group_min = members.iter().map(|a| n_min[*a]).max().unwrap_or(1);
            let group_factor = members.iter().fold(1, |acc, a| lcm(acc, factors[*a]));
            n_real[axis] = smallest_allowed_size(group_min, group_factor, params.max_prime);
        }
        debug!(
            "gridding for d_min {d_min:.4} (resolution factor {resolution_factor:.4}): {n_real:?}, symmetry factors {factors:?}"
        );
        Ok(CrystalGridding {
            symmetry,
            d_min,
            resolution_factor,
            n_real,
        })
    }

    pub fn symmetry(&self) -> &Arc<CrystalSymmetry> {
        &self.symmetry
    }

    pub fn unit_cell(&self) -> &UnitCell {
        self.symmetry.unit_cell()
    }

    pub fn space_group(&self) -> &SpaceGroup {
        self.symmetry.space_group()
    }

    pub fn d_min(&self) -> f64 {
        self.d_min
    }

    pub fn resolution_factor(&self) -> f64 {
        self.resolution_factor
    }

    pub fn n_real(&self) -> GridShape {
        self.n_real
    }

    pub fn n_grid_points(&self) -> usize {
        grid_size(self.n_real)
    }
}

impl MillerSet {
    /// Gridding for this set's symmetry, at `params.d_min` or the set's own d_min.
    pub fn crystal_gridding(&self, params: &GriddingParams) -> Result<CrystalGridding> {
        let d_min = match params.d_min {
            Some(d_min) => d_min,
            None => self.d_min()?,
        };
        let mut max_index = [0i32; 3];
        for h in self.indices() {
            for (axis, value) in h.0.iter().enumerate() {
                max_index[axis] = max_index[axis].max(value.abs());
            }
        }
        CrystalGridding::new(Arc::clone(self.symmetry()), d_min, params, Some(max_index))
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

fn largest_prime_factor(mut n: usize) -> usize {
    let mut largest = 1;
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            largest = p;
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        largest = largest.max(n);
    }
    largest
}

/// Smallest multiple of `factor` that is `>= n_min` and whose cofactor has no prime above `max_prime`.
fn smallest_allowed_size(n_min: usize, factor: usize, max_prime: usize) -> usize {
    let mut m = n_min.div_ceil(factor).max(1);
    while max_prime >= 2 && largest_prime_factor(m) > max_prime {
        m += 1;
    }
    factor * m
}

fn denominator(value: f64) -> Result<usize> {
    (1..=MAX_TRANSLATION_DENOMINATOR)
        .find(|d| {
            let scaled = value * *d as f64;
            (scaled - scaled.round()).abs() < TRANSLATION_TOLERANCE * *d as f64
        })
        .ok_or_else(|| {
            MillerError::InvalidArgument(format!("translation component {value} is not a simple fraction"))
        })
}

/// Per-axis lcm of the translation denominators of every operation.
fn translation_denominators(group: &SpaceGroup) -> Result<[usize; 3]> {
    let mut factors = [1usize; 3];
    for op in group.all_operations() {
        for axis in 0..3 {
            factors[axis] = lcm(factors[axis], denominator(op.translation[axis])?);
        }
    }
    Ok(factors)
}

/// Label each axis with the smallest axis it is mixed with by some rotation.
fn coupled_axes(group: &SpaceGroup) -> [usize; 3] {
    let mut label = [0usize, 1, 2];
    let mut changed = true;
    while changed {
        changed = false;
        for op in group.smx() {
            for i in 0..3 {
                for j in 0..3 {
                    if i != j && op.rotation[(i, j)] != 0 && label[i] != label[j] {
                        let merged = label[i].min(label[j]);
                        let (from_i, from_j) = (label[i], label[j]);
                        for l in label.iter_mut() {
                            if *l == from_i || *l == from_j {
                                *l = merged;
                            }
                        }
                        changed = true;
                    }
                }
            }
        }
    }
    label
}
