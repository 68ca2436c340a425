use log::{debug, trace};
use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::MAX_SPACE_GROUP_ORDER;
use crate::error::MillerError;
use crate::interfaces::AnomalousFlag;
use crate::miller::index::MillerIndex;
use crate::symmetries::change_of_basis::ChangeOfBasis;
use crate::symmetries::symmetry_operations::{
    is_integer_phase, normalize_translation, round_integer_matrix, SymmetryOperation,
};
use crate::Result;

/// Result of mapping one index into the asymmetric unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsuIndex {
    /// Canonical representative.
    pub index: MillerIndex,
    /// Phase shift h·t (in turns) of the operation that produced it.
    pub phase_shift: f64,
    /// Whether a Friedel flip (-hR) was applied on top of the rotation.
    pub friedel_flipped: bool,
}

impl AsuIndex {
    /// Carry a structure factor F(h) over to F(representative).
    ///
    /// F(hR) = F(h) exp(-2πi h·t), and F(-h) = conj(F(h)).
    pub fn apply_to_complex(&self, value: Complex64) -> Complex64 {
        let shifted = value * Complex64::from_polar(1.0, -2.0 * PI * self.phase_shift);
        if self.friedel_flipped {
            shifted.conj()
        } else {
            shifted
        }
    }
}

/// Ordering key of the canonical asymmetric unit: the orbit member maximising (l, h, k).
///
/// For the triclinic Laue group this reproduces the usual
/// `l > 0 or (l == 0 and (h > 0 or (h == 0 and k >= 0)))` half-space.
fn asu_key(index: &MillerIndex) -> (i32, i32, i32) {
    (index.l(), index.h(), index.k())
}

/// A crystallographic space group stored as coset representatives plus centring translations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceGroup {
    /// Symbol the group was looked up by, if any.
    symbol: Option<String>,
    /// One operation per distinct rotation part; the first is the identity.
    smx: Vec<SymmetryOperation>,
    /// Lattice centring translations; the first is zero.
    ltr: Vec<Vector3<f64>>,
}

impl SpaceGroup {
    /// The trivial group P 1.
    pub fn p1() -> Self {
        SpaceGroup {
            symbol: Some("P 1".to_string()),
            smx: vec![SymmetryOperation::identity()],
            ltr: vec![Vector3::zeros()],
        }
    }

    /// Close a set of generators and centring vectors into a group modulo lattice translations.
    pub fn from_generators(
        generators: &[SymmetryOperation],
        centring: &[Vector3<f64>],
    ) -> Result<Self> {
        let mut ops = vec![SymmetryOperation::identity()];
        let seeds = centring
            .iter()
            .map(|t| SymmetryOperation::translation_only(*t))
            .chain(generators.iter().copied());
        for seed in seeds {
            let det = seed.determinant();
            if det != 1 && det != -1 {
                return Err(MillerError::InvalidArgument(format!(
                    "generator rotation has determinant {det}"
                )));
            }
            push_unique(&mut ops, seed.normalized());
        }

        // Closure under composition
        let mut changed = true;
        while changed {
            changed = false;
            let n = ops.len();
            for a in 0..n {
                for b in 0..n {
                    let product = ops[a].multiply(&ops[b]).normalized();
                    if push_unique(&mut ops, product) {
                        changed = true;
                        if ops.len() > MAX_SPACE_GROUP_ORDER {
                            return Err(MillerError::InvalidArgument(
                                "generators do not close into a crystallographic group".to_string(),
                            ));
                        }
                    }
                }
            }
        }

        let ltr: Vec<Vector3<f64>> = ops
            .iter()
            .filter(|op| op.rotation == Matrix3::identity())
            .map(|op| op.translation)
            .collect();
        let mut smx: Vec<SymmetryOperation> = Vec::new();
        for op in &ops {
            if !smx.iter().any(|s| s.rotation == op.rotation) {
                smx.push(*op);
            }
        }
        if smx.len() * ltr.len() != ops.len() {
            return Err(MillerError::InvalidArgument(format!(
                "inconsistent group: {} operations, {} rotations, {} centring vectors",
                ops.len(),
                smx.len(),
                ltr.len()
            )));
        }
        debug!(
            "closed space group: order_z = {}, order_p = {}",
            ops.len(),
            smx.len()
        );
        Ok(SpaceGroup {
            symbol: None,
            smx,
            ltr,
        })
    }

    /// Attach a display symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Coset representatives (one per rotation).
    pub fn smx(&self) -> &[SymmetryOperation] {
        &self.smx
    }

    /// Centring translations.
    pub fn ltr(&self) -> &[Vector3<f64>] {
        &self.ltr
    }

    /// Every operation, coset representatives combined with centring translations.
    pub fn all_operations(&self) -> Vec<SymmetryOperation> {
        self.ltr
            .iter()
            .flat_map(|t| {
                self.smx.iter().map(move |s| {
                    SymmetryOperation::new(s.rotation, s.translation + t).normalized()
                })
            })
            .collect()
    }

    pub fn order_p(&self) -> usize {
        self.smx.len()
    }

    pub fn order_z(&self) -> usize {
        self.smx.len() * self.ltr.len()
    }

    /// Whether the group contains an inversion.
    pub fn is_centric(&self) -> bool {
        let minus_identity = -Matrix3::<i32>::identity();
        self.smx.iter().any(|s| s.rotation == minus_identity)
    }

    /// Whether this group is its own Patterson group.
    pub fn is_patterson_group(&self) -> bool {
        self.is_equivalent_to(&self.patterson_group())
    }

    /// Same operations, regardless of storage order and representative choice.
    pub fn is_equivalent_to(&self, other: &SpaceGroup) -> bool {
        if self.order_z() != other.order_z() {
            return false;
        }
        let theirs = other.all_operations();
        self.all_operations()
            .iter()
            .all(|op| theirs.iter().any(|o| o.is_equivalent_to(op)))
    }

    /// Map an index to the canonical asymmetric unit.
    ///
    /// Friedel mates are folded together only for `Merged`; `Unset` is treated as distinct.
    pub fn map_to_asu(&self, index: &MillerIndex, anomalous: AnomalousFlag) -> AsuIndex {
        let friedel = !anomalous.is_anomalous_or_unset();
        let mut best = AsuIndex {
            index: *index,
            phase_shift: 0.0,
            friedel_flipped: false,
        };
        for op in &self.smx {
            let image = op.apply_to_index(index);
            let phase_shift = op.phase_shift(index);
            if asu_key(&image) > asu_key(&best.index) {
                best = AsuIndex {
                    index: image,
                    phase_shift,
                    friedel_flipped: false,
                };
            }
            if friedel && asu_key(&-image) > asu_key(&best.index) {
                best = AsuIndex {
                    index: -image,
                    phase_shift,
                    friedel_flipped: true,
                };
            }
        }
        trace!("map_to_asu {} -> {}", index, best.index);
        best
    }

    pub fn is_in_asu(&self, index: &MillerIndex, anomalous: AnomalousFlag) -> bool {
        self.map_to_asu(index, anomalous).index == *index
    }

    /// Distinct symmetry-equivalent indices (Friedel mates included when merged).
    pub fn equivalent_indices(&self, index: &MillerIndex, anomalous: AnomalousFlag) -> Vec<MillerIndex> {
        let friedel = !anomalous.is_anomalous_or_unset();
        let mut result: Vec<MillerIndex> = Vec::with_capacity(2 * self.smx.len());
        for op in &self.smx {
            let image = op.apply_to_index(index);
            if !result.contains(&image) {
                result.push(image);
            }
            if friedel && !result.contains(&-image) {
                result.push(-image);
            }
        }
        result
    }

    pub fn multiplicity(&self, index: &MillerIndex, anomalous: AnomalousFlag) -> usize {
        self.equivalent_indices(index, anomalous).len()
    }

    /// Number of rotations leaving the index invariant.
    pub fn epsilon(&self, index: &MillerIndex) -> usize {
        self.smx
            .iter()
            .filter(|op| op.apply_to_index(index) == *index)
            .count()
    }

    /// Whether some rotation maps h onto -h.
    pub fn is_centric_index(&self, index: &MillerIndex) -> bool {
        let minus = -*index;
        self.smx.iter().any(|op| op.apply_to_index(index) == minus)
    }

    /// Whether symmetry forces the reflection to vanish.
    pub fn is_sys_absent(&self, index: &MillerIndex) -> bool {
        for op in &self.smx {
            if op.apply_to_index(index) != *index {
                continue;
            }
            for t in &self.ltr {
                if !is_integer_phase(index.dot_translation(&(op.translation + t))) {
                    return true;
                }
            }
        }
        false
    }

    /// The Patterson group: Laue group rotations, no translations, centring kept.
    pub fn patterson_group(&self) -> SpaceGroup {
        let mut smx: Vec<SymmetryOperation> = Vec::with_capacity(2 * self.smx.len());
        for op in &self.smx {
            for rotation in [op.rotation, -op.rotation] {
                if !smx.iter().any(|s| s.rotation == rotation) {
                    smx.push(SymmetryOperation::new(rotation, Vector3::zeros()));
                }
            }
        }
        SpaceGroup {
            symbol: None,
            smx,
            ltr: self.ltr.clone(),
        }
    }

    /// Rewrite the group in a new basis: R' = M⁻¹ R M, t' = M⁻¹ t.
    pub fn change_basis(&self, cb: &ChangeOfBasis) -> Result<SpaceGroup> {
        let m = cb.matrix().map(|x| x as f64);
        let m_inv = cb.inverse_matrix_f64();
        let mut transformed = Vec::with_capacity(self.order_z());
        for op in self.all_operations() {
            let rotation = m_inv * op.rotation.map(|x| x as f64) * m;
            let rotation = round_integer_matrix(&rotation).ok_or_else(|| {
                MillerError::IncompatibleBasis(format!(
                    "rotation {:?} is not integral in the new basis",
                    op.rotation
                ))
            })?;
            let translation = normalize_translation(&(m_inv * op.translation));
            transformed.push(SymmetryOperation::new(rotation, translation));
        }
        let (centring, generators): (Vec<_>, Vec<_>) = transformed
            .into_iter()
            .partition(|op| op.rotation == Matrix3::identity());
        let centring: Vec<Vector3<f64>> = centring.into_iter().map(|op| op.translation).collect();
        SpaceGroup::from_generators(&generators, &centring)
    }

    /// Whether a metric tensor is invariant under every rotation.
    pub fn is_compatible_metric(&self, metric: &Matrix3<f64>, relative_tol: f64) -> bool {
        let scale = metric.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        self.smx.iter().all(|op| {
            let r = op.rotation.map(|x| x as f64);
            let transformed = r.transpose() * metric * r;
            (transformed - metric)
                .iter()
                .all(|x| x.abs() <= relative_tol * scale)
        })
    }
}

fn push_unique(ops: &mut Vec<SymmetryOperation>, candidate: SymmetryOperation) -> bool {
    if ops.iter().any(|op| op.is_equivalent_to(&candidate)) {
        return false;
    }
    ops.push(candidate);
    true
}

impl PartialEq for SpaceGroup {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent_to(other)
    }
}

