use std::collections::HashMap;

use log::debug;

use crate::error::MillerError;
use crate::interfaces::{AnomalousFlag, Hemisphere};
use crate::miller::index::MillerIndex;
use crate::symmetries::space_group::SpaceGroup;
use crate::Result;

/// Position of every index. Matching is only defined on unique indices.
fn lookup(indices: &[MillerIndex], what: &str) -> Result<HashMap<MillerIndex, usize>> {
    let mut map = HashMap::with_capacity(indices.len());
    for (i, h) in indices.iter().enumerate() {
        if let Some(first) = map.insert(*h, i) {
            return Err(MillerError::InvalidArgument(format!(
                "{what}: index {h} occurs at positions {first} and {i}"
            )));
        }
    }
    Ok(map)
}

/// Positional pairing of two index lists that share indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMatches {
    pairs: Vec<(usize, usize)>,
    singles: [Vec<usize>; 2],
}

impl IndexMatches {
    /// Pair every index of `lhs` with the equal index of `rhs`.
    ///
    /// Both lists must be free of duplicates.
    pub fn new(lhs: &[MillerIndex], rhs: &[MillerIndex]) -> Result<Self> {
        lookup(lhs, "index matching")?;
        let rhs_lookup = lookup(rhs, "index matching")?;
        let mut pairs = Vec::new();
        let mut lhs_singles = Vec::new();
        let mut rhs_used = vec![false; rhs.len()];
        for (i, h) in lhs.iter().enumerate() {
            match rhs_lookup.get(h) {
                Some(&j) if !rhs_used[j] => {
                    rhs_used[j] = true;
                    pairs.push((i, j));
                }
                _ => lhs_singles.push(i),
            }
        }
        let rhs_singles = rhs_used
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(j, _)| j)
            .collect();
        debug!(
            "matched {} pairs ({} + {} singles)",
            pairs.len(),
            lhs_singles.len(),
            rhs.len() - pairs.len()
        );
        Ok(IndexMatches {
            pairs,
            singles: [lhs_singles, rhs_singles],
        })
    }

    /// `(lhs_position, rhs_position)` in lhs order.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Unmatched positions of side 0 (lhs) or 1 (rhs).
    pub fn singles(&self, side: usize) -> &[usize] {
        &self.singles[side.min(1)]
    }

    pub fn have_singles(&self) -> bool {
        !self.singles[0].is_empty() || !self.singles[1].is_empty()
    }

    /// Paired positions of one side, in pair order.
    pub fn pair_column(&self, side: usize) -> Vec<usize> {
        self.pairs
            .iter()
            .map(|(i, j)| if side == 0 { *i } else { *j })
            .collect()
    }

    /// Mask over one side that is true for paired positions.
    pub fn pair_selection(&self, side: usize, size: usize) -> Vec<bool> {
        let mut flags = vec![false; size];
        for position in self.pair_column(side) {
            if let Some(flag) = flags.get_mut(position) {
                *flag = true;
            }
        }
        flags
    }

    /// For every rhs position, the lhs position holding the same index.
    ///
    /// Requires a perfect one-to-one matching.
    pub fn permutation(&self) -> Result<Vec<usize>> {
        if self.have_singles() {
            return Err(MillerError::InvalidArgument(format!(
                "index lists do not match one-to-one ({} + {} unmatched)",
                self.singles[0].len(),
                self.singles[1].len()
            )));
        }
        let mut result = vec![0; self.pairs.len()];
        for (i, j) in &self.pairs {
            result[*j] = *i;
        }
        Ok(result)
    }

    /// Indices of the paired reflections, taken from `lhs`.
    pub fn paired_indices(&self, lhs: &[MillerIndex]) -> Vec<MillerIndex> {
        self.pairs.iter().map(|(i, _)| lhs[*i]).collect()
    }

    /// `a[i] + b[j]` for every pair.
    pub fn plus<T>(&self, a: &[T], b: &[T]) -> Vec<T>
    where
        T: Copy + std::ops::Add<Output = T>,
    {
        self.pairs.iter().map(|(i, j)| a[*i] + b[*j]).collect()
    }

    /// `sqrt(a[i]² + b[j]²)` for every pair.
    pub fn additive_sigmas(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        self.pairs
            .iter()
            .map(|(i, j)| a[*i].hypot(b[*j]))
            .collect()
    }
}

/// Friedel pairing of indices already mapped into the anomalous asymmetric unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BijvoetMatches {
    pairs: Vec<(usize, usize)>,
    singles: Vec<usize>,
}

impl BijvoetMatches {
    /// Pair each "+" index with the position of its mate.
    ///
    /// An index is "+" when it is its own Friedel-merged representative. Centric
    /// reflections never pair and are reported as singles.
    pub fn new(space_group: &SpaceGroup, asu_indices: &[MillerIndex]) -> Result<Self> {
        let positions = lookup(asu_indices, "bijvoet matching")?;
        let mut pairs = Vec::new();
        let mut singles = Vec::new();
        for (i, h) in asu_indices.iter().enumerate() {
            if space_group.is_centric_index(h) {
                singles.push(i);
                continue;
            }
            let mate = space_group
                .map_to_asu(&-*h, AnomalousFlag::AnomalousDistinct)
                .index;
            let mate_position = positions.get(&mate).copied();
            match (hemisphere_of(space_group, h), mate_position) {
                (Hemisphere::Plus, Some(j)) => pairs.push((i, j)),
                (Hemisphere::Minus, Some(_)) => {}
                (_, None) => singles.push(i),
            }
        }
        debug!(
            "bijvoet matching: {} pairs, {} singles",
            pairs.len(),
            singles.len()
        );
        Ok(BijvoetMatches { pairs, singles })
    }

    /// `(plus_position, minus_position)` in order of the "+" reflections.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn singles(&self) -> &[usize] {
        &self.singles
    }

    pub fn n_singles(&self) -> usize {
        self.singles.len()
    }

    /// Positions of one hemisphere, in pair order.
    pub fn column(&self, hemisphere: Hemisphere) -> Vec<usize> {
        self.pairs
            .iter()
            .map(|(plus, minus)| match hemisphere {
                Hemisphere::Plus => *plus,
                Hemisphere::Minus => *minus,
            })
            .collect()
    }

    /// "+" indices of the pairs.
    pub fn miller_indices_in_hemisphere(
        &self,
        asu_indices: &[MillerIndex],
        hemisphere: Hemisphere,
    ) -> Vec<MillerIndex> {
        self.column(hemisphere)
            .into_iter()
            .map(|i| asu_indices[i])
            .collect()
    }

    /// `data[+] - data[-]` for every pair.
    pub fn minus(&self, data: &[f64]) -> Vec<f64> {
        self.pairs
            .iter()
            .map(|(plus, minus)| data[*plus] - data[*minus])
            .collect()
    }

    /// `sqrt(s[+]² + s[-]²)` for every pair.
    pub fn additive_sigmas(&self, sigmas: &[f64]) -> Vec<f64> {
        self.pairs
            .iter()
            .map(|(plus, minus)| sigmas[*plus].hypot(sigmas[*minus]))
            .collect()
    }
}

/// Which half of reciprocal space an index lies in, relative to the merged asymmetric unit.
pub fn hemisphere_of(space_group: &SpaceGroup, index: &MillerIndex) -> Hemisphere {
    if space_group.map_to_asu(index, AnomalousFlag::Merged).index == *index {
        Hemisphere::Plus
    } else {
        Hemisphere::Minus
    }
}
