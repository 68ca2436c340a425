use log::debug;

use crate::error::MillerError;
use crate::miller::index::{IndexSpan, MillerIndex};
use crate::miller::miller_array::{MillerArray, MillerData};
use crate::Result;

/// One row per symmetry-unique index, plus how many observations went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEquivalents {
    array: MillerArray,
    redundancies: Vec<usize>,
}

impl MergedEquivalents {
    /// Merge symmetry-equivalent observations of a real-valued array.
    ///
    /// Without sigmas the merged value is the plain mean. With sigmas it is the
    /// 1/σ²-weighted mean and the merged sigma is 1/sqrt(Σw).
    pub fn new(array: &MillerArray) -> Result<Self> {
        let data = array.real_data("merge_equivalents")?;
        let asu = array.set().map_to_asu();
        let span = IndexSpan::new(asu.indices());
        let keys: Vec<u64> = asu.indices().iter().map(|h| span.pack(h)).collect();
        let mut permutation: Vec<usize> = (0..keys.len()).collect();
        permutation.sort_by_key(|i| keys[*i]);

        let weights: Option<Vec<f64>> = match array.sigmas() {
            None => None,
            Some(sigmas) => {
                let mut w = Vec::with_capacity(sigmas.len());
                for (position, s) in sigmas.iter().enumerate() {
                    let s_sq = s * s;
                    if !(s_sq > 0.0) || !s_sq.is_finite() {
                        return Err(MillerError::NonPositiveSigma { position });
                    }
                    w.push(1.0 / s_sq);
                }
                Some(w)
            }
        };

        let mut indices: Vec<MillerIndex> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        let mut merged_sigmas: Vec<f64> = Vec::new();
        let mut redundancies: Vec<usize> = Vec::new();
        let mut start = 0;
        while start < permutation.len() {
            let key = keys[permutation[start]];
            let mut end = start + 1;
            while end < permutation.len() && keys[permutation[end]] == key {
                end += 1;
            }
            let group = &permutation[start..end];
            indices.push(asu.indices()[group[0]]);
            redundancies.push(group.len());
            match &weights {
                None => {
                    let sum: f64 = group.iter().map(|i| data[*i]).sum();
                    values.push(sum / group.len() as f64);
                }
                Some(w) => {
                    let sum_w: f64 = group.iter().map(|i| w[*i]).sum();
                    let sum_wx: f64 = group.iter().map(|i| w[*i] * data[*i]).sum();
                    values.push(sum_wx / sum_w);
                    merged_sigmas.push(1.0 / sum_w.sqrt());
                }
            }
            start = end;
        }
        debug!(
            "merged {} observations into {} unique reflections",
            permutation.len(),
            indices.len()
        );

        let sigmas = weights.map(|_| merged_sigmas);
        let merged = array.derive(asu.with_indices(indices), MillerData::Real(values), sigmas)?;
        Ok(MergedEquivalents {
            array: merged,
            redundancies,
        })
    }

    pub fn array(&self) -> &MillerArray {
        &self.array
    }

    pub fn redundancies(&self) -> &[usize] {
        &self.redundancies
    }

    pub fn into_parts(self) -> (MillerArray, Vec<usize>) {
        (self.array, self.redundancies)
    }
}

impl MillerArray {
    pub fn merge_equivalents(&self) -> Result<MergedEquivalents> {
        MergedEquivalents::new(self)
    }
}
