use log::debug;
use std::sync::Arc;

use crate::error::MillerError;
use crate::interfaces::{AnomalousFlag, BinSlot, ObservationKind};
use crate::miller::binner::{BinnedData, Binner};
use crate::miller::miller_array::{MillerArray, MillerData};
use crate::Result;

fn mean_of(values: &[f64], weights: Option<&[f64]>) -> Result<f64> {
    match weights {
        None => {
            if values.is_empty() {
                return Err(MillerError::Arithmetic("mean of no values".to_string()));
            }
            Ok(values.iter().sum::<f64>() / values.len() as f64)
        }
        Some(w) => {
            let sum_w: f64 = w.iter().sum();
            if sum_w == 0.0 {
                return Err(MillerError::Arithmetic("weights sum to zero".to_string()));
            }
            Ok(values.iter().zip(w).map(|(x, w)| x * w).sum::<f64>() / sum_w)
        }
    }
}

/// Pearson correlation; `None` when either side has no spread or there are no values.
pub fn linear_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 {
        None
    } else {
        Some(sxy / denominator)
    }
}

fn gather(values: &[f64], positions: &[usize]) -> Vec<f64> {
    positions.iter().map(|i| values[*i]).collect()
}

impl MillerArray {
    fn multiplicity_weights(&self, use_multiplicities: bool) -> Option<Vec<f64>> {
        use_multiplicities.then(|| {
            self.set()
                .multiplicities()
                .into_iter()
                .map(|m| m as f64)
                .collect()
        })
    }

    /// Apply `function` per ordinary shell; empty shells give 0.
    fn per_shell<F>(&self, operation: &'static str, mut function: F) -> Result<BinnedData<f64>>
    where
        F: FnMut(&[usize]) -> Result<f64>,
    {
        let binner = Arc::clone(self.set().require_binner(operation)?);
        let slots: Vec<BinSlot> = binner.shells().collect();
        let mut data = Vec::with_capacity(slots.len());
        for slot in &slots {
            let positions = binner.positions(*slot);
            if positions.is_empty() {
                data.push(0.0);
            } else {
                data.push(function(&positions)?);
            }
        }
        BinnedData::new(binner, slots, data)
    }

    fn generic_mean(&self, operation: &'static str, use_multiplicities: bool, square: bool) -> Result<f64> {
        let data = self.real_data(operation)?;
        let values: Vec<f64> = if square {
            data.iter().map(|x| x * x).collect()
        } else {
            data.to_vec()
        };
        let weights = self.multiplicity_weights(use_multiplicities);
        mean_of(&values, weights.as_deref())
    }

    fn generic_mean_binned(
        &self,
        operation: &'static str,
        use_multiplicities: bool,
        square: bool,
    ) -> Result<BinnedData<f64>> {
        let data = self.real_data(operation)?;
        let values: Vec<f64> = if square {
            data.iter().map(|x| x * x).collect()
        } else {
            data.to_vec()
        };
        let weights = self.multiplicity_weights(use_multiplicities);
        self.per_shell(operation, |positions| {
            let w = weights.as_ref().map(|w| gather(w, positions));
            mean_of(&gather(&values, positions), w.as_deref())
        })
    }

    pub fn mean(&self, use_multiplicities: bool) -> Result<f64> {
        self.generic_mean("mean", use_multiplicities, false)
    }

    pub fn mean_binned(&self, use_multiplicities: bool) -> Result<BinnedData<f64>> {
        self.generic_mean_binned("mean_binned", use_multiplicities, false)
    }

    pub fn mean_sq(&self, use_multiplicities: bool) -> Result<f64> {
        self.generic_mean("mean_sq", use_multiplicities, true)
    }

    pub fn mean_sq_binned(&self, use_multiplicities: bool) -> Result<BinnedData<f64>> {
        self.generic_mean_binned("mean_sq_binned", use_multiplicities, true)
    }

    pub fn rms(&self, use_multiplicities: bool) -> Result<f64> {
        Ok(self.mean_sq(use_multiplicities)?.sqrt())
    }

    pub fn rms_binned(&self, use_multiplicities: bool) -> Result<BinnedData<f64>> {
        let mean_sq = self.mean_sq_binned(use_multiplicities)?;
        let rms = mean_sq.data().iter().map(|x| x.sqrt()).collect();
        BinnedData::new(Arc::clone(mean_sq.binner()), mean_sq.slots().to_vec(), rms)
    }

    /// Keep reflections with |x| ≤ cutoff·rms, globally or against their own shell's rms.
    ///
    /// With binning, reflections outside every ordinary shell are always kept.
    pub fn rms_filter(
        &self,
        cutoff_factor: f64,
        use_binning: bool,
        use_multiplicities: bool,
        negate: bool,
    ) -> Result<Self> {
        let abs_data = self.real_data("rms_filter")?.iter().map(|x| x.abs()).collect::<Vec<_>>();
        let keep: Vec<bool> = if !use_binning {
            let rms = self.rms(use_multiplicities)?;
            abs_data.iter().map(|x| *x <= cutoff_factor * rms).collect()
        } else {
            let rms = self.rms_binned(use_multiplicities)?;
            let binner = rms.binner();
            abs_data
                .iter()
                .zip(binner.slots())
                .map(|(x, slot)| match slot {
                    BinSlot::Shell(i) => *x <= cutoff_factor * rms.data()[*i],
                    _ => true,
                })
                .collect()
        };
        self.apply_selection(&keep, negate)
    }

    /// Σ(m·x/ε)/Σm over the whole array.
    pub fn statistical_mean(&self) -> Result<f64> {
        let data = self.real_data("statistical_mean")?;
        self.symmetry()
            .statistical_mean(self.indices(), data, self.anomalous_flag())
    }

    /// Statistical mean per ordinary shell; empty shells give 0.
    pub fn statistical_mean_binned(&self) -> Result<BinnedData<f64>> {
        let data = self.real_data("statistical_mean_binned")?;
        let indices = self.indices();
        let symmetry = Arc::clone(self.symmetry());
        self.per_shell("statistical_mean_binned", |positions| {
            let shell_indices: Vec<_> = positions.iter().map(|i| indices[*i]).collect();
            symmetry.statistical_mean(&shell_indices, &gather(data, positions), self.anomalous_flag())
        })
    }

    /// Subtract each shell's statistical mean intensity from the reflections in that shell.
    pub fn remove_patterson_origin_peak(&self) -> Result<Self> {
        self.require_observation(ObservationKind::Intensity, "remove_patterson_origin_peak")?;
        let means = self.statistical_mean_binned()?;
        let data = self.real_data("remove_patterson_origin_peak")?;
        let binner = means.binner();
        let result: Vec<f64> = data
            .iter()
            .zip(binner.slots())
            .map(|(x, slot)| match slot {
                BinSlot::Shell(i) => x - means.data()[*i],
                _ => *x,
            })
            .collect();
        self.derive(self.set().clone(), MillerData::Real(result), self.sigmas().map(<[f64]>::to_vec))
    }

    /// |F| / sqrt(ε).
    pub fn quasi_normalized_as_normalized(&self) -> Result<Self> {
        self.require_observation(ObservationKind::Amplitude, "quasi_normalized_as_normalized")?;
        let data = self.real_data("quasi_normalized_as_normalized")?;
        let normalized = data
            .iter()
            .zip(self.set().epsilons())
            .map(|(f, eps)| f / (eps as f64).sqrt())
            .collect();
        self.derive(self.set().clone(), MillerData::Real(normalized), None)
    }

    /// Quasi-normalised amplitudes E = sqrt(F² / <F²/ε>), with the shell means
    /// interpolated in d*^`d_star_power`.
    pub fn quasi_normalize_structure_factors(&self, d_star_power: f64) -> Result<Self> {
        let binner = Arc::clone(self.set().require_binner("quasi_normalize_structure_factors")?);
        if binner.n_out_of_range() != 0 {
            return Err(MillerError::ReflectionsOutOfRange {
                count: binner.n_out_of_range(),
            });
        }
        self.require_observation(ObservationKind::Amplitude, "quasi_normalize_structure_factors")?;
        let data = self.real_data("quasi_normalize_structure_factors")?;
        if let Some(position) = data.iter().position(|f| *f < 0.0) {
            return Err(MillerError::InvalidArgument(format!(
                "negative amplitude at position {position}"
            )));
        }
        let epsilons = self.set().epsilons();
        let f_sq_over_epsilon: Vec<f64> = data
            .iter()
            .zip(&epsilons)
            .map(|(f, eps)| f * f / *eps as f64)
            .collect();
        let shell_means = self.per_shell("quasi_normalize_structure_factors", |positions| {
            mean_of(&gather(&f_sq_over_epsilon, positions), None)
        })?;
        let curve = binner.interpolate(shell_means.data(), d_star_power)?;
        if let Some(position) = curve.iter().position(|x| !(*x > 0.0)) {
            return Err(MillerError::Arithmetic(format!(
                "non-positive normalisation curve at position {position}"
            )));
        }
        let normalized = data
            .iter()
            .zip(&curve)
            .map(|(f, mean)| (f * f / mean).sqrt())
            .collect();
        debug!(
            "quasi-normalised {} reflections over {} shells",
            data.len(),
            binner.n_bins()
        );
        self.derive(self.set().clone(), MillerData::Real(normalized), None)
    }

    /// sqrt(2⟨(F+ − F−)²⟩ / ⟨F+² + F−²⟩) over positive data; 0 without Bijvoet pairs.
    pub fn anomalous_signal(&self) -> Result<f64> {
        let data = self.real_data("anomalous_signal")?;
        let positive: Vec<bool> = data.iter().map(|x| *x > 0.0).collect();
        let mut observed = self.apply_selection(&positive, false)?;
        if observed.is_intensity_array() {
            observed = observed.f_sq_as_f()?;
        }
        let (plus, minus) = observed.hemispheres()?;
        let f_plus = plus.real_data("anomalous_signal")?;
        let f_minus = minus.real_data("anomalous_signal")?;
        if f_plus.is_empty() {
            return Ok(0.0);
        }
        let n = f_plus.len() as f64;
        let mean_sq_diff = f_plus
            .iter()
            .zip(f_minus)
            .map(|(p, m)| (p - m) * (p - m))
            .sum::<f64>()
            / n;
        let mean_sum_sq = f_plus
            .iter()
            .zip(f_minus)
            .map(|(p, m)| p * p + m * m)
            .sum::<f64>()
            / n;
        if !(mean_sum_sq > 0.0) {
            return Err(MillerError::Arithmetic(
                "anomalous signal with zero mean square amplitude".to_string(),
            ));
        }
        Ok((2.0 * mean_sq_diff / mean_sum_sq).sqrt())
    }

    /// Anomalous signal for every slot of the attached binner, pseudo-shells included.
    pub fn anomalous_signal_binned(&self) -> Result<BinnedData<f64>> {
        let binner = Arc::clone(self.set().require_binner("anomalous_signal_binned")?);
        let slots = binner.all_slots();
        let mut data = Vec::with_capacity(slots.len());
        for slot in &slots {
            data.push(self.apply_selection(&binner.selection(*slot), false)?.anomalous_signal()?);
        }
        BinnedData::new(binner, slots, data)
    }

    /// Bring two arrays to a common Friedel convention and their shared indices.
    fn correlation_pair(&self, other: &MillerArray) -> Result<(MillerArray, MillerArray)> {
        self.real_data("correlation")?;
        other.real_data("correlation")?;
        let (lhs, rhs) = match (self.anomalous_flag(), other.anomalous_flag()) {
            (AnomalousFlag::Merged, AnomalousFlag::AnomalousDistinct) => (self.as_anomalous()?, other.clone()),
            (AnomalousFlag::AnomalousDistinct, AnomalousFlag::Merged) => (self.clone(), other.as_anomalous()?),
            _ => (self.clone(), other.clone()),
        };
        lhs.common_sets(&rhs)
    }

    /// Pearson correlation over the common reflections.
    pub fn correlation(&self, other: &MillerArray) -> Result<f64> {
        let (lhs, rhs) = self.correlation_pair(other)?;
        linear_correlation(lhs.real_data("correlation")?, rhs.real_data("correlation")?).ok_or_else(|| {
            MillerError::Arithmetic("correlation of constant or empty data".to_string())
        })
    }

    /// Correlation per slot of this array's binning; degenerate slots give `None`.
    pub fn correlation_binned(&self, other: &MillerArray) -> Result<BinnedData<Option<f64>>> {
        self.set().require_binner("correlation_binned")?;
        let (mut lhs, rhs) = self.correlation_pair(other)?;
        lhs.use_binning_of(self.set())?;
        let binner: Arc<Binner> = Arc::clone(lhs.set().require_binner("correlation_binned")?);
        let x = lhs.real_data("correlation")?;
        let y = rhs.real_data("correlation")?;
        let slots = binner.all_slots();
        let data = slots
            .iter()
            .map(|slot| {
                let positions = binner.positions(*slot);
                linear_correlation(&gather(x, &positions), &gather(y, &positions))
            })
            .collect();
        BinnedData::new(binner, slots, data)
    }
}
