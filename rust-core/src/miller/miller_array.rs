use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::ops::Add;
use std::sync::Arc;

use crate::config::{BinningStrategy, F_SQ_AS_F_TOLERANCE};
use crate::error::MillerError;
use crate::interfaces::{AnomalousFlag, Hemisphere, ObservationKind, SortKey, ValueKind};
use crate::miller::binner::Binner;
use crate::miller::index::MillerIndex;
use crate::miller::matching::{BijvoetMatches, IndexMatches};
use crate::miller::miller_set::{check_permutation, check_selection, sort_permutation_by, MillerSet};
use crate::symmetries::change_of_basis::ChangeOfBasis;
use crate::symmetries::crystal_symmetry::CrystalSymmetry;
use crate::Result;

/// Values of a Miller array, real or complex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MillerData {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl MillerData {
    pub fn len(&self) -> usize {
        match self {
            MillerData::Real(v) => v.len(),
            MillerData::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            MillerData::Real(_) => ValueKind::Real,
            MillerData::Complex(_) => ValueKind::Complex,
        }
    }

    /// Gather values at the given positions (assumed in range).
    pub fn select(&self, positions: &[usize]) -> MillerData {
        match self {
            MillerData::Real(v) => MillerData::Real(positions.iter().map(|i| v[*i]).collect()),
            MillerData::Complex(v) => MillerData::Complex(positions.iter().map(|i| v[*i]).collect()),
        }
    }

    /// |x| for real values, the modulus for complex ones.
    pub fn abs(&self) -> Vec<f64> {
        match self {
            MillerData::Real(v) => v.iter().map(|x| x.abs()).collect(),
            MillerData::Complex(v) => v.iter().map(|z| z.norm()).collect(),
        }
    }
}

fn mask_positions(flags: &[bool], negate: bool) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, keep)| **keep != negate)
        .map(|(i, _)| i)
        .collect()
}

/// A Miller set with parallel values, optional sigmas and an observation-kind tag.
#[derive(Debug, Clone, PartialEq)]
pub struct MillerArray {
    set: MillerSet,
    data: MillerData,
    sigmas: Option<Vec<f64>>,
    observation: ObservationKind,
    info: Option<String>,
}

impl MillerArray {
    pub fn new(set: MillerSet, data: MillerData, sigmas: Option<Vec<f64>>) -> Result<Self> {
        if data.len() != set.size() {
            return Err(MillerError::LengthMismatch {
                what: "data",
                expected: set.size(),
                actual: data.len(),
            });
        }
        if let Some(s) = &sigmas {
            if s.len() != set.size() {
                return Err(MillerError::LengthMismatch {
                    what: "sigmas",
                    expected: set.size(),
                    actual: s.len(),
                });
            }
        }
        Ok(MillerArray {
            set,
            data,
            sigmas,
            observation: ObservationKind::Unset,
            info: None,
        })
    }

    pub fn from_real(set: MillerSet, data: Vec<f64>, sigmas: Option<Vec<f64>>) -> Result<Self> {
        MillerArray::new(set, MillerData::Real(data), sigmas)
    }

    pub fn from_complex(set: MillerSet, data: Vec<Complex64>) -> Result<Self> {
        MillerArray::new(set, MillerData::Complex(data), None)
    }

    pub fn with_observation_kind(mut self, observation: ObservationKind) -> Self {
        self.observation = observation;
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// New array that inherits observation kind and info from `self`.
    pub(crate) fn derive(&self, set: MillerSet, data: MillerData, sigmas: Option<Vec<f64>>) -> Result<Self> {
        let mut result = MillerArray::new(set, data, sigmas)?;
        result.observation = self.observation;
        result.info = self.info.clone();
        Ok(result)
    }

    // ---------- accessors ----------

    pub fn set(&self) -> &MillerSet {
        &self.set
    }

    pub fn symmetry(&self) -> &Arc<CrystalSymmetry> {
        self.set.symmetry()
    }

    pub fn indices(&self) -> &[MillerIndex] {
        self.set.indices()
    }

    pub fn anomalous_flag(&self) -> AnomalousFlag {
        self.set.anomalous_flag()
    }

    pub fn size(&self) -> usize {
        self.set.size()
    }

    pub fn data(&self) -> &MillerData {
        &self.data
    }

    pub fn sigmas(&self) -> Option<&[f64]> {
        self.sigmas.as_deref()
    }

    pub fn observation_kind(&self) -> ObservationKind {
        self.observation
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn value_kind(&self) -> ValueKind {
        self.data.value_kind()
    }

    pub fn is_real(&self) -> bool {
        self.value_kind() == ValueKind::Real
    }

    pub fn is_complex(&self) -> bool {
        self.value_kind() == ValueKind::Complex
    }

    pub fn is_amplitude_array(&self) -> bool {
        self.observation == ObservationKind::Amplitude
    }

    pub fn is_intensity_array(&self) -> bool {
        self.observation == ObservationKind::Intensity
    }

    pub fn real_data(&self, operation: &'static str) -> Result<&[f64]> {
        match &self.data {
            MillerData::Real(v) => Ok(v),
            MillerData::Complex(_) => Err(MillerError::ValueKindMismatch {
                operation,
                found: ValueKind::Complex,
            }),
        }
    }

    pub fn complex_data(&self, operation: &'static str) -> Result<&[Complex64]> {
        match &self.data {
            MillerData::Complex(v) => Ok(v),
            MillerData::Real(_) => Err(MillerError::ValueKindMismatch {
                operation,
                found: ValueKind::Real,
            }),
        }
    }

    pub(crate) fn require_sigmas(&self, operation: &'static str) -> Result<&[f64]> {
        self.sigmas
            .as_deref()
            .ok_or(MillerError::MissingSigmas { operation })
    }

    /// Accept `Unset` or the given kind.
    pub(crate) fn require_observation(&self, kind: ObservationKind, operation: &'static str) -> Result<()> {
        if self.observation == ObservationKind::Unset || self.observation == kind {
            Ok(())
        } else {
            Err(MillerError::ObservationKindMismatch {
                operation,
                found: self.observation,
            })
        }
    }

    // ---------- binning ----------

    pub fn binner(&self) -> Option<&Arc<Binner>> {
        self.set.binner()
    }

    pub fn setup_binner(
        &mut self,
        strategy: BinningStrategy,
        d_max: Option<f64>,
        d_min: Option<f64>,
    ) -> Result<Arc<Binner>> {
        self.set.setup_binner(strategy, d_max, d_min)
    }

    pub fn use_binning_of(&mut self, other: &MillerSet) -> Result<()> {
        self.set.use_binning_of(other)
    }

    pub fn use_binner_of(&mut self, other: &MillerSet) -> Result<()> {
        self.set.use_binner_of(other)
    }

    /// Independent copy; symmetry, indices, values and sigmas are all duplicated.
    pub fn deep_copy(&self) -> Self {
        MillerArray {
            set: self.set.deep_copy(),
            data: self.data.clone(),
            sigmas: self.sigmas.clone(),
            observation: self.observation,
            info: self.info.clone(),
        }
    }

    // ---------- selection ----------

    pub fn apply_selection(&self, flags: &[bool], negate: bool) -> Result<Self> {
        check_selection(flags, self.size())?;
        let positions = mask_positions(flags, negate);
        self.select_unchecked(&positions, self.anomalous_flag())
    }

    /// Reorder or subset by positions; `result[i]` is `self[permutation[i]]`.
    pub fn select(&self, permutation: &[usize]) -> Result<Self> {
        self.select_with_flag(permutation, self.anomalous_flag())
    }

    pub fn select_with_flag(&self, permutation: &[usize], anomalous: AnomalousFlag) -> Result<Self> {
        check_permutation(permutation, self.size())?;
        self.select_unchecked(permutation, anomalous)
    }

    fn select_unchecked(&self, positions: &[usize], anomalous: AnomalousFlag) -> Result<Self> {
        let indices = positions.iter().map(|i| self.indices()[*i]).collect();
        let set = self.set.with_indices(indices).with_anomalous_flag(anomalous);
        let sigmas = self
            .sigmas
            .as_ref()
            .map(|s| positions.iter().map(|i| s[*i]).collect());
        self.derive(set, self.data.select(positions), sigmas)
    }

    pub fn sort_permutation(&self, key: SortKey, reverse: bool) -> Result<Vec<usize>> {
        Ok(match key {
            SortKey::Resolution => self.set.sort_permutation(reverse),
            SortKey::Data => sort_permutation_by(self.real_data("sort by data")?, !reverse),
            SortKey::Abs => sort_permutation_by(&self.data.abs(), !reverse),
        })
    }

    pub fn sort(&self, key: SortKey, reverse: bool) -> Result<Self> {
        let permutation = self.sort_permutation(key, reverse)?;
        self.select_unchecked(&permutation, self.anomalous_flag())
    }

    pub fn eliminate_sys_absent(&self) -> Result<Self> {
        let absent = self.set.sys_absent_flags();
        if !absent.iter().any(|a| *a) {
            return Ok(self.clone());
        }
        self.apply_selection(&absent, true)
    }

    pub fn resolution_filter(&self, d_max: Option<f64>, d_min: Option<f64>, negate: bool) -> Result<Self> {
        self.apply_selection(&self.set.resolution_filter_selection(d_max, d_min), negate)
    }

    /// Keep reflections with |x| ≥ cutoff·σ, or the complement when `negate`.
    pub fn sigma_filter(&self, cutoff_factor: f64, negate: bool) -> Result<Self> {
        let sigmas = self.require_sigmas("sigma_filter")?;
        if let Some(position) = sigmas.iter().position(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err(MillerError::NonPositiveSigma { position });
        }
        let flags: Vec<bool> = self
            .data
            .abs()
            .iter()
            .zip(sigmas)
            .map(|(x, s)| *x >= s * cutoff_factor)
            .collect();
        self.apply_selection(&flags, negate)
    }

    // ---------- intensity / amplitude ----------

    /// Intensities to amplitudes.
    ///
    /// Intensities below [`F_SQ_AS_F_TOLERANCE`] give F = 0 and σF = sqrt(σI);
    /// the rest give F = sqrt(I) and σF = σI / 2F.
    pub fn f_sq_as_f(&self) -> Result<Self> {
        self.require_observation(ObservationKind::Intensity, "f_sq_as_f")?;
        let f_sq = self.real_data("f_sq_as_f")?;
        let negligible: Vec<bool> = f_sq.iter().map(|i| *i < F_SQ_AS_F_TOLERANCE).collect();
        let f: Vec<f64> = f_sq
            .iter()
            .zip(&negligible)
            .map(|(i, small)| if *small { 0.0 } else { i.sqrt() })
            .collect();
        let sigmas = self.sigmas.as_ref().map(|sigma_f_sq| {
            f.iter()
                .zip(sigma_f_sq)
                .zip(&negligible)
                .map(|((f, s), small)| if *small { s.sqrt() } else { s / (2.0 * f) })
                .collect()
        });
        Ok(self
            .derive(self.set.clone(), MillerData::Real(f), sigmas)?
            .with_observation_kind(ObservationKind::Amplitude))
    }

    /// Amplitudes to intensities: I = F², σI = 2Fσ.
    pub fn f_as_f_sq(&self) -> Result<Self> {
        self.require_observation(ObservationKind::Amplitude, "f_as_f_sq")?;
        let f = self.real_data("f_as_f_sq")?;
        let f_sq = f.iter().map(|x| x * x).collect();
        let sigmas = self
            .sigmas
            .as_ref()
            .map(|s| f.iter().zip(s).map(|(f, s)| 2.0 * f * s).collect());
        Ok(self
            .derive(self.set.clone(), MillerData::Real(f_sq), sigmas)?
            .with_observation_kind(ObservationKind::Intensity))
    }

    pub fn as_amplitude_array(&self) -> Result<Self> {
        if self.is_intensity_array() {
            self.f_sq_as_f()
        } else {
            Ok(self.clone())
        }
    }

    // ---------- complex values ----------

    /// |x| (or |F|), sigmas kept.
    pub fn abs(&self) -> Result<Self> {
        self.derive(self.set.clone(), MillerData::Real(self.data.abs()), self.sigmas.clone())
    }

    pub fn amplitudes(&self) -> Result<Self> {
        let data = self.complex_data("amplitudes")?;
        if self.sigmas.is_some() {
            return Err(MillerError::InvalidArgument(
                "amplitudes of an array with sigmas".to_string(),
            ));
        }
        let amplitudes = data.iter().map(|z| z.norm()).collect();
        Ok(self
            .derive(self.set.clone(), MillerData::Real(amplitudes), None)?
            .with_observation_kind(ObservationKind::Amplitude))
    }

    pub fn phases(&self, deg: bool) -> Result<Self> {
        let data = self.complex_data("phases")?;
        let scale = if deg { 180.0 / PI } else { 1.0 };
        let phases = data.iter().map(|z| z.arg() * scale).collect();
        Ok(self
            .derive(self.set.clone(), MillerData::Real(phases), None)?
            .with_observation_kind(ObservationKind::Unset))
    }

    // ---------- symmetry ----------

    /// Move every reflection into the asymmetric unit, shifting complex phases to match.
    pub fn map_to_asu(&self) -> Result<Self> {
        let group = self.set.space_group();
        let anomalous = self.anomalous_flag();
        let mapped: Vec<_> = self
            .indices()
            .iter()
            .map(|h| group.map_to_asu(h, anomalous))
            .collect();
        let data = match &self.data {
            MillerData::Real(v) => MillerData::Real(v.clone()),
            MillerData::Complex(v) => MillerData::Complex(
                v.iter()
                    .zip(&mapped)
                    .map(|(f, asu)| asu.apply_to_complex(*f))
                    .collect(),
            ),
        };
        let set = self.set.with_indices(mapped.iter().map(|asu| asu.index).collect());
        self.derive(set, data, self.sigmas.clone())
    }

    /// Full P 1 orbit of every reflection, carrying real values, sigmas or complex phases.
    pub fn expand_to_p1(&self) -> Result<Self> {
        let images = self.set.p1_images()?;
        let positions: Vec<usize> = images.iter().map(|image| image.source).collect();
        let data = match &self.data {
            MillerData::Real(v) => MillerData::Real(positions.iter().map(|i| v[*i]).collect()),
            MillerData::Complex(v) => MillerData::Complex(
                images
                    .iter()
                    .map(|image| {
                        let shifted = v[image.source]
                            * Complex64::from_polar(1.0, -2.0 * PI * image.phase_shift);
                        if image.friedel_flipped {
                            shifted.conj()
                        } else {
                            shifted
                        }
                    })
                    .collect(),
            ),
        };
        let sigmas = self
            .sigmas
            .as_ref()
            .map(|s| positions.iter().map(|i| s[*i]).collect());
        let set = MillerSet::new(
            Arc::new(self.symmetry().cell_equivalent_p1()),
            images.iter().map(|image| image.index).collect(),
            self.anomalous_flag(),
        );
        debug!("expand_to_p1: {} -> {} reflections", self.size(), set.size());
        self.derive(set, data, sigmas)
    }

    /// Reindex real data into a new basis.
    pub fn change_basis(&self, cb: &ChangeOfBasis) -> Result<Self> {
        let data = self.real_data("change_basis")?.to_vec();
        let set = self.set.change_basis(cb)?;
        self.derive(set, MillerData::Real(data), self.sigmas.clone())
    }

    /// Same data under the Patterson group; complex values become amplitudes.
    pub fn patterson_symmetry(&self) -> Result<Self> {
        let set = self.set.patterson_symmetry()?;
        match &self.data {
            MillerData::Real(v) => self.derive(set, MillerData::Real(v.clone()), self.sigmas.clone()),
            MillerData::Complex(_) => Ok(self
                .derive(set, MillerData::Real(self.data.abs()), self.sigmas.clone())?
                .with_observation_kind(ObservationKind::Amplitude)),
        }
    }

    /// Add the Friedel mate of every acentric reflection.
    pub fn as_anomalous(&self) -> Result<Self> {
        match self.anomalous_flag() {
            AnomalousFlag::AnomalousDistinct => return Ok(self.clone()),
            AnomalousFlag::Unset => {
                return Err(MillerError::UnresolvedAnomalousFlag {
                    operation: "as_anomalous",
                })
            }
            AnomalousFlag::Merged => {}
        }
        let acentric: Vec<usize> = self
            .set
            .centric_flags()
            .iter()
            .enumerate()
            .filter(|(_, centric)| !**centric)
            .map(|(i, _)| i)
            .collect();
        let mut indices = self.indices().to_vec();
        indices.extend(acentric.iter().map(|i| -self.indices()[*i]));
        let data = match &self.data {
            MillerData::Real(v) => {
                let mut out = v.clone();
                out.extend(acentric.iter().map(|i| v[*i]));
                MillerData::Real(out)
            }
            MillerData::Complex(v) => {
                let mut out = v.clone();
                out.extend(acentric.iter().map(|i| v[*i].conj()));
                MillerData::Complex(out)
            }
        };
        let sigmas = self.sigmas.as_ref().map(|s| {
            let mut out = s.clone();
            out.extend(acentric.iter().map(|i| s[*i]));
            out
        });
        let set = self
            .set
            .with_indices(indices)
            .with_anomalous_flag(AnomalousFlag::AnomalousDistinct);
        self.derive(set, data, sigmas)
    }

    // ---------- pairing with other sets ----------

    fn check_compatible(&self, other: &MillerSet, operation: &'static str) -> Result<()> {
        if !self.symmetry().is_similar_symmetry(other.symmetry()) {
            return Err(MillerError::IncompatibleSymmetry(format!(
                "{operation}: crystal symmetries differ"
            )));
        }
        if self.anomalous_flag() != other.anomalous_flag() {
            return Err(MillerError::AnomalousFlagMismatch {
                operation,
                found: other.anomalous_flag(),
            });
        }
        Ok(())
    }

    /// Reorder the data onto `other`'s indices, which must be a permutation of ours.
    pub fn adopt_set(&self, other: &MillerSet) -> Result<Self> {
        self.check_compatible(other, "adopt_set")?;
        if self.size() != other.size() {
            return Err(MillerError::LengthMismatch {
                what: "adopted set",
                expected: self.size(),
                actual: other.size(),
            });
        }
        let permutation = IndexMatches::new(self.indices(), other.indices())?.permutation()?;
        let sigmas = self
            .sigmas
            .as_ref()
            .map(|s| permutation.iter().map(|i| s[*i]).collect());
        self.derive(other.clone(), self.data.select(&permutation), sigmas)
    }

    /// Reflections whose index also occurs in `other`, in our order.
    pub fn common_set(&self, other: &MillerArray) -> Result<Self> {
        self.check_compatible(&other.set, "common_set")?;
        let matches = IndexMatches::new(self.indices(), other.indices())?;
        self.apply_selection(&matches.pair_selection(0, self.size()), false)
    }

    /// Both arrays restricted to their shared indices, position-aligned.
    pub fn common_sets(&self, other: &MillerArray) -> Result<(Self, Self)> {
        self.check_compatible(&other.set, "common_sets")?;
        let matches = IndexMatches::new(self.indices(), other.indices())?;
        Ok((
            self.select(&matches.pair_column(0))?,
            other.select(&matches.pair_column(1))?,
        ))
    }

    /// Index-matched sum; sigmas combine in quadrature when both sides have them.
    pub fn add_array(&self, other: &MillerArray) -> Result<Self> {
        let matches = IndexMatches::new(self.indices(), other.indices())?;
        let data = match (&self.data, &other.data) {
            (MillerData::Real(a), MillerData::Real(b)) => MillerData::Real(matches.plus(a, b)),
            (MillerData::Complex(a), MillerData::Complex(b)) => MillerData::Complex(matches.plus(a, b)),
            (_, other_data) => {
                return Err(MillerError::ValueKindMismatch {
                    operation: "add_array",
                    found: other_data.value_kind(),
                })
            }
        };
        let sigmas = match (&self.sigmas, &other.sigmas) {
            (Some(a), Some(b)) => Some(matches.additive_sigmas(a, b)),
            _ => None,
        };
        let set = self.set.with_indices(matches.paired_indices(self.indices()));
        self.derive(set, data, sigmas)
    }

    // ---------- Friedel pairs ----------

    pub(crate) fn bijvoet_split(&self) -> Result<(MillerArray, BijvoetMatches)> {
        if self.anomalous_flag() == AnomalousFlag::Merged {
            return Err(MillerError::AnomalousFlagMismatch {
                operation: "match_bijvoet_mates",
                found: AnomalousFlag::Merged,
            });
        }
        let asu = self.map_to_asu()?;
        let matches = BijvoetMatches::new(asu.set.space_group(), asu.indices())?;
        Ok((asu, matches))
    }

    /// F(+) − F(−) per Bijvoet pair, on the "+" indices.
    pub fn anomalous_differences(&self) -> Result<Self> {
        self.require_observation(ObservationKind::Amplitude, "anomalous_differences")?;
        let (asu, matches) = self.bijvoet_split()?;
        let data = asu.real_data("anomalous_differences")?;
        let indices = matches.miller_indices_in_hemisphere(asu.indices(), Hemisphere::Plus);
        let sigmas = asu.sigmas.as_ref().map(|s| matches.additive_sigmas(s));
        let set = asu
            .set
            .with_indices(indices)
            .with_anomalous_flag(AnomalousFlag::Merged);
        self.derive(set, MillerData::Real(matches.minus(data)), sigmas)
    }

    /// The paired "+" and "−" reflections as two position-aligned merged arrays.
    pub fn hemispheres(&self) -> Result<(Self, Self)> {
        let (asu, matches) = self.bijvoet_split()?;
        Ok((
            asu.select_with_flag(&matches.column(Hemisphere::Plus), AnomalousFlag::Merged)?,
            asu.select_with_flag(&matches.column(Hemisphere::Minus), AnomalousFlag::Merged)?,
        ))
    }

    pub fn hemisphere(&self, hemisphere: Hemisphere) -> Result<Self> {
        let (asu, matches) = self.bijvoet_split()?;
        asu.select_with_flag(&matches.column(hemisphere), AnomalousFlag::Merged)
    }

    /// One line per reflection: index, value and sigma.
    pub fn show_array(&self) -> String {
        let mut out = String::new();
        for (i, h) in self.indices().iter().enumerate() {
            let value = match &self.data {
                MillerData::Real(v) => format!("{}", v[i]),
                MillerData::Complex(v) => format!("{}", v[i]),
            };
            match &self.sigmas {
                Some(s) => out.push_str(&format!("{h} {value} {}\n", s[i])),
                None => out.push_str(&format!("{h} {value}\n")),
            }
        }
        out
    }
}

impl Add<f64> for &MillerArray {
    type Output = MillerArray;

    fn add(self, value: f64) -> MillerArray {
        let data = match &self.data {
            MillerData::Real(v) => MillerData::Real(v.iter().map(|x| x + value).collect()),
            MillerData::Complex(v) => MillerData::Complex(v.iter().map(|z| *z + value).collect()),
        };
        MillerArray {
            data,
            ..self.clone()
        }
    }
}

impl fmt::Display for MillerArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Miller array info: {}", self.info.as_deref().unwrap_or("None"))?;
        writeln!(f, "Observation type: {:?}", self.observation)?;
        writeln!(f, "Type of data: {:?}, size={}", self.value_kind(), self.data.len())?;
        match &self.sigmas {
            Some(s) => writeln!(f, "Type of sigmas: Real, size={}", s.len())?,
            None => writeln!(f, "Type of sigmas: None")?,
        }
        write!(f, "{}", self.set)
    }
}
