use log::debug;
use std::fmt;
use std::sync::Arc;

use crate::config::{BinningStrategy, COMPLETE_SET_TOLERANCE};
use crate::error::MillerError;
use crate::interfaces::{AnomalousCriterion, AnomalousFlag};
use crate::lattice::unit_cell::UnitCell;
use crate::miller::binner::{BinnedData, Binner, Binning};
use crate::miller::index::MillerIndex;
use crate::miller::matching::BijvoetMatches;
use crate::symmetries::change_of_basis::ChangeOfBasis;
use crate::symmetries::crystal_symmetry::CrystalSymmetry;
use crate::symmetries::index_generator::generate_indices;
use crate::symmetries::space_group::SpaceGroup;
use crate::Result;

/// One member of a P 1 expansion: where it came from and how to carry data along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct P1Image {
    /// Position of the source reflection.
    pub source: usize,
    pub index: MillerIndex,
    /// h·t in turns of the operation that generated the image.
    pub phase_shift: f64,
    pub friedel_flipped: bool,
}

/// Ordered Miller indices bound to a crystal symmetry and a Friedel convention.
#[derive(Debug, Clone)]
pub struct MillerSet {
    symmetry: Arc<CrystalSymmetry>,
    indices: Vec<MillerIndex>,
    anomalous: AnomalousFlag,
    binner: Option<Arc<Binner>>,
}

impl PartialEq for MillerSet {
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices
            && self.anomalous == other.anomalous
            && (Arc::ptr_eq(&self.symmetry, &other.symmetry) || self.symmetry == other.symmetry)
    }
}

impl MillerSet {
    pub fn new(
        symmetry: Arc<CrystalSymmetry>,
        indices: Vec<MillerIndex>,
        anomalous: AnomalousFlag,
    ) -> Self {
        MillerSet {
            symmetry,
            indices,
            anomalous,
            binner: None,
        }
    }

    /// Every observable index to `d_min`.
    pub fn build(symmetry: Arc<CrystalSymmetry>, anomalous: AnomalousFlag, d_min: f64) -> Result<Self> {
        let indices = generate_indices(&symmetry, anomalous, d_min)?;
        Ok(MillerSet::new(symmetry, indices, anomalous))
    }

    /// Same symmetry and convention, different indices. The binner is not carried over.
    pub fn with_indices(&self, indices: Vec<MillerIndex>) -> Self {
        MillerSet::new(Arc::clone(&self.symmetry), indices, self.anomalous)
    }

    pub fn with_anomalous_flag(&self, anomalous: AnomalousFlag) -> Self {
        MillerSet {
            anomalous,
            ..self.clone()
        }
    }

    pub fn with_symmetry(&self, symmetry: Arc<CrystalSymmetry>) -> Self {
        MillerSet::new(symmetry, self.indices.clone(), self.anomalous)
    }

    /// Independent copy that shares nothing with `self`, binner excluded.
    pub fn deep_copy(&self) -> Self {
        MillerSet::new(
            Arc::new(CrystalSymmetry::clone(&self.symmetry)),
            self.indices.clone(),
            self.anomalous,
        )
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

    pub fn indices(&self) -> &[MillerIndex] {
        &self.indices
    }

    pub fn anomalous_flag(&self) -> AnomalousFlag {
        self.anomalous
    }

    pub fn size(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn binner(&self) -> Option<&Arc<Binner>> {
        self.binner.as_ref()
    }

    pub(crate) fn require_binner(&self, operation: &'static str) -> Result<&Arc<Binner>> {
        self.binner
            .as_ref()
            .ok_or(MillerError::MissingBinner { operation })
    }

    pub(crate) fn require_resolved(&self, operation: &'static str) -> Result<()> {
        if self.anomalous.is_resolved() {
            Ok(())
        } else {
            Err(MillerError::UnresolvedAnomalousFlag { operation })
        }
    }

    // ---------- per-index quantities ----------

    pub fn d_spacings(&self) -> Vec<f64> {
        self.indices.iter().map(|h| self.unit_cell().d(h)).collect()
    }

    pub fn d_star_sq(&self) -> Vec<f64> {
        self.indices.iter().map(|h| self.unit_cell().d_star_sq(h)).collect()
    }

    pub fn multiplicities(&self) -> Vec<usize> {
        self.indices
            .iter()
            .map(|h| self.space_group().multiplicity(h, self.anomalous))
            .collect()
    }

    pub fn epsilons(&self) -> Vec<usize> {
        self.indices.iter().map(|h| self.space_group().epsilon(h)).collect()
    }

    pub fn centric_flags(&self) -> Vec<bool> {
        self.indices
            .iter()
            .map(|h| self.space_group().is_centric_index(h))
            .collect()
    }

    pub fn sys_absent_flags(&self) -> Vec<bool> {
        self.indices
            .iter()
            .map(|h| self.space_group().is_sys_absent(h))
            .collect()
    }

    /// `(d_max, d_min)` over the set.
    pub fn resolution_range(&self) -> Result<(f64, f64)> {
        let d_star_sq = self.d_star_sq();
        let (lo, hi) = d_star_sq
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(*x), hi.max(*x)));
        if d_star_sq.is_empty() {
            return Err(MillerError::InvalidArgument(
                "resolution range of an empty set".to_string(),
            ));
        }
        let as_d = |x: f64| if x > 0.0 { 1.0 / x.sqrt() } else { f64::INFINITY };
        Ok((as_d(lo), as_d(hi)))
    }

    pub fn d_min(&self) -> Result<f64> {
        self.resolution_range().map(|(_, d_min)| d_min)
    }

    // ---------- symmetry reduction ----------

    /// Rewrite every index to its asymmetric-unit representative. `Unset` is treated as distinct.
    pub fn map_to_asu(&self) -> Self {
        let group = self.space_group();
        let indices = self
            .indices
            .iter()
            .map(|h| group.map_to_asu(h, self.anomalous).index)
            .collect();
        self.with_indices(indices)
    }

    /// Every member of the P 1 orbit of every index, Friedel-reduced when merged.
    pub fn p1_images(&self) -> Result<Vec<P1Image>> {
        self.require_resolved("expand_to_p1")?;
        let p1 = SpaceGroup::p1();
        let merged = !self.anomalous.is_anomalous_or_unset();
        let mut images = Vec::with_capacity(self.indices.len() * self.space_group().order_p());
        let mut seen: Vec<MillerIndex> = Vec::new();
        for (source, h) in self.indices.iter().enumerate() {
            seen.clear();
            for op in self.space_group().smx() {
                let image = op.apply_to_index(h);
                let phase_shift = op.phase_shift(h);
                let (index, friedel_flipped) = if merged && !p1.is_in_asu(&image, self.anomalous) {
                    (-image, true)
                } else {
                    (image, false)
                };
                if seen.contains(&index) {
                    continue;
                }
                seen.push(index);
                images.push(P1Image {
                    source,
                    index,
                    phase_shift,
                    friedel_flipped,
                });
            }
        }
        Ok(images)
    }

    /// Same reflections described in space group P 1.
    pub fn expand_to_p1(&self) -> Result<Self> {
        let indices = self.p1_images()?.into_iter().map(|image| image.index).collect();
        Ok(MillerSet::new(
            Arc::new(self.symmetry.cell_equivalent_p1()),
            indices,
            self.anomalous,
        ))
    }

    pub fn change_basis(&self, cb: &ChangeOfBasis) -> Result<Self> {
        let symmetry = self.symmetry.change_basis(cb)?;
        Ok(MillerSet::new(
            Arc::new(symmetry),
            cb.apply_all(&self.indices),
            self.anomalous,
        ))
    }

    /// Same indices under the Patterson group. Only Friedel-merged sets have one.
    pub fn patterson_symmetry(&self) -> Result<Self> {
        if self.anomalous != AnomalousFlag::Merged {
            return Err(MillerError::AnomalousFlagMismatch {
                operation: "patterson_symmetry",
                found: self.anomalous,
            });
        }
        Ok(self.with_symmetry(Arc::new(self.symmetry.patterson_symmetry())))
    }

    pub fn is_patterson_symmetry(&self) -> bool {
        self.space_group().is_patterson_group()
    }

    // ---------- selection ----------

    pub fn all_selection(&self) -> Vec<bool> {
        vec![true; self.indices.len()]
    }

    pub fn apply_selection(&self, flags: &[bool], negate: bool) -> Result<Self> {
        check_selection(flags, self.indices.len())?;
        let indices = self
            .indices
            .iter()
            .zip(flags)
            .filter(|(_, keep)| **keep != negate)
            .map(|(h, _)| *h)
            .collect();
        Ok(self.with_indices(indices))
    }

    /// Reorder or subset by positions.
    pub fn select(&self, permutation: &[usize]) -> Result<Self> {
        check_permutation(permutation, self.indices.len())?;
        Ok(self.with_indices(permutation.iter().map(|i| self.indices[*i]).collect()))
    }

    /// Keep reflections with `d_min ≤ d ≤ d_max` (each bound optional).
    pub fn resolution_filter_selection(&self, d_max: Option<f64>, d_min: Option<f64>) -> Vec<bool> {
        self.d_spacings()
            .iter()
            .map(|d| d_max.map_or(true, |limit| *d <= limit) && d_min.map_or(true, |limit| *d >= limit))
            .collect()
    }

    pub fn resolution_filter(&self, d_max: Option<f64>, d_min: Option<f64>, negate: bool) -> Result<Self> {
        self.apply_selection(&self.resolution_filter_selection(d_max, d_min), negate)
    }

    /// Drop systematically absent reflections, or keep only those when `negate`.
    pub fn remove_systematic_absences(&self, negate: bool) -> Result<Self> {
        self.apply_selection(&self.sys_absent_flags(), !negate)
    }

    /// Stable permutation by d*², lowest resolution first unless `reverse`.
    pub fn sort_permutation(&self, reverse: bool) -> Vec<usize> {
        let d_star_sq = self.d_star_sq();
        sort_permutation_by(&d_star_sq, reverse)
    }

    pub fn sort(&self, reverse: bool) -> Self {
        let permutation = self.sort_permutation(reverse);
        self.with_indices(permutation.iter().map(|i| self.indices[*i]).collect())
    }

    // ---------- Friedel pairs ----------

    /// Map to the anomalous asymmetric unit and pair Friedel mates.
    ///
    /// Friedel-merged sets have no mates to pair; `Unset` is promoted to distinct.
    pub fn match_bijvoet_mates(&self) -> Result<(MillerSet, BijvoetMatches)> {
        if self.anomalous == AnomalousFlag::Merged {
            return Err(MillerError::AnomalousFlagMismatch {
                operation: "match_bijvoet_mates",
                found: self.anomalous,
            });
        }
        let asu = self.map_to_asu();
        let matches = BijvoetMatches::new(self.space_group(), asu.indices())?;
        Ok((asu, matches))
    }

    pub fn n_bijvoet_pairs(&self) -> Result<usize> {
        Ok(self.match_bijvoet_mates()?.1.pairs().len())
    }

    /// Choose a Friedel convention from the number of Bijvoet pairs present.
    pub fn auto_anomalous(&self, criterion: AnomalousCriterion) -> Result<Self> {
        let n_pairs = self.with_anomalous_flag(AnomalousFlag::AnomalousDistinct).n_bijvoet_pairs()?;
        let anomalous = match criterion {
            AnomalousCriterion::AnyPairs => n_pairs > 0,
            AnomalousCriterion::MinPairs(min) => n_pairs >= min,
            AnomalousCriterion::MinFraction(fraction) => {
                if self.indices.is_empty() {
                    return Err(MillerError::Arithmetic(
                        "Bijvoet pair fraction of an empty set".to_string(),
                    ));
                }
                2.0 * n_pairs as f64 / self.indices.len() as f64 >= fraction
            }
        };
        debug!("auto_anomalous: {n_pairs} pairs, anomalous = {anomalous}");
        Ok(self.with_anomalous_flag(AnomalousFlag::from_bool(anomalous)))
    }

    // ---------- completeness ----------

    /// Complete set to this set's d_min, slightly widened.
    pub fn complete_set(&self, tolerance: f64) -> Result<Self> {
        self.require_resolved("complete_set")?;
        let d_min = self.d_min()? * (1.0 - tolerance);
        MillerSet::build(Arc::clone(&self.symmetry), self.anomalous, d_min)
    }

    pub fn completeness(&self) -> Result<f64> {
        let complete = self.complete_set(COMPLETE_SET_TOLERANCE)?;
        if complete.is_empty() {
            return Err(MillerError::Arithmetic("complete set is empty".to_string()));
        }
        Ok(self.size() as f64 / complete.size() as f64)
    }

    /// `(given, complete)` reflection counts for every slot of the attached binner.
    pub fn completeness_binned(&self) -> Result<BinnedData<(usize, usize)>> {
        let binner = self.require_binner("completeness_binned")?;
        let mut complete = self.complete_set(COMPLETE_SET_TOLERANCE)?;
        complete.use_binning_of(self)?;
        let complete_binner = complete.require_binner("completeness_binned")?;
        let slots = binner.all_slots();
        let data = slots
            .iter()
            .map(|slot| (binner.count(*slot), complete_binner.count(*slot)))
            .collect();
        BinnedData::new(Arc::clone(binner), slots, data)
    }

    /// Text table of binned completeness, one line per slot.
    pub fn show_completeness_in_bins(&self) -> Result<String> {
        let binned = self.completeness_binned()?;
        let fractions: Vec<String> = binned
            .data()
            .iter()
            .map(|(given, complete)| format!("{given}/{complete}"))
            .collect();
        let width = fractions.iter().map(String::len).max().unwrap_or(0);
        let mut out = String::new();
        for ((slot, (given, complete)), fraction) in
            binned.slots().iter().zip(binned.data()).zip(&fractions)
        {
            out.push_str(&binned.binner().bin_legend(*slot));
            out.push_str(&format!(" {fraction:>width$}"));
            if *complete != 0 {
                out.push_str(&format!(" = {:8.4}", *given as f64 / *complete as f64));
            }
            out.push('\n');
        }
        Ok(out)
    }

    // ---------- binning ----------

    /// Bin the set's own indices and attach the binner.
    pub fn setup_binner(
        &mut self,
        strategy: BinningStrategy,
        d_max: Option<f64>,
        d_min: Option<f64>,
    ) -> Result<Arc<Binner>> {
        let n_bins = strategy.n_bins(self.indices.len())?;
        let binning = Binning::new(self.unit_cell(), n_bins, &self.indices, d_max, d_min)?;
        let binner = Arc::new(Binner::new(binning, &self.indices));
        self.binner = Some(Arc::clone(&binner));
        Ok(binner)
    }

    /// Re-bin this set's indices with another set's shell limits.
    pub fn use_binning_of(&mut self, other: &MillerSet) -> Result<()> {
        let binning = other.require_binner("use_binning_of")?.binning().clone();
        self.binner = Some(Arc::new(Binner::new(binning, &self.indices)));
        Ok(())
    }

    /// Share another set's binner. The index lists must be identical.
    pub fn use_binner_of(&mut self, other: &MillerSet) -> Result<()> {
        let binner = other.require_binner("use_binner_of")?;
        if self.indices != other.indices {
            return Err(MillerError::InvalidArgument(
                "use_binner_of requires identical indices".to_string(),
            ));
        }
        self.binner = Some(Arc::clone(binner));
        Ok(())
    }

    pub fn clear_binner(&mut self) {
        self.binner = None;
    }

    // ---------- summaries ----------

    /// Size, convention and symmetry, plus absences, centrics, resolution, completeness and pairs.
    pub fn comprehensive_summary(&self) -> Result<String> {
        let mut out = self.to_string();
        let absent = self.sys_absent_flags();
        let n_absent = absent.iter().filter(|a| **a).count();
        out.push_str(&format!("Systematic absences: {n_absent}\n"));
        let present = if n_absent != 0 {
            out.push_str("Systematic absences not included in following:\n");
            self.apply_selection(&absent, true)?
        } else {
            self.clone()
        };
        let n_centric = present.centric_flags().iter().filter(|c| **c).count();
        out.push_str(&format!("Centric reflections: {n_centric}\n"));
        if !present.is_empty() {
            let (d_max, d_min) = present.resolution_range()?;
            out.push_str(&format!("Resolution range: {d_max:.6} {d_min:.6}\n"));
            if present.anomalous.is_resolved() {
                out.push_str(&format!("Completeness: {:.6}\n", present.completeness()?));
            }
        }
        if present.anomalous == AnomalousFlag::AnomalousDistinct {
            let (_, matches) = present.match_bijvoet_mates()?;
            out.push_str(&format!("Bijvoet pairs: {}\n", matches.pairs().len()));
            out.push_str(&format!(
                "Lone Bijvoet mates: {}\n",
                matches.n_singles().saturating_sub(n_centric)
            ));
        }
        Ok(out)
    }
}

impl fmt::Display for MillerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.unit_cell().parameters();
        writeln!(f, "Number of Miller indices: {}", self.indices.len())?;
        writeln!(f, "Anomalous flag: {:?}", self.anomalous)?;
        writeln!(
            f,
            "Unit cell: ({}, {}, {}, {}, {}, {})",
            p[0], p[1], p[2], p[3], p[4], p[5]
        )?;
        writeln!(
            f,
            "Space group: {} (No. of operations: {})",
            self.space_group().symbol().unwrap_or("unnamed"),
            self.space_group().order_z()
        )
    }
}

pub(crate) fn check_selection(flags: &[bool], size: usize) -> Result<()> {
    if flags.len() != size {
        return Err(MillerError::LengthMismatch {
            what: "selection",
            expected: size,
            actual: flags.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_permutation(permutation: &[usize], size: usize) -> Result<()> {
    if let Some(bad) = permutation.iter().find(|i| **i >= size) {
        return Err(MillerError::InvalidArgument(format!(
            "position {bad} out of range for {size} reflections"
        )));
    }
    Ok(())
}

/// Stable ascending (or descending when `reverse`) permutation of `keys`.
pub(crate) fn sort_permutation_by(keys: &[f64], reverse: bool) -> Vec<usize> {
    let mut permutation: Vec<usize> = (0..keys.len()).collect();
    if reverse {
        permutation.sort_by(|a, b| keys[*b].total_cmp(&keys[*a]));
    } else {
        permutation.sort_by(|a, b| keys[*a].total_cmp(&keys[*b]));
    }
    permutation
}

