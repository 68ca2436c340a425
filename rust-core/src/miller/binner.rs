use log::{debug, warn};
use std::fmt::{self, Display, Write as _};
use std::sync::Arc;

use crate::config::BINNING_EDGE_TOLERANCE;
use crate::error::MillerError;
use crate::interfaces::BinSlot;
use crate::lattice::unit_cell::UnitCell;
use crate::miller::index::MillerIndex;
use crate::Result;

/// Shell limits in d*², ascending, so shell 0 is the lowest-resolution shell.
///
/// Limits are spaced uniformly in reciprocal volume (d*³), which gives comparable
/// reflection counts per shell for complete data.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    unit_cell: UnitCell,
    limits: Vec<f64>,
}

impl Binning {
    /// Build limits covering `indices`, or the explicit `[d_min, d_max]` window when given.
    pub fn new(
        unit_cell: &UnitCell,
        n_bins: usize,
        indices: &[MillerIndex],
        d_max: Option<f64>,
        d_min: Option<f64>,
    ) -> Result<Self> {
        if n_bins == 0 {
            return Err(MillerError::InvalidArgument("binning needs at least one bin".to_string()));
        }
        let (data_low, data_high) = indices
            .iter()
            .map(|h| unit_cell.d_star_sq(h))
            .fold(None, |acc: Option<(f64, f64)>, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
            })
            .map(|(lo, hi)| {
                (
                    lo * (1.0 - BINNING_EDGE_TOLERANCE),
                    hi * (1.0 + BINNING_EDGE_TOLERANCE),
                )
            })
            .unwrap_or((0.0, 0.0));

        let low = match d_max {
            Some(d) if d > 0.0 => 1.0 / (d * d),
            _ => data_low,
        };
        let high = match d_min {
            Some(d) if d > 0.0 => 1.0 / (d * d),
            _ => data_high,
        };
        if !(high > low) {
            return Err(MillerError::InvalidArgument(format!(
                "empty resolution range for binning: d*² from {low} to {high}"
            )));
        }

        let cube_low = low.powf(1.5);
        let cube_high = high.powf(1.5);
        let step = (cube_high - cube_low) / n_bins as f64;
        let mut limits: Vec<f64> = (0..=n_bins)
            .map(|i| (cube_low + step * i as f64).powf(2.0 / 3.0))
            .collect();
        // Pin the ends against powf round-off
        limits[0] = low;
        limits[n_bins] = high;

        debug!(
            "binning: {} shells, d from {:.4} to {:.4}",
            n_bins,
            d_from_d_star_sq(low),
            d_from_d_star_sq(high)
        );
        Ok(Binning {
            unit_cell: unit_cell.clone(),
            limits,
        })
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    pub fn n_bins(&self) -> usize {
        self.limits.len() - 1
    }

    /// d*² limits, `n_bins + 1` values.
    pub fn limits(&self) -> &[f64] {
        &self.limits
    }

    /// Which slot a d*² value belongs to. Shells are half-open `[lo, hi)` except the last.
    pub fn slot_of(&self, d_star_sq: f64) -> BinSlot {
        let n = self.n_bins();
        if d_star_sq < self.limits[0] {
            return BinSlot::TooCoarse;
        }
        if d_star_sq > self.limits[n] {
            return BinSlot::TooFine;
        }
        let above = self.limits.partition_point(|limit| *limit <= d_star_sq);
        BinSlot::Shell(above.saturating_sub(1).min(n - 1))
    }

    /// `(d_max, d_min)` of a slot; the open side of a pseudo-shell is `None`.
    pub fn d_range(&self, slot: BinSlot) -> (Option<f64>, Option<f64>) {
        let n = self.n_bins();
        match slot {
            BinSlot::TooCoarse => (None, Some(d_from_d_star_sq(self.limits[0]))),
            BinSlot::TooFine => (Some(d_from_d_star_sq(self.limits[n])), None),
            BinSlot::Shell(i) => (
                Some(d_from_d_star_sq(self.limits[i])),
                Some(d_from_d_star_sq(self.limits[i + 1])),
            ),
        }
    }

    /// Shell centres on the x = d*^p axis.
    fn centers(&self, d_star_power: f64) -> Vec<f64> {
        self.limits
            .windows(2)
            .map(|w| 0.5 * (w[0].powf(d_star_power / 2.0) + w[1].powf(d_star_power / 2.0)))
            .collect()
    }
}

fn d_from_d_star_sq(d_star_sq: f64) -> f64 {
    if d_star_sq > 0.0 {
        1.0 / d_star_sq.sqrt()
    } else {
        f64::INFINITY
    }
}

/// A binning applied to one particular list of indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Binner {
    binning: Binning,
    d_star_sq: Vec<f64>,
    slots: Vec<BinSlot>,
    shell_counts: Vec<usize>,
    n_too_coarse: usize,
    n_too_fine: usize,
}

impl Binner {
    pub fn new(binning: Binning, indices: &[MillerIndex]) -> Self {
        let d_star_sq: Vec<f64> = indices
            .iter()
            .map(|h| binning.unit_cell.d_star_sq(h))
            .collect();
        let slots: Vec<BinSlot> = d_star_sq.iter().map(|x| binning.slot_of(*x)).collect();
        let mut shell_counts = vec![0; binning.n_bins()];
        let mut n_too_coarse = 0;
        let mut n_too_fine = 0;
        for slot in &slots {
            match slot {
                BinSlot::TooCoarse => n_too_coarse += 1,
                BinSlot::TooFine => n_too_fine += 1,
                BinSlot::Shell(i) => shell_counts[*i] += 1,
            }
        }
        Binner {
            binning,
            d_star_sq,
            slots,
            shell_counts,
            n_too_coarse,
            n_too_fine,
        }
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn n_bins(&self) -> usize {
        self.binning.n_bins()
    }

    /// Number of reflections the binner was built for.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Slot of every reflection, in the order of the indices.
    pub fn slots(&self) -> &[BinSlot] {
        &self.slots
    }

    pub fn slot(&self, position: usize) -> BinSlot {
        self.slots[position]
    }

    /// Ordinary shells, low to high resolution.
    pub fn shells(&self) -> impl Iterator<Item = BinSlot> {
        (0..self.n_bins()).map(BinSlot::Shell)
    }

    /// Too-coarse, every ordinary shell, too-fine.
    pub fn all_slots(&self) -> Vec<BinSlot> {
        let mut slots = Vec::with_capacity(self.n_bins() + 2);
        slots.push(BinSlot::TooCoarse);
        slots.extend(self.shells());
        slots.push(BinSlot::TooFine);
        slots
    }

    pub fn count(&self, slot: BinSlot) -> usize {
        match slot {
            BinSlot::TooCoarse => self.n_too_coarse,
            BinSlot::TooFine => self.n_too_fine,
            BinSlot::Shell(i) => self.shell_counts.get(i).copied().unwrap_or(0),
        }
    }

    pub fn shell_counts(&self) -> &[usize] {
        &self.shell_counts
    }

    pub fn n_too_coarse(&self) -> usize {
        self.n_too_coarse
    }

    pub fn n_too_fine(&self) -> usize {
        self.n_too_fine
    }

    pub fn n_out_of_range(&self) -> usize {
        self.n_too_coarse + self.n_too_fine
    }

    /// Boolean mask of the reflections in `slot`.
    pub fn selection(&self, slot: BinSlot) -> Vec<bool> {
        self.slots.iter().map(|s| *s == slot).collect()
    }

    /// Positions of the reflections in `slot`.
    pub fn positions(&self, slot: BinSlot) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == slot)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn d_range(&self, slot: BinSlot) -> (Option<f64>, Option<f64>) {
        self.binning.d_range(slot)
    }

    /// Fixed-width label for a slot, used in binned tables.
    pub fn bin_legend(&self, slot: BinSlot) -> String {
        match (slot, self.d_range(slot)) {
            (BinSlot::TooCoarse, (_, Some(d_max))) => {
                format!("unused:              d > {:9.4}:", d_max)
            }
            (BinSlot::TooFine, (Some(d_min), _)) => {
                format!("unused: {:9.4} >  d            :", d_min)
            }
            (BinSlot::Shell(i), (Some(d_max), Some(d_min))) => {
                format!("bin {:2}: {:9.4} >= d > {:9.4}:", i + 1, d_max, d_min)
            }
            _ => String::new(),
        }
    }

    /// Spread a per-shell curve back onto every reflection.
    ///
    /// Values are linear in x = d*^p between shell centres and held constant beyond the
    /// outermost centres.
    pub fn interpolate(&self, shell_values: &[f64], d_star_power: f64) -> Result<Vec<f64>> {
        let n = self.n_bins();
        if shell_values.len() != n {
            return Err(MillerError::LengthMismatch {
                what: "shell values",
                expected: n,
                actual: shell_values.len(),
            });
        }
        if !(d_star_power > 0.0) {
            return Err(MillerError::InvalidArgument(format!(
                "d_star_power must be positive, got {d_star_power}"
            )));
        }
        for (i, count) in self.shell_counts.iter().enumerate() {
            if *count == 0 {
                warn!("interpolating across empty shell {}", i + 1);
            }
        }
        let centers = self.binning.centers(d_star_power);
        let result = self
            .d_star_sq
            .iter()
            .map(|d_star_sq| {
                let x = d_star_sq.powf(d_star_power / 2.0);
                if n == 1 || x <= centers[0] {
                    return shell_values[0];
                }
                if x >= centers[n - 1] {
                    return shell_values[n - 1];
                }
                let upper = centers.partition_point(|c| *c <= x).min(n - 1);
                let lower = upper - 1;
                let span = centers[upper] - centers[lower];
                let t = if span > 0.0 { (x - centers[lower]) / span } else { 0.0 };
                shell_values[lower] + t * (shell_values[upper] - shell_values[lower])
            })
            .collect();
        Ok(result)
    }

    /// Table of one value per slot, each row prefixed by the slot's legend.
    pub fn show_data<T: Display>(&self, slots: &[BinSlot], data: &[T], show_counts: bool) -> String {
        let mut out = String::new();
        for (slot, value) in slots.iter().zip(data) {
            let _ = write!(out, "{}", self.bin_legend(*slot));
            if show_counts {
                let _ = write!(out, " n={:5},", self.count(*slot));
            }
            let _ = writeln!(out, " {}", value);
        }
        out
    }

    /// Reflection count per slot, including both pseudo-shells.
    pub fn summary(&self) -> String {
        let slots = self.all_slots();
        let counts: Vec<String> = slots.iter().map(|s| format!("{:5}", self.count(*s))).collect();
        self.show_data(&slots, &counts, false)
    }
}

/// Values attached to the slots of a binner.
#[derive(Debug, Clone)]
pub struct BinnedData<T> {
    binner: Arc<Binner>,
    slots: Vec<BinSlot>,
    data: Vec<T>,
}

impl<T> BinnedData<T> {
    pub fn new(binner: Arc<Binner>, slots: Vec<BinSlot>, data: Vec<T>) -> Result<Self> {
        if slots.len() != data.len() {
            return Err(MillerError::LengthMismatch {
                what: "binned data",
                expected: slots.len(),
                actual: data.len(),
            });
        }
        Ok(BinnedData {
            binner,
            slots,
            data,
        })
    }

    pub fn binner(&self) -> &Arc<Binner> {
        &self.binner
    }

    pub fn slots(&self) -> &[BinSlot] {
        &self.slots
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, slot: BinSlot) -> Option<&T> {
        self.slots
            .iter()
            .position(|s| *s == slot)
            .map(|i| &self.data[i])
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}

impl<T: Display> Display for BinnedData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.binner.show_data(&self.slots, &self.data, false))
    }
}
