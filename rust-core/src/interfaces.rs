// Definitions that are used throughout all modules

use serde::{Deserialize, Serialize};

/// Friedel convention of a set of Miller indices.
///
/// `Unset` is never silently treated as `Merged`: operations that need a concrete
/// convention either reject it or promote it to `AnomalousDistinct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnomalousFlag {
    #[default]
    Unset,
    /// Friedel mates are equivalent (h and -h are the same reflection).
    Merged,
    /// Friedel mates are kept as distinct reflections.
    AnomalousDistinct,
}

impl AnomalousFlag {
    /// Whether Friedel mates are kept apart, promoting `Unset` to distinct.
    pub fn is_anomalous_or_unset(&self) -> bool {
        !matches!(self, AnomalousFlag::Merged)
    }

    /// `Some(true)` for distinct, `Some(false)` for merged, `None` when unset.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnomalousFlag::Unset => None,
            AnomalousFlag::Merged => Some(false),
            AnomalousFlag::AnomalousDistinct => Some(true),
        }
    }

    pub fn from_bool(anomalous: bool) -> Self {
        if anomalous {
            AnomalousFlag::AnomalousDistinct
        } else {
            AnomalousFlag::Merged
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, AnomalousFlag::Unset)
    }
}

// Enumeration to track what a real-valued array measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ObservationKind {
    #[default]
    Unset,
    Amplitude,
    Intensity,
}

// Enumeration to track the value representation of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Real,
    Complex,
}

/// Where a reflection lands in a resolution binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinSlot {
    /// d-spacing larger than the low-resolution limit.
    TooCoarse,
    /// Ordinary shell, numbered from low to high resolution.
    Shell(usize),
    /// d-spacing smaller than the high-resolution limit.
    TooFine,
}

/// Which half of a Bijvoet pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    Plus,
    Minus,
}

/// Rule used by `auto_anomalous` to decide whether Friedel mates are kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum AnomalousCriterion {
    /// Distinct as soon as any Bijvoet pair is present.
    #[default]
    AnyPairs,
    /// Distinct when at least this many Bijvoet pairs are present.
    MinPairs(usize),
    /// Distinct when 2·pairs / size reaches this fraction.
    MinFraction(f64),
}

/// Key used to order a Miller array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Increasing d*² (lowest resolution first) unless reversed.
    Resolution,
    /// Decreasing data value unless reversed.
    Data,
    /// Decreasing absolute value unless reversed.
    Abs,
}
