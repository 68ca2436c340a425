//! Error types for Miller set and array operations.

use thiserror::Error;

use crate::interfaces::{AnomalousFlag, ObservationKind, ValueKind};

/// Errors raised by precondition violations and numeric degeneracies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MillerError {
    /// Parallel sequences disagree in length.
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The operation needs a concrete Friedel convention.
    #[error("{operation} requires a resolved anomalous flag")]
    UnresolvedAnomalousFlag { operation: &'static str },

    /// The Friedel convention is not one the operation accepts.
    #[error("{operation} does not accept anomalous flag {found:?}")]
    AnomalousFlagMismatch {
        operation: &'static str,
        found: AnomalousFlag,
    },

    /// A sigma used as a weight is zero, negative or not finite.
    #[error("non-positive sigma at position {position}")]
    NonPositiveSigma { position: usize },

    #[error("{operation} does not accept observation kind {found:?}")]
    ObservationKindMismatch {
        operation: &'static str,
        found: ObservationKind,
    },

    #[error("{operation} does not accept {found:?} values")]
    ValueKindMismatch {
        operation: &'static str,
        found: ValueKind,
    },

    #[error("{operation} requires sigmas")]
    MissingSigmas { operation: &'static str },

    #[error("{operation} requires a binner")]
    MissingBinner { operation: &'static str },

    /// Reflections fell into the too-coarse or too-fine pseudo-shells.
    #[error("{count} reflections fall outside the binning range")]
    ReflectionsOutOfRange { count: usize },

    #[error("incompatible change of basis: {0}")]
    IncompatibleBasis(String),

    #[error("incompatible symmetry: {0}")]
    IncompatibleSymmetry(String),

    /// Zero denominators, zero-weight sums and similar degeneracies.
    #[error("arithmetic failure: {0}")]
    Arithmetic(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown space group symbol: {0}")]
    UnknownSpaceGroup(String),

    #[error("transform failure: {0}")]
    Transform(String),
}
