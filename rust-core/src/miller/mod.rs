//! Miller module: index sets, data arrays and the reductions defined on them.
//!
//! Quick reference
//! - Indices: [`MillerIndex`], [`IndexSpan`]
//! - Sets and arrays: [`MillerSet`], [`MillerArray`], [`MillerData`]
//! - Binning: [`Binning`], [`Binner`], [`BinnedData`]
//! - Pairing: [`IndexMatches`], [`BijvoetMatches`]
//! - Merging: [`MergedEquivalents`]

// ======================== MODULE DECLARATIONS ========================
pub mod array_statistics;
pub mod binner;
pub mod index;
pub mod matching;
pub mod merge;
pub mod miller_array;
pub mod miller_set;

mod _tests_binner;
mod _tests_miller_array;

// ======================== INDICES ========================
#[doc(inline)]
pub use index::{IndexSpan, MillerIndex};
// MillerIndex impl methods:
//   new(h, k, l) -> Self                                          - creates index
//   times_matrix(&self, matrix: &Matrix3<i32>) -> Self            - row-vector product h·R
//   dot_translation(&self, t: &Vector3<f64>) -> f64               - h·t
// IndexSpan impl methods:
//   new(indices: &[MillerIndex]) -> Self                          - bounding box of a list
//   pack(&self, index: &MillerIndex) -> u64                       - sortable scalar key

// ======================== SETS & ARRAYS ========================
#[doc(inline)]
pub use miller_set::{MillerSet, P1Image};
// MillerSet impl methods (selection):
//   map_to_asu / expand_to_p1 / change_basis / patterson_symmetry - symmetry transforms
//   apply_selection / select / resolution_filter / sort            - subsets and permutations
//   match_bijvoet_mates / n_bijvoet_pairs / auto_anomalous         - Friedel pairs
//   complete_set / completeness / completeness_binned              - completeness
//   setup_binner / use_binning_of / use_binner_of                  - binning

#[doc(inline)]
pub use miller_array::{MillerArray, MillerData};
// MillerArray impl methods (selection):
//   f_sq_as_f / f_as_f_sq / as_amplitude_array                     - intensity <-> amplitude
//   add_array / + f64                                              - index-matched arithmetic
//   adopt_set / common_set / common_sets / as_anomalous            - pairing with other arrays
//   anomalous_differences / hemispheres                            - Friedel components
//   mean / mean_sq / rms (+ _binned), sigma_filter, rms_filter     - statistics and filters
//   statistical_mean / remove_patterson_origin_peak                - Patterson origin removal
//   quasi_normalize_structure_factors                              - E values
//   anomalous_signal / correlation (+ _binned)                     - comparison statistics
//   merge_equivalents                                              - symmetry merging

// ======================== BINNING ========================
#[doc(inline)]
pub use binner::{BinnedData, Binner, Binning};

// ======================== MATCHING & MERGING ========================
pub use array_statistics::linear_correlation; // fn(x: &[f64], y: &[f64]) -> Option<f64>
pub use matching::{hemisphere_of, BijvoetMatches, IndexMatches};
pub use merge::MergedEquivalents;
