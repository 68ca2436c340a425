// Constants and tunable parameter sets

use serde::{Deserialize, Serialize};

use crate::error::MillerError;
use crate::Result;

// Tolerances
pub const BASE_VECTOR_TOLERANCE: f64 = 1e-10; // For construction of unit cell bases
pub const TRANSLATION_TOLERANCE: f64 = 1e-6; // For comparing fractional translations
pub const CELL_LENGTH_RELATIVE_TOLERANCE: f64 = 0.01; // For unit cell similarity
pub const CELL_ANGLE_TOLERANCE_DEG: f64 = 1.0; // For unit cell similarity
pub const COMPLETE_SET_TOLERANCE: f64 = 1e-6; // Relative widening of d_min for complete sets
pub const F_SQ_AS_F_TOLERANCE: f64 = 1e-6; // Intensities below this are clipped to zero amplitude
pub const BINNING_EDGE_TOLERANCE: f64 = 1e-6; // Relative widening of data-derived bin limits

// Binning defaults
pub const DEFAULT_REFLECTIONS_PER_BIN: usize = 200;
pub const DEFAULT_N_BINS: usize = 8;

// Gridding defaults
pub const DEFAULT_RESOLUTION_FACTOR: f64 = 1.0 / 3.0;
pub const DEFAULT_MAX_PRIME: usize = 5;

// Upper bound on the order of a closed space group (Fm-3m has 192)
pub const MAX_SPACE_GROUP_ORDER: usize = 192;

/// How many resolution shells to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinningStrategy {
    /// Exactly this many shells.
    Bins(usize),
    /// round(N / reflections_per_bin) shells.
    ReflectionsPerBin(usize),
    /// `n_bins` shells unless that puts more than `reflections_per_bin` into each,
    /// in which case the shell count follows `reflections_per_bin`.
    Auto {
        reflections_per_bin: usize,
        n_bins: usize,
    },
}

impl Default for BinningStrategy {
    fn default() -> Self {
        BinningStrategy::Auto {
            reflections_per_bin: DEFAULT_REFLECTIONS_PER_BIN,
            n_bins: DEFAULT_N_BINS,
        }
    }
}

impl BinningStrategy {
    /// Resolve the strategy into a shell count for `n_reflections` reflections.
    pub fn n_bins(&self, n_reflections: usize) -> Result<usize> {
        let rounded_ratio = |per_bin: usize| (n_reflections as f64 / per_bin as f64 + 0.5) as usize;
        let n_bins = match *self {
            BinningStrategy::Bins(n) => n,
            BinningStrategy::ReflectionsPerBin(per_bin) => {
                if per_bin == 0 {
                    return Err(MillerError::InvalidArgument(
                        "reflections_per_bin must be positive".to_string(),
                    ));
                }
                rounded_ratio(per_bin)
            }
            BinningStrategy::Auto {
                reflections_per_bin,
                n_bins,
            } => {
                if reflections_per_bin == 0 || n_bins == 0 {
                    return Err(MillerError::InvalidArgument(
                        "auto binning needs positive defaults".to_string(),
                    ));
                }
                if rounded_ratio(n_bins) > reflections_per_bin {
                    rounded_ratio(reflections_per_bin)
                } else {
                    n_bins
                }
            }
        };
        if n_bins == 0 {
            return Err(MillerError::InvalidArgument(format!(
                "{self:?} yields no bins for {n_reflections} reflections"
            )));
        }
        Ok(n_bins)
    }
}

/// Parameters controlling the choice of a Fourier map grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddingParams {
    /// Grid spacing as a fraction of d_min.
    pub resolution_factor: f64,
    /// Resolution limit; the array's own d_min when `None`.
    pub d_min: Option<f64>,
    /// Per-axis factors every grid size must be divisible by.
    pub mandatory_factors: [usize; 3],
    /// Largest prime factor allowed in a grid size.
    pub max_prime: usize,
    /// Reject resolution factors above 1/2.
    pub assert_shannon_sampling: bool,
}

impl Default for GriddingParams {
    fn default() -> Self {
        GriddingParams {
            resolution_factor: DEFAULT_RESOLUTION_FACTOR,
            d_min: None,
            mandatory_factors: [1, 1, 1],
            max_prime: DEFAULT_MAX_PRIME,
            assert_shannon_sampling: true,
        }
    }
}
