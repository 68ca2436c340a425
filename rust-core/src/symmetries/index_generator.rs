use log::debug;

use crate::error::MillerError;
use crate::interfaces::AnomalousFlag;
use crate::miller::index::MillerIndex;
use crate::symmetries::crystal_symmetry::CrystalSymmetry;
use crate::Result;

/// Every symmetry-unique, non-absent index with d ≥ d_min, excluding (0,0,0).
///
/// Indices come out in the canonical asymmetric unit for the given Friedel convention,
/// ordered by h, then k, then l.
pub fn generate_indices(
    symmetry: &CrystalSymmetry,
    anomalous: AnomalousFlag,
    d_min: f64,
) -> Result<Vec<MillerIndex>> {
    if !anomalous.is_resolved() {
        return Err(MillerError::UnresolvedAnomalousFlag {
            operation: "generate_indices",
        });
    }
    if !(d_min > 0.0) {
        return Err(MillerError::InvalidArgument(format!(
            "d_min must be positive, got {d_min}"
        )));
    }

    let cell = symmetry.unit_cell();
    let group = symmetry.space_group();
    let d_star_sq_max = 1.0 / (d_min * d_min);
    let [h_max, k_max, l_max] = cell.max_miller_indices(d_min);

    let mut result = Vec::new();
    for h in -h_max..=h_max {
        for k in -k_max..=k_max {
            for l in -l_max..=l_max {
                let index = MillerIndex::new(h, k, l);
                if index.is_zero() || cell.d_star_sq(&index) > d_star_sq_max * (1.0 + 1e-12) {
                    continue;
                }
                if group.is_in_asu(&index, anomalous) && !group.is_sys_absent(&index) {
                    result.push(index);
                }
            }
        }
    }
    debug!(
        "generated {} indices to d_min = {} ({:?})",
        result.len(),
        d_min,
        anomalous
    );
    Ok(result)
}
