use serde::{Deserialize, Serialize};

use crate::config::{CELL_ANGLE_TOLERANCE_DEG, CELL_LENGTH_RELATIVE_TOLERANCE};
use crate::error::MillerError;
use crate::interfaces::AnomalousFlag;
use crate::lattice::unit_cell::UnitCell;
use crate::miller::index::MillerIndex;
use crate::symmetries::change_of_basis::ChangeOfBasis;
use crate::symmetries::space_group::SpaceGroup;
use crate::symmetries::space_group_symbols::space_group_from_symbol;
use crate::Result;

/// Unit cell plus space group: the symmetry every Miller set is bound to.
///
/// Sets and arrays hold it behind an `Arc` and never mutate it; every transform
/// that changes symmetry builds a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalSymmetry {
    unit_cell: UnitCell,
    space_group: SpaceGroup,
}

impl CrystalSymmetry {
    /// Pair a cell with a group, rejecting cells whose metric the group does not preserve.
    pub fn new(unit_cell: UnitCell, space_group: SpaceGroup) -> Result<Self> {
        if !space_group.is_compatible_metric(unit_cell.metric_tensor(), 1e-3) {
            return Err(MillerError::IncompatibleSymmetry(format!(
                "unit cell {:?} is not compatible with space group {}",
                unit_cell.parameters(),
                space_group.symbol().unwrap_or("(unnamed)")
            )));
        }
        Ok(CrystalSymmetry {
            unit_cell,
            space_group,
        })
    }

    /// Convenience constructor from cell parameters and a space-group symbol.
    pub fn from_symbol(parameters: [f64; 6], symbol: &str) -> Result<Self> {
        Self::new(UnitCell::new(parameters)?, space_group_from_symbol(symbol)?)
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    pub fn space_group(&self) -> &SpaceGroup {
        &self.space_group
    }

    /// Same cell, space group P 1.
    pub fn cell_equivalent_p1(&self) -> CrystalSymmetry {
        CrystalSymmetry {
            unit_cell: self.unit_cell.clone(),
            space_group: SpaceGroup::p1(),
        }
    }

    /// Same cell, centrosymmetric symmorphic Patterson group.
    pub fn patterson_symmetry(&self) -> CrystalSymmetry {
        CrystalSymmetry {
            unit_cell: self.unit_cell.clone(),
            space_group: self.space_group.patterson_group(),
        }
    }

    pub fn change_basis(&self, cb: &ChangeOfBasis) -> Result<CrystalSymmetry> {
        let space_group = self.space_group.change_basis(cb)?;
        let unit_cell = self.unit_cell.change_basis(cb.matrix())?;
        Self::new(unit_cell, space_group)
    }

    /// Similar cells (within configured tolerances) and identical groups.
    pub fn is_similar_symmetry(&self, other: &CrystalSymmetry) -> bool {
        self.unit_cell.is_similar_to(
            &other.unit_cell,
            CELL_LENGTH_RELATIVE_TOLERANCE,
            CELL_ANGLE_TOLERANCE_DEG,
        ) && self.space_group == other.space_group
    }

    /// Multiplicity-weighted mean of `data / epsilon`: Σ(m·x/ε) / Σm.
    pub fn statistical_mean(
        &self,
        indices: &[MillerIndex],
        data: &[f64],
        anomalous: AnomalousFlag,
    ) -> Result<f64> {
        if indices.len() != data.len() {
            return Err(MillerError::LengthMismatch {
                what: "data",
                expected: indices.len(),
                actual: data.len(),
            });
        }
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (index, value) in indices.iter().zip(data) {
            let multiplicity = self.space_group.multiplicity(index, anomalous) as f64;
            let epsilon = self.space_group.epsilon(index) as f64;
            numerator += multiplicity * value / epsilon;
            denominator += multiplicity;
        }
        if denominator == 0.0 {
            return Err(MillerError::Arithmetic(
                "statistical mean of an empty selection".to_string(),
            ));
        }
        Ok(numerator / denominator)
    }
}
