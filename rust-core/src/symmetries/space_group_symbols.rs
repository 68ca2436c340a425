use nalgebra::{Matrix3, Vector3};

use crate::error::MillerError;
use crate::symmetries::space_group::SpaceGroup;
use crate::symmetries::symmetry_operations::SymmetryOperation;
use crate::Result;

// Rotation parts shared by several groups (acting on fractional coordinates)
fn two_fold_x() -> Matrix3<i32> {
    Matrix3::new(1, 0, 0, 0, -1, 0, 0, 0, -1)
}

fn two_fold_y() -> Matrix3<i32> {
    Matrix3::new(-1, 0, 0, 0, 1, 0, 0, 0, -1)
}

fn two_fold_z() -> Matrix3<i32> {
    Matrix3::new(-1, 0, 0, 0, -1, 0, 0, 0, 1)
}

fn four_fold_z() -> Matrix3<i32> {
    // (-y, x, z)
    Matrix3::new(0, -1, 0, 1, 0, 0, 0, 0, 1)
}

fn three_fold_z_hexagonal() -> Matrix3<i32> {
    // (-y, x-y, z)
    Matrix3::new(0, -1, 0, 1, -1, 0, 0, 0, 1)
}

fn six_fold_z_hexagonal() -> Matrix3<i32> {
    // (x-y, x, z)
    Matrix3::new(1, -1, 0, 1, 0, 0, 0, 0, 1)
}

fn three_fold_body_diagonal() -> Matrix3<i32> {
    // (z, x, y)
    Matrix3::new(0, 0, 1, 1, 0, 0, 0, 1, 0)
}

fn op(rotation: Matrix3<i32>, t: [f64; 3]) -> SymmetryOperation {
    SymmetryOperation::new(rotation, Vector3::new(t[0], t[1], t[2]))
}

const I_CENTRING: [f64; 3] = [0.5, 0.5, 0.5];
const C_CENTRING: [f64; 3] = [0.5, 0.5, 0.0];

/// Generators and centring vectors for a normalised (whitespace-free) symbol.
fn generators_for(compact: &str) -> Option<(&'static str, Vec<SymmetryOperation>, Vec<[f64; 3]>)> {
    let entry: (&'static str, Vec<SymmetryOperation>, Vec<[f64; 3]>) = match compact {
        "P1" => ("P 1", vec![], vec![]),
        "P-1" => ("P -1", vec![SymmetryOperation::inversion()], vec![]),
        // Monoclinic, unique axis b
        "P2" | "P121" => ("P 1 2 1", vec![op(two_fold_y(), [0.0; 3])], vec![]),
        "P21" | "P1211" => ("P 1 21 1", vec![op(two_fold_y(), [0.0, 0.5, 0.0])], vec![]),
        "C2" | "C121" => ("C 1 2 1", vec![op(two_fold_y(), [0.0; 3])], vec![C_CENTRING]),
        // Orthorhombic
        "P222" => (
            "P 2 2 2",
            vec![op(two_fold_z(), [0.0; 3]), op(two_fold_y(), [0.0; 3])],
            vec![],
        ),
        "P212121" => (
            "P 21 21 21",
            vec![
                op(two_fold_z(), [0.5, 0.0, 0.5]),
                op(two_fold_y(), [0.0, 0.5, 0.5]),
            ],
            vec![],
        ),
        "I222" => (
            "I 2 2 2",
            vec![op(two_fold_z(), [0.0; 3]), op(two_fold_y(), [0.0; 3])],
            vec![I_CENTRING],
        ),
        // Tetragonal
        "P4" => ("P 4", vec![op(four_fold_z(), [0.0; 3])], vec![]),
        "P41" => ("P 41", vec![op(four_fold_z(), [0.0, 0.0, 0.25])], vec![]),
        "P422" => (
            "P 4 2 2",
            vec![op(four_fold_z(), [0.0; 3]), op(two_fold_x(), [0.0; 3])],
            vec![],
        ),
        "P43212" => (
            "P 43 21 2",
            vec![
                // (-y+1/2, x+1/2, z+3/4)
                op(four_fold_z(), [0.5, 0.5, 0.75]),
                // (-x+1/2, y+1/2, -z+1/4)
                op(two_fold_y(), [0.5, 0.5, 0.25]),
            ],
            vec![],
        ),
        // Trigonal and hexagonal (hexagonal axes)
        "P3" => ("P 3", vec![op(three_fold_z_hexagonal(), [0.0; 3])], vec![]),
        "P31" => (
            "P 31",
            vec![op(three_fold_z_hexagonal(), [0.0, 0.0, 1.0 / 3.0])],
            vec![],
        ),
        "P6" => ("P 6", vec![op(six_fold_z_hexagonal(), [0.0; 3])], vec![]),
        "P63" => ("P 63", vec![op(six_fold_z_hexagonal(), [0.0, 0.0, 0.5])], vec![]),
        // Cubic
        "P23" => (
            "P 2 3",
            vec![
                op(two_fold_z(), [0.0; 3]),
                op(two_fold_y(), [0.0; 3]),
                op(three_fold_body_diagonal(), [0.0; 3]),
            ],
            vec![],
        ),
        "I23" => (
            "I 2 3",
            vec![
                op(two_fold_z(), [0.0; 3]),
                op(two_fold_y(), [0.0; 3]),
                op(three_fold_body_diagonal(), [0.0; 3]),
            ],
            vec![I_CENTRING],
        ),
        "F23" => (
            "F 2 3",
            vec![
                op(two_fold_z(), [0.0; 3]),
                op(two_fold_y(), [0.0; 3]),
                op(three_fold_body_diagonal(), [0.0; 3]),
            ],
            vec![[0.0, 0.5, 0.5], [0.5, 0.0, 0.5]],
        ),
        _ => return None,
    };
    Some(entry)
}

/// Look up a space group by its Hermann–Mauguin symbol (whitespace-insensitive).
pub fn space_group_from_symbol(symbol: &str) -> Result<SpaceGroup> {
    let compact: String = symbol.chars().filter(|c| !c.is_whitespace()).collect();
    let (canonical, generators, centring) = generators_for(&compact)
        .ok_or_else(|| MillerError::UnknownSpaceGroup(symbol.to_string()))?;
    let centring: Vec<Vector3<f64>> = centring
        .iter()
        .map(|t| Vector3::new(t[0], t[1], t[2]))
        .collect();
    Ok(SpaceGroup::from_generators(&generators, &centring)?.with_symbol(canonical))
}

/// Symbols understood by [`space_group_from_symbol`].
pub fn known_symbols() -> &'static [&'static str] {
    &[
        "P 1", "P -1", "P 1 2 1", "P 1 21 1", "C 1 2 1", "P 2 2 2", "P 21 21 21", "I 2 2 2",
        "P 4", "P 41", "P 4 2 2", "P 43 21 2", "P 3", "P 31", "P 6", "P 63", "P 2 3", "I 2 3",
        "F 2 3",
    ]
}
