// Symmetries module: space groups, symmetry operations and the crystal symmetry they form
// together with a unit cell. Also hosts the generator of complete index sets.

// ======================== MODULE DECLARATIONS ========================
pub mod change_of_basis;
pub mod crystal_symmetry;
pub mod index_generator;
pub mod space_group;
pub mod space_group_symbols;
pub mod symmetry_operations;


// ======================== SYMMETRY OPERATIONS ========================
pub use symmetry_operations::SymmetryOperation; // struct - integer rotation + fractional translation
// SymmetryOperation impl methods:
//   new(rotation: Matrix3<i32>, translation: Vector3<f64>) -> Self - creates operation
//   apply(&self, point: Vector3<f64>) -> Vector3<f64>             - acts on fractional coordinates
//   multiply(&self, other: &Self) -> Self                         - composition (self after other)
//   inverse(&self) -> Result<Self>                                - inverse operation
//   apply_to_index(&self, index: &MillerIndex) -> MillerIndex     - index image h R
//   phase_shift(&self, index: &MillerIndex) -> f64                - h·t in turns

// ======================== SPACE GROUPS ========================
pub use space_group::{
    AsuIndex,   // struct - asymmetric-unit representative with phase shift and Friedel flag
    SpaceGroup, // struct - coset representatives plus centring translations
};
// SpaceGroup impl methods:
//   from_generators(generators, centring) -> Result<Self>         - closes generators into a group
//   map_to_asu(&self, index, anomalous) -> AsuIndex               - canonical representative
//   multiplicity / epsilon / is_centric_index / is_sys_absent     - per-index symmetry quantities
//   patterson_group(&self) -> SpaceGroup                          - Laue rotations, no translations
//   change_basis(&self, cb: &ChangeOfBasis) -> Result<SpaceGroup> - group in a new basis

pub use space_group_symbols::{
    known_symbols,           // fn() -> &[&str] - symbols understood by the lookup
    space_group_from_symbol, // fn(symbol: &str) -> Result<SpaceGroup> - Hermann-Mauguin lookup
};

// ======================== CRYSTAL SYMMETRY ========================
pub use change_of_basis::ChangeOfBasis; // struct - unimodular integer basis transform
pub use crystal_symmetry::CrystalSymmetry; // struct - unit cell + space group
// CrystalSymmetry impl methods:
//   new(cell, group) -> Result<Self>                              - validates metric compatibility
//   from_symbol(parameters: [f64; 6], symbol: &str) -> Result<Self>
//   patterson_symmetry(&self) -> CrystalSymmetry
//   cell_equivalent_p1(&self) -> CrystalSymmetry
//   change_basis(&self, cb) -> Result<CrystalSymmetry>
//   is_similar_symmetry(&self, other) -> bool
//   statistical_mean(&self, indices, data, anomalous) -> Result<f64>

// ======================== INDEX GENERATION ========================
pub use index_generator::generate_indices; // fn(symmetry, anomalous, d_min) -> Result<Vec<MillerIndex>>
