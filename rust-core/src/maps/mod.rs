// Maps module: real-space grids, crystal gridding and Fourier synthesis of Miller arrays

// ======================== MODULE DECLARATIONS ========================
pub mod fft;
pub mod fft_map;
pub mod grid;
pub mod gridding;

// Test modules
mod _tests_fft;
mod _tests_fft_map;

// ======================== GRIDS ========================
pub use grid::{
    ComplexGrid,   // struct - complex grid, full or half-complex
    GridShape,     // type - [usize; 3], row-major, last axis fastest
    MapStatistics, // struct - min, max, mean, sigma
    RealGrid,      // struct - real map, optionally padded along the last axis
};
// RealGrid impl methods:
//   zeros(focus) / zeros_padded(focus) / from_values(focus, data)  - constructors
//   focus / storage_shape / is_padded / unpadded                    - padding
//   get / set / values / statistics / scale / argmax                - access and reductions

// ======================== GRIDDING ========================
pub use gridding::CrystalGridding; // struct - grid sizes compatible with symmetry and resolution
// CrystalGridding impl methods:
//   new(symmetry, d_min, params, max_index) -> Result<Self>        - choose grid sizes
//   n_real / d_min / resolution_factor / symmetry                  - accessors
// MillerSet::crystal_gridding(&self, params) -> Result<CrystalGridding>

// ======================== TRANSFORMS ========================
pub use fft::{
    FourierTransform, // trait - forward/backward complex and real/Hermitian 3-D transforms
    RustFftProvider,  // struct - rustfft-backed provider
};

// ======================== FOURIER MAPS ========================
pub use fft_map::{
    structure_factors_from_map,      // fn(set, map) -> Result<MillerArray>
    structure_factors_from_map_with, // fn(provider, set, map) -> Result<MillerArray>
    FftMap,                          // struct - synthesised map
    MapInput,                        // enum - real or complex map to sample
};
// FftMap impl methods:
//   new(gridding, coefficients, f_000) -> Result<Self>             - synthesis
//   real_map / real_map_unpadded / complex_map                     - results
//   statistics / apply_sigma_scaling                               - normalisation
// MillerArray::fft_map(&self, params, f_000) -> Result<FftMap>
// MillerArray::patterson_map(&self, params, f_000, sharpening, origin_peak_removal) -> Result<FftMap>
