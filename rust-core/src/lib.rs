//! Miller array library
//!
//! This library provides implementations for working with reciprocal-lattice data:
//! sets of Miller indices bound to a crystal symmetry, parallel arrays of observed or
//! derived values, resolution binning, symmetry-equivalence merging and Fourier
//! synthesis of real-space maps.

pub mod config;
pub mod error;
pub mod interfaces;
pub mod lattice;
pub mod maps;
pub mod miller;
pub mod symmetries;

pub use error::MillerError;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, MillerError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
