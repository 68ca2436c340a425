use log::{debug, trace};
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::config::{BinningStrategy, GriddingParams};
use crate::error::MillerError;
use crate::interfaces::{AnomalousFlag, ObservationKind};
use crate::maps::fft::{FourierTransform, RustFftProvider};
use crate::maps::grid::{half_complex_shape, ComplexGrid, GridShape, MapStatistics, RealGrid};
use crate::maps::gridding::CrystalGridding;
use crate::miller::index::MillerIndex;
use crate::miller::miller_array::{MillerArray, MillerData};
use crate::miller::miller_set::MillerSet;
use crate::Result;

/// A map to transform back into structure factors.
#[derive(Debug, Clone, Copy)]
pub enum MapInput<'a> {
    Real(&'a RealGrid),
    Complex(&'a ComplexGrid),
}

#[derive(Debug, Clone, PartialEq)]
enum MapData {
    Real(RealGrid),
    Complex(ComplexGrid),
}

/// Fourier synthesis of a complex Miller array on a crystal gridding.
///
/// Friedel-merged coefficients give a real (padded) map through the Hermitian
/// transform; anomalous-distinct coefficients give a complex map.
#[derive(Debug, Clone, PartialEq)]
pub struct FftMap {
    gridding: CrystalGridding,
    anomalous: AnomalousFlag,
    map: MapData,
}

/// Grid coordinate of `index` along one axis, or `None` when it does not fit.
fn grid_coordinate(value: i32, n: usize) -> Option<usize> {
    let n_signed = n as i64;
    let value = value as i64;
    if 2 * value.abs() >= n_signed {
        return None;
    }
    Some(value.rem_euclid(n_signed) as usize)
}

fn grid_point(index: &MillerIndex, n_real: GridShape) -> Option<GridShape> {
    Some([
        grid_coordinate(index.h(), n_real[0])?,
        grid_coordinate(index.k(), n_real[1])?,
        grid_coordinate(index.l(), n_real[2])?,
    ])
}

fn index_outside_grid(index: &MillerIndex, n_real: GridShape) -> MillerError {
    MillerError::InvalidArgument(format!("index {index} does not fit on grid {n_real:?}"))
}

impl FftMap {
    pub fn new(
        gridding: CrystalGridding,
        coefficients: &MillerArray,
        f_000: Option<Complex64>,
    ) -> Result<Self> {
        Self::with_provider(&mut RustFftProvider::new(), gridding, coefficients, f_000)
    }

    /// Expand the coefficients to P 1, place them on the grid and transform back.
    ///
    /// Grid values are conj(F) at every symmetry image h (and F at -h for merged
    /// data), so the map is ρ(x) = Σ conj(F(h)) exp(2πi h·x). `f_000` overrides the
    /// origin coefficient.
    pub fn with_provider<P: FourierTransform>(
        provider: &mut P,
        gridding: CrystalGridding,
        coefficients: &MillerArray,
        f_000: Option<Complex64>,
    ) -> Result<Self> {
        let anomalous = coefficients.anomalous_flag();
        if !anomalous.is_resolved() {
            return Err(MillerError::UnresolvedAnomalousFlag { operation: "fft_map" });
        }
        let data = coefficients.complex_data("fft_map")?;
        let symmetry = coefficients.symmetry();
        if !symmetry.unit_cell().is_similar_to(gridding.unit_cell(), 1e-3, 1e-3)
            || symmetry.space_group() != gridding.space_group()
        {
            return Err(MillerError::IncompatibleSymmetry(
                "fft_map: coefficients and gridding have different symmetry".to_string(),
            ));
        }

        let n_real = gridding.n_real();
        let merged = anomalous == AnomalousFlag::Merged;
        let shape = if merged { half_complex_shape(n_real) } else { n_real };
        let mut grid = ComplexGrid::zeros(shape);
        let mut place = |index: &MillerIndex, value: Complex64| -> Result<()> {
            let [i, j, k] = grid_point(index, n_real).ok_or_else(|| index_outside_grid(index, n_real))?;
            if k < shape[2] {
                grid.set(i, j, k, value);
            }
            Ok(())
        };

        let images = coefficients.set().p1_images()?;
        for image in &images {
            let shifted = data[image.source] * Complex64::from_polar(1.0, -2.0 * PI * image.phase_shift);
            let value = if image.friedel_flipped { shifted.conj() } else { shifted };
            trace!("placing {} = {value}", image.index);
            place(&image.index, value.conj())?;
            if merged {
                place(&-image.index, value)?;
            }
        }
        if let Some(f_000) = f_000 {
            grid.set(0, 0, 0, f_000);
        }
        debug!(
            "fft_map: {} coefficients expanded to {} P 1 images on grid {:?}",
            coefficients.size(),
            images.len(),
            n_real
        );

        let map = if merged {
            MapData::Real(provider.backward_hermitian(&grid, n_real)?)
        } else {
            provider.backward(&mut grid)?;
            MapData::Complex(grid)
        };
        Ok(FftMap {
            gridding,
            anomalous,
            map,
        })
    }

    pub fn gridding(&self) -> &CrystalGridding {
        &self.gridding
    }

    pub fn n_real(&self) -> GridShape {
        self.gridding.n_real()
    }

    pub fn anomalous_flag(&self) -> AnomalousFlag {
        self.anomalous
    }

    /// The real map; padded for merged coefficients, the real part of the complex map otherwise.
    pub fn real_map(&self) -> RealGrid {
        match &self.map {
            MapData::Real(map) => map.clone(),
            MapData::Complex(map) => map.real_part(),
        }
    }

    pub fn real_map_unpadded(&self) -> RealGrid {
        match &self.map {
            MapData::Real(map) => map.unpadded(),
            MapData::Complex(map) => map.real_part(),
        }
    }

    /// Only maps of anomalous-distinct coefficients are complex.
    pub fn complex_map(&self) -> Result<&ComplexGrid> {
        match &self.map {
            MapData::Complex(map) => Ok(map),
            MapData::Real(_) => Err(MillerError::AnomalousFlagMismatch {
                operation: "complex_map",
                found: self.anomalous,
            }),
        }
    }

    pub fn statistics(&self) -> Result<MapStatistics> {
        match &self.map {
            MapData::Real(map) => map.statistics(),
            MapData::Complex(map) => map.real_part().statistics(),
        }
    }

    /// Divide the real map by its standard deviation. A flat map is left untouched.
    pub fn apply_sigma_scaling(&mut self) -> Result<&mut Self> {
        let anomalous = self.anomalous;
        match &mut self.map {
            MapData::Real(map) => {
                let sigma = map.statistics()?.sigma;
                if sigma != 0.0 {
                    map.scale(1.0 / sigma);
                }
                Ok(self)
            }
            MapData::Complex(_) => Err(MillerError::AnomalousFlagMismatch {
                operation: "apply_sigma_scaling",
                found: anomalous,
            }),
        }
    }
}

/// Sample the forward transform of `map` at the indices of `set`.
///
/// F(h) = conj(FFT(ρ)(h)), which inverts the synthesis of [`FftMap`] up to the
/// grid size: coefficients that went in come back multiplied by n0·n1·n2.
pub fn structure_factors_from_map(set: &MillerSet, map: MapInput<'_>) -> Result<MillerArray> {
    structure_factors_from_map_with(&mut RustFftProvider::new(), set, map)
}

pub fn structure_factors_from_map_with<P: FourierTransform>(
    provider: &mut P,
    set: &MillerSet,
    map: MapInput<'_>,
) -> Result<MillerArray> {
    let data = match map {
        MapInput::Real(real) => {
            let n_real = real.focus();
            let half = provider.forward_real(real)?;
            let half_last = half.shape()[2];
            set.indices()
                .iter()
                .map(|h| {
                    let [i, j, k] = grid_point(h, n_real).ok_or_else(|| index_outside_grid(h, n_real))?;
                    if k < half_last {
                        Ok(half.get(i, j, k).conj())
                    } else {
                        // Hermitian partner: G(h) = conj(G(-h))
                        let minus = -*h;
                        let [i, j, k] =
                            grid_point(&minus, n_real).ok_or_else(|| index_outside_grid(&minus, n_real))?;
                        Ok(half.get(i, j, k))
                    }
                })
                .collect::<Result<Vec<Complex64>>>()?
        }
        MapInput::Complex(complex) => {
            let n = complex.shape();
            let mut transformed = complex.clone();
            provider.forward(&mut transformed)?;
            set.indices()
                .iter()
                .map(|h| {
                    let [i, j, k] = grid_point(h, n).ok_or_else(|| index_outside_grid(h, n))?;
                    Ok(transformed.get(i, j, k).conj())
                })
                .collect::<Result<Vec<Complex64>>>()?
        }
    };
    debug!("sampled {} structure factors from map", data.len());
    MillerArray::from_complex(set.clone(), data)
}

impl MillerArray {
    /// Fourier synthesis on a gridding chosen from `params`.
    pub fn fft_map(&self, params: &GriddingParams, f_000: Option<Complex64>) -> Result<FftMap> {
        let gridding = self.set().crystal_gridding(params)?;
        FftMap::new(gridding, self, f_000)
    }

    /// Patterson synthesis: |F|² with zero phase under the Patterson group.
    ///
    /// `sharpening` quasi-normalises the amplitudes first and `origin_peak_removal`
    /// subtracts the per-shell statistical mean intensity. Both bin automatically.
    pub fn patterson_map(
        &self,
        params: &GriddingParams,
        f_000: Option<f64>,
        sharpening: bool,
        origin_peak_removal: bool,
    ) -> Result<FftMap> {
        let mut f_patt = self.patterson_symmetry()?;
        if f_patt.observation_kind() == ObservationKind::Intensity {
            return Err(MillerError::ObservationKindMismatch {
                operation: "patterson_map",
                found: ObservationKind::Intensity,
            });
        }
        let gridding = f_patt.set().crystal_gridding(params)?;
        if sharpening {
            f_patt.setup_binner(BinningStrategy::default(), None, None)?;
            f_patt = f_patt.quasi_normalize_structure_factors(2.0)?;
        }
        let mut i_patt = f_patt.f_as_f_sq()?;
        if origin_peak_removal {
            i_patt.setup_binner(BinningStrategy::default(), None, None)?;
            i_patt = i_patt.remove_patterson_origin_peak()?;
        }
        let intensities = i_patt.real_data("patterson_map")?;
        let coefficients = MillerArray::new(
            i_patt.set().with_indices(i_patt.indices().to_vec()),
            MillerData::Complex(intensities.iter().map(|x| Complex64::new(*x, 0.0)).collect()),
            None,
        )?
        .with_observation_kind(ObservationKind::Intensity);
        debug!(
            "patterson_map: {} coefficients, sharpening {sharpening}, origin peak removal {origin_peak_removal}",
            coefficients.size()
        );
        FftMap::new(gridding, &coefficients, f_000.map(|f| Complex64::new(f * f, 0.0)))
    }
}
