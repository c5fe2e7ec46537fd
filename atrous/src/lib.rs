//! Stationary ("à trous") wavelet transforms over N-dimensional rasters.
//!
//! A [`StationaryFilterBank`] splits a raster into `2^N` same-sized
//! sub-bands by filtering along every axis with the low-pass and high-pass
//! filters of a wavelet family, and recombines them in the inverse direction.
//! Instead of decimating the image between levels, the filters are
//! up-sampled by inserting zeros between their taps.
//!
//! On top of the filter bank sit the [`WaveletForwardTransform`] pyramid,
//! which only follows the low-pass branch, and the [`WaveletPacketTransform`],
//! which may decompose any sub-band as long as its [`StopPolicy`] asks for it.
//! Both have an inverse that rebuilds the input.
//!
//! ```no_run
//! use atrous::{Raster, Region, TransformSettings, WaveletFamily, WaveletForwardTransform};
//!
//! let input = Raster::filled(Region::from_size(&[64, 64]), 1.0)?;
//! let mut transform = WaveletForwardTransform::new(TransformSettings::new(WaveletFamily::Spline97));
//! transform.set_number_of_decompositions(3);
//! let sub_bands = transform.compute(&input, None)?;
//! assert_eq!(sub_bands.len(), 10);
//! # Ok::<(), atrous::WaveletError>(())
//! ```

pub mod border_mode;
pub mod cost;
pub mod error;
pub mod filter_bank;
pub mod forward;
pub mod kernel;
pub mod packet;
pub mod raster;
pub mod region;
pub mod settings;
pub mod stencil;

pub use border_mode::BorderMode;
pub use cost::{EnergyThresholdCost, FullyDecomposedCost, StopPolicy};
pub use error::WaveletError;
pub use filter_bank::StationaryFilterBank;
pub use forward::{WaveletForwardTransform, WaveletInverseTransform};
pub use kernel::{Band, Direction, WaveletFamily, WaveletOperator};
pub use packet::{WaveletPacketInverseTransform, WaveletPacketTransform};
pub use raster::Raster;
pub use region::Region;
pub use settings::TransformSettings;
