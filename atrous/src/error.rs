//! Error values returned by the wavelet core.

use std::error;
use std::fmt;

use crate::kernel::Band;

/// Error values that may be returned from wavelet functions.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveletError {
    /// Unknown wavelet family.
    ///
    /// The name did not match any of the supported families
    /// (Haar, Spline biorthogonal 9/7).
    UnknownWaveletFamily { name: String },

    /// Unknown band name, expected `low` or `high`.
    UnknownBand { name: String },

    /// Unknown boundary extension policy.
    UnknownBorderMode { name: String },

    /// The packet transform was asked to compute without a stop policy.
    CostPolicyNotSet,

    /// Operator radius does not agree with the declared up-sample factor.
    ///
    /// This happens when an operator generated for one decomposition level
    /// is handed to a filter bank configured for another one.
    OperatorRadiusMismatch {
        band: Band,
        radius: usize,
        expected: usize,
        up_sample_factor: u32,
    },

    /// Up-sampling this many times makes the filter longer than
    /// [`crate::kernel::MAX_FILTER_LENGTH`] taps.
    UpSampleFactorTooLarge { up_sample_factor: u32 },

    /// An operator of the wrong band was plugged into a filter bank slot.
    OperatorBandMismatch { expected: Band, actual: Band },

    /// A directional operator was requested along a non-existent axis.
    DimensionOutOfRange { dimension: usize, total: usize },

    /// The sub-sample factor must be at least one.
    InvalidSubSampleFactor,

    /// The inverse filter bank needs exactly `2^N` sub-bands.
    SubBandCountMismatch { expected: usize, actual: usize },

    /// All sub-bands combined by one inverse pass must cover the same region.
    SubBandRegionMismatch { expected: String, actual: String },

    /// The output list length of a pyramid is not `levels * (2^N - 1) + 1`.
    DecompositionCountMismatch {
        outputs: usize,
        bands_per_level: usize,
    },

    /// The packet rule does not describe the given list of leaves.
    PacketRuleMismatch { rule_length: usize, leaves: usize },

    /// Rasters with no samples (or no dimensions) cannot be transformed.
    EmptyRaster,

    /// A raster buffer of the given number of samples could not be allocated.
    OutOfMemory(usize),
}

impl error::Error for WaveletError {}
impl fmt::Display for WaveletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownWaveletFamily { name } => {
                write!(f, "unknown wavelet family {:?}", name)
            }
            Self::UnknownBand { name } => write!(f, "unknown wavelet band {:?}", name),
            Self::UnknownBorderMode { name } => write!(f, "unknown border mode {:?}", name),
            Self::CostPolicyNotSet => f.write_str("cost policy not set"),
            Self::OperatorRadiusMismatch {
                band,
                radius,
                expected,
                up_sample_factor,
            } => {
                write!(
                    f,
                    "{:?} operator radius {} does not match radius {} expected for up-sample factor {}",
                    band, radius, expected, up_sample_factor
                )
            }
            Self::UpSampleFactorTooLarge { up_sample_factor } => {
                write!(
                    f,
                    "up-sample factor {} makes the filter longer than {} taps",
                    up_sample_factor,
                    crate::kernel::MAX_FILTER_LENGTH
                )
            }
            Self::OperatorBandMismatch { expected, actual } => {
                write!(
                    f,
                    "expected a {:?} operator but got a {:?} operator",
                    expected, actual
                )
            }
            Self::DimensionOutOfRange { dimension, total } => {
                write!(
                    f,
                    "dimension {} is out of range for a {}-dimensional operator",
                    dimension, total
                )
            }
            Self::InvalidSubSampleFactor => f.write_str("sub-sample image factor must be >= 1"),
            Self::SubBandCountMismatch { expected, actual } => {
                write!(f, "expected {} sub-bands, got {}", expected, actual)
            }
            Self::SubBandRegionMismatch { expected, actual } => {
                write!(
                    f,
                    "sub-band region {} does not match region {}",
                    actual, expected
                )
            }
            Self::DecompositionCountMismatch {
                outputs,
                bands_per_level,
            } => {
                write!(
                    f,
                    "{} outputs cannot form a pyramid with {} high-pass bands per level",
                    outputs, bands_per_level
                )
            }
            Self::PacketRuleMismatch { rule_length, leaves } => {
                write!(
                    f,
                    "packet rule of length {} does not describe {} leaves",
                    rule_length, leaves
                )
            }
            Self::EmptyRaster => f.write_str("raster has no samples"),
            Self::OutOfMemory(length) => {
                write!(f, "cannot allocate {} samples for a raster", length)
            }
        }
    }
}

/// Allocates a vector, reporting allocation failure as [`WaveletError::OutOfMemory`].
macro_rules! try_vec {
    () => {
        Vec::new()
    };
    ($elem:expr; $n:expr) => {{
        let mut v = Vec::new();
        v.try_reserve_exact($n)
            .map_err(|_| crate::error::WaveletError::OutOfMemory($n))?;
        v.resize($n, $elem);
        v
    }};
}

pub(crate) use try_vec;

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate(n: usize) -> Result<Vec<f64>, WaveletError> {
        Ok(try_vec![0.0; n])
    }

    #[test]
    fn test_messages_name_the_parameter() {
        let e = WaveletError::UnknownWaveletFamily {
            name: "db4".to_string(),
        };
        assert_eq!(e.to_string(), "unknown wavelet family \"db4\"");
        assert_eq!(
            WaveletError::CostPolicyNotSet.to_string(),
            "cost policy not set"
        );
    }

    #[test]
    fn test_try_vec() {
        assert_eq!(allocate(3).unwrap(), vec![0.0; 3]);
        assert_eq!(
            allocate(usize::MAX),
            Err(WaveletError::OutOfMemory(usize::MAX))
        );
    }
}
