//! Wavelet coefficient generation.
//!
//! Produces the 1-D analysis and synthesis filters of the supported wavelet
//! families and up-samples them for the stationary ("à trous") transform,
//! where `H(z)` becomes `H(z^2)` at every further decomposition level.

use std::fmt;
use std::str::FromStr;

use crate::error::{try_vec, WaveletError};

/// Haar filter coefficients, centred on the middle tap
pub mod coefficients_haar {
    /// Low-pass analysis filter
    pub const LOW_PASS: [f64; 3] = [0.5, 0.5, 0.0];
    /// High-pass analysis filter
    pub const HIGH_PASS: [f64; 3] = [-0.5, 0.5, 0.0];
}

/// Spline biorthogonal 9/7 filter coefficients, centred on the middle tap
#[allow(clippy::excessive_precision)]
pub mod coefficients_97 {
    /// Low-pass analysis filter (9 taps)
    pub const LOW_PASS: [f64; 9] = [
        0.026748757411,
        -0.016864118443,
        -0.078223266529,
        0.266864118443,
        0.602949018236,
        0.266864118443,
        -0.078223266529,
        -0.016864118443,
        0.026748757411,
    ];
    /// High-pass analysis filter (7 taps)
    pub const HIGH_PASS: [f64; 7] = [
        0.045635881557,
        -0.028771763114,
        -0.295635881557,
        0.557543526229,
        -0.295635881557,
        -0.028771763114,
        0.045635881557,
    ];
}

/// Wavelet family selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaveletFamily {
    /// Haar wavelet
    #[default]
    Haar,
    /// Spline biorthogonal 9/7 wavelet
    Spline97,
}

impl fmt::Display for WaveletFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveletFamily::Haar => f.write_str("haar"),
            WaveletFamily::Spline97 => f.write_str("9/7"),
        }
    }
}

impl FromStr for WaveletFamily {
    type Err = WaveletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "haar" => Ok(WaveletFamily::Haar),
            "9/7" | "97" | "spline97" | "spline_biorthogonal_9_7" | "cdf97" => {
                Ok(WaveletFamily::Spline97)
            }
            _ => Err(WaveletError::UnknownWaveletFamily {
                name: s.to_string(),
            }),
        }
    }
}

/// Low-pass or high-pass branch of a filter bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    High,
}

impl FromStr for Band {
    type Err = WaveletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "lowpass" | "low-pass" => Ok(Band::Low),
            "high" | "highpass" | "high-pass" => Ok(Band::High),
            _ => Err(WaveletError::UnknownBand {
                name: s.to_string(),
            }),
        }
    }
}

/// Whether a filter bank decomposes or reconstructs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

/// Base analysis coefficients of a family and band.
pub fn generate_base_coefficients(family: WaveletFamily, band: Band) -> Vec<f64> {
    match (family, band) {
        (WaveletFamily::Haar, Band::Low) => coefficients_haar::LOW_PASS.to_vec(),
        (WaveletFamily::Haar, Band::High) => coefficients_haar::HIGH_PASS.to_vec(),
        (WaveletFamily::Spline97, Band::Low) => coefficients_97::LOW_PASS.to_vec(),
        (WaveletFamily::Spline97, Band::High) => coefficients_97::HIGH_PASS.to_vec(),
    }
}

/// Multiply every tap by `(-1)^offset`, offsets counted from the centre tap.
fn modulate(coeff: &[f64]) -> Vec<f64> {
    let radius = coeff.len() / 2;
    coeff
        .iter()
        .enumerate()
        .map(|(i, &c)| if (i + radius) % 2 == 0 { c } else { -c })
        .collect()
}

/// Synthesis coefficients of a family and band.
///
/// The synthesis stencil is the tap-reversed dual filter. Haar is its own
/// dual. For 9/7 the low-pass dual is the demodulated high-pass analysis
/// filter and the high-pass dual is the modulated low-pass analysis filter,
/// so that `H(w)·H'(w) + G(w)·G'(w) = 1` at every up-sampling level.
pub fn generate_synthesis_coefficients(family: WaveletFamily, band: Band) -> Vec<f64> {
    let mut dual = match family {
        WaveletFamily::Haar => generate_base_coefficients(family, band),
        WaveletFamily::Spline97 => match band {
            Band::Low => modulate(&coefficients_97::HIGH_PASS),
            Band::High => modulate(&coefficients_97::LOW_PASS),
        },
    };
    dual.reverse();
    dual
}

/// Longest up-sampled filter the transforms accept, so that every tap
/// offset and padded region stays addressable.
pub const MAX_FILTER_LENGTH: usize = i32::MAX as usize;

/// Length of a `length`-tap filter after `factor` up-sampling passes.
///
/// Fails once the result would exceed [`MAX_FILTER_LENGTH`].
pub fn up_sampled_length(length: usize, factor: u32) -> Result<usize, WaveletError> {
    if length <= 1 {
        return Ok(length);
    }
    1usize
        .checked_shl(factor)
        .and_then(|step| (length - 1).checked_mul(step))
        .and_then(|n| n.checked_add(1))
        .filter(|&n| n <= MAX_FILTER_LENGTH)
        .ok_or(WaveletError::UpSampleFactorTooLarge {
            up_sample_factor: factor,
        })
}

/// Insert a zero between every pair of adjacent taps, `factor` times.
pub fn up_sample(coeff: &[f64], factor: u32) -> Result<Vec<f64>, WaveletError> {
    let length = up_sampled_length(coeff.len(), factor)?;
    if coeff.len() <= 1 {
        return Ok(coeff.to_vec());
    }
    let step = (length - 1) / (coeff.len() - 1);
    let mut taps = try_vec![0.0; length];
    for (i, &c) in coeff.iter().enumerate() {
        taps[i * step] = c;
    }
    Ok(taps)
}

/// A 1-D wavelet filter ready to be laid along one axis.
///
/// Only the base taps are stored; the zeros inserted by up-sampling are
/// implied by the tap spacing. Generated once per filter bank level and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletOperator {
    family: WaveletFamily,
    band: Band,
    direction: Direction,
    up_sample_factor: u32,
    base: Vec<f64>,
    length: usize,
}

impl WaveletOperator {
    pub fn new(
        family: WaveletFamily,
        band: Band,
        direction: Direction,
        up_sample_factor: u32,
    ) -> Result<Self, WaveletError> {
        let base = Self::base_coefficients(family, band, direction);
        let length = up_sampled_length(base.len(), up_sample_factor)?;
        Ok(Self {
            family,
            band,
            direction,
            up_sample_factor,
            base,
            length,
        })
    }

    fn base_coefficients(family: WaveletFamily, band: Band, direction: Direction) -> Vec<f64> {
        match direction {
            Direction::Forward => generate_base_coefficients(family, band),
            Direction::Inverse => generate_synthesis_coefficients(family, band),
        }
    }

    /// Radius expected for an operator of this kind at the given up-sample factor
    pub fn expected_radius(
        family: WaveletFamily,
        band: Band,
        direction: Direction,
        up_sample_factor: u32,
    ) -> Result<usize, WaveletError> {
        let base = Self::base_coefficients(family, band, direction).len();
        Ok(up_sampled_length(base, up_sample_factor)? / 2)
    }

    pub fn family(&self) -> WaveletFamily {
        self.family
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn up_sample_factor(&self) -> u32 {
        self.up_sample_factor
    }

    /// The up-sampled coefficient sequence, zeros included
    pub fn coefficients(&self) -> Result<Vec<f64>, WaveletError> {
        up_sample(&self.base, self.up_sample_factor)
    }

    /// `(offset, coefficient)` of every base tap, offsets relative to the centre
    pub fn taps(&self) -> impl Iterator<Item = (isize, f64)> + '_ {
        let step = if self.base.len() > 1 {
            (self.length - 1) / (self.base.len() - 1)
        } else {
            0
        };
        let radius = self.radius() as isize;
        self.base
            .iter()
            .enumerate()
            .map(move |(i, &c)| ((i * step) as isize - radius, c))
    }

    /// Number of taps after up-sampling
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn radius(&self) -> usize {
        self.length / 2
    }
}
