//! Configuration shared by the filter bank and the transforms built on it.

use crate::border_mode::BorderMode;
use crate::error::WaveletError;
use crate::kernel::WaveletFamily;

/// Transform configuration.
///
/// `number_of_regions == 0` splits every level into one region per rayon
/// worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSettings {
    pub family: WaveletFamily,
    pub border_mode: BorderMode,
    /// Decimation applied after filtering (forward) or zero insertion before
    /// filtering (inverse). `1` keeps the transform stationary.
    pub sub_sample_image_factor: u32,
    pub number_of_regions: usize,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            family: WaveletFamily::Haar,
            border_mode: BorderMode::Wrap,
            sub_sample_image_factor: 1,
            number_of_regions: 0,
        }
    }
}

impl TransformSettings {
    pub fn new(family: WaveletFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    pub fn with_border_mode(mut self, border_mode: BorderMode) -> Self {
        self.border_mode = border_mode;
        self
    }

    pub fn with_sub_sample_image_factor(mut self, factor: u32) -> Self {
        self.sub_sample_image_factor = factor;
        self
    }

    pub fn with_number_of_regions(mut self, regions: usize) -> Self {
        self.number_of_regions = regions;
        self
    }

    /// True when no decimation happens between levels
    pub fn is_stationary(&self) -> bool {
        self.sub_sample_image_factor == 1
    }

    /// Up-sample factor of the operators at a given decomposition depth
    pub fn up_sample_factor_at(&self, depth: u32) -> u32 {
        if self.is_stationary() {
            depth
        } else {
            0
        }
    }

    pub fn validate(&self) -> Result<(), WaveletError> {
        if self.sub_sample_image_factor == 0 {
            return Err(WaveletError::InvalidSubSampleFactor);
        }
        Ok(())
    }
}
