//! Multi-level pyramid transform following the low-pass branch.
//!
//! Level `k` filters the low-pass output of level `k - 1`. The output list
//! holds the `2^N - 1` high-pass sub-bands of every level in level order,
//! followed by the last low-pass sub-band.

use log::{error, info};

use crate::error::WaveletError;
use crate::filter_bank::{number_of_sub_bands, rescaled_observer, StationaryFilterBank};
use crate::kernel::Direction;
use crate::raster::Raster;
use crate::settings::TransformSettings;

/// Number of outputs a `levels` deep pyramid produces for an N-D raster
pub fn number_of_outputs(dimension: usize, levels: u32) -> usize {
    levels as usize * (number_of_sub_bands(dimension) - 1) + 1
}

#[derive(Debug, Clone)]
pub struct WaveletForwardTransform {
    settings: TransformSettings,
    filter_list: Vec<StationaryFilterBank>,
}

impl WaveletForwardTransform {
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            settings,
            filter_list: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn number_of_decompositions(&self) -> u32 {
        self.filter_list.len() as u32
    }

    /// Rebuild one filter bank per level.
    ///
    /// In the stationary case level `k` uses operators up-sampled `k` times.
    pub fn set_number_of_decompositions(&mut self, levels: u32) {
        self.filter_list = (0..levels)
            .map(|level| {
                StationaryFilterBank::with_settings(
                    &self.settings,
                    Direction::Forward,
                    self.settings.up_sample_factor_at(level),
                )
            })
            .collect();
    }

    pub fn filter_list(&self) -> &[StationaryFilterBank] {
        &self.filter_list
    }

    /// Filter bank of one level, e.g. to plug in custom operators
    pub fn filter_mut(&mut self, level: u32) -> Option<&mut StationaryFilterBank> {
        self.filter_list.get_mut(level as usize)
    }

    pub fn compute(
        &self,
        input: &Raster,
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        self.run(input, observer).inspect_err(|e| {
            error!("wavelet forward transform failed: {}", e);
        })
    }

    fn run(
        &self,
        input: &Raster,
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        self.settings.validate()?;
        if input.region().is_empty() {
            return Err(WaveletError::EmptyRaster);
        }
        // every level must be able to build its operators before any is run
        for bank in &self.filter_list {
            bank.operators()?;
        }
        let levels = self.filter_list.len();
        let mut outputs = Vec::with_capacity(number_of_outputs(input.dimension(), levels as u32));

        let mut low: Option<Raster> = None;
        for (level, bank) in self.filter_list.iter().enumerate() {
            let source = low.as_ref().unwrap_or(input);
            let scaled = rescaled_observer(observer, level as f32 / levels as f32, 1.0 / levels as f32);
            let mut bands = bank.forward(source, scaled.as_ref().map(|f| f as &(dyn Fn(f32) + Sync)))?;
            info!(
                "pyramid level {} produced {} sub-bands over {}",
                level,
                bands.len(),
                bands[0].region()
            );
            let next = bands.remove(0);
            outputs.append(&mut bands);
            low = Some(next);
        }

        match low {
            Some(low) => outputs.push(low),
            None => {
                outputs.push(input.clone());
                if let Some(observer) = observer {
                    observer(1.0);
                }
            }
        }
        Ok(outputs)
    }
}

/// Rebuilds a raster from the output list of a [`WaveletForwardTransform`].
///
/// The number of levels is inferred from the length of the list. The
/// settings must match the ones used for the forward pass.
#[derive(Debug, Clone, Default)]
pub struct WaveletInverseTransform {
    settings: TransformSettings,
}

impl WaveletInverseTransform {
    pub fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    /// Number of levels encoded by an output list of `outputs` rasters.
    pub fn number_of_decompositions(
        dimension: usize,
        outputs: usize,
    ) -> Result<u32, WaveletError> {
        let bands_per_level = number_of_sub_bands(dimension) - 1;
        if outputs == 0 || (outputs - 1) % bands_per_level != 0 {
            return Err(WaveletError::DecompositionCountMismatch {
                outputs,
                bands_per_level,
            });
        }
        Ok(((outputs - 1) / bands_per_level) as u32)
    }

    pub fn compute(
        &self,
        outputs: &[Raster],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Raster, WaveletError> {
        self.run(outputs, observer).inspect_err(|e| {
            error!("wavelet inverse transform failed: {}", e);
        })
    }

    fn run(
        &self,
        outputs: &[Raster],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Raster, WaveletError> {
        self.settings.validate()?;
        let (last, highs) = match outputs.split_last() {
            Some(split) => split,
            None => {
                return Err(WaveletError::DecompositionCountMismatch {
                    outputs: 0,
                    bands_per_level: 0,
                })
            }
        };
        let dimension = last.dimension();
        if dimension == 0 {
            return Err(WaveletError::EmptyRaster);
        }
        let levels = Self::number_of_decompositions(dimension, outputs.len())?;
        let bands_per_level = number_of_sub_bands(dimension) - 1;

        let mut low: Option<Raster> = None;
        for (step, level) in (0..levels).rev().enumerate() {
            let bank = StationaryFilterBank::with_settings(
                &self.settings,
                Direction::Inverse,
                self.settings.up_sample_factor_at(level),
            );
            let start = level as usize * bands_per_level;
            let mut sub_bands = Vec::with_capacity(bands_per_level + 1);
            sub_bands.push(low.as_ref().unwrap_or(last));
            sub_bands.extend(&highs[start..start + bands_per_level]);

            let scaled = rescaled_observer(observer, step as f32 / levels as f32, 1.0 / levels as f32);
            let reconstructed =
                bank.inverse(&sub_bands, scaled.as_ref().map(|f| f as &(dyn Fn(f32) + Sync)))?;
            info!("pyramid level {} reconstructed over {}", level, reconstructed.region());
            low = Some(reconstructed);
        }

        Ok(low.unwrap_or_else(|| last.clone()))
    }
}
