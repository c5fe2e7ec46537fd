//! Stop policies deciding how deep a wavelet packet tree grows.

use crate::raster::Raster;

/// Decides whether a sub-band produced at `depth` is decomposed again.
///
/// Implementations may look at the sub-band content; the packet transform
/// treats every policy the same way.
pub trait StopPolicy: Send + Sync {
    /// `true` while further decomposition is desired
    fn evaluate(&self, depth: u32, subband: &Raster) -> bool;
}

impl<F> StopPolicy for F
where
    F: Fn(u32, &Raster) -> bool + Send + Sync,
{
    fn evaluate(&self, depth: u32, subband: &Raster) -> bool {
        self(depth, subband)
    }
}

/// Decomposes every node down to a fixed depth, ignoring the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullyDecomposedCost {
    number_of_allowed_decompositions: u32,
}

impl FullyDecomposedCost {
    pub fn new(number_of_allowed_decompositions: u32) -> Self {
        Self {
            number_of_allowed_decompositions,
        }
    }

    pub fn number_of_allowed_decompositions(&self) -> u32 {
        self.number_of_allowed_decompositions
    }

    pub fn set_number_of_allowed_decompositions(&mut self, decompositions: u32) {
        self.number_of_allowed_decompositions = decompositions;
    }
}

impl StopPolicy for FullyDecomposedCost {
    fn evaluate(&self, depth: u32, _subband: &Raster) -> bool {
        depth < self.number_of_allowed_decompositions
    }
}

/// Decomposes a node while it still carries energy.
///
/// A sub-band is split again when `depth < max_depth` and its mean squared
/// sample value is strictly above `threshold`. Flat sub-bands stay leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyThresholdCost {
    max_depth: u32,
    threshold: f64,
}

impl EnergyThresholdCost {
    pub fn new(max_depth: u32, threshold: f64) -> Self {
        Self {
            max_depth,
            threshold,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Mean squared sample value, `0` for an empty raster
    pub fn energy(subband: &Raster) -> f64 {
        let samples = subband.as_slice();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|v| v * v).sum::<f64>() / samples.len() as f64
    }
}

impl StopPolicy for EnergyThresholdCost {
    fn evaluate(&self, depth: u32, subband: &Raster) -> bool {
        depth < self.max_depth && Self::energy(subband) > self.threshold
    }
}
