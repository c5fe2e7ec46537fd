//! N-dimensional sample buffers.

use crate::error::{try_vec, WaveletError};
use crate::region::Region;

/// Anything a stencil can read samples from.
pub trait SampleSource {
    /// Sample at the absolute index `index`.
    fn sample(&self, index: &[isize]) -> f64;
}

/// An N-dimensional array of `f64` samples with physical origin and spacing.
///
/// The buffered region is always the whole raster; axis 0 varies fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    region: Region,
    origin: Vec<f64>,
    spacing: Vec<f64>,
    data: Vec<f64>,
}

impl Raster {
    /// Create a zero filled raster covering `region`
    pub fn new(region: Region) -> Result<Self, WaveletError> {
        Self::filled(region, 0.0)
    }

    /// Create a raster covering `region` with every sample set to `value`
    pub fn filled(region: Region, value: f64) -> Result<Self, WaveletError> {
        let data = try_vec![value; region.number_of_pixels()];
        let dimension = region.dimension();
        Ok(Self {
            region,
            origin: vec![0.0; dimension],
            spacing: vec![1.0; dimension],
            data,
        })
    }

    /// Create from existing data laid out in buffer order
    pub fn from_data(region: Region, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), region.number_of_pixels());
        let dimension = region.dimension();
        Self {
            region,
            origin: vec![0.0; dimension],
            spacing: vec![1.0; dimension],
            data,
        }
    }

    /// Create a raster whose samples are computed from their index
    pub fn from_fn<F>(region: Region, mut f: F) -> Result<Self, WaveletError>
    where
        F: FnMut(&[isize]) -> f64,
    {
        let mut raster = Self::new(region)?;
        if raster.region.is_empty() {
            return Ok(raster);
        }
        let mut index = raster.region.index().to_vec();
        let mut offset = 0;
        loop {
            raster.data[offset] = f(&index);
            offset += 1;
            if !raster.region.next_index(&mut index) {
                break;
            }
        }
        Ok(raster)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn dimension(&self) -> usize {
        self.region.dimension()
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn set_origin(&mut self, origin: Vec<f64>) {
        assert_eq!(origin.len(), self.dimension());
        self.origin = origin;
    }

    pub fn set_spacing(&mut self, spacing: Vec<f64>) {
        assert_eq!(spacing.len(), self.dimension());
        self.spacing = spacing;
    }

    /// Copy origin and spacing from another raster of the same dimension
    pub fn copy_information(&mut self, other: &Raster) {
        self.origin = other.origin.clone();
        self.spacing = other.spacing.clone();
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Get value at absolute index
    pub fn get(&self, index: &[isize]) -> f64 {
        match self.checked_get(index) {
            Some(value) => value,
            None => panic!(
                "Sample {:?} is outside of raster region {}",
                index, self.region
            ),
        }
    }

    pub fn checked_get(&self, index: &[isize]) -> Option<f64> {
        if self.region.contains(index) {
            Some(self.data[self.region.linear_offset(index)])
        } else {
            None
        }
    }

    /// Set value at absolute index
    pub fn set(&mut self, index: &[isize], value: f64) {
        assert!(
            self.region.contains(index),
            "Sample {:?} is outside of raster region {}",
            index,
            self.region
        );
        let offset = self.region.linear_offset(index);
        self.data[offset] = value;
    }

    /// Read-only window restricted to `region`.
    pub fn view(&self, region: &Region) -> RasterView<'_> {
        assert!(
            self.region.contains_region(region),
            "View region {} is not buffered by raster region {}",
            region,
            self.region
        );
        RasterView {
            raster: self,
            region: region.clone(),
        }
    }

    /// Copy the overlapping samples of `tile` into this raster.
    pub fn paste(&mut self, tile: &Raster) {
        let overlap = match self.region.crop(&tile.region) {
            Some(overlap) => overlap,
            None => return,
        };
        let mut index = overlap.index().to_vec();
        loop {
            let dst = self.region.linear_offset(&index);
            let src = tile.region.linear_offset(&index);
            self.data[dst] = tile.data[src];
            if !overlap.next_index(&mut index) {
                break;
            }
        }
    }

    /// Keep every `factor`-th sample along every axis, starting at the region index.
    pub fn shrink(&self, factor: usize) -> Result<Raster, WaveletError> {
        if factor == 0 {
            return Err(WaveletError::InvalidSubSampleFactor);
        }
        let region = self.region.shrink(factor);
        let start = region.index().to_vec();
        let mut source = vec![0; self.dimension()];
        let mut output = Raster::from_fn(region, |index| {
            for d in 0..index.len() {
                source[d] = self.region.index()[d] + (index[d] - start[d]) * factor as isize;
            }
            self.get(&source)
        })?;
        output.origin = self.origin.clone();
        output.spacing = self.spacing.iter().map(|s| s * factor as f64).collect();
        Ok(output)
    }

    /// Insert `factor - 1` zeros between neighbouring samples along every axis.
    pub fn expand(&self, factor: usize) -> Result<Raster, WaveletError> {
        if factor == 0 {
            return Err(WaveletError::InvalidSubSampleFactor);
        }
        let region = self.region.expand(factor);
        let factor_i = factor as isize;
        let mut output = Raster::from_fn(region, |index| {
            if index.iter().all(|i| i.rem_euclid(factor_i) == 0) {
                let source: Vec<isize> = index.iter().map(|i| i / factor_i).collect();
                self.get(&source)
            } else {
                0.0
            }
        })?;
        output.origin = self.origin.clone();
        output.spacing = self.spacing.iter().map(|s| s / factor as f64).collect();
        Ok(output)
    }
}

impl SampleSource for Raster {
    fn sample(&self, index: &[isize]) -> f64 {
        self.get(index)
    }
}

/// A read-only window into a raster, restricted to a declared region.
///
/// Reading outside the declared region is a streaming invariant violation
/// and panics, even if the backing raster holds the sample.
#[derive(Debug, Clone)]
pub struct RasterView<'a> {
    raster: &'a Raster,
    region: Region,
}

impl RasterView<'_> {
    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn get(&self, index: &[isize]) -> f64 {
        assert!(
            self.region.contains(index),
            "Sample {:?} is outside of the buffered region {}",
            index,
            self.region
        );
        self.raster.data[self.raster.region.linear_offset(index)]
    }
}

impl SampleSource for RasterView<'_> {
    fn sample(&self, index: &[isize]) -> f64 {
        self.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(size: &[usize]) -> Raster {
        let mut counter = 0.0;
        Raster::from_fn(Region::from_size(size), |_| {
            counter += 1.0;
            counter - 1.0
        })
        .unwrap()
    }

    #[test]
    fn test_raster_creation() {
        let raster = Raster::new(Region::from_size(&[4, 3])).unwrap();
        assert_eq!(raster.dimension(), 2);
        assert_eq!(raster.as_slice().len(), 12);
        assert_eq!(raster.get(&[3, 2]), 0.0);
        assert_eq!(raster.spacing(), &[1.0, 1.0]);
    }

    #[test]
    fn test_get_set() {
        let mut raster = ramp(&[4, 3]);
        assert_eq!(raster.get(&[1, 2]), 9.0);
        raster.set(&[1, 2], -1.0);
        assert_eq!(raster.as_slice()[9], -1.0);
        assert_eq!(raster.checked_get(&[4, 0]), None);
    }

    #[test]
    #[should_panic]
    fn test_view_outside_buffered_region() {
        let raster = ramp(&[4, 4]);
        let view = raster.view(&Region::new(vec![1, 1], vec![2, 2]));
        assert_eq!(view.get(&[1, 1]), 5.0);
        view.get(&[0, 0]);
    }

    #[test]
    fn test_paste() {
        let mut raster = Raster::new(Region::from_size(&[4, 4])).unwrap();
        let tile = Raster::filled(Region::new(vec![2, 3], vec![4, 4]), 7.0).unwrap();
        raster.paste(&tile);
        assert_eq!(raster.get(&[2, 3]), 7.0);
        assert_eq!(raster.get(&[3, 3]), 7.0);
        assert_eq!(raster.get(&[1, 3]), 0.0);
        assert_eq!(raster.as_slice().iter().filter(|&&v| v == 7.0).count(), 2);
    }

    #[test]
    fn test_shrink_expand() {
        let raster = ramp(&[4, 4]);
        let shrunk = raster.shrink(2).unwrap();
        assert_eq!(shrunk.region(), &Region::from_size(&[2, 2]));
        assert_eq!(shrunk.as_slice(), &[0.0, 2.0, 8.0, 10.0]);
        assert_eq!(shrunk.spacing(), &[2.0, 2.0]);

        let expanded = shrunk.expand(2).unwrap();
        assert_eq!(expanded.region(), &Region::from_size(&[4, 4]));
        assert_eq!(expanded.get(&[2, 2]), 10.0);
        assert_eq!(expanded.get(&[1, 2]), 0.0);
        assert_eq!(expanded.spacing(), &[1.0, 1.0]);
    }
}
