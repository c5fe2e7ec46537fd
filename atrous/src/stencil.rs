//! Directional operators: a 1-D filter laid along one axis of an N-D neighbourhood.

use crate::error::WaveletError;
use crate::kernel::WaveletOperator;
use crate::raster::SampleSource;

/// An N-dimensional stencil active along exactly one axis.
///
/// Its radius is `len / 2` along the active axis and zero along every other
/// axis, so the inner product only ever reads samples on the active line
/// through the centre pixel. Tap 0 sits at the most negative offset.
///
/// Taps are kept as `(offset, coefficient)` pairs. A stencil built from an
/// up-sampled operator holds only the operator's base taps, never the
/// inserted zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalStencil {
    taps: Vec<(isize, f64)>,
    length: usize,
    dimension: usize,
    total_dimensions: usize,
}

impl DirectionalStencil {
    /// Lay a dense coefficient sequence along `dimension`; every tap is applied
    pub fn new(
        coefficients: &[f64],
        dimension: usize,
        total_dimensions: usize,
    ) -> Result<Self, WaveletError> {
        let radius = (coefficients.len() / 2) as isize;
        let taps = coefficients
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as isize - radius, c))
            .collect();
        Self::from_taps(taps, coefficients.len(), dimension, total_dimensions)
    }

    /// Lay a wavelet operator along `dimension`
    pub fn from_operator(
        operator: &WaveletOperator,
        dimension: usize,
        total_dimensions: usize,
    ) -> Result<Self, WaveletError> {
        Self::from_taps(
            operator.taps().collect(),
            operator.len(),
            dimension,
            total_dimensions,
        )
    }

    fn from_taps(
        taps: Vec<(isize, f64)>,
        length: usize,
        dimension: usize,
        total_dimensions: usize,
    ) -> Result<Self, WaveletError> {
        if dimension >= total_dimensions {
            return Err(WaveletError::DimensionOutOfRange {
                dimension,
                total: total_dimensions,
            });
        }
        Ok(Self {
            taps,
            length,
            dimension,
            total_dimensions,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn taps(&self) -> &[(isize, f64)] {
        &self.taps
    }

    /// Radius along every axis
    pub fn radius(&self) -> Vec<usize> {
        let mut radius = vec![0; self.total_dimensions];
        radius[self.dimension] = self.length / 2;
        radius
    }

    /// Size along every axis
    pub fn size(&self) -> Vec<usize> {
        let mut size = vec![1; self.total_dimensions];
        size[self.dimension] = self.length;
        size
    }

    /// `sum_i c[i] * source[center + offset_i * e_dimension]`
    ///
    /// `scratch` must have one slot per dimension.
    pub fn inner_product<S: SampleSource + ?Sized>(
        &self,
        source: &S,
        center: &[isize],
        scratch: &mut [isize],
    ) -> f64 {
        scratch.copy_from_slice(center);
        let mut sum = 0.0;
        for &(offset, c) in &self.taps {
            scratch[self.dimension] = center[self.dimension] + offset;
            sum += c * source.sample(scratch);
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Band, Direction, WaveletFamily};
    use crate::raster::Raster;
    use crate::region::Region;

    #[test]
    fn test_haar_low_pass_1d() {
        let (a, b, c) = (3.0, 5.0, 11.0);
        // the trailing zero tap still reads one sample past the centre
        let raster = Raster::from_data(Region::from_size(&[4]), vec![a, b, c, 17.0]);
        let op = WaveletOperator::new(WaveletFamily::Haar, Band::Low, Direction::Forward, 0).unwrap();
        let stencil = DirectionalStencil::from_operator(&op, 0, 1).unwrap();
        let mut scratch = [0];
        assert_eq!(stencil.inner_product(&raster, &[1], &mut scratch), 0.5 * a + 0.5 * b);
        assert_eq!(stencil.inner_product(&raster, &[2], &mut scratch), 0.5 * b + 0.5 * c);
    }

    #[test]
    fn test_only_active_axis_is_read() {
        // 3x3 raster with distinct values, stencil along axis 1
        let raster = Raster::from_fn(Region::from_size(&[3, 3]), |i| (i[0] * 10 + i[1]) as f64)
            .unwrap();
        let stencil = DirectionalStencil::new(&[1.0, 2.0, 4.0], 1, 2).unwrap();
        assert_eq!(stencil.radius(), vec![0, 1]);
        assert_eq!(stencil.size(), vec![1, 3]);
        let mut scratch = [0, 0];
        let value = stencil.inner_product(&raster, &[2, 1], &mut scratch);
        assert_eq!(value, 20.0 + 2.0 * 21.0 + 4.0 * 22.0);
    }

    #[test]
    fn test_up_sampled_operator_matches_dense_filter() {
        let raster = Raster::from_fn(Region::from_size(&[40]), |i| ((i[0] * 7) % 11) as f64).unwrap();
        let op = WaveletOperator::new(WaveletFamily::Spline97, Band::Low, Direction::Forward, 2)
            .unwrap();
        let sparse = DirectionalStencil::from_operator(&op, 0, 1).unwrap();
        let dense = DirectionalStencil::new(&op.coefficients().unwrap(), 0, 1).unwrap();
        assert_eq!(sparse.taps().len(), 9);
        assert_eq!(dense.taps().len(), 33);
        assert_eq!(sparse.radius(), dense.radius());
        let mut scratch = [0];
        for center in 16..24 {
            let a = sparse.inner_product(&raster, &[center], &mut scratch);
            let b = dense.inner_product(&raster, &[center], &mut scratch);
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nan_under_zero_tap_propagates() {
        // the last Haar tap is zero and sits on sample 2
        let raster = Raster::from_data(Region::from_size(&[3]), vec![1.0, 2.0, f64::NAN]);
        let op = WaveletOperator::new(WaveletFamily::Haar, Band::Low, Direction::Forward, 0).unwrap();
        let stencil = DirectionalStencil::from_operator(&op, 0, 1).unwrap();
        let mut scratch = [0];
        assert!(stencil.inner_product(&raster, &[1], &mut scratch).is_nan());
    }

    #[test]
    fn test_dimension_out_of_range() {
        assert_eq!(
            DirectionalStencil::new(&[1.0], 2, 2),
            Err(WaveletError::DimensionOutOfRange {
                dimension: 2,
                total: 2
            })
        );
    }
}
