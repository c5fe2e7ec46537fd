//! One level of the separable stationary wavelet filter bank.
//!
//! The forward direction turns one N-dimensional raster into `2^N` sub-bands
//! by filtering along axis 0, then axis 1, and so on. Every branch of one
//! axis feeds both branches of the next. Bit `d` of a sub-band index is set
//! when axis `d` received the high-pass filter. The inverse direction runs
//! the axes in reverse and sums the synthesis-filtered low and high branches
//! of each pair until a single raster remains.
//!
//! Work is split into disjoint output tiles processed in parallel. A tile
//! only ever reads the padded region returned by
//! [`StationaryFilterBank::generate_input_requested_region`]. Intermediate
//! stages are kept over the tile padded along the axes still to be filtered,
//! so no stage needs samples from a neighbouring tile.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, error};
use rayon::prelude::*;

use crate::border_mode::{BorderMode, BoundedView};
use crate::error::WaveletError;
use crate::kernel::{Band, Direction, WaveletFamily, WaveletOperator};
use crate::raster::{Raster, SampleSource};
use crate::region::Region;
use crate::settings::TransformSettings;
use crate::stencil::DirectionalStencil;

/// Number of sub-bands one level produces for an `dimension`-D raster
pub fn number_of_sub_bands(dimension: usize) -> usize {
    1 << dimension
}

/// Wraps `observer` so that its `0..1` range maps onto `start..start + span`.
pub(crate) fn rescaled_observer<'a>(
    observer: Option<&'a (dyn Fn(f32) + Sync)>,
    start: f32,
    span: f32,
) -> Option<impl Fn(f32) + Sync + 'a> {
    observer.map(move |observer| move |progress: f32| observer(start + progress * span))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationaryFilterBank {
    family: WaveletFamily,
    direction: Direction,
    up_sample_filter_factor: u32,
    sub_sample_image_factor: u32,
    border_mode: BorderMode,
    number_of_regions: usize,
    low_pass: Option<WaveletOperator>,
    high_pass: Option<WaveletOperator>,
}

impl StationaryFilterBank {
    pub fn new(family: WaveletFamily, direction: Direction) -> Self {
        Self {
            family,
            direction,
            up_sample_filter_factor: 0,
            sub_sample_image_factor: 1,
            border_mode: BorderMode::default(),
            number_of_regions: 0,
            low_pass: None,
            high_pass: None,
        }
    }

    /// Filter bank for one decomposition level configured from `settings`
    pub fn with_settings(
        settings: &TransformSettings,
        direction: Direction,
        up_sample_filter_factor: u32,
    ) -> Self {
        let mut bank = Self::new(settings.family, direction);
        bank.up_sample_filter_factor = up_sample_filter_factor;
        bank.sub_sample_image_factor = settings.sub_sample_image_factor;
        bank.border_mode = settings.border_mode;
        bank.number_of_regions = settings.number_of_regions;
        bank
    }

    pub fn family(&self) -> WaveletFamily {
        self.family
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn up_sample_filter_factor(&self) -> u32 {
        self.up_sample_filter_factor
    }

    pub fn set_up_sample_filter_factor(&mut self, factor: u32) {
        self.up_sample_filter_factor = factor;
    }

    pub fn sub_sample_image_factor(&self) -> u32 {
        self.sub_sample_image_factor
    }

    pub fn set_sub_sample_image_factor(&mut self, factor: u32) {
        self.sub_sample_image_factor = factor;
    }

    pub fn border_mode(&self) -> BorderMode {
        self.border_mode
    }

    pub fn set_border_mode(&mut self, border_mode: BorderMode) {
        self.border_mode = border_mode;
    }

    pub fn number_of_regions(&self) -> usize {
        self.number_of_regions
    }

    /// `0` uses one region per rayon worker thread
    pub fn set_number_of_regions(&mut self, regions: usize) {
        self.number_of_regions = regions;
    }

    /// Plug externally built operators into the bank.
    ///
    /// Both operators must be of the right band and their radius must match
    /// the radius generated for the bank's up-sample factor.
    pub fn set_operators(
        &mut self,
        low_pass: WaveletOperator,
        high_pass: WaveletOperator,
    ) -> Result<(), WaveletError> {
        self.check_operator(&low_pass, Band::Low)?;
        self.check_operator(&high_pass, Band::High)?;
        self.low_pass = Some(low_pass);
        self.high_pass = Some(high_pass);
        Ok(())
    }

    fn check_operator(&self, operator: &WaveletOperator, band: Band) -> Result<(), WaveletError> {
        if operator.band() != band {
            return Err(WaveletError::OperatorBandMismatch {
                expected: band,
                actual: operator.band(),
            });
        }
        let expected = WaveletOperator::expected_radius(
            operator.family(),
            band,
            self.direction,
            self.up_sample_filter_factor,
        )?;
        if operator.radius() != expected {
            return Err(WaveletError::OperatorRadiusMismatch {
                band,
                radius: operator.radius(),
                expected,
                up_sample_factor: self.up_sample_filter_factor,
            });
        }
        Ok(())
    }

    /// Low and high operators used by the next computation
    pub fn operators(&self) -> Result<(WaveletOperator, WaveletOperator), WaveletError> {
        let low = match &self.low_pass {
            Some(op) => {
                self.check_operator(op, Band::Low)?;
                op.clone()
            }
            None => self.generate_operator(Band::Low)?,
        };
        let high = match &self.high_pass {
            Some(op) => {
                self.check_operator(op, Band::High)?;
                op.clone()
            }
            None => self.generate_operator(Band::High)?,
        };
        Ok((low, high))
    }

    fn generate_operator(&self, band: Band) -> Result<WaveletOperator, WaveletError> {
        WaveletOperator::new(self.family, band, self.direction, self.up_sample_filter_factor)
    }

    /// Largest stencil radius of the two operators, identical along every axis
    pub fn radius(&self) -> Result<usize, WaveletError> {
        let radius = |op: &Option<WaveletOperator>, band| match op {
            Some(op) => Ok(op.radius()),
            None => WaveletOperator::expected_radius(
                self.family,
                band,
                self.direction,
                self.up_sample_filter_factor,
            ),
        };
        Ok(radius(&self.low_pass, Band::Low)?.max(radius(&self.high_pass, Band::High)?))
    }

    /// Region of the input that must be available to produce `tile`.
    ///
    /// The tile is padded by the stencil radius. Along an axis where the pad
    /// crosses the image border and the border mode folds samples back from
    /// across the axis, the whole axis is requested. The result is cropped to
    /// the image; `None` when the tile lies outside of it.
    pub fn generate_input_requested_region(
        &self,
        image: &Region,
        tile: &Region,
    ) -> Result<Option<Region>, WaveletError> {
        let radius = vec![self.radius()?; tile.dimension()];
        let mut requested = tile.padded(&radius);
        if self.border_mode.folds_across_border() {
            for d in 0..tile.dimension() {
                if requested.index()[d] < image.index()[d] || requested.upper(d) > image.upper(d) {
                    requested.set_axis(d, image.index()[d], image.size()[d]);
                }
            }
        }
        Ok(requested.crop(image))
    }

    fn effective_number_of_regions(&self) -> usize {
        if self.number_of_regions == 0 {
            rayon::current_num_threads()
        } else {
            self.number_of_regions
        }
    }

    /// Run the bank on `inputs`.
    ///
    /// `observer` is called with the completed fraction once per finished tile.
    ///
    /// Forward banks take one raster and return its `2^N` sub-bands in
    /// sub-band index order. Inverse banks take `2^N` sub-bands and return
    /// the single reconstructed raster.
    pub fn compute(
        &self,
        inputs: &[Raster],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        self.run(inputs, observer).inspect_err(|e| {
            error!("{:?} {} filter bank failed: {}", self.direction, self.family, e);
        })
    }

    pub(crate) fn run(
        &self,
        inputs: &[Raster],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        if self.sub_sample_image_factor == 0 {
            return Err(WaveletError::InvalidSubSampleFactor);
        }
        match self.direction {
            Direction::Forward => {
                if inputs.len() != 1 {
                    return Err(WaveletError::SubBandCountMismatch {
                        expected: 1,
                        actual: inputs.len(),
                    });
                }
                self.forward(&inputs[0], observer)
            }
            Direction::Inverse => {
                let sub_bands: Vec<&Raster> = inputs.iter().collect();
                Ok(vec![self.inverse(&sub_bands, observer)?])
            }
        }
    }

    pub(crate) fn forward(
        &self,
        input: &Raster,
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Vec<Raster>, WaveletError> {
        if input.region().is_empty() {
            return Err(WaveletError::EmptyRaster);
        }
        let (low, high) = self.operators()?;
        let extent = input.region();
        let tiles = extent.split(self.effective_number_of_regions());
        debug!(
            "forward level with up-sample factor {}: {} split into {} regions",
            self.up_sample_filter_factor,
            extent,
            tiles.len()
        );

        let done = AtomicUsize::new(0);
        let pieces = tiles
            .par_iter()
            .map(|tile| -> Result<Vec<Raster>, WaveletError> {
                let bands = self.forward_tile(input, tile, &low, &high)?;
                report_progress(observer, &done, tiles.len());
                Ok(bands)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = Vec::with_capacity(number_of_sub_bands(input.dimension()));
        for _ in 0..number_of_sub_bands(input.dimension()) {
            let mut output = Raster::new(extent.clone())?;
            output.copy_information(input);
            outputs.push(output);
        }
        for bands in &pieces {
            for (output, band) in outputs.iter_mut().zip(bands) {
                output.paste(band);
            }
        }

        if self.sub_sample_image_factor > 1 {
            let factor = self.sub_sample_image_factor as usize;
            debug!("decimating {} sub-bands by {}", outputs.len(), factor);
            outputs = outputs
                .iter()
                .map(|output| output.shrink(factor))
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(outputs)
    }

    pub(crate) fn inverse(
        &self,
        sub_bands: &[&Raster],
        observer: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<Raster, WaveletError> {
        let first = match sub_bands.first() {
            Some(&first) => first,
            None => return Err(WaveletError::EmptyRaster),
        };
        if first.region().is_empty() {
            return Err(WaveletError::EmptyRaster);
        }
        let expected = number_of_sub_bands(first.dimension());
        if sub_bands.len() != expected {
            return Err(WaveletError::SubBandCountMismatch {
                expected,
                actual: sub_bands.len(),
            });
        }
        if let Some(band) = sub_bands.iter().find(|b| b.region() != first.region()) {
            return Err(WaveletError::SubBandRegionMismatch {
                expected: first.region().to_string(),
                actual: band.region().to_string(),
            });
        }

        let expanded;
        let sub_bands: Vec<&Raster> = if self.sub_sample_image_factor > 1 {
            let factor = self.sub_sample_image_factor as usize;
            debug!("up-sampling {} sub-bands by {}", sub_bands.len(), factor);
            expanded = sub_bands
                .iter()
                .map(|band| band.expand(factor))
                .collect::<Result<Vec<_>, _>>()?;
            expanded.iter().collect()
        } else {
            sub_bands.to_vec()
        };

        let (low, high) = self.operators()?;
        let extent = sub_bands[0].region();
        let tiles = extent.split(self.effective_number_of_regions());
        debug!(
            "inverse level with up-sample factor {}: {} split into {} regions",
            self.up_sample_filter_factor,
            extent,
            tiles.len()
        );

        let done = AtomicUsize::new(0);
        let pieces = tiles
            .par_iter()
            .map(|tile| -> Result<Raster, WaveletError> {
                let piece = self.inverse_tile(&sub_bands, tile, &low, &high)?;
                report_progress(observer, &done, tiles.len());
                Ok(piece)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut output = Raster::new(extent.clone())?;
        output.copy_information(sub_bands[0]);
        for piece in &pieces {
            output.paste(piece);
        }
        Ok(output)
    }

    fn stencils(
        low: &WaveletOperator,
        high: &WaveletOperator,
        dimension: usize,
    ) -> Result<Vec<(DirectionalStencil, DirectionalStencil)>, WaveletError> {
        (0..dimension)
            .map(|d| {
                Ok((
                    DirectionalStencil::from_operator(low, d, dimension)?,
                    DirectionalStencil::from_operator(high, d, dimension)?,
                ))
            })
            .collect()
    }

    fn forward_tile(
        &self,
        input: &Raster,
        tile: &Region,
        low: &WaveletOperator,
        high: &WaveletOperator,
    ) -> Result<Vec<Raster>, WaveletError> {
        let dimension = input.dimension();
        let extent = input.region();
        let requested = self
            .generate_input_requested_region(extent, tile)?
            .ok_or(WaveletError::EmptyRaster)?;
        debug!("tile {} reads {}", tile, requested);

        let stencils = Self::stencils(low, high, dimension)?;
        let radius = vec![low.radius().max(high.radius()); dimension];
        let source = BoundedView::new(input.view(&requested), extent.clone(), self.border_mode);

        let stage = tile.padded_along(&radius, 1..dimension);
        let mut branches = vec![
            (0usize, filter_along(&source, &stencils[0].0, &stage)?),
            (1, filter_along(&source, &stencils[0].1, &stage)?),
        ];
        for (d, (low_d, high_d)) in stencils.iter().enumerate().skip(1) {
            let stage = tile.padded_along(&radius, d + 1..dimension);
            let mut next = Vec::with_capacity(2 * branches.len());
            for (index, branch) in &branches {
                next.push((*index, filter_along(branch, low_d, &stage)?));
                next.push((*index | (1 << d), filter_along(branch, high_d, &stage)?));
            }
            branches = next;
        }

        branches.sort_by_key(|(index, _)| *index);
        Ok(branches.into_iter().map(|(_, band)| band).collect())
    }

    fn inverse_tile(
        &self,
        sub_bands: &[&Raster],
        tile: &Region,
        low: &WaveletOperator,
        high: &WaveletOperator,
    ) -> Result<Raster, WaveletError> {
        let dimension = tile.dimension();
        let extent = sub_bands[0].region();
        let requested = self
            .generate_input_requested_region(extent, tile)?
            .ok_or(WaveletError::EmptyRaster)?;
        debug!("tile {} reads {}", tile, requested);

        let stencils = Self::stencils(low, high, dimension)?;
        let radius = vec![low.radius().max(high.radius()); dimension];
        let sources: Vec<BoundedView> = sub_bands
            .iter()
            .map(|band| BoundedView::new(band.view(&requested), extent.clone(), self.border_mode))
            .collect();

        let last = dimension - 1;
        let half = 1 << last;
        let stage = tile.padded_along(&radius, 0..last);
        let mut branches = (0..half)
            .map(|index| {
                combine_along(
                    &sources[index],
                    &sources[index | half],
                    &stencils[last],
                    &stage,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        for d in (0..last).rev() {
            let half = 1 << d;
            let stage = tile.padded_along(&radius, 0..d);
            branches = (0..half)
                .map(|index| {
                    combine_along(&branches[index], &branches[index | half], &stencils[d], &stage)
                })
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(branches.swap_remove(0))
    }
}

fn report_progress(observer: Option<&(dyn Fn(f32) + Sync)>, done: &AtomicUsize, total: usize) {
    let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
    if let Some(observer) = observer {
        observer(completed as f32 / total as f32);
    }
}

/// Apply `stencil` at every index of `region`.
fn filter_along<S: SampleSource + ?Sized>(
    source: &S,
    stencil: &DirectionalStencil,
    region: &Region,
) -> Result<Raster, WaveletError> {
    let mut scratch = vec![0; region.dimension()];
    Raster::from_fn(region.clone(), |index| {
        stencil.inner_product(source, index, &mut scratch)
    })
}

/// Sum of the synthesis-filtered low and high branches over `region`.
fn combine_along<L, H>(
    low_source: &L,
    high_source: &H,
    (low, high): &(DirectionalStencil, DirectionalStencil),
    region: &Region,
) -> Result<Raster, WaveletError>
where
    L: SampleSource + ?Sized,
    H: SampleSource + ?Sized,
{
    let mut scratch = vec![0; region.dimension()];
    Raster::from_fn(region.clone(), |index| {
        low.inner_product(low_source, index, &mut scratch)
            + high.inner_product(high_source, index, &mut scratch)
    })
}
