//! Boundary extension policies for neighbourhood reads past the image border.

use std::fmt;
use std::str::FromStr;

use crate::error::WaveletError;
use crate::raster::{RasterView, SampleSource};
use crate::region::Region;

/// Declares how samples outside the image are synthesised.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default)]
pub enum BorderMode {
    /// Edge sample replicated, `aaaaaa|abcdefgh|hhhhhhh`
    Clamp,
    /// Periodic extension, `cdefgh|abcdefgh|abcdefg`
    #[default]
    Wrap,
    /// Mirror including the edge sample, `fedcba|abcdefgh|hgfedcb`
    Reflect,
    /// Mirror excluding the edge sample, `gfedcb|abcdefgh|gfedcba`
    Reflect101,
    /// Zero padding, `000000|abcdefgh|000000`
    Zeros,
}

impl fmt::Display for BorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BorderMode::Clamp => f.write_str("clamp"),
            BorderMode::Wrap => f.write_str("wrap"),
            BorderMode::Reflect => f.write_str("reflect"),
            BorderMode::Reflect101 => f.write_str("reflect101"),
            BorderMode::Zeros => f.write_str("zeros"),
        }
    }
}

impl FromStr for BorderMode {
    type Err = WaveletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" | "zero-flux" | "neumann" => Ok(BorderMode::Clamp),
            "wrap" | "periodic" => Ok(BorderMode::Wrap),
            "reflect" | "mirror" => Ok(BorderMode::Reflect),
            "reflect101" => Ok(BorderMode::Reflect101),
            "zeros" | "zero" | "constant" => Ok(BorderMode::Zeros),
            _ => Err(WaveletError::UnknownBorderMode {
                name: s.to_string(),
            }),
        }
    }
}

impl BorderMode {
    /// Map `position` onto `start .. start + size`.
    ///
    /// Returns `None` when the sample is an implicit zero.
    #[inline]
    pub fn map_coordinate(self, position: isize, start: isize, size: usize) -> Option<isize> {
        let n = size as isize;
        let local = position - start;
        if (0..n).contains(&local) {
            return Some(position);
        }
        let mapped = match self {
            BorderMode::Clamp => local.clamp(0, n - 1),
            BorderMode::Wrap => local.rem_euclid(n),
            BorderMode::Reflect => {
                let m = local.rem_euclid(2 * n);
                if m < n {
                    m
                } else {
                    2 * n - 1 - m
                }
            }
            BorderMode::Reflect101 => {
                if n == 1 {
                    0
                } else {
                    let m = local.rem_euclid(2 * n - 2);
                    if m < n {
                        m
                    } else {
                        2 * n - 2 - m
                    }
                }
            }
            BorderMode::Zeros => return None,
        };
        Some(start + mapped)
    }

    /// True when samples past one border are read from anywhere along the axis,
    /// not only from the samples next to that border.
    pub fn folds_across_border(self) -> bool {
        matches!(
            self,
            BorderMode::Wrap | BorderMode::Reflect | BorderMode::Reflect101
        )
    }

    /// Map every coordinate of `index` into `extent`, writing the result to `mapped`.
    ///
    /// Returns `false` when the sample is an implicit zero.
    #[inline]
    pub fn map_index(self, index: &[isize], extent: &Region, mapped: &mut [isize]) -> bool {
        for d in 0..index.len() {
            match self.map_coordinate(index[d], extent.index()[d], extent.size()[d]) {
                Some(position) => mapped[d] = position,
                None => return false,
            }
        }
        true
    }
}

/// A raster view whose reads outside the image extent follow a [`BorderMode`].
///
/// Mapped positions must still fall inside the view's buffered region.
pub struct BoundedView<'a> {
    view: RasterView<'a>,
    extent: Region,
    border_mode: BorderMode,
}

impl<'a> BoundedView<'a> {
    pub fn new(view: RasterView<'a>, extent: Region, border_mode: BorderMode) -> Self {
        Self {
            view,
            extent,
            border_mode,
        }
    }
}

impl SampleSource for BoundedView<'_> {
    fn sample(&self, index: &[isize]) -> f64 {
        if self.extent.contains(index) {
            return self.view.get(index);
        }
        let mut mapped = index.to_vec();
        if self.border_mode.map_index(index, &self.extent, &mut mapped) {
            self.view.get(&mapped)
        } else {
            0.0
        }
    }
}
