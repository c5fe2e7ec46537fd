//! Axis-aligned index ranges over N-dimensional rasters.
//!
//! A [`Region`] is the unit of streaming: a stage declares the region it has
//! to produce, derives the (padded) region it needs from its input, and only
//! ever reads samples inside that declared region. Indices are signed so that
//! intermediate buffers may extend past the image borders.

use std::fmt;
use std::ops::Range;

/// An N-dimensional index range: `index[d] .. index[d] + size[d]` along every axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    index: Vec<isize>,
    size: Vec<usize>,
}

impl Region {
    /// Create a region from its start index and size.
    pub fn new(index: Vec<isize>, size: Vec<usize>) -> Self {
        assert_eq!(
            index.len(),
            size.len(),
            "region index and size must have the same dimension"
        );
        Self { index, size }
    }

    /// Create a region starting at the origin
    pub fn from_size(size: &[usize]) -> Self {
        Self::new(vec![0; size.len()], size.to_vec())
    }

    pub fn dimension(&self) -> usize {
        self.size.len()
    }

    pub fn index(&self) -> &[isize] {
        &self.index
    }

    pub fn size(&self) -> &[usize] {
        &self.size
    }

    /// Exclusive upper bound along `axis`
    pub fn upper(&self, axis: usize) -> isize {
        self.index[axis] + self.size[axis] as isize
    }

    /// Saturates at `usize::MAX`, which no allocation can satisfy
    pub fn number_of_pixels(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.size
            .iter()
            .try_fold(1usize, |n, &s| n.checked_mul(s))
            .unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty() || self.size.contains(&0)
    }

    /// Check whether the index lies inside the region
    pub fn contains(&self, index: &[isize]) -> bool {
        index.len() == self.dimension()
            && index
                .iter()
                .enumerate()
                .all(|(d, &i)| i >= self.index[d] && i < self.upper(d))
    }

    /// Check whether `other` lies completely inside this region
    pub fn contains_region(&self, other: &Region) -> bool {
        other.dimension() == self.dimension()
            && (0..self.dimension()).all(|d| {
                other.size[d] == 0
                    || (other.index[d] >= self.index[d] && other.upper(d) <= self.upper(d))
            })
    }

    /// Replace the range covered along `axis`.
    pub fn set_axis(&mut self, axis: usize, index: isize, size: usize) {
        self.index[axis] = index;
        self.size[axis] = size;
    }

    /// Grow the region by `radius[d]` on both sides of every axis in `axes`.
    pub fn padded_along(&self, radius: &[usize], axes: Range<usize>) -> Region {
        let mut padded = self.clone();
        for d in axes {
            padded.index[d] -= radius[d] as isize;
            padded.size[d] += 2 * radius[d];
        }
        padded
    }

    /// Grow the region by `radius[d]` on both sides of every axis.
    pub fn padded(&self, radius: &[usize]) -> Region {
        self.padded_along(radius, 0..self.dimension())
    }

    /// Intersection of the two regions, `None` when they do not overlap.
    pub fn crop(&self, other: &Region) -> Option<Region> {
        assert_eq!(self.dimension(), other.dimension());
        let mut index = Vec::with_capacity(self.dimension());
        let mut size = Vec::with_capacity(self.dimension());
        for d in 0..self.dimension() {
            let lower = self.index[d].max(other.index[d]);
            let upper = self.upper(d).min(other.upper(d));
            if upper <= lower {
                return None;
            }
            index.push(lower);
            size.push((upper - lower) as usize);
        }
        Some(Region { index, size })
    }

    /// Split into at most `pieces` disjoint regions covering this one.
    ///
    /// The split happens along the outermost axis whose size is larger than
    /// one, so every piece maps to a contiguous block of a raster buffer.
    pub fn split(&self, pieces: usize) -> Vec<Region> {
        let axis = match (0..self.dimension()).rev().find(|&d| self.size[d] > 1) {
            Some(axis) => axis,
            None => return vec![self.clone()],
        };
        let pieces = pieces.clamp(1, self.size[axis]);
        let chunk = self.size[axis].div_ceil(pieces);

        let mut regions = Vec::with_capacity(pieces);
        let mut start = 0;
        while start < self.size[axis] {
            let mut piece = self.clone();
            piece.index[axis] = self.index[axis] + start as isize;
            piece.size[axis] = chunk.min(self.size[axis] - start);
            regions.push(piece);
            start += chunk;
        }
        regions
    }

    /// Region of the samples kept when decimating by `factor` along every axis.
    pub fn shrink(&self, factor: usize) -> Region {
        let factor_i = factor as isize;
        Region {
            index: self.index.iter().map(|&i| i.div_euclid(factor_i)).collect(),
            size: self.size.iter().map(|&s| s.div_ceil(factor)).collect(),
        }
    }

    /// Region covered after inserting `factor - 1` zeros between samples.
    pub fn expand(&self, factor: usize) -> Region {
        Region {
            index: self.index.iter().map(|&i| i * factor as isize).collect(),
            size: self.size.iter().map(|&s| s * factor).collect(),
        }
    }

    /// Row-major strides, axis 0 varying fastest.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.dimension());
        let mut stride = 1;
        for &s in &self.size {
            strides.push(stride);
            stride *= s;
        }
        strides
    }

    /// Offset of `index` in a buffer laid out over this region.
    pub fn linear_offset(&self, index: &[isize]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for d in 0..self.dimension() {
            offset += (index[d] - self.index[d]) as usize * stride;
            stride *= self.size[d];
        }
        offset
    }

    /// Advance `index` to the next position in buffer order.
    ///
    /// Returns `false` once every position has been visited.
    pub fn next_index(&self, index: &mut [isize]) -> bool {
        for d in 0..self.dimension() {
            index[d] += 1;
            if index[d] < self.upper(d) {
                return true;
            }
            index[d] = self.index[d];
        }
        false
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[index {:?}, size {:?}]", self.index, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_creation() {
        let region = Region::new(vec![2, -1], vec![4, 3]);
        assert_eq!(region.dimension(), 2);
        assert_eq!(region.upper(0), 6);
        assert_eq!(region.upper(1), 2);
        assert_eq!(region.number_of_pixels(), 12);
        assert!(region.contains(&[2, -1]));
        assert!(!region.contains(&[6, 0]));

        let huge = Region::from_size(&[1 << 40, 1 << 40]);
        assert_eq!(huge.number_of_pixels(), usize::MAX);
        assert_eq!(Region::from_size(&[1 << 40, 0]).number_of_pixels(), 0);
    }

    #[test]
    fn test_padding_and_crop() {
        let image = Region::from_size(&[8, 8]);
        let tile = Region::new(vec![0, 4], vec![8, 4]);

        let padded = tile.padded(&[2, 1]);
        assert_eq!(padded, Region::new(vec![-2, 3], vec![12, 6]));

        let partial = tile.padded_along(&[2, 1], 1..2);
        assert_eq!(partial, Region::new(vec![0, 3], vec![8, 6]));

        let cropped = padded.crop(&image).unwrap();
        assert_eq!(cropped, Region::new(vec![0, 3], vec![8, 5]));
        assert!(image.contains_region(&cropped));
        assert!(!image.contains_region(&padded));

        let mut widened = padded.clone();
        widened.set_axis(0, 0, 8);
        assert_eq!(widened, Region::new(vec![0, 3], vec![8, 6]));

        let far = Region::new(vec![20, 20], vec![2, 2]);
        assert!(image.crop(&far).is_none());
    }

    #[test]
    fn test_split_outermost_axis() {
        let region = Region::from_size(&[5, 10]);
        let pieces = region.split(3);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], Region::new(vec![0, 0], vec![5, 4]));
        assert_eq!(pieces[2], Region::new(vec![0, 8], vec![5, 2]));
        let total: usize = pieces.iter().map(|r| r.number_of_pixels()).sum();
        assert_eq!(total, region.number_of_pixels());

        // outermost axis of size one is skipped
        let flat = Region::from_size(&[6, 1]);
        let pieces = flat.split(4);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[1], Region::new(vec![2, 0], vec![2, 1]));

        assert_eq!(Region::from_size(&[1, 1]).split(8).len(), 1);
    }

    #[test]
    fn test_index_walk() {
        let region = Region::new(vec![1, 1], vec![2, 2]);
        let mut index = region.index().to_vec();
        let mut visited = vec![index.clone()];
        while region.next_index(&mut index) {
            visited.push(index.clone());
        }
        assert_eq!(
            visited,
            vec![vec![1, 1], vec![2, 1], vec![1, 2], vec![2, 2]]
        );
        for (offset, idx) in visited.iter().enumerate() {
            assert_eq!(region.linear_offset(idx), offset);
        }
    }

    #[test]
    fn test_shrink_expand() {
        let region = Region::from_size(&[7, 8]);
        assert_eq!(region.shrink(2), Region::from_size(&[4, 4]));
        assert_eq!(region.shrink(2).expand(2), Region::from_size(&[8, 8]));
    }
}
