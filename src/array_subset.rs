//! Array subsets.
//!
//! An [`ArraySubset`] represents a rectangular subset (hyperslab) of an array or chunk: a start
//! index and a shape per dimension. Subsets drive the translation of array-level read/write
//! selections into per-chunk operations, and the gather/scatter of contiguous element runs
//! between flattened row-major buffers.

pub mod iterators;

use std::ops::Range;

use derive_more::{Display, From};
use itertools::izip;
use thiserror::Error;

use crate::array::{ArrayIndices, ArrayShape};

use iterators::{Chunks, ContiguousLinearisedIndices, Indices};

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new [`IncompatibleDimensionalityError`].
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An incompatible array subset and array shape error.
#[derive(Clone, Debug, Error, From)]
#[error("array subset {0} is incompatible with array of shape {1:?}")]
pub struct IncompatibleArraySubsetAndShapeError(ArraySubset, ArrayShape);

impl ArraySubset {
    /// Create a new empty array subset with `dimensionality`.
    #[must_use]
    pub fn new_empty(dimensionality: usize) -> Self {
        Self {
            start: vec![0; dimensionality],
            shape: vec![0; dimensionality],
        }
    }

    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset from a list of half-open [`Range`]s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
    }

    /// Create a new array subset from a start and a shape.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(
                shape.len(),
                start.len(),
            ))
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Returns if the array subset is empty (i.e. has a zero element in its shape).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&i| i == 0)
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the array subset as a [`usize`].
    ///
    /// # Panics
    /// Panics if the number of elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns [`true`] if the array subset contains `indices`.
    #[must_use]
    pub fn contains(&self, indices: &[u64]) -> bool {
        indices.len() == self.dimensionality()
            && izip!(indices, &self.start, &self.shape).all(|(&i, &o, &s)| i >= o && i < o + s)
    }

    /// Returns [`true`] if this array subset is within an array of shape `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        array_shape.len() == self.dimensionality()
            && std::iter::zip(self.end_exc(), array_shape).all(|(end, &bound)| end <= bound)
    }

    /// Return the overlapping region (intersection) of this subset and `other` in absolute coordinates.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionalities do not match.
    pub fn overlap(&self, other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = std::iter::zip(&self.start, &other.start)
            .map(|(&a, &b)| a.max(b))
            .collect();
        let shape: ArrayShape = izip!(&start, self.end_exc(), other.end_exc())
            .map(|(&start, end_a, end_b)| end_a.min(end_b).saturating_sub(start))
            .collect();
        Ok(Self { start, shape })
    }

    /// Return this array subset relative to `start` (e.g. the origin of a chunk).
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` does not match the
    /// dimensionality.
    pub fn relative_to(&self, start: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                start.len(),
                self.dimensionality(),
            ));
        }
        Ok(Self {
            start: std::iter::zip(&self.start, start)
                .map(|(&a, &b)| a.saturating_sub(b))
                .collect(),
            shape: self.shape.clone(),
        })
    }

    /// Returns an iterator over the absolute indices of the array subset in lexicographical order.
    #[must_use]
    pub fn indices(&self) -> Indices {
        Indices::new(self.clone())
    }

    /// Returns an iterator over the linearised starts of contiguous element runs of this subset
    /// within a row-major array of shape `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the subset is not within `array_shape`.
    pub fn contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndices, IncompatibleArraySubsetAndShapeError> {
        if self.inbounds(array_shape) {
            Ok(ContiguousLinearisedIndices::new(
                self.clone(),
                array_shape.to_vec(),
            ))
        } else {
            Err(IncompatibleArraySubsetAndShapeError(
                self.clone(),
                array_shape.to_vec(),
            ))
        }
    }

    /// Returns an iterator over the chunks of shape `chunk_shape` overlapping this subset.
    ///
    /// Yields `(chunk_indices, chunk_subset)` pairs, where `chunk_subset` is the full (unclipped)
    /// extent of the chunk in absolute coordinates.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `chunk_shape` does not match
    /// the dimensionality.
    pub fn chunks(&self, chunk_shape: &[u64]) -> Result<Chunks, IncompatibleDimensionalityError> {
        if chunk_shape.len() == self.dimensionality() {
            Ok(Chunks::new(self.clone(), chunk_shape.to_vec()))
        } else {
            Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Extract the bytes of this subset from the flattened row-major `bytes` of an array with
    /// shape `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the subset is not within `array_shape`
    /// or `bytes` has an invalid length.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, IncompatibleArraySubsetAndShapeError> {
        let expected_len = array_shape.iter().product::<u64>() * element_size as u64;
        if bytes.len() as u64 != expected_len {
            return Err(IncompatibleArraySubsetAndShapeError(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        let contiguous_indices = self.contiguous_linearised_indices(array_shape)?;
        let length = contiguous_indices.contiguous_elements_usize() * element_size;
        let mut out = Vec::with_capacity(self.num_elements_usize() * element_size);
        for index in &contiguous_indices {
            let offset = usize::try_from(index).unwrap() * element_size;
            out.extend_from_slice(&bytes[offset..offset + length]);
        }
        Ok(out)
    }

    /// Store `subset_bytes` into this subset of the flattened row-major `bytes` of an array with
    /// shape `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the subset is not within `array_shape`
    /// or a bytes argument has an invalid length.
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), IncompatibleArraySubsetAndShapeError> {
        let expected_len = array_shape.iter().product::<u64>() * element_size as u64;
        if bytes.len() as u64 != expected_len
            || subset_bytes.len() as u64 != self.num_elements() * element_size as u64
        {
            return Err(IncompatibleArraySubsetAndShapeError(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        let contiguous_indices = self.contiguous_linearised_indices(array_shape)?;
        let length = contiguous_indices.contiguous_elements_usize() * element_size;
        let mut subset_offset = 0;
        for index in &contiguous_indices {
            let offset = usize::try_from(index).unwrap() * element_size;
            bytes[offset..offset + length]
                .copy_from_slice(&subset_bytes[subset_offset..subset_offset + length]);
            subset_offset += length;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset_basics() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 0..5]);
        assert_eq!(subset.start(), &[1, 0]);
        assert_eq!(subset.shape(), &[2, 5]);
        assert_eq!(subset.num_elements(), 10);
        assert_eq!(subset.end_exc(), vec![3, 5]);
        assert!(subset.contains(&[2, 4]));
        assert!(!subset.contains(&[3, 0]));
        assert!(subset.inbounds(&[3, 5]));
        assert!(!subset.inbounds(&[2, 5]));
        assert!(!ArraySubset::new_with_shape(vec![0, 2]).contains(&[0, 0]));
    }

    #[test]
    fn array_subset_overlap() {
        let subset = ArraySubset::new_with_ranges(&[1..5, 2..6]);
        let chunk = ArraySubset::new_with_ranges(&[0..4, 4..8]);
        let overlap = subset.overlap(&chunk).unwrap();
        assert_eq!(overlap, ArraySubset::new_with_ranges(&[1..4, 4..6]));
        let relative = overlap.relative_to(chunk.start()).unwrap();
        assert_eq!(relative, ArraySubset::new_with_ranges(&[1..4, 0..2]));

        let disjoint = ArraySubset::new_with_ranges(&[6..8, 0..2]);
        assert!(subset.overlap(&disjoint).unwrap().is_empty());
    }

    #[test]
    fn array_subset_extract_store() {
        // 3x4 array of u8
        let bytes: Vec<u8> = (0..12).collect();
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        let extracted = subset.extract_bytes(&bytes, &[3, 4], 1).unwrap();
        assert_eq!(extracted, vec![5, 6, 9, 10]);

        let mut bytes = bytes;
        subset
            .store_bytes(&[50, 60, 90, 100], &mut bytes, &[3, 4], 1)
            .unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3, 4, 50, 60, 7, 8, 90, 100, 11]);
    }

    #[test]
    fn array_subset_extract_full_rows() {
        // full rows are a single contiguous run per row span
        let bytes: Vec<u8> = (0..12).collect();
        let subset = ArraySubset::new_with_ranges(&[1..3, 0..4]);
        let extracted = subset.extract_bytes(&bytes, &[3, 4], 1).unwrap();
        assert_eq!(extracted, (4..12).collect::<Vec<u8>>());
    }
}
