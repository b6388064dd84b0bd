//! Array subset iterators.
//!
//! The iterators are the building blocks of the chunk I/O engine:
//!  - [`Indices`] iterates the absolute indices of a subset in lexicographical order,
//!  - [`ContiguousLinearisedIndices`] iterates the linearised starts of contiguous element runs, and
//!  - [`Chunks`] iterates the chunks overlapping a subset.

use crate::array::{ArrayIndices, ArrayShape};

use super::ArraySubset;

/// Iterates over the absolute indices of an array subset in lexicographical order.
pub struct Indices {
    subset: ArraySubset,
}

impl Indices {
    pub(super) fn new(subset: ArraySubset) -> Self {
        Self { subset }
    }

    /// Return the number of indices.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.subset.num_elements()
    }

    /// Returns true if there are no indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subset.is_empty()
    }
}

impl<'a> IntoIterator for &'a Indices {
    type Item = ArrayIndices;
    type IntoIter = IndicesIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        IndicesIterator {
            subset: &self.subset,
            next: if self.subset.is_empty() {
                None
            } else {
                Some(self.subset.start().to_vec())
            },
        }
    }
}

/// An iterator over the indices of an array subset.
pub struct IndicesIterator<'a> {
    subset: &'a ArraySubset,
    next: Option<ArrayIndices>,
}

impl Iterator for IndicesIterator<'_> {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.clone()?;
        // advance the innermost dimension first
        let mut next = current.clone();
        let start = self.subset.start();
        let shape = self.subset.shape();
        let mut d = next.len();
        loop {
            if d == 0 {
                self.next = None;
                break;
            }
            d -= 1;
            next[d] += 1;
            if next[d] < start[d] + shape[d] {
                self.next = Some(next);
                break;
            }
            next[d] = start[d];
        }
        Some(current)
    }
}

/// Iterates over the linearised starts of contiguous element runs of an array subset within a
/// row-major array.
pub struct ContiguousLinearisedIndices {
    subset: ArraySubset,
    array_shape: ArrayShape,
    /// Dimensions at and beyond this index are merged into a single contiguous run.
    split_dim: usize,
    contiguous_elements: u64,
}

impl ContiguousLinearisedIndices {
    pub(super) fn new(subset: ArraySubset, array_shape: ArrayShape) -> Self {
        let start = subset.start();
        let shape = subset.shape();
        let mut contiguous_elements = 1;
        let mut split_dim = subset.dimensionality();
        for d in (0..subset.dimensionality()).rev() {
            contiguous_elements *= shape[d];
            split_dim = d;
            if !(start[d] == 0 && shape[d] == array_shape[d]) {
                break;
            }
        }
        Self {
            subset,
            array_shape,
            split_dim,
            contiguous_elements,
        }
    }

    /// Return the number of contiguous elements per run.
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }

    /// Return the number of contiguous elements per run as a [`usize`].
    ///
    /// # Panics
    /// Panics if the number of elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn contiguous_elements_usize(&self) -> usize {
        usize::try_from(self.contiguous_elements).unwrap()
    }
}

impl<'a> IntoIterator for &'a ContiguousLinearisedIndices {
    type Item = u64;
    type IntoIter = ContiguousLinearisedIndicesIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        // iterate the outer dimensions only; the inner dimensions are one run
        let outer = ArraySubset::new_with_start_shape(
            self.subset.start()[..self.split_dim].to_vec(),
            self.subset.shape()[..self.split_dim].to_vec(),
        )
        .expect("start and shape have the same length");
        let empty = self.subset.is_empty();
        ContiguousLinearisedIndicesIterator {
            parent: self,
            next_outer: if empty {
                None
            } else {
                Some(outer.start().to_vec())
            },
            outer,
        }
    }
}

/// An iterator over the linearised starts of contiguous element runs.
pub struct ContiguousLinearisedIndicesIterator<'a> {
    parent: &'a ContiguousLinearisedIndices,
    outer: ArraySubset,
    next_outer: Option<ArrayIndices>,
}

impl Iterator for ContiguousLinearisedIndicesIterator<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        let outer = self.next_outer.clone()?;

        // linearise the run start: outer indices followed by the subset start in the inner dims
        let mut index = 0;
        for d in 0..self.parent.array_shape.len() {
            let i = if d < outer.len() {
                outer[d]
            } else {
                self.parent.subset.start()[d]
            };
            index = index * self.parent.array_shape[d] + i;
        }

        // advance the outer counter
        let mut next = outer;
        let start = self.outer.start();
        let shape = self.outer.shape();
        let mut d = next.len();
        loop {
            if d == 0 {
                self.next_outer = None;
                break;
            }
            d -= 1;
            next[d] += 1;
            if next[d] < start[d] + shape[d] {
                self.next_outer = Some(next);
                break;
            }
            next[d] = start[d];
        }

        Some(index)
    }
}

/// Iterates over the chunks overlapping an array subset.
///
/// Yields `(chunk_indices, chunk_subset)` pairs where `chunk_subset` is the full extent of the
/// chunk in absolute coordinates (not clipped to the subset or the array shape).
#[derive(Debug)]
pub struct Chunks {
    chunk_grid_subset: ArraySubset,
    chunk_shape: ArrayShape,
}

impl Chunks {
    pub(super) fn new(subset: ArraySubset, chunk_shape: ArrayShape) -> Self {
        let first_chunk: ArrayIndices = std::iter::zip(subset.start(), &chunk_shape)
            .map(|(&start, &chunk)| start / chunk)
            .collect();
        let chunks_shape: ArrayShape = if subset.is_empty() {
            vec![0; subset.dimensionality()]
        } else {
            itertools::izip!(subset.start(), subset.end_exc(), &chunk_shape)
                .map(|(&start, end, &chunk)| (end - 1) / chunk - start / chunk + 1)
                .collect()
        };
        let chunk_grid_subset = ArraySubset::new_with_start_shape(first_chunk, chunks_shape)
            .expect("start and shape have the same length");
        Self {
            chunk_grid_subset,
            chunk_shape,
        }
    }

    /// Return the number of chunks.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.chunk_grid_subset.num_elements()
    }

    /// Returns true if there are no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunk_grid_subset.is_empty()
    }
}

impl<'a> IntoIterator for &'a Chunks {
    type Item = (ArrayIndices, ArraySubset);
    type IntoIter = ChunksIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        ChunksIterator {
            chunk_shape: &self.chunk_shape,
            inner: (&self.chunk_grid_subset.indices()).into_iter().collect::<Vec<_>>().into_iter(),
        }
    }
}

/// An iterator over the chunks overlapping an array subset.
pub struct ChunksIterator<'a> {
    chunk_shape: &'a [u64],
    inner: std::vec::IntoIter<ArrayIndices>,
}

impl Iterator for ChunksIterator<'_> {
    type Item = (ArrayIndices, ArraySubset);

    fn next(&mut self) -> Option<Self::Item> {
        let chunk_indices = self.inner.next()?;
        let start: ArrayIndices = std::iter::zip(&chunk_indices, self.chunk_shape)
            .map(|(&index, &chunk)| index * chunk)
            .collect();
        let chunk_subset = ArraySubset::new_with_start_shape(start, self.chunk_shape.to_vec())
            .expect("start and shape have the same length");
        Some((chunk_indices, chunk_subset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_iterator() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 0..2]);
        let indices: Vec<_> = (&subset.indices()).into_iter().collect();
        assert_eq!(
            indices,
            vec![vec![1, 0], vec![1, 1], vec![2, 0], vec![2, 1]]
        );
    }

    #[test]
    fn contiguous_linearised_indices_iterator() {
        // 4x5 array, subset of rows 1..3 and all columns: one run per... no, merged runs
        let subset = ArraySubset::new_with_ranges(&[1..3, 0..5]);
        let contiguous = subset.contiguous_linearised_indices(&[4, 5]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 10);
        let starts: Vec<_> = (&contiguous).into_iter().collect();
        assert_eq!(starts, vec![5]);

        // columns 1..3: one run of 2 per row
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        let contiguous = subset.contiguous_linearised_indices(&[4, 5]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 2);
        let starts: Vec<_> = (&contiguous).into_iter().collect();
        assert_eq!(starts, vec![6, 11]);
    }

    #[test]
    fn chunks_iterator() {
        let subset = ArraySubset::new_with_ranges(&[1..5, 2..6]);
        let chunks = subset.chunks(&[2, 3]).unwrap();
        assert_eq!(chunks.len(), 6);
        let items: Vec<_> = (&chunks).into_iter().collect();
        assert_eq!(items[0].0, vec![0, 0]);
        assert_eq!(items[0].1, ArraySubset::new_with_ranges(&[0..2, 0..3]));
        assert_eq!(items[5].0, vec![2, 1]);
        assert_eq!(items[5].1, ArraySubset::new_with_ranges(&[4..6, 3..6]));
    }
}
