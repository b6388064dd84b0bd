//! The regular chunk grid.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#chunk-grids>.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array_subset::ArraySubset,
    metadata::v3::MetadataV3,
    plugin::PluginCreateError,
};

use super::{ArrayIndices, ArrayShape};

/// The identifier for the `regular` chunk grid.
pub const IDENTIFIER: &str = "regular";

/// Configuration parameters for a `regular` chunk grid.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegularChunkGridConfiguration {
    /// The chunk shape.
    pub chunk_shape: ArrayShape,
}

/// A chunk grid creation error.
#[derive(Debug, Error)]
pub enum ChunkGridError {
    /// The chunk shape dimensionality does not match the array shape dimensionality.
    #[error("chunk shape {0:?} is incompatible with array shape {1:?}")]
    IncompatibleDimensionality(ArrayShape, ArrayShape),
    /// A shape component is zero.
    #[error("array shape {0:?} and chunk shape {1:?} components must be positive")]
    ZeroExtent(ArrayShape, ArrayShape),
}

/// A `regular` chunk grid: fixed-shape chunks tiling the array from the origin.
///
/// The grid shape along each dimension is `ceil(array_shape / chunk_shape)`.
#[derive(Debug, Clone)]
pub struct RegularChunkGrid {
    array_shape: ArrayShape,
    chunk_shape: ArrayShape,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid over `array_shape` with chunks of `chunk_shape`.
    ///
    /// # Errors
    /// Returns [`ChunkGridError`] if the shapes differ in dimensionality or any component is zero.
    pub fn new(array_shape: ArrayShape, chunk_shape: ArrayShape) -> Result<Self, ChunkGridError> {
        if array_shape.len() != chunk_shape.len() {
            return Err(ChunkGridError::IncompatibleDimensionality(
                chunk_shape,
                array_shape,
            ));
        }
        if array_shape.iter().any(|&d| d == 0) || chunk_shape.iter().any(|&d| d == 0) {
            return Err(ChunkGridError::ZeroExtent(array_shape, chunk_shape));
        }
        Ok(Self {
            array_shape,
            chunk_shape,
        })
    }

    /// Create a regular chunk grid from metadata and an array shape.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the metadata is not a supported chunk grid or the chunk
    /// shape is incompatible with `array_shape`.
    pub fn from_metadata(
        metadata: &MetadataV3,
        array_shape: ArrayShape,
    ) -> Result<Self, PluginCreateError> {
        if metadata.name() != IDENTIFIER {
            return Err(PluginCreateError::unsupported(metadata.name()));
        }
        let configuration: RegularChunkGridConfiguration = metadata
            .to_configuration()
            .map_err(|_| PluginCreateError::metadata_invalid(IDENTIFIER, metadata.clone()))?;
        Self::new(array_shape, configuration.chunk_shape).map_err(|err| {
            PluginCreateError::Other {
                error_str: err.to_string(),
            }
        })
    }

    /// Create the metadata of this chunk grid.
    #[must_use]
    pub fn create_metadata(&self) -> MetadataV3 {
        let configuration = RegularChunkGridConfiguration {
            chunk_shape: self.chunk_shape.clone(),
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }

    /// Return the dimensionality of the chunk grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    /// Return the array shape.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.array_shape
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    /// Return the number of elements per chunk.
    #[must_use]
    pub fn chunk_num_elements(&self) -> u64 {
        self.chunk_shape.iter().product()
    }

    /// Return the shape of the chunk grid (the number of chunks along each dimension).
    #[must_use]
    pub fn grid_shape(&self) -> ArrayShape {
        std::iter::zip(&self.array_shape, &self.chunk_shape)
            .map(|(a, c)| a.div_ceil(*c))
            .collect()
    }

    /// Return the origin of the chunk at `chunk_indices`.
    ///
    /// Returns [`None`] if the dimensionality of `chunk_indices` does not match.
    #[must_use]
    pub fn chunk_origin(&self, chunk_indices: &[u64]) -> Option<ArrayIndices> {
        (chunk_indices.len() == self.dimensionality()).then(|| {
            std::iter::zip(chunk_indices, &self.chunk_shape)
                .map(|(i, c)| i * c)
                .collect()
        })
    }

    /// Return the indices of the chunk containing the element at `array_indices`.
    ///
    /// Returns [`None`] if the dimensionality of `array_indices` does not match.
    #[must_use]
    pub fn chunk_indices(&self, array_indices: &[u64]) -> Option<ArrayIndices> {
        (array_indices.len() == self.dimensionality()).then(|| {
            std::iter::zip(array_indices, &self.chunk_shape)
                .map(|(i, c)| i / c)
                .collect()
        })
    }

    /// Return the intra-chunk indices of the element at `array_indices`.
    ///
    /// Returns [`None`] if the dimensionality of `array_indices` does not match.
    #[must_use]
    pub fn chunk_element_indices(&self, array_indices: &[u64]) -> Option<ArrayIndices> {
        (array_indices.len() == self.dimensionality()).then(|| {
            std::iter::zip(array_indices, &self.chunk_shape)
                .map(|(i, c)| i % c)
                .collect()
        })
    }

    /// Return the subset of the array covered by the chunk at `chunk_indices`.
    ///
    /// Returns [`None`] if the dimensionality of `chunk_indices` does not match.
    #[must_use]
    pub fn chunk_subset(&self, chunk_indices: &[u64]) -> Option<ArraySubset> {
        let origin = self.chunk_origin(chunk_indices)?;
        Some(
            ArraySubset::new_with_start_shape(origin, self.chunk_shape.clone())
                .expect("start and shape have the same length"),
        )
    }

    /// Returns [`true`] if the chunk at `chunk_indices` is within the chunk grid.
    #[must_use]
    pub fn chunk_indices_inbounds(&self, chunk_indices: &[u64]) -> bool {
        chunk_indices.len() == self.dimensionality()
            && std::iter::zip(chunk_indices, self.grid_shape()).all(|(&i, g)| i < g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_grid_regular() {
        let chunk_grid = RegularChunkGrid::new(vec![5, 7, 52], vec![1, 2, 3]).unwrap();

        assert_eq!(chunk_grid.dimensionality(), 3);
        assert_eq!(chunk_grid.grid_shape(), vec![5, 4, 18]);
        assert_eq!(chunk_grid.chunk_origin(&[1, 1, 1]), Some(vec![1, 2, 3]));
        assert_eq!(chunk_grid.chunk_indices(&[3, 5, 50]), Some(vec![3, 2, 16]));
        assert_eq!(
            chunk_grid.chunk_element_indices(&[3, 5, 50]),
            Some(vec![0, 1, 2])
        );
        assert_eq!(
            chunk_grid.chunk_subset(&[3, 2, 16]).unwrap(),
            ArraySubset::new_with_ranges(&[3..4, 4..6, 48..51])
        );
        assert!(chunk_grid.chunk_indices_inbounds(&[4, 3, 17]));
        assert!(!chunk_grid.chunk_indices_inbounds(&[5, 3, 17]));
    }

    #[test]
    fn chunk_grid_invalid() {
        assert!(RegularChunkGrid::new(vec![5, 7], vec![1, 2, 3]).is_err());
        assert!(RegularChunkGrid::new(vec![5, 0], vec![1, 2]).is_err());
        assert!(RegularChunkGrid::new(vec![5, 7], vec![1, 0]).is_err());
    }

    #[test]
    fn chunk_grid_from_metadata() {
        let metadata =
            MetadataV3::try_from(r#"{"name":"regular","configuration":{"chunk_shape":[2,2]}}"#)
                .unwrap();
        let chunk_grid = RegularChunkGrid::from_metadata(&metadata, vec![5, 5]).unwrap();
        assert_eq!(chunk_grid.grid_shape(), vec![3, 3]);
        assert_eq!(chunk_grid.create_metadata(), metadata);

        let metadata = MetadataV3::try_from(r#""rectangular""#).unwrap();
        assert!(RegularChunkGrid::from_metadata(&metadata, vec![5, 5]).is_err());
    }
}
