//! Zarr arrays.
//!
//! An [`Array`] is a node in a Zarr hierarchy holding dense n-dimensional data. It is partitioned
//! into fixed-shape chunks by a regular [chunk grid](chunk_grid), each chunk encoded independently
//! through a [codec chain](codec) and stored under a key derived from its
//! [chunk key encoding](chunk_key_encoding).
//!
//! Hyperslab reads and writes ([`retrieve_array_subset`](Array::retrieve_array_subset),
//! [`store_array_subset`](Array::store_array_subset)) are translated into per-chunk operations on
//! lazily created [`ChunkIo`](chunk_io::ChunkIo) units. Reads materialize absent chunks as the
//! fill value; writes merge with existing chunk contents and flush all touched chunks before
//! returning. A chunk left entirely at the fill value is erased from the store, keeping sparse
//! arrays sparse on disk.

pub mod chunk_grid;
pub mod chunk_io;
pub mod chunk_key_encoding;
pub mod codec;
mod data_type;
mod element;
mod fill_value;
mod metadata_builder;

pub use data_type::{DataType, IncompatibleFillValueMetadataError, UnsupportedDataTypeError};
pub use element::{Element, InvalidBytesLengthError};
pub use fill_value::FillValue;
pub use metadata_builder::{ArrayMetadataBuilder, ArrayMetadataBuilderError};

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    array_subset::{
        ArraySubset, IncompatibleArraySubsetAndShapeError, IncompatibleDimensionalityError,
    },
    metadata::{ArrayMetadataV3, FillValueMetadata},
    node::{NodePath, NodePathError},
    storage::{data_key, StorageError, Store, StoreHandle},
};

use chunk_grid::{ChunkGridError, RegularChunkGrid};
use chunk_io::ChunkIo;
use chunk_key_encoding::ChunkKeyEncoding;
use codec::{CodecChain, CodecChainCreateError, CodecError};

/// The shape of an array: the extent of each dimension.
pub type ArrayShape = Vec<u64>;

/// Array element indices or chunk grid indices.
pub type ArrayIndices = Vec<u64>;

/// The shape, data type, and fill value of an array or chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayRepresentation {
    shape: ArrayShape,
    data_type: DataType,
    fill_value: FillValue,
}

impl ArrayRepresentation {
    /// Create a new [`ArrayRepresentation`].
    ///
    /// # Panics
    /// Panics if the fill value size does not match the data type size.
    #[must_use]
    pub fn new(shape: ArrayShape, data_type: DataType, fill_value: FillValue) -> Self {
        assert_eq!(data_type.size(), fill_value.size());
        Self {
            shape,
            data_type,
            fill_value,
        }
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Return the dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.num_elements() * self.element_size() as u64
    }

    /// Return the element size in bytes.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.data_type.size()
    }

    /// Return a buffer of [`num_elements`](Self::num_elements) copies of the fill value.
    #[must_use]
    pub fn fill_value_buffer(&self) -> Vec<u8> {
        self.fill_value
            .as_ne_bytes()
            .iter()
            .copied()
            .cycle()
            .take(usize::try_from(self.size()).unwrap())
            .collect()
    }
}

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// No array metadata exists at the path.
    #[error("array metadata is missing at {0}")]
    MissingMetadata(NodePath),
    /// The node at the path is not an array.
    #[error("the node at {0} is not an array")]
    NotAnArray(NodePath),
    /// An unsupported data type.
    #[error(transparent)]
    DataTypeCreateError(#[from] UnsupportedDataTypeError),
    /// An invalid fill value.
    #[error(transparent)]
    InvalidFillValueMetadata(#[from] IncompatibleFillValueMetadataError),
    /// An invalid codec chain.
    #[error(transparent)]
    CodecChainCreateError(#[from] CodecChainCreateError),
    /// An invalid chunk grid.
    #[error(transparent)]
    ChunkGridError(#[from] ChunkGridError),
    /// An invalid chunk grid or chunk key encoding.
    #[error(transparent)]
    PluginCreateError(#[from] crate::plugin::PluginCreateError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// An array operation error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// The selection is outside of the array shape.
    #[error("array subset {0} is out of bounds of array shape {1:?}")]
    InvalidArraySubset(ArraySubset, ArrayShape),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// Incompatible array subset and shape.
    #[error(transparent)]
    IncompatibleArraySubsetAndShapeError(#[from] IncompatibleArraySubsetAndShapeError),
    /// The chunk grid indices are out of bounds.
    #[error("invalid chunk grid indices {0:?}")]
    InvalidChunkGridIndices(ArrayIndices),
    /// The host data has an unexpected size.
    #[error("the input data has {0} bytes, expected {1}")]
    InvalidBytesInputSize(usize, u64),
    /// A decoded chunk has an unexpected size.
    #[error("a decoded chunk has {0} bytes, expected {1}")]
    InvalidChunkDecodedSize(usize, u64),
    /// The host element type does not match the array data type.
    #[error("the element data type {0} does not match the array data type {1}")]
    IncompatibleElementType(DataType, DataType),
    /// An invalid bytes length for the element type.
    #[error(transparent)]
    InvalidBytesLengthError(#[from] InvalidBytesLengthError),
}

/// A Zarr array.
#[derive(Debug)]
pub struct Array {
    store: StoreHandle,
    path: NodePath,
    data_type: DataType,
    chunk_grid: RegularChunkGrid,
    chunk_key_encoding: ChunkKeyEncoding,
    fill_value: FillValue,
    codecs: CodecChain,
    attributes: serde_json::Map<String, serde_json::Value>,
    attributes_dirty: bool,
    chunks: Mutex<HashMap<ArrayIndices, ChunkIo>>,
}

impl Array {
    /// Create an array at `path` from `metadata`.
    ///
    /// This does **not** write to the store; use [`store_metadata`](Array::store_metadata) to
    /// persist the metadata.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if any metadata is invalid.
    pub fn new_with_metadata(
        store: StoreHandle,
        path: &str,
        metadata: ArrayMetadataV3,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        let data_type = DataType::from_metadata(&metadata.data_type)?;
        let chunk_grid = RegularChunkGrid::from_metadata(&metadata.chunk_grid, metadata.shape.clone())?;
        let chunk_key_encoding = ChunkKeyEncoding::from_metadata(&metadata.chunk_key_encoding)?;
        let fill_value = data_type.fill_value_from_metadata(&metadata.fill_value)?;
        let codecs = CodecChain::from_metadata(&metadata.codecs)?;
        Ok(Self {
            store,
            path,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            attributes: metadata.attributes,
            attributes_dirty: false,
            chunks: Mutex::default(),
        })
    }

    /// Open an existing array at `path`, reading its metadata from the store.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if there is a storage error, the metadata is missing, or
    /// the node is not an array.
    pub fn open(store: StoreHandle, path: &str) -> Result<Self, ArrayCreateError> {
        let node_path = NodePath::new(path)?;
        match store.get_metadata(&node_path)? {
            Some(crate::node::NodeMetadata::Array(metadata)) => {
                Self::new_with_metadata(store, path, metadata)
            }
            Some(crate::node::NodeMetadata::Group(_)) => {
                Err(ArrayCreateError::NotAnArray(node_path))
            }
            None => Err(ArrayCreateError::MissingMetadata(node_path)),
        }
    }

    /// Return the node path of the array.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        self.chunk_grid.array_shape()
    }

    /// Return the dimensionality of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape().len()
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Return the chunk grid.
    #[must_use]
    pub const fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// Return the chunk key encoding.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// Return the codec chain.
    #[must_use]
    pub const fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// Return the store of the array.
    #[must_use]
    pub fn store(&self) -> StoreHandle {
        self.store.clone()
    }

    /// Return the user attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Set a user attribute, marking the attributes dirty.
    ///
    /// Dirty attributes are persisted by [`save`](Array::save).
    pub fn set_attribute(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(name.into(), value);
        self.attributes_dirty = true;
    }

    /// Remove all user attributes, marking the attributes dirty.
    pub fn delete_attributes(&mut self) {
        if !self.attributes.is_empty() {
            self.attributes.clear();
            self.attributes_dirty = true;
        }
    }

    /// Returns whether the attributes have unpersisted modifications.
    #[must_use]
    pub const fn attributes_dirty(&self) -> bool {
        self.attributes_dirty
    }

    /// Create the array metadata document from the current state.
    #[must_use]
    pub fn metadata(&self) -> ArrayMetadataV3 {
        ArrayMetadataV3::new(
            self.shape().to_vec(),
            self.data_type.metadata(),
            self.chunk_grid.create_metadata(),
            self.chunk_key_encoding.create_metadata(),
            self.data_type
                .metadata_fill_value(&self.fill_value)
                .unwrap_or(FillValueMetadata::Unsupported(serde_json::Value::Null)),
            self.codecs.create_metadatas(),
            self.attributes.clone(),
        )
    }

    /// Write the array metadata document to the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        self.store.set_metadata(
            &self.path,
            &crate::node::NodeMetadata::Array(self.metadata()),
        )
    }

    /// The representation of a single chunk.
    #[must_use]
    pub fn chunk_representation(&self) -> ArrayRepresentation {
        ArrayRepresentation::new(
            self.chunk_grid.chunk_shape().to_vec(),
            self.data_type,
            self.fill_value.clone(),
        )
    }

    /// Acquire the chunk at `chunk_indices`, creating its I/O unit on first touch.
    fn with_chunk<R>(
        &self,
        chunk_indices: &[u64],
        f: impl FnOnce(&mut ChunkIo) -> Result<R, ArrayError>,
    ) -> Result<R, ArrayError> {
        if !self.chunk_grid.chunk_indices_inbounds(chunk_indices) {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let mut chunks = self.chunks.lock();
        let chunk = chunks.entry(chunk_indices.to_vec()).or_insert_with(|| {
            let key = data_key(&self.path, chunk_indices, &self.chunk_key_encoding);
            ChunkIo::new(
                self.store.clone(),
                key,
                self.chunk_representation(),
                self.codecs.clone(),
            )
        });
        f(chunk)
    }

    fn validate_subset(&self, subset: &ArraySubset) -> Result<(), ArrayError> {
        if subset.dimensionality() != self.dimensionality() || !subset.inbounds(self.shape()) {
            return Err(ArrayError::InvalidArraySubset(
                subset.clone(),
                self.shape().to_vec(),
            ));
        }
        Ok(())
    }

    /// Read the bytes of the hyperslab at `subset`.
    ///
    /// The output is in row-major order with absent regions materialized as the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the subset is out of bounds or a chunk operation fails.
    pub fn retrieve_array_subset(&self, subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        self.validate_subset(subset)?;
        let element_size = self.data_type.size();
        let mut output = ArrayRepresentation::new(
            subset.shape().to_vec(),
            self.data_type,
            self.fill_value.clone(),
        )
        .fill_value_buffer();

        for (chunk_indices, chunk_bounds) in &subset.chunks(self.chunk_grid.chunk_shape())? {
            let overlap = subset.overlap(&chunk_bounds)?;
            if overlap.is_empty() {
                continue;
            }
            let chunk_subset = overlap.relative_to(chunk_bounds.start())?;
            let chunk_bytes =
                self.with_chunk(&chunk_indices, |chunk| chunk.read_subset(&chunk_subset))?;
            let output_subset = overlap.relative_to(subset.start())?;
            output_subset.store_bytes(&chunk_bytes, &mut output, subset.shape(), element_size)?;
        }
        Ok(output)
    }

    /// Read the elements of the hyperslab at `subset`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type, the
    /// subset is out of bounds, or a chunk operation fails.
    pub fn retrieve_array_subset_elements<T: Element>(
        &self,
        subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        self.validate_element_type::<T>()?;
        let bytes = self.retrieve_array_subset(subset)?;
        Ok(T::from_array_bytes(&bytes)?)
    }

    /// Read the elements of the hyperslab at `subset`, mapping fill value elements to [`None`].
    ///
    /// The boolean data type has no absent representation, so boolean elements are always
    /// [`Some`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type, the
    /// subset is out of bounds, or a chunk operation fails.
    pub fn retrieve_array_subset_opt_elements<T: Element>(
        &self,
        subset: &ArraySubset,
    ) -> Result<Vec<Option<T>>, ArrayError> {
        self.validate_element_type::<T>()?;
        let bytes = self.retrieve_array_subset(subset)?;
        let elements = T::from_array_bytes(&bytes)?;
        if self.data_type == DataType::Bool {
            return Ok(elements.into_iter().map(Some).collect());
        }
        Ok(std::iter::zip(bytes.chunks_exact(self.data_type.size()), elements)
            .map(|(element_bytes, element)| {
                if self
                    .data_type
                    .element_is_fill_value(&self.fill_value, element_bytes)
                {
                    None
                } else {
                    Some(element)
                }
            })
            .collect())
    }

    /// Write `subset_bytes` to the hyperslab at `subset`.
    ///
    /// Partial chunk writes merge with existing chunk contents. All touched chunks are flushed
    /// before the call returns.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the subset is out of bounds, the input size is invalid, or a
    /// chunk operation fails.
    pub fn store_array_subset(
        &self,
        subset: &ArraySubset,
        subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        self.validate_subset(subset)?;
        let element_size = self.data_type.size();
        let expected_len = subset.num_elements() * element_size as u64;
        if subset_bytes.len() as u64 != expected_len {
            return Err(ArrayError::InvalidBytesInputSize(
                subset_bytes.len(),
                expected_len,
            ));
        }

        for (chunk_indices, chunk_bounds) in &subset.chunks(self.chunk_grid.chunk_shape())? {
            let overlap = subset.overlap(&chunk_bounds)?;
            if overlap.is_empty() {
                continue;
            }
            let input_subset = overlap.relative_to(subset.start())?;
            let chunk_bytes =
                input_subset.extract_bytes(subset_bytes, subset.shape(), element_size)?;
            let chunk_subset = overlap.relative_to(chunk_bounds.start())?;
            self.with_chunk(&chunk_indices, |chunk| {
                chunk.write_subset(&chunk_subset, &chunk_bytes)?;
                chunk.flush()
            })?;
        }
        Ok(())
    }

    /// Write `elements` to the hyperslab at `subset`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type, the
    /// subset is out of bounds, or a chunk operation fails.
    pub fn store_array_subset_elements<T: Element>(
        &self,
        subset: &ArraySubset,
        elements: &[T],
    ) -> Result<(), ArrayError> {
        self.validate_element_type::<T>()?;
        self.store_array_subset(subset, &T::to_array_bytes(elements))
    }

    /// Write optional `elements` to the hyperslab at `subset`, mapping [`None`] to the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type, the
    /// subset is out of bounds, or a chunk operation fails.
    pub fn store_array_subset_opt_elements<T: Element>(
        &self,
        subset: &ArraySubset,
        elements: &[Option<T>],
    ) -> Result<(), ArrayError> {
        self.validate_element_type::<T>()?;
        let fill = T::from_array_bytes(self.fill_value.as_ne_bytes())?;
        let fill = fill[0];
        let elements: Vec<T> = elements
            .iter()
            .map(|element| element.unwrap_or(fill))
            .collect();
        self.store_array_subset(subset, &T::to_array_bytes(&elements))
    }

    /// Read the entire chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk indices are out of bounds or a chunk operation
    /// fails.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, ArrayError> {
        let chunk_shape = self.chunk_grid.chunk_shape().to_vec();
        self.with_chunk(chunk_indices, |chunk| {
            chunk.read_subset(&ArraySubset::new_with_shape(chunk_shape))
        })
    }

    /// Write the entire chunk at `chunk_indices` and flush it.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the chunk indices are out of bounds, the input size is
    /// invalid, or a chunk operation fails.
    pub fn store_chunk(&self, chunk_indices: &[u64], chunk_bytes: &[u8]) -> Result<(), ArrayError> {
        let chunk_shape = self.chunk_grid.chunk_shape().to_vec();
        self.with_chunk(chunk_indices, |chunk| {
            chunk.write_subset(&ArraySubset::new_with_shape(chunk_shape), chunk_bytes)?;
            chunk.flush()
        })
    }

    /// Flush all dirty chunks to the store.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if a chunk flush fails.
    pub fn flush(&self) -> Result<(), ArrayError> {
        let mut chunks = self.chunks.lock();
        for chunk in chunks.values_mut() {
            chunk.flush()?;
        }
        Ok(())
    }

    /// Flush all dirty chunks and persist dirty attributes.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if a flush or metadata write fails.
    pub fn save(&mut self) -> Result<(), ArrayError> {
        self.flush()?;
        if self.attributes_dirty {
            self.store_metadata()?;
            self.attributes_dirty = false;
        }
        Ok(())
    }

    fn validate_element_type<T: Element>(&self) -> Result<(), ArrayError> {
        if T::DATA_TYPE == self.data_type {
            Ok(())
        } else {
            Err(ArrayError::IncompatibleElementType(
                T::DATA_TYPE,
                self.data_type,
            ))
        }
    }
}

impl Drop for Array {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::warn!("failed to flush array {} on drop: {err}", self.path);
        }
    }
}
