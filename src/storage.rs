//! Zarr storage (abstract store interface and backends).
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#storage>.
//!
//! A Zarr [store](Store) is a system that can be used to store and retrieve data from a Zarr
//! hierarchy: a mapping from [keys](StoreKey) to byte values with directory-like listing.
//! Backends: [`MemoryStore`](store::MemoryStore), [`FilesystemStore`](store::FilesystemStore), and
//! the read-only [`HttpStore`](store::HttpStore).
//!
//! Node metadata documents are read and written through the store as well, normalized to the
//! Zarr V3 representation regardless of the on-disk format (V2 `.zarray`/`.zgroup`/`.zattrs`
//! documents are translated on read).

pub mod fs_uri;
pub mod store;
mod store_key;
mod store_prefix;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator},
    byte_range::{validate_byte_ranges, ByteRange, InvalidByteRangeError},
    metadata::{
        array_metadata_v2_to_v3, ArrayMetadataV2, ArrayMetadataV2ToV3ConversionError,
        GroupMetadataV2, GroupMetadataV3,
    },
    node::{NodeMetadata, NodeNameError, NodePath, NodePathError},
};

/// The value of a store key, or [`None`] if the key is absent.
pub type MaybeBytes = Option<Vec<u8>>;

/// [`Arc`] wrapped store.
pub type StoreHandle = Arc<dyn Store>;

/// [`StoreKeys`] and [`StorePrefixes`]: the immediate children of a prefix.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub const fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An error converting Zarr V2 metadata.
    #[error(transparent)]
    InvalidV2Metadata(#[from] ArrayMetadataV2ToV3ConversionError),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid node path.
    #[error("invalid node path {0}")]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error("invalid node name {0}")]
    NodeNameError(#[from] NodeNameError),
    /// An invalid byte range.
    #[error("invalid byte range {0}")]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
    /// The requested method is not supported.
    #[error("{0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// The Zarr abstract store interface.
///
/// All backends implement this trait. Capability methods report what a backend supports; mutating
/// methods on a read only store fail with [`StorageError::ReadOnly`] rather than panicking.
pub trait Store: Send + Sync + core::fmt::Debug {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Retrieve a byte range of the value associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the byte range is invalid (out of bounds or empty) or there
    /// is an underlying storage error.
    fn get_partial(
        &self,
        key: &StoreKey,
        byte_range: &ByteRange,
    ) -> Result<MaybeBytes, StorageError> {
        let Some(bytes) = self.get(key)? else {
            return Ok(None);
        };
        let size = bytes.len() as u64;
        validate_byte_ranges(&[*byte_range], size)?;
        if byte_range.start(size) >= size || byte_range.length(size) == 0 {
            return Err(InvalidByteRangeError::new(*byte_range, size).into());
        }
        Ok(Some(bytes[byte_range.to_range_usize(size)].to_vec()))
    }

    /// Returns whether the key exists in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Return the size in bytes of the value at `key`, or [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self.get(key)?.map(|bytes| bytes.len() as u64))
    }

    /// Store `value` at `key`, overwriting any existing value.
    ///
    /// Hierarchical backends create intermediate directories.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store, or [`StorageError::ReadOnly`] for a read
    /// only store.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Store `value` at `key` only if the key is absent.
    ///
    /// Returns whether the value was stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set_if_not_exists(&self, key: &StoreKey, value: &[u8]) -> Result<bool, StorageError> {
        if self.exists(key)? {
            Ok(false)
        } else {
            self.set(key, value)?;
            Ok(true)
        }
    }

    /// Erase the value at `key`.
    ///
    /// Returns whether a value was erased.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error, or
    /// [`StorageError::ReadOnly`] for a read only store.
    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError>;

    /// Erase all values with a key beginning with `prefix`.
    ///
    /// Returns whether any value was erased.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error, or
    /// [`StorageError::ReadOnly`] for a read only store.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError>;

    /// Retrieve all [`StoreKeys`] in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store does not support listing or there is an underlying
    /// storage error.
    fn list(&self) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] with a given [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store does not support listing or there is an underlying
    /// storage error.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] and [`StorePrefixes`] that are direct children of `prefix`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store does not support listing or there is an underlying
    /// storage error.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError>;

    /// Retrieve the metadata document of the node at `path`, normalized to the Zarr V3
    /// representation regardless of the stored format.
    ///
    /// Zarr V2 `.zattrs` attributes are merged into the returned document. Returns [`None`] if no
    /// metadata document exists at the path.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a metadata document is malformed or there is an underlying
    /// storage error.
    fn get_metadata(&self, path: &NodePath) -> Result<Option<NodeMetadata>, StorageError> {
        get_metadata_v3_then_v2(&|key| self.get(key), path)
    }

    /// Store the metadata document of the node at `path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store, or [`StorageError::ReadOnly`] for a read
    /// only store.
    fn set_metadata(&self, path: &NodePath, metadata: &NodeMetadata) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|err| StorageError::InvalidMetadata(meta_key(path), err.to_string()))?;
        self.set(&meta_key(path), &json)
    }

    /// Returns whether the store is read only.
    fn read_only(&self) -> bool {
        false
    }

    /// Returns whether the store supports writes.
    fn supports_writes(&self) -> bool {
        !self.read_only()
    }

    /// Returns whether the store supports listing.
    fn supports_listing(&self) -> bool {
        true
    }

    /// Returns whether the store supports deletes.
    fn supports_deletes(&self) -> bool {
        !self.read_only()
    }

    /// Returns whether the store supports consolidated metadata.
    fn supports_consolidated_metadata(&self) -> bool {
        false
    }

    /// The default chunk key separator for arrays created on this store.
    ///
    /// Individual arrays override this via their `chunk_key_encoding`.
    fn default_chunk_key_separator(&self) -> ChunkKeySeparator {
        ChunkKeySeparator::Slash
    }
}

/// Shared v3-then-v2 metadata retrieval over a store `get` function.
///
/// Attempts `zarr.json`, then `.zarray` + `.zattrs`, then `.zgroup` + `.zattrs`, translating V2
/// documents into the V3 representation.
pub(crate) fn get_metadata_v3_then_v2(
    get: &dyn Fn(&StoreKey) -> Result<MaybeBytes, StorageError>,
    path: &NodePath,
) -> Result<Option<NodeMetadata>, StorageError> {
    let key_v3 = meta_key(path);
    if let Some(metadata) = get(&key_v3)? {
        let metadata: NodeMetadata = serde_json::from_slice(&metadata)
            .map_err(|err| StorageError::InvalidMetadata(key_v3, err.to_string()))?;
        return Ok(Some(metadata));
    }

    let key_v2_array = meta_key_v2_array(path);
    if let Some(metadata) = get(&key_v2_array)? {
        let mut metadata: ArrayMetadataV2 = serde_json::from_slice(&metadata)
            .map_err(|err| StorageError::InvalidMetadata(key_v2_array, err.to_string()))?;
        if let Some(attributes) = get_attributes_v2(get, path)? {
            metadata.attributes = attributes;
        }
        let metadata = array_metadata_v2_to_v3(&metadata)?;
        return Ok(Some(NodeMetadata::Array(metadata)));
    }

    let key_v2_group = meta_key_v2_group(path);
    if let Some(metadata) = get(&key_v2_group)? {
        let metadata: GroupMetadataV2 = serde_json::from_slice(&metadata)
            .map_err(|err| StorageError::InvalidMetadata(key_v2_group, err.to_string()))?;
        let mut metadata_v3 = GroupMetadataV3::new(metadata.attributes);
        if let Some(attributes) = get_attributes_v2(get, path)? {
            metadata_v3.attributes = attributes;
        }
        return Ok(Some(NodeMetadata::Group(metadata_v3)));
    }

    Ok(None)
}

fn get_attributes_v2(
    get: &dyn Fn(&StoreKey) -> Result<MaybeBytes, StorageError>,
    path: &NodePath,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, StorageError> {
    let key = meta_key_v2_attributes(path);
    let Some(attributes) = get(&key)? else {
        return Ok(None);
    };
    let attributes = serde_json::from_slice(&attributes)
        .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
    Ok(Some(attributes))
}

/// Return the metadata key given a node path for a specified metadata file name.
#[must_use]
fn meta_key_any(path: &NodePath, metadata_file_name: &str) -> StoreKey {
    let path = path.as_str();
    if path.eq("/") {
        unsafe { StoreKey::new_unchecked(metadata_file_name.to_string()) }
    } else {
        let path = path.strip_prefix('/').unwrap_or(path);
        unsafe { StoreKey::new_unchecked(format!("{path}/{metadata_file_name}")) }
    }
}

/// Return the Zarr V3 metadata key (zarr.json) given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    meta_key_any(path, "zarr.json")
}

/// Return the Zarr V2 array metadata key (.zarray) given a node path.
#[must_use]
pub fn meta_key_v2_array(path: &NodePath) -> StoreKey {
    meta_key_any(path, ".zarray")
}

/// Return the Zarr V2 group metadata key (.zgroup) given a node path.
#[must_use]
pub fn meta_key_v2_group(path: &NodePath) -> StoreKey {
    meta_key_any(path, ".zgroup")
}

/// Return the Zarr V2 user-defined attributes key (.zattrs) given a node path.
#[must_use]
pub fn meta_key_v2_attributes(path: &NodePath) -> StoreKey {
    meta_key_any(path, ".zattrs")
}

/// Return the data key given a node path, chunk grid coordinates, and a chunk key encoding.
#[must_use]
pub fn data_key(
    path: &NodePath,
    chunk_grid_indices: &[u64],
    chunk_key_encoding: &ChunkKeyEncoding,
) -> StoreKey {
    let path = path.as_str();
    let path = path.strip_prefix('/').unwrap_or(path);
    let chunk_key = chunk_key_encoding.encode(chunk_grid_indices);
    if path.is_empty() {
        chunk_key
    } else {
        unsafe { StoreKey::new_unchecked(format!("{path}/{}", chunk_key.as_str())) }
    }
}

/// Returns whether a node (group or array metadata document) exists at `path`.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying storage error.
pub fn node_exists(store: &dyn Store, path: &NodePath) -> Result<bool, StorageError> {
    Ok(store.exists(&meta_key(path))?
        || store.exists(&meta_key_v2_array(path))?
        || store.exists(&meta_key_v2_group(path))?)
}

/// Erase the node at `path` and all of its descendants.
///
/// # Errors
/// Returns a [`StorageError`] if there is an underlying storage error.
pub fn erase_node(store: &dyn Store, path: &NodePath) -> Result<bool, StorageError> {
    let prefix: StorePrefix = path
        .try_into()
        .map_err(|err: StorePrefixError| StorageError::from(err.to_string()))?;
    if prefix.as_str().is_empty() {
        // erasing the root erases everything in the store
        store.erase_prefix(&StorePrefix::root())
    } else {
        store.erase_prefix(&prefix)
    }
}
