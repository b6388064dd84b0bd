//! Zarr chunk key encodings.
//!
//! A chunk key encoding maps chunk grid indices to store keys.
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#chunk-key-encoding>.

use serde::{Deserialize, Serialize};

use crate::{metadata::v3::MetadataV3, plugin::PluginCreateError, storage::StoreKey};

/// The identifier for the `default` chunk key encoding.
pub const DEFAULT_IDENTIFIER: &str = "default";

/// The identifier for the `v2` chunk key encoding.
pub const V2_IDENTIFIER: &str = "v2";

/// A chunk key separator, either `.` or `/`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChunkKeySeparator {
    /// The `/` character.
    Slash,
    /// The `.` character.
    Dot,
}

impl std::fmt::Display for ChunkKeySeparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Self::Slash => write!(f, "/"),
            Self::Dot => write!(f, "."),
        }
    }
}

impl serde::Serialize for ChunkKeySeparator {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Slash => s.serialize_char('/'),
            Self::Dot => s.serialize_char('.'),
        }
    }
}

impl<'de> serde::Deserialize<'de> for ChunkKeySeparator {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let separator = String::deserialize(d)?;
        match separator.as_str() {
            "/" => Ok(Self::Slash),
            "." => Ok(Self::Dot),
            _ => Err(serde::de::Error::custom(
                "chunk key separator must be a `.` or `/`.",
            )),
        }
    }
}

/// Chunk key encoding traits.
pub trait ChunkKeyEncodingTraits: dyn_clone::DynClone + core::fmt::Debug + Send + Sync {
    /// Create the metadata of this chunk key encoding.
    fn create_metadata(&self) -> MetadataV3;

    /// Encode chunk grid indices (grid cell coordinates) into a store key.
    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey;
}

dyn_clone::clone_trait_object!(ChunkKeyEncodingTraits);

/// A chunk key encoding.
#[derive(Clone, Debug)]
pub struct ChunkKeyEncoding(Box<dyn ChunkKeyEncodingTraits>);

impl ChunkKeyEncoding {
    /// Create a chunk key encoding.
    pub fn new<T: ChunkKeyEncodingTraits + 'static>(chunk_key_encoding: T) -> Self {
        Self(Box::new(chunk_key_encoding))
    }

    /// Create a chunk key encoding from metadata.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the metadata is not a supported chunk key encoding.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, PluginCreateError> {
        match metadata.name() {
            DEFAULT_IDENTIFIER => {
                let configuration: DefaultChunkKeyEncodingConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(DEFAULT_IDENTIFIER, metadata.clone())
                    })?;
                Ok(Self::new(DefaultChunkKeyEncoding::new(
                    configuration.separator,
                )))
            }
            V2_IDENTIFIER => {
                let configuration: V2ChunkKeyEncodingConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(V2_IDENTIFIER, metadata.clone())
                    })?;
                Ok(Self::new(V2ChunkKeyEncoding::new(configuration.separator)))
            }
            name => Err(PluginCreateError::unsupported(name)),
        }
    }

    /// Create the metadata of this chunk key encoding.
    #[must_use]
    pub fn create_metadata(&self) -> MetadataV3 {
        self.0.create_metadata()
    }

    /// Encode chunk grid indices (grid cell coordinates) into a store key.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        self.0.encode(chunk_grid_indices)
    }
}

impl Default for ChunkKeyEncoding {
    /// The `default` chunk key encoding with the `/` separator.
    fn default() -> Self {
        Self::new(DefaultChunkKeyEncoding::default())
    }
}

impl<T: ChunkKeyEncodingTraits + 'static> From<T> for ChunkKeyEncoding {
    fn from(chunk_key_encoding: T) -> Self {
        Self::new(chunk_key_encoding)
    }
}

/// Configuration parameters for the `default` chunk key encoding.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct DefaultChunkKeyEncodingConfiguration {
    /// The chunk key separator.
    #[serde(default = "default_separator")]
    pub separator: ChunkKeySeparator,
}

/// Configuration parameters for the `v2` chunk key encoding.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct V2ChunkKeyEncodingConfiguration {
    /// The chunk key separator.
    #[serde(default = "v2_separator")]
    pub separator: ChunkKeySeparator,
}

const fn default_separator() -> ChunkKeySeparator {
    ChunkKeySeparator::Slash
}

const fn v2_separator() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

/// A `default` chunk key encoding.
///
/// The key for a chunk with grid index (k, j, i, ...) is formed by taking the initial prefix `c`,
/// and appending for each dimension the separator character followed by the ASCII decimal string
/// representation of the chunk index within that dimension.
#[derive(Debug, Clone)]
pub struct DefaultChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl DefaultChunkKeyEncoding {
    /// Create a new `default` chunk key encoding with separator `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a new `default` chunk key encoding with separator `.`.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Create a new `default` chunk key encoding with separator `/`.
    #[must_use]
    pub const fn new_slash() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }
}

impl Default for DefaultChunkKeyEncoding {
    /// Create a `default` chunk key encoding with default separator: `/`.
    fn default() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }
}

impl ChunkKeyEncodingTraits for DefaultChunkKeyEncoding {
    fn create_metadata(&self) -> MetadataV3 {
        let configuration = DefaultChunkKeyEncodingConfiguration {
            separator: self.separator,
        };
        MetadataV3::new_with_serializable_configuration(DEFAULT_IDENTIFIER, &configuration).unwrap()
    }

    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        let mut key = "c".to_string();
        if !chunk_grid_indices.is_empty() {
            key = key
                + &self.separator.to_string()
                + &chunk_grid_indices
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<String>>()
                    .join(&self.separator.to_string());
        }
        unsafe { StoreKey::new_unchecked(key) }
    }
}

/// A `v2` chunk key encoding.
///
/// The chunk key is the `separator`-joined chunk indices with no prefix, as Zarr V2 arrays name
/// their chunks. A zero dimensional chunk has the key `0`.
#[derive(Debug, Clone)]
pub struct V2ChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl V2ChunkKeyEncoding {
    /// Create a new `v2` chunk key encoding with separator `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a new `v2` chunk key encoding with separator `.`.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Create a new `v2` chunk key encoding with separator `/`.
    #[must_use]
    pub const fn new_slash() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }
}

impl Default for V2ChunkKeyEncoding {
    /// Create a `v2` chunk key encoding with default separator: `.`.
    fn default() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }
}

impl ChunkKeyEncodingTraits for V2ChunkKeyEncoding {
    fn create_metadata(&self) -> MetadataV3 {
        let configuration = V2ChunkKeyEncodingConfiguration {
            separator: self.separator,
        };
        MetadataV3::new_with_serializable_configuration(V2_IDENTIFIER, &configuration).unwrap()
    }

    fn encode(&self, chunk_grid_indices: &[u64]) -> StoreKey {
        let key = if chunk_grid_indices.is_empty() {
            "0".to_string()
        } else {
            chunk_grid_indices
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(&self.separator.to_string())
        };
        unsafe { StoreKey::new_unchecked(key) }
    }
}
