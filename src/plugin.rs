//! Extension point creation errors.
//!
//! [Zarr extension points](https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#extension-points)
//! ([chunk grids](crate::array::chunk_grid), [chunk key encodings](crate::array::chunk_key_encoding),
//! and [codecs](crate::array::codec)) are created from [`MetadataV3`] by name. The supported set is
//! fixed to the core extensions, so creation dispatches on the metadata name and fails with a
//! [`PluginCreateError`] for anything else.

use thiserror::Error;

use crate::metadata::{ConfigurationInvalidError, MetadataV3};

/// A plugin creation error.
#[derive(Error, Debug)]
pub enum PluginCreateError {
    /// An unsupported plugin.
    #[error("{name:?} is not supported")]
    Unsupported {
        /// The name of the unsupported plugin.
        name: String,
    },
    /// Invalid metadata.
    #[error("{identifier} is unsupported, metadata: {metadata}")]
    MetadataInvalid {
        /// The identifier of the plugin.
        identifier: &'static str,
        /// The invalid metadata.
        metadata: MetadataV3,
    },
    /// Invalid configuration.
    #[error(transparent)]
    ConfigurationInvalidError(#[from] ConfigurationInvalidError),
    /// Other.
    #[error("{error_str}")]
    Other {
        /// The error string.
        error_str: String,
    },
}

impl PluginCreateError {
    /// Create a [`PluginCreateError::MetadataInvalid`] error.
    #[must_use]
    pub fn metadata_invalid(identifier: &'static str, metadata: MetadataV3) -> Self {
        Self::MetadataInvalid {
            identifier,
            metadata,
        }
    }

    /// Create a [`PluginCreateError::Unsupported`] error.
    #[must_use]
    pub fn unsupported(name: &str) -> Self {
        Self::Unsupported {
            name: name.to_string(),
        }
    }
}
