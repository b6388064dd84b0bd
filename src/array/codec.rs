//! Zarr codecs.
//!
//! A codec is a single transformation stage applied to chunks on the write (encode) and read
//! (decode) paths. Codecs are typed by their input and output domains:
//!  - **array to array**: [`transpose`]
//!  - **array to bytes**: [`bytes`]
//!  - **bytes to bytes**: [`blosc`], [`gzip`], [`zstd`], [`crc32c`]
//!
//! An ordered sequence of codecs forms a [`CodecChain`](codec_chain::CodecChain), which encodes an
//! array into bytes and decodes bytes into an array.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#id18>.

pub mod blosc;
pub mod bytes;
pub mod codec_chain;
pub mod crc32c;
pub mod gzip;
pub mod transpose;
pub mod zstd;

pub use codec_chain::{CodecChain, CodecChainCreateError};

pub use self::blosc::{
    BloscCodec, BloscCodecConfiguration, BloscCodecConfigurationV1, BloscCompressionLevel,
    BloscCompressor, BloscShuffleMode,
};
pub use self::bytes::{
    BytesCodec, BytesCodecConfiguration, BytesCodecConfigurationV1, Endianness, NATIVE_ENDIAN,
};
pub use self::crc32c::Crc32cCodec;
pub use self::gzip::{GzipCodec, GzipCodecConfiguration, GzipCodecConfigurationV1};
pub use self::transpose::{
    TransposeCodec, TransposeCodecConfiguration, TransposeCodecConfigurationV1, TransposeOrder,
};
pub use self::zstd::{ZstdCodec, ZstdCodecConfiguration, ZstdCodecConfigurationV1};

use thiserror::Error;

use crate::{metadata::v3::MetadataV3, plugin::PluginCreateError};

use super::ArrayRepresentation;

/// Codec traits shared by all codec categories.
pub trait CodecTraits: dyn_clone::DynClone + core::fmt::Debug + Send + Sync {
    /// The codec identifier.
    fn identifier(&self) -> &'static str;

    /// Create the codec metadata fragment (`{"name": ..., "configuration": {...}}`).
    fn create_metadata(&self) -> MetadataV3;
}

/// Traits for codecs operating on decoded arrays (raw bytes with an [`ArrayRepresentation`]).
pub trait ArrayCodecTraits: CodecTraits {
    /// Encode an array of `decoded_representation` in `decoded_value`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input does not match the representation or encoding fails.
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decode into an array of `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the input is malformed or decoding fails.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Traits for `array -> array` codecs.
pub trait ArrayToArrayCodecTraits: ArrayCodecTraits {
    /// Return the representation of the encoded output given the `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the representation is incompatible with the codec configuration.
    fn compute_encoded_representation(
        &self,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<ArrayRepresentation, CodecError>;
}

/// Traits for `array -> bytes` codecs.
pub trait ArrayToBytesCodecTraits: ArrayCodecTraits {}

/// Traits for `bytes -> bytes` codecs.
pub trait BytesToBytesCodecTraits: CodecTraits {
    /// Encode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if encoding fails.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if decoding fails.
    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;
}

dyn_clone::clone_trait_object!(ArrayToArrayCodecTraits);
dyn_clone::clone_trait_object!(ArrayToBytesCodecTraits);
dyn_clone::clone_trait_object!(BytesToBytesCodecTraits);

/// A codec, tagged by its input and output domains.
#[derive(Debug, Clone)]
pub enum Codec {
    /// An `array -> array` codec.
    ArrayToArray(Box<dyn ArrayToArrayCodecTraits>),
    /// An `array -> bytes` codec.
    ArrayToBytes(Box<dyn ArrayToBytesCodecTraits>),
    /// A `bytes -> bytes` codec.
    BytesToBytes(Box<dyn BytesToBytesCodecTraits>),
}

impl Codec {
    /// Create a codec from metadata.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the metadata is invalid or not a supported codec.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, PluginCreateError> {
        match metadata.name() {
            transpose::IDENTIFIER => {
                let configuration: TransposeCodecConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(transpose::IDENTIFIER, metadata.clone())
                    })?;
                let codec = TransposeCodec::new_with_configuration(&configuration)?;
                Ok(Self::ArrayToArray(Box::new(codec)))
            }
            bytes::IDENTIFIER => {
                let configuration: BytesCodecConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(bytes::IDENTIFIER, metadata.clone())
                    })?;
                let codec = BytesCodec::new_with_configuration(&configuration);
                Ok(Self::ArrayToBytes(Box::new(codec)))
            }
            blosc::IDENTIFIER => {
                let configuration: BloscCodecConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(blosc::IDENTIFIER, metadata.clone())
                    })?;
                let codec = BloscCodec::new_with_configuration(&configuration)?;
                Ok(Self::BytesToBytes(Box::new(codec)))
            }
            gzip::IDENTIFIER => {
                let configuration: GzipCodecConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(gzip::IDENTIFIER, metadata.clone())
                    })?;
                let codec = GzipCodec::new_with_configuration(&configuration);
                Ok(Self::BytesToBytes(Box::new(codec)))
            }
            zstd::IDENTIFIER => {
                let configuration: ZstdCodecConfiguration =
                    metadata.to_configuration().map_err(|_| {
                        PluginCreateError::metadata_invalid(zstd::IDENTIFIER, metadata.clone())
                    })?;
                let codec = ZstdCodec::new_with_configuration(&configuration);
                Ok(Self::BytesToBytes(Box::new(codec)))
            }
            crc32c::IDENTIFIER => Ok(Self::BytesToBytes(Box::new(Crc32cCodec::new()))),
            name => Err(PluginCreateError::unsupported(name)),
        }
    }

    /// The codec identifier.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::ArrayToArray(codec) => codec.identifier(),
            Self::ArrayToBytes(codec) => codec.identifier(),
            Self::BytesToBytes(codec) => codec.identifier(),
        }
    }
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The decoded value has an unexpected size for the chunk representation.
    #[error("the size of a decoded chunk is {0}, expected {1}")]
    UnexpectedChunkDecodedSize(usize, u64),
    /// The encoded value is too short to decode.
    #[error("the encoded chunk has {0} bytes, expected at least {1}")]
    UnexpectedEncodedSize(usize, usize),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
