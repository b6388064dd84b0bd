//! The `blosc` bytes to bytes codec.
//!
//! It uses the [blosc](https://www.blosc.org/) container format.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/blosc/v1.0.html>.

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{array::DataType, metadata::v3::MetadataV3, plugin::PluginCreateError};

use super::{BytesToBytesCodecTraits, CodecError, CodecTraits};

/// The identifier for the `blosc` codec.
pub const IDENTIFIER: &str = "blosc";

/// An integer from 0 to 9 controlling the compression level.
///
/// A level of 1 is the fastest compression method and produces the least compression, while 9 is
/// slowest and produces the most compression. Compression is turned off when the level is 0.
#[derive(Serialize, Copy, Clone, Debug, Eq, PartialEq)]
pub struct BloscCompressionLevel(u8);

impl From<BloscCompressionLevel> for u8 {
    fn from(val: BloscCompressionLevel) -> Self {
        val.0
    }
}

impl TryFrom<u8> for BloscCompressionLevel {
    type Error = u8;
    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(level)
        }
    }
}

impl<'de> serde::Deserialize<'de> for BloscCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(d)?;
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(serde::de::Error::custom("clevel must be between 0 and 9"))
        }
    }
}

/// The `blosc` shuffle mode.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BloscShuffleMode {
    /// No shuffling.
    #[default]
    NoShuffle,
    /// Byte-wise shuffling.
    Shuffle,
    /// Bit-wise shuffling.
    BitShuffle,
}

impl BloscShuffleMode {
    /// The default shuffle mode for an element of `data_type`: no shuffling for single-byte types,
    /// byte shuffling for two and four byte types, and bit shuffling for eight byte types.
    #[must_use]
    pub const fn default_for_data_type(data_type: DataType) -> Self {
        match data_type.size() {
            1 => Self::NoShuffle,
            2 | 4 => Self::Shuffle,
            _ => Self::BitShuffle,
        }
    }
}

/// The `blosc` compressor.
///
/// See <https://www.blosc.org/pages/>.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// [BloscLZ](https://github.com/Blosc/c-blosc/blob/master/blosc/blosclz.h): the blosc default compressor, heavily based on FastLZ.
    BloscLZ,
    /// [LZ4](https://lz4.org/): a compact, very popular and fast compressor.
    LZ4,
    /// [LZ4HC](https://lz4.org/): a tweaked version of LZ4, produces better compression ratios at the expense of speed.
    LZ4HC,
    /// [Zlib](https://www.zlib.net/): a classic, achieving better compression ratios than LZ4 at lower speed.
    Zlib,
    /// [Zstd](https://facebook.github.io/zstd/): an extremely well balanced codec.
    Zstd,
}

impl BloscCompressor {
    const fn to_blosc(self) -> blosc::Compressor {
        match self {
            Self::BloscLZ => blosc::Compressor::BloscLZ,
            Self::LZ4 => blosc::Compressor::LZ4,
            Self::LZ4HC => blosc::Compressor::LZ4HC,
            Self::Zlib => blosc::Compressor::Zlib,
            Self::Zstd => blosc::Compressor::Zstd,
        }
    }
}

/// A wrapper to handle various versions of `blosc` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum BloscCodecConfiguration {
    /// Version 1.0.
    V1(BloscCodecConfigurationV1),
}

/// Configuration parameters for the `blosc` codec (version 1.0).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct BloscCodecConfigurationV1 {
    /// The compressor.
    pub cname: BloscCompressor,
    /// The compression level.
    pub clevel: BloscCompressionLevel,
    /// The shuffle mode.
    ///
    /// Defaults to noshuffle if unspecified.
    #[serde(default)]
    pub shuffle: BloscShuffleMode,
    /// The type size in bytes.
    ///
    /// Required unless shuffle is "noshuffle", in which case the value is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typesize: Option<usize>,
    /// The compression block size. Automatically determined if 0.
    #[serde(default)]
    pub blocksize: usize,
}

/// A `blosc` codec implementation.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    configuration: BloscCodecConfigurationV1,
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    ///
    /// The block size is chosen automatically if `blocksize` is 0.
    /// `typesize` is required if shuffling is enabled.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the typesize has not been specified and shuffling is
    /// enabled.
    pub fn new(
        cname: BloscCompressor,
        clevel: BloscCompressionLevel,
        shuffle: BloscShuffleMode,
        typesize: Option<usize>,
        blocksize: usize,
    ) -> Result<Self, PluginCreateError> {
        if shuffle != BloscShuffleMode::NoShuffle && typesize.unwrap_or(0) == 0 {
            return Err(PluginCreateError::Other {
                error_str: "typesize is a positive integer required if shuffle mode is not none."
                    .into(),
            });
        }
        Ok(Self {
            configuration: BloscCodecConfigurationV1 {
                cname,
                clevel,
                shuffle,
                typesize,
                blocksize,
            },
        })
    }

    /// Create a new `blosc` codec from configuration.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if the configuration is not supported.
    pub fn new_with_configuration(
        configuration: &BloscCodecConfiguration,
    ) -> Result<Self, PluginCreateError> {
        let BloscCodecConfiguration::V1(configuration) = configuration;
        Self::new(
            configuration.cname,
            configuration.clevel,
            configuration.shuffle,
            configuration.typesize,
            configuration.blocksize,
        )
    }
}

fn clevel_to_blosc(clevel: BloscCompressionLevel) -> blosc::Clevel {
    match u8::from(clevel) {
        0 => blosc::Clevel::None,
        1 => blosc::Clevel::L1,
        2 => blosc::Clevel::L2,
        3 => blosc::Clevel::L3,
        4 => blosc::Clevel::L4,
        5 => blosc::Clevel::L5,
        6 => blosc::Clevel::L6,
        7 => blosc::Clevel::L7,
        8 => blosc::Clevel::L8,
        _ => blosc::Clevel::L9,
    }
}

const fn shuffle_to_blosc(shuffle: BloscShuffleMode) -> blosc::ShuffleMode {
    match shuffle {
        BloscShuffleMode::NoShuffle => blosc::ShuffleMode::None,
        BloscShuffleMode::Shuffle => blosc::ShuffleMode::Byte,
        BloscShuffleMode::BitShuffle => blosc::ShuffleMode::Bit,
    }
}

fn compress_bytes(
    decoded_value: &[u8],
    configuration: &BloscCodecConfigurationV1,
) -> Result<Vec<u8>, CodecError> {
    let typesize = if configuration.shuffle == BloscShuffleMode::NoShuffle {
        None
    } else {
        configuration.typesize
    };
    let blocksize = if configuration.blocksize == 0 {
        None
    } else {
        Some(configuration.blocksize)
    };
    let context = blosc::Context::new()
        .blocksize(blocksize)
        .clevel(clevel_to_blosc(configuration.clevel))
        .shuffle(shuffle_to_blosc(configuration.shuffle))
        .typesize(typesize)
        .compressor(configuration.cname.to_blosc())
        .map_err(|_| {
            CodecError::Other(format!(
                "blosc compressor {:?} is not supported",
                configuration.cname
            ))
        })?;
    Ok(context.compress(decoded_value).into())
}

fn decompress_bytes(encoded_value: &[u8]) -> Result<Vec<u8>, CodecError> {
    // NOTE: There is limited validation of blosc encoded data.
    // See [Blosc issue #229](https://github.com/Blosc/c-blosc/issues/229).
    unsafe { blosc::decompress_bytes(encoded_value) }
        .map_err(|_| CodecError::Other("blosc decompression failed".to_string()))
}

impl CodecTraits for BloscCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> MetadataV3 {
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &self.configuration).unwrap()
    }
}

impl BytesToBytesCodecTraits for BloscCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        compress_bytes(&decoded_value, &self.configuration)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        decompress_bytes(&encoded_value)
    }
}
