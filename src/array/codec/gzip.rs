//! The `gzip` bytes to bytes codec.
//!
//! Applies gzip compression (gzip framing, not raw deflate or zlib).
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/gzip/v1.0.html>.

use std::io::{Cursor, Read};

use derive_more::From;
use flate2::bufread::{GzDecoder, GzEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::v3::MetadataV3;

use super::{BytesToBytesCodecTraits, CodecError, CodecTraits};

/// The identifier for the `gzip` codec.
pub const IDENTIFIER: &str = "gzip";

/// An integer from 0 to 9 controlling the compression level.
///
/// A level of 1 is the fastest compression method and produces the least compression, while 9 is
/// slowest and produces the most compression. Compression is turned off when the level is 0.
#[derive(Serialize, Copy, Clone, Debug, Eq, PartialEq)]
pub struct GzipCompressionLevel(u32);

/// An invalid gzip compression level error.
#[derive(Copy, Clone, Debug, Error)]
#[error("invalid gzip compression level {0}, must be 0-9")]
pub struct GzipCompressionLevelError(u32);

impl TryFrom<u32> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;
    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(GzipCompressionLevelError(level))
        }
    }
}

impl GzipCompressionLevel {
    /// Return the compression level.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl<'de> serde::Deserialize<'de> for GzipCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = u32::deserialize(d)?;
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(serde::de::Error::custom("level must be between 0 and 9"))
        }
    }
}

/// A wrapper to handle various versions of `gzip` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum GzipCodecConfiguration {
    /// Version 1.0.
    V1(GzipCodecConfigurationV1),
}

/// Configuration parameters for the `gzip` codec (version 1.0).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct GzipCodecConfigurationV1 {
    /// The compression level.
    pub level: GzipCompressionLevel,
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression_level: GzipCompressionLevel,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, GzipCompressionLevelError> {
        Ok(Self {
            compression_level: compression_level.try_into()?,
        })
    }

    /// Create a new `gzip` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &GzipCodecConfiguration) -> Self {
        let GzipCodecConfiguration::V1(configuration) = configuration;
        Self {
            compression_level: configuration.level,
        }
    }
}

impl CodecTraits for GzipCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> MetadataV3 {
        let configuration = GzipCodecConfigurationV1 {
            level: self.compression_level,
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl BytesToBytesCodecTraits for GzipCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_VALID: &str = r#"{ "level": 5 }"#;

    #[test]
    fn codec_gzip_round_trip() {
        let bytes: Vec<u8> = (0..255).collect();
        let configuration: GzipCodecConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        let codec = GzipCodec::new_with_configuration(&configuration);

        let encoded = codec.encode(bytes.clone()).unwrap();
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_gzip_invalid_level() {
        assert!(serde_json::from_str::<GzipCodecConfiguration>(r#"{ "level": 10 }"#).is_err());
        assert!(GzipCodec::new(10).is_err());
    }

    #[test]
    fn codec_gzip_decode_invalid() {
        let codec = GzipCodec::new(5).unwrap();
        assert!(codec.decode(vec![0, 1, 2, 3]).is_err());
    }
}
