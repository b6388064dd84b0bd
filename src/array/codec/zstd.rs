//! The `zstd` bytes to bytes codec.
//!
//! See <https://github.com/zarr-developers/zarr-specs/pull/256>.

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::metadata::v3::MetadataV3;

use super::{BytesToBytesCodecTraits, CodecError, CodecTraits};

/// The identifier for the `zstd` codec.
pub const IDENTIFIER: &str = "zstd";

/// An integer from 1 to 20 controlling the compression level.
#[derive(Serialize, Copy, Clone, Debug, Eq, PartialEq)]
pub struct ZstdCompressionLevel(i32);

impl ZstdCompressionLevel {
    /// Return the compression level.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl<'de> serde::Deserialize<'de> for ZstdCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = i32::deserialize(d)?;
        if (1..=20).contains(&level) {
            Ok(Self(level))
        } else {
            Err(serde::de::Error::custom("level must be between 1 and 20"))
        }
    }
}

/// A wrapper to handle various versions of `zstd` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum ZstdCodecConfiguration {
    /// Version 1.0.
    V1(ZstdCodecConfigurationV1),
}

/// Configuration parameters for the `zstd` codec (version 1.0).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZstdCodecConfigurationV1 {
    /// The compression level.
    pub level: ZstdCompressionLevel,
}

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression: i32,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    #[must_use]
    pub const fn new(compression: i32) -> Self {
        Self { compression }
    }

    /// Create a new `zstd` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &ZstdCodecConfiguration) -> Self {
        let ZstdCodecConfiguration::V1(configuration) = configuration;
        Self {
            compression: configuration.level.as_i32(),
        }
    }
}

impl CodecTraits for ZstdCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> MetadataV3 {
        let configuration = ZstdCodecConfigurationV1 {
            level: ZstdCompressionLevel(self.compression),
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl BytesToBytesCodecTraits for ZstdCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(decoded_value.as_slice(), self.compression).map_err(CodecError::IOError)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(encoded_value.as_slice()).map_err(CodecError::IOError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_VALID: &str = r#"{ "level": 1 }"#;

    #[test]
    fn codec_zstd_round_trip() {
        let bytes: Vec<u8> = (0..255).cycle().take(1024).collect();
        let configuration: ZstdCodecConfiguration = serde_json::from_str(JSON_VALID).unwrap();
        let codec = ZstdCodec::new_with_configuration(&configuration);

        let encoded = codec.encode(bytes.clone()).unwrap();
        assert!(encoded.len() < bytes.len());
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_zstd_invalid_level() {
        assert!(serde_json::from_str::<ZstdCodecConfiguration>(r#"{ "level": 0 }"#).is_err());
        assert!(serde_json::from_str::<ZstdCodecConfiguration>(r#"{ "level": 21 }"#).is_err());
    }

    #[test]
    fn codec_zstd_decode_invalid() {
        let codec = ZstdCodec::new(1);
        assert!(codec.decode(vec![0, 1, 2, 3]).is_err());
    }
}
