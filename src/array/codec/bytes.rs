//! The `bytes` array to bytes codec.
//!
//! Serializes chunk elements to a tightly packed byte vector with a declared endianness.
//! Decoded chunks are always native endian in memory; the codec reverses element bytes when the
//! declared endianness differs from the native one.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/bytes/v1.0.html>.

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{
    array::{ArrayRepresentation, DataType},
    metadata::v3::MetadataV3,
};

use super::{ArrayCodecTraits, ArrayToBytesCodecTraits, CodecError, CodecTraits};

/// The identifier for the `bytes` codec.
pub const IDENTIFIER: &str = "bytes";

/// The endianness of a multi-byte value.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Little endian: least significant byte first.
    Little,
    /// Big endian: most significant byte first.
    Big,
}

impl Endianness {
    /// Returns [`true`] if the endianness matches the native endianness.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

/// The native endianness of the target.
#[cfg(target_endian = "little")]
pub const NATIVE_ENDIAN: Endianness = Endianness::Little;
/// The native endianness of the target.
#[cfg(target_endian = "big")]
pub const NATIVE_ENDIAN: Endianness = Endianness::Big;

/// A wrapper to handle various versions of `bytes` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum BytesCodecConfiguration {
    /// Version 1.0.
    V1(BytesCodecConfigurationV1),
}

/// Configuration parameters for the `bytes` codec (version 1.0).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct BytesCodecConfigurationV1 {
    /// The endianness. Omitted for data types with a single-byte element size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endian: Option<Endianness>,
}

/// A `bytes` codec implementation.
#[derive(Debug, Clone)]
pub struct BytesCodec {
    endian: Option<Endianness>,
}

impl Default for BytesCodec {
    fn default() -> Self {
        Self::new(Some(NATIVE_ENDIAN))
    }
}

impl BytesCodec {
    /// Create a new `bytes` codec.
    ///
    /// `endian` is optional because a single-byte type has no endianness.
    #[must_use]
    pub const fn new(endian: Option<Endianness>) -> Self {
        Self { endian }
    }

    /// Create a new `bytes` codec for little endian data.
    #[must_use]
    pub const fn little() -> Self {
        Self::new(Some(Endianness::Little))
    }

    /// Create a new `bytes` codec for big endian data.
    #[must_use]
    pub const fn big() -> Self {
        Self::new(Some(Endianness::Big))
    }

    /// Create a new `bytes` codec from configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &BytesCodecConfiguration) -> Self {
        let BytesCodecConfiguration::V1(configuration) = configuration;
        Self::new(configuration.endian)
    }

    fn do_encode_or_decode(
        &self,
        mut value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let array_size = decoded_representation.size();
        if value.len() as u64 != array_size {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                value.len(),
                array_size,
            ));
        }
        let data_type_size = decoded_representation.element_size();
        if data_type_size > 1 && self.endian.is_none() {
            return Err(CodecError::Other(format!(
                "tried to encode an array with element size {data_type_size} with endianness None"
            )));
        }

        if let Some(endian) = self.endian {
            if !endian.is_native() {
                reverse_endianness(&mut value, decoded_representation.data_type());
            }
        }
        Ok(value)
    }
}

/// Reverse the endianness of each element of `bytes` in place.
fn reverse_endianness(bytes: &mut [u8], data_type: DataType) {
    match data_type.size() {
        1 => {}
        size => bytes.chunks_exact_mut(size).for_each(<[u8]>::reverse),
    }
}

impl CodecTraits for BytesCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> MetadataV3 {
        let configuration = BytesCodecConfigurationV1 {
            endian: self.endian,
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl ArrayCodecTraits for BytesCodec {
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.do_encode_or_decode(decoded_value, decoded_representation)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.do_encode_or_decode(encoded_value, decoded_representation)
    }
}

impl ArrayToBytesCodecTraits for BytesCodec {}

#[cfg(test)]
mod tests {
    use crate::array::FillValue;

    use super::*;

    #[test]
    fn codec_bytes_little_endian() {
        let representation =
            ArrayRepresentation::new(vec![2], DataType::UInt16, FillValue::from(0_u16));
        let codec = BytesCodec::little();
        let bytes: Vec<u8> = 0x0102_u16
            .to_ne_bytes()
            .into_iter()
            .chain(0x0304_u16.to_ne_bytes())
            .collect();
        let encoded = codec.encode(bytes.clone(), &representation).unwrap();
        assert_eq!(encoded, vec![0x02, 0x01, 0x04, 0x03]);
        let decoded = codec.decode(encoded, &representation).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn codec_bytes_big_endian() {
        let representation =
            ArrayRepresentation::new(vec![2], DataType::UInt16, FillValue::from(0_u16));
        let codec = BytesCodec::big();
        let bytes: Vec<u8> = 0x0102_u16
            .to_ne_bytes()
            .into_iter()
            .chain(0x0304_u16.to_ne_bytes())
            .collect();
        let encoded = codec.encode(bytes.clone(), &representation).unwrap();
        assert_eq!(encoded, vec![0x01, 0x02, 0x03, 0x04]);
        let decoded = codec.decode(encoded, &representation).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn codec_bytes_endian_required_for_multibyte() {
        let representation =
            ArrayRepresentation::new(vec![2], DataType::UInt16, FillValue::from(0_u16));
        let codec = BytesCodec::new(None);
        assert!(codec.encode(vec![0; 4], &representation).is_err());

        let representation =
            ArrayRepresentation::new(vec![2], DataType::UInt8, FillValue::from(0_u8));
        assert!(codec.encode(vec![0; 2], &representation).is_ok());
    }

    #[test]
    fn codec_bytes_invalid_size() {
        let representation =
            ArrayRepresentation::new(vec![2], DataType::UInt16, FillValue::from(0_u16));
        let codec = BytesCodec::little();
        assert!(codec.encode(vec![0; 3], &representation).is_err());
    }

    #[test]
    fn codec_bytes_configuration_omitted_endian() {
        let codec = BytesCodec::new(None);
        assert_eq!(
            serde_json::to_string(&codec.create_metadata()).unwrap(),
            r#"{"name":"bytes"}"#
        );
        let codec = BytesCodec::little();
        assert_eq!(
            serde_json::to_string(&codec.create_metadata()).unwrap(),
            r#"{"name":"bytes","configuration":{"endian":"little"}}"#
        );
    }
}
