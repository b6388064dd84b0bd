//! The `crc32c` bytes to bytes codec.
//!
//! Appends a CRC32C checksum of the input to the encoded output. On decode the checksum is
//! recomputed and compared; a mismatch is reported as a warning and the payload is still returned.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/crc32c/v1.0.html>.

use crate::{config::global_config, metadata::v3::MetadataV3};

use super::{BytesToBytesCodecTraits, CodecError, CodecTraits};

/// The identifier for the `crc32c` codec.
pub const IDENTIFIER: &str = "crc32c";

/// The size of the appended checksum in bytes.
pub const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();

/// A `crc32c` (CRC32C checksum) codec implementation.
#[derive(Clone, Debug, Default)]
pub struct Crc32cCodec;

impl Crc32cCodec {
    /// Create a new `crc32c` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

impl CodecTraits for Crc32cCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> MetadataV3 {
        MetadataV3::new(IDENTIFIER)
    }
}

impl BytesToBytesCodecTraits for Crc32cCodec {
    fn encode(&self, mut decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(&decoded_value).to_le_bytes();
        decoded_value.reserve_exact(checksum.len());
        decoded_value.extend(checksum);
        Ok(decoded_value)
    }

    fn decode(&self, mut encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() < CHECKSUM_SIZE {
            return Err(CodecError::UnexpectedEncodedSize(
                encoded_value.len(),
                CHECKSUM_SIZE,
            ));
        }
        if global_config().validate_checksums() {
            let decoded_value = &encoded_value[..encoded_value.len() - CHECKSUM_SIZE];
            let checksum = crc32c::crc32c(decoded_value).to_le_bytes();
            if checksum != encoded_value[encoded_value.len() - CHECKSUM_SIZE..] {
                log::warn!("crc32c checksum mismatch, returning the data anyway");
            }
        }
        encoded_value.truncate(encoded_value.len() - CHECKSUM_SIZE);
        Ok(encoded_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_crc32c_round_trip() {
        let bytes: Vec<u8> = (0..32).collect();
        let codec = Crc32cCodec::new();
        let encoded = codec.encode(bytes.clone()).unwrap();
        assert_eq!(encoded.len(), bytes.len() + CHECKSUM_SIZE);
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_crc32c_checksum_value() {
        // RFC 3720 test vector: crc32c of 32 zero bytes
        let bytes = vec![0_u8; 32];
        let codec = Crc32cCodec::new();
        let encoded = codec.encode(bytes).unwrap();
        assert_eq!(&encoded[32..], &[0xaa, 0x36, 0x91, 0x8a]);
    }

    #[test]
    fn codec_crc32c_corrupt_checksum_still_returns_data() {
        let bytes: Vec<u8> = (0..32).collect();
        let codec = Crc32cCodec::new();
        let mut encoded = codec.encode(bytes.clone()).unwrap();
        let last = encoded.len() - 1;
        encoded[last] = !encoded[last];
        let decoded = codec.decode(encoded).unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_crc32c_too_short() {
        let codec = Crc32cCodec::new();
        assert!(codec.decode(vec![0, 1]).is_err());
    }
}
