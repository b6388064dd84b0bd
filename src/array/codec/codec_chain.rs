//! A validated sequence of codecs mapping array to bytes on encode and bytes to array on decode.

use thiserror::Error;

use crate::{
    array::ArrayRepresentation,
    metadata::v3::MetadataV3,
    plugin::PluginCreateError,
};

use super::{
    ArrayCodecTraits, ArrayToArrayCodecTraits, ArrayToBytesCodecTraits, BytesToBytesCodecTraits,
    Codec, CodecError, CodecTraits,
};

/// A codec chain: an `array -> array` prefix, exactly one `array -> bytes` transition, and a
/// `bytes -> bytes` suffix.
///
/// The chain invariant holds by construction: the output domain of every codec matches the input
/// domain of its successor, the first codec consumes an array, and the last produces bytes.
#[derive(Debug, Clone)]
pub struct CodecChain {
    array_to_array: Vec<Box<dyn ArrayToArrayCodecTraits>>,
    array_to_bytes: Box<dyn ArrayToBytesCodecTraits>,
    bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
}

/// A codec chain creation error.
#[derive(Debug, Error)]
pub enum CodecChainCreateError {
    /// A codec could not be created from its metadata.
    #[error(transparent)]
    PluginCreateError(#[from] PluginCreateError),
    /// The chain has no `array -> bytes` codec.
    #[error("missing array to bytes codec")]
    MissingArrayToBytesCodec,
    /// The chain has more than one `array -> bytes` codec.
    #[error("multiple array to bytes codecs: {0} and {1}")]
    MultipleArrayToBytesCodecs(String, String),
    /// A codec is out of order for its input and output domains.
    #[error("codec {0} is out of order in the codec chain")]
    CodecOutOfOrder(String),
}

impl CodecChain {
    /// Create a new codec chain.
    #[must_use]
    pub fn new(
        array_to_array: Vec<Box<dyn ArrayToArrayCodecTraits>>,
        array_to_bytes: Box<dyn ArrayToBytesCodecTraits>,
        bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
    ) -> Self {
        Self {
            array_to_array,
            array_to_bytes,
            bytes_to_bytes,
        }
    }

    /// Create a new codec chain from a list of metadata.
    ///
    /// # Errors
    /// Returns a [`CodecChainCreateError`] if:
    ///  - a codec could not be created from its metadata,
    ///  - no `array -> bytes` codec is supplied,
    ///  - more than one `array -> bytes` codec is supplied, or
    ///  - the codecs are out of order for their input and output domains.
    pub fn from_metadata(metadatas: &[MetadataV3]) -> Result<Self, CodecChainCreateError> {
        let mut array_to_array: Vec<Box<dyn ArrayToArrayCodecTraits>> = vec![];
        let mut array_to_bytes: Option<Box<dyn ArrayToBytesCodecTraits>> = None;
        let mut bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>> = vec![];
        for metadata in metadatas {
            match Codec::from_metadata(metadata)? {
                Codec::ArrayToArray(codec) => {
                    if array_to_bytes.is_some() || !bytes_to_bytes.is_empty() {
                        return Err(CodecChainCreateError::CodecOutOfOrder(
                            codec.identifier().to_string(),
                        ));
                    }
                    array_to_array.push(codec);
                }
                Codec::ArrayToBytes(codec) => {
                    if !bytes_to_bytes.is_empty() {
                        return Err(CodecChainCreateError::CodecOutOfOrder(
                            codec.identifier().to_string(),
                        ));
                    }
                    if let Some(existing) = &array_to_bytes {
                        return Err(CodecChainCreateError::MultipleArrayToBytesCodecs(
                            existing.identifier().to_string(),
                            codec.identifier().to_string(),
                        ));
                    }
                    array_to_bytes = Some(codec);
                }
                Codec::BytesToBytes(codec) => {
                    if array_to_bytes.is_none() {
                        return Err(CodecChainCreateError::CodecOutOfOrder(
                            codec.identifier().to_string(),
                        ));
                    }
                    bytes_to_bytes.push(codec);
                }
            }
        }

        array_to_bytes.map_or(
            Err(CodecChainCreateError::MissingArrayToBytesCodec),
            |array_to_bytes| Ok(Self::new(array_to_array, array_to_bytes, bytes_to_bytes)),
        )
    }

    /// Create codec chain metadata.
    #[must_use]
    pub fn create_metadatas(&self) -> Vec<MetadataV3> {
        let mut metadatas =
            Vec::with_capacity(self.array_to_array.len() + 1 + self.bytes_to_bytes.len());
        for codec in &self.array_to_array {
            metadatas.push(codec.create_metadata());
        }
        metadatas.push(self.array_to_bytes.create_metadata());
        for codec in &self.bytes_to_bytes {
            metadatas.push(codec.create_metadata());
        }
        metadatas
    }

    /// Get the `array -> array` codecs.
    #[must_use]
    pub fn array_to_array_codecs(&self) -> &[Box<dyn ArrayToArrayCodecTraits>] {
        &self.array_to_array
    }

    /// Get the `array -> bytes` codec.
    #[allow(clippy::borrowed_box)]
    #[must_use]
    pub fn array_to_bytes_codec(&self) -> &Box<dyn ArrayToBytesCodecTraits> {
        &self.array_to_bytes
    }

    /// Get the `bytes -> bytes` codecs.
    #[must_use]
    pub fn bytes_to_bytes_codecs(&self) -> &[Box<dyn BytesToBytesCodecTraits>] {
        &self.bytes_to_bytes
    }

    /// Return the representations through the `array -> array` stages, starting with
    /// `decoded_representation` and ending with the representation seen by the
    /// `array -> bytes` codec.
    fn array_representations(
        &self,
        decoded_representation: ArrayRepresentation,
    ) -> Result<Vec<ArrayRepresentation>, CodecError> {
        let mut representations = Vec::with_capacity(self.array_to_array.len() + 1);
        representations.push(decoded_representation);
        for codec in &self.array_to_array {
            representations
                .push(codec.compute_encoded_representation(representations.last().unwrap())?);
        }
        Ok(representations)
    }

    /// Encode a decoded array of `decoded_representation` into bytes.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if any codec fails.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if decoded_value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                decoded_value.len(),
                decoded_representation.size(),
            ));
        }

        let representations = self.array_representations(decoded_representation.clone())?;

        let mut value = decoded_value;
        for (codec, representation) in std::iter::zip(&self.array_to_array, &representations) {
            value = codec.encode(value, representation)?;
        }
        value = self
            .array_to_bytes
            .encode(value, representations.last().unwrap())?;
        for codec in &self.bytes_to_bytes {
            value = codec.encode(value)?;
        }
        Ok(value)
    }

    /// Decode bytes into an array of `decoded_representation`.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if any codec fails.
    pub fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let representations = self.array_representations(decoded_representation.clone())?;

        let mut value = encoded_value;
        for codec in self.bytes_to_bytes.iter().rev() {
            value = codec.decode(value)?;
        }
        value = self
            .array_to_bytes
            .decode(value, representations.last().unwrap())?;
        for (codec, representation) in std::iter::zip(
            self.array_to_array.iter().rev(),
            representations.iter().rev().skip(1),
        ) {
            value = codec.decode(value, representation)?;
        }
        Ok(value)
    }
}
