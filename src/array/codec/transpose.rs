//! The `transpose` array to array codec.
//!
//! Permutes the dimensions of chunks. The canonical on-disk layout keeps dimension 0 outermost;
//! an array stored by a column-major writer carries a transpose codec with a reversed order so that
//! readers recover the logical layout.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/transpose/v1.0.html>.

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array::{ArrayRepresentation, ArrayShape},
    array_subset::ArraySubset,
    metadata::v3::MetadataV3,
    plugin::PluginCreateError,
};

use super::{ArrayCodecTraits, ArrayToArrayCodecTraits, CodecError, CodecTraits};

/// The identifier for the `transpose` codec.
pub const IDENTIFIER: &str = "transpose";

/// A wrapper to handle various versions of `transpose` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum TransposeCodecConfiguration {
    /// Version 1.0.
    V1(TransposeCodecConfigurationV1),
}

/// Configuration parameters for the `transpose` codec (version 1.0).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct TransposeCodecConfigurationV1 {
    /// The permutation order of the dimensions.
    pub order: TransposeOrder,
}

/// A permutation of `0..n` defining the transpose order.
///
/// The encoded output dimension `i` corresponds to the decoded input dimension `order[i]`.
#[derive(Serialize, Clone, Eq, PartialEq, Debug)]
pub struct TransposeOrder(Vec<usize>);

/// An invalid permutation order error.
#[derive(Clone, Debug, Error)]
#[error("permutation order {0:?} is invalid")]
pub struct InvalidPermutationError(Vec<usize>);

impl TransposeOrder {
    /// Create a new [`TransposeOrder`].
    ///
    /// # Errors
    /// Returns [`InvalidPermutationError`] if `order` is not a permutation of `0..order.len()` of
    /// at least two dimensions.
    pub fn new(order: &[usize]) -> Result<Self, InvalidPermutationError> {
        if Self::validate(order) {
            Ok(Self(order.to_vec()))
        } else {
            Err(InvalidPermutationError(order.to_vec()))
        }
    }

    /// Create a reversed order (`n-1, ..., 1, 0`) of `dimensionality` dimensions.
    ///
    /// # Errors
    /// Returns [`InvalidPermutationError`] if `dimensionality` is below two.
    pub fn new_reversed(dimensionality: usize) -> Result<Self, InvalidPermutationError> {
        Self::new(&(0..dimensionality).rev().collect::<Vec<_>>())
    }

    fn validate(order: &[usize]) -> bool {
        let mut seen = vec![false; order.len()];
        order.len() >= 2
            && order.iter().all(|&d| {
                if d < order.len() && !seen[d] {
                    seen[d] = true;
                    true
                } else {
                    false
                }
            })
    }

    /// Return the permutation order.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Return the dimensionality of the permutation.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }

    /// Returns [`true`] if the order is the identity permutation.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &d)| i == d)
    }

    /// Return the inverse permutation.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.0.len()];
        for (i, &d) in self.0.iter().enumerate() {
            inverse[d] = i;
        }
        Self(inverse)
    }
}

impl<'de> serde::Deserialize<'de> for TransposeOrder {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let order = Vec::<usize>::deserialize(d)?;
        Self::new(&order).map_err(|err| serde::de::Error::custom(err.to_string()))
    }
}

/// A `transpose` codec implementation.
#[derive(Clone, Debug)]
pub struct TransposeCodec {
    order: TransposeOrder,
}

impl TransposeCodec {
    /// Create a new `transpose` codec.
    #[must_use]
    pub const fn new(order: TransposeOrder) -> Self {
        Self { order }
    }

    /// Create a new `transpose` codec from configuration.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if there is a configuration issue.
    pub fn new_with_configuration(
        configuration: &TransposeCodecConfiguration,
    ) -> Result<Self, PluginCreateError> {
        let TransposeCodecConfiguration::V1(configuration) = configuration;
        Ok(Self::new(configuration.order.clone()))
    }

    /// Return the permutation order.
    #[must_use]
    pub fn order(&self) -> &TransposeOrder {
        &self.order
    }
}

fn permute<T: Copy>(v: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| v[i]).collect()
}

/// Transpose `bytes`, an array of `input_shape` with `element_size`, by `order`.
///
/// The output is an array of shape `permute(input_shape, order)` where the output index along
/// dimension `k` addresses input dimension `order[k]`.
fn transpose_array(
    order: &[usize],
    input_shape: &[u64],
    element_size: usize,
    bytes: &[u8],
) -> Vec<u8> {
    let mut input_strides = vec![1_u64; input_shape.len()];
    for d in (0..input_shape.len().saturating_sub(1)).rev() {
        input_strides[d] = input_strides[d + 1] * input_shape[d + 1];
    }

    let output_shape: ArrayShape = permute(input_shape, order);
    let mut out = vec![0_u8; bytes.len()];
    let output_subset = ArraySubset::new_with_shape(output_shape);
    for (output_element, output_indices) in (&output_subset.indices()).into_iter().enumerate() {
        let mut input_element = 0;
        for (output_index, &input_dimension) in std::iter::zip(&output_indices, order) {
            input_element += output_index * input_strides[input_dimension];
        }
        let input_offset = usize::try_from(input_element).unwrap() * element_size;
        let output_offset = output_element * element_size;
        out[output_offset..output_offset + element_size]
            .copy_from_slice(&bytes[input_offset..input_offset + element_size]);
    }
    out
}

impl CodecTraits for TransposeCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> MetadataV3 {
        let configuration = TransposeCodecConfigurationV1 {
            order: self.order.clone(),
        };
        MetadataV3::new_with_serializable_configuration(IDENTIFIER, &configuration).unwrap()
    }
}

impl ArrayCodecTraits for TransposeCodec {
    fn encode(
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
        if self.order.dimensionality() != decoded_representation.dimensionality() {
            return Err(CodecError::Other(format!(
                "transpose order {:?} is incompatible with an array of dimensionality {}",
                self.order.as_slice(),
                decoded_representation.dimensionality()
            )));
        }
        if self.order.is_identity() {
            return Ok(decoded_value);
        }
        Ok(transpose_array(
            self.order.as_slice(),
            decoded_representation.shape(),
            decoded_representation.element_size(),
            &decoded_value,
        ))
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                encoded_value.len(),
                decoded_representation.size(),
            ));
        }
        if self.order.is_identity() {
            return Ok(encoded_value);
        }
        let transposed_shape = permute(decoded_representation.shape(), self.order.as_slice());
        Ok(transpose_array(
            self.order.inverse().as_slice(),
            &transposed_shape,
            decoded_representation.element_size(),
            &encoded_value,
        ))
    }
}

impl ArrayToArrayCodecTraits for TransposeCodec {
    fn compute_encoded_representation(
        &self,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<ArrayRepresentation, CodecError> {
        if self.order.dimensionality() != decoded_representation.dimensionality() {
            return Err(CodecError::Other(format!(
                "transpose order {:?} is incompatible with an array of dimensionality {}",
                self.order.as_slice(),
                decoded_representation.dimensionality()
            )));
        }
        Ok(ArrayRepresentation::new(
            permute(decoded_representation.shape(), self.order.as_slice()),
            decoded_representation.data_type(),
            decoded_representation.fill_value().clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::array::{DataType, FillValue};

    use super::*;

    #[test]
    fn transpose_order_validity() {
        assert!(TransposeOrder::new(&[0, 1, 2]).is_ok());
        assert!(TransposeOrder::new(&[2, 0, 1]).is_ok());
        assert!(TransposeOrder::new(&[0]).is_err());
        assert!(TransposeOrder::new(&[0, 0]).is_err());
        assert!(TransposeOrder::new(&[0, 2]).is_err());
        assert!(TransposeOrder::new_reversed(3).unwrap().as_slice() == [2, 1, 0]);
        assert!(TransposeOrder::new(&[1, 0]).unwrap().inverse().as_slice() == [1, 0]);
        assert!(TransposeOrder::new(&[2, 0, 1]).unwrap().inverse().as_slice() == [1, 2, 0]);
    }

    #[test]
    fn codec_transpose_round_trip() {
        let representation = ArrayRepresentation::new(
            vec![2, 3, 4],
            DataType::UInt16,
            FillValue::from(0_u16),
        );
        let elements: Vec<u16> = (0..24).collect();
        let bytes: Vec<u8> = elements.iter().flat_map(|e| e.to_ne_bytes()).collect();

        let codec = TransposeCodec::new(TransposeOrder::new(&[2, 1, 0]).unwrap());
        let encoded = codec.encode(bytes.clone(), &representation).unwrap();
        assert_ne!(encoded, bytes);
        let decoded = codec.decode(encoded, &representation).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn codec_transpose_2d_swap() {
        // 2x3 u8 array [[0,1,2],[3,4,5]] -> transposed 3x2 [[0,3],[1,4],[2,5]]
        let representation =
            ArrayRepresentation::new(vec![2, 3], DataType::UInt8, FillValue::from(0_u8));
        let codec = TransposeCodec::new(TransposeOrder::new(&[1, 0]).unwrap());
        let encoded = codec
            .encode(vec![0, 1, 2, 3, 4, 5], &representation)
            .unwrap();
        assert_eq!(encoded, vec![0, 3, 1, 4, 2, 5]);
        let decoded = codec.decode(encoded, &representation).unwrap();
        assert_eq!(decoded, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn codec_transpose_identity_is_noop() {
        let representation =
            ArrayRepresentation::new(vec![2, 2], DataType::UInt8, FillValue::from(0_u8));
        let codec = TransposeCodec::new(TransposeOrder::new(&[0, 1]).unwrap());
        let encoded = codec.encode(vec![0, 1, 2, 3], &representation).unwrap();
        assert_eq!(encoded, vec![0, 1, 2, 3]);
    }

    #[test]
    fn codec_transpose_configuration() {
        let configuration: TransposeCodecConfiguration =
            serde_json::from_str(r#"{"order":[2,1,0]}"#).unwrap();
        let codec = TransposeCodec::new_with_configuration(&configuration).unwrap();
        let metadata = codec.create_metadata();
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"name":"transpose","configuration":{"order":[2,1,0]}}"#
        );
        assert!(serde_json::from_str::<TransposeCodecConfiguration>(r#"{"order":[0,0]}"#).is_err());
    }
}
