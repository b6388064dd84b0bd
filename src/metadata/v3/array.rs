use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use super::MetadataV3;
use crate::array::ArrayShape;

/// Zarr array metadata (storage specification v3).
///
/// An example `JSON` document for a Zarr V3 array:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "array",
///     "shape": [10000, 1000],
///     "data_type": "float64",
///     "chunk_grid": {
///         "name": "regular",
///         "configuration": {
///             "chunk_shape": [1000, 100]
///         }
///     },
///     "chunk_key_encoding": {
///         "name": "default",
///         "configuration": {
///             "separator": "/"
///         }
///     },
///     "codecs": [{
///         "name": "gzip",
///         "configuration": {
///             "level": 1
///         }
///     }],
///     "fill_value": "NaN",
///     "attributes": {
///         "foo": 42
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadataV3 {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// A string defining the type of hierarchy node element, must be `array` here.
    pub node_type: monostate::MustBe!("array"),
    /// An array of integers providing the length of each dimension of the Zarr array.
    pub shape: ArrayShape,
    /// The data type of the Zarr array.
    pub data_type: MetadataV3,
    /// The chunk grid of the Zarr array.
    pub chunk_grid: MetadataV3,
    /// The mapping from chunk grid cell coordinates to keys in the underlying store.
    pub chunk_key_encoding: MetadataV3,
    /// Provides an element value to use for uninitialised portions of the Zarr array.
    pub fill_value: FillValueMetadata,
    /// Specifies a list of codecs to be used for encoding and decoding chunks.
    pub codecs: Vec<MetadataV3>,
    /// Optional user defined attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArrayMetadataV3 {
    /// Create new Zarr V3 array metadata.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        data_type: MetadataV3,
        chunk_grid: MetadataV3,
        chunk_key_encoding: MetadataV3,
        fill_value: FillValueMetadata,
        codecs: Vec<MetadataV3>,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            zarr_format: monostate::MustBe!(3u64),
            node_type: monostate::MustBe!("array"),
            shape,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            attributes,
        }
    }
}

/// Fill value metadata.
///
/// The interpretation of a fill value is data type dependent, handled in
/// [`DataType::fill_value_from_metadata`](crate::array::DataType::fill_value_from_metadata).
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[serde(untagged)]
pub enum FillValueMetadata {
    /// A boolean value.
    Bool(bool),
    /// An unsigned integer.
    UInt(u64),
    /// A signed integer.
    Int(i64),
    /// A float.
    Float(FillValueFloat),
    /// An unsupported fill value.
    Unsupported(serde_json::Value),
}

impl TryFrom<&str> for FillValueMetadata {
    type Error = serde_json::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(s)
    }
}

/// A float fill value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, From, Display)]
#[serde(untagged)]
pub enum FillValueFloat {
    /// A float number.
    Float(f64),
    /// A hex string specifying the byte representation of the floating point number as an unsigned integer.
    HexString(HexString),
    /// A string representation of a non finite value.
    NonFinite(FillValueFloatStringNonFinite),
}

/// A hex string.
#[derive(Debug, Clone, Eq, PartialEq, From)]
pub struct HexString(Vec<u8>);

impl HexString {
    /// Create a new [`HexString`].
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Return the hex string as a big endian byte slice.
    #[must_use]
    pub fn as_be_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for HexString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", bytes_to_hex_string(&self.0))
    }
}

fn bytes_to_hex_string(v: &[u8]) -> String {
    let mut string = String::with_capacity(2 + v.len() * 2);
    string.push('0');
    string.push('x');
    for byte in v {
        string.push(char::from_digit((byte / 16).into(), 16).unwrap());
        string.push(char::from_digit((byte % 16).into(), 16).unwrap());
    }
    string
}

fn hex_string_to_be_bytes(s: &str) -> Option<Vec<u8>> {
    if s.starts_with("0x") && s.len() % 2 == 0 {
        (2..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16))
            .collect::<Result<Vec<_>, _>>()
            .ok()
    } else {
        None
    }
}

impl serde::Serialize for HexString {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&bytes_to_hex_string(&self.0))
    }
}

impl<'de> serde::Deserialize<'de> for HexString {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Self(hex_string_to_be_bytes(&s).ok_or_else(|| {
            serde::de::Error::custom("not a valid hex string")
        })?))
    }
}

/// A string representation of a non finite value.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Display)]
pub enum FillValueFloatStringNonFinite {
    /// Positive infinity.
    #[serde(rename = "Infinity")]
    PosInfinity,
    /// Negative infinity.
    #[serde(rename = "-Infinity")]
    NegInfinity,
    /// NaN (not-a-number).
    #[serde(rename = "NaN")]
    NaN,
}

impl FillValueFloat {
    /// Convert the float fill value to an `f64`.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Float(float) => Some(*float),
            Self::HexString(hex_string) => {
                let bytes = hex_string.as_be_bytes();
                bytes.try_into().ok().map(f64::from_be_bytes)
            }
            Self::NonFinite(nonfinite) => {
                use FillValueFloatStringNonFinite as NF;
                Some(match nonfinite {
                    NF::PosInfinity => f64::INFINITY,
                    NF::NegInfinity => f64::NEG_INFINITY,
                    NF::NaN => f64::NAN,
                })
            }
        }
    }

    /// Convert the float fill value to an `f32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32(&self) -> Option<f32> {
        match self {
            Self::Float(float) => Some(*float as f32),
            Self::HexString(hex_string) => {
                let bytes = hex_string.as_be_bytes();
                bytes.try_into().ok().map(f32::from_be_bytes)
            }
            Self::NonFinite(nonfinite) => {
                use FillValueFloatStringNonFinite as NF;
                Some(match nonfinite {
                    NF::PosInfinity => f32::INFINITY,
                    NF::NegInfinity => f32::NEG_INFINITY,
                    NF::NaN => f32::NAN,
                })
            }
        }
    }
}

impl FillValueMetadata {
    /// Convert the fill value to a [`bool`].
    #[must_use]
    pub const fn try_as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(bool) => Some(*bool),
            _ => None,
        }
    }

    /// Convert the fill value to a signed integer.
    #[must_use]
    pub fn try_as_int<T: TryFrom<i64> + TryFrom<u64>>(&self) -> Option<T> {
        match self {
            Self::Int(int) => T::try_from(*int).ok(),
            Self::UInt(uint) => T::try_from(*uint).ok(),
            _ => None,
        }
    }

    /// Convert the fill value to an unsigned integer.
    #[must_use]
    pub fn try_as_uint<T: TryFrom<i64> + TryFrom<u64>>(&self) -> Option<T> {
        match self {
            Self::Int(int) => T::try_from(*int).ok(),
            Self::UInt(uint) => T::try_from(*uint).ok(),
            _ => None,
        }
    }

    /// Convert the fill value to an `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn try_as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(int) => Some(*int as f64),
            Self::UInt(uint) => Some(*uint as f64),
            Self::Float(float) => float.to_f64(),
            _ => None,
        }
    }

    /// Convert the fill value to an `f32`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn try_as_f32(&self) -> Option<f32> {
        match self {
            Self::Int(int) => Some(*int as f32),
            Self::UInt(uint) => Some(*uint as f32),
            Self::Float(float) => float.to_f32(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_metadata_round_trip() {
        let json = r#"{
            "zarr_format": 3,
            "node_type": "array",
            "shape": [10000, 1000],
            "data_type": "float64",
            "chunk_grid": {
                "name": "regular",
                "configuration": { "chunk_shape": [1000, 100] }
            },
            "chunk_key_encoding": {
                "name": "default",
                "configuration": { "separator": "/" }
            },
            "codecs": [{ "name": "bytes", "configuration": { "endian": "little" } }],
            "fill_value": "NaN",
            "attributes": { "foo": 42 }
        }"#;
        let metadata: ArrayMetadataV3 = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.shape, vec![10000, 1000]);
        assert_eq!(metadata.data_type.name(), "float64");
        assert!(matches!(
            metadata.fill_value,
            FillValueMetadata::Float(FillValueFloat::NonFinite(
                FillValueFloatStringNonFinite::NaN
            ))
        ));
        let serialized = serde_json::to_string(&metadata).unwrap();
        let metadata2: ArrayMetadataV3 = serde_json::from_str(&serialized).unwrap();
        assert_eq!(metadata, metadata2);
    }

    #[test]
    fn array_metadata_wrong_node_type() {
        let json = r#"{
            "zarr_format": 3,
            "node_type": "group"
        }"#;
        assert!(serde_json::from_str::<ArrayMetadataV3>(json).is_err());
    }

    #[test]
    fn fill_value_metadata() {
        let fill_value: FillValueMetadata = serde_json::from_str("255").unwrap();
        assert_eq!(fill_value.try_as_uint::<u64>(), Some(255));
        let fill_value: FillValueMetadata = serde_json::from_str("-100").unwrap();
        assert_eq!(fill_value.try_as_int::<i64>(), Some(-100));
        let fill_value: FillValueMetadata = serde_json::from_str("\"NaN\"").unwrap();
        assert!(fill_value.try_as_f64().unwrap().is_nan());
        let fill_value: FillValueMetadata = serde_json::from_str("\"0x7fc00000\"").unwrap();
        assert!(fill_value.try_as_f32().unwrap().is_nan());
        let fill_value: FillValueMetadata = serde_json::from_str("false").unwrap();
        assert_eq!(fill_value.try_as_bool(), Some(false));
    }
}
