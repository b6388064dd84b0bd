//! Zarr V2 metadata (read-only support).
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html>.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::array::{chunk_key_encoding::ChunkKeySeparator, ArrayShape};

/// Zarr V2 codec metadata: a numcodecs identifier with flattened configuration.
///
/// For example:
/// ```json
/// { "id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1 }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct MetadataV2 {
    id: String,
    #[serde(flatten)]
    configuration: serde_json::Map<String, serde_json::Value>,
}

impl MetadataV2 {
    /// Return the numcodecs identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the configuration (all fields except `id`).
    #[must_use]
    pub const fn configuration(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.configuration
    }
}

/// Zarr array metadata (storage specification v2, the `.zarray` document).
///
/// An example `JSON` document for a Zarr V2 array:
/// ```json
/// {
///     "chunks": [1000, 1000],
///     "compressor": {
///         "id": "blosc",
///         "cname": "lz4",
///         "clevel": 5,
///         "shuffle": 1
///     },
///     "dtype": "<f8",
///     "fill_value": "NaN",
///     "filters": null,
///     "order": "C",
///     "shape": [10000, 10000],
///     "zarr_format": 2
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ArrayMetadataV2 {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// An array of integers providing the length of each dimension of the Zarr array.
    pub shape: ArrayShape,
    /// A list of integers defining the length of each dimension of a chunk of the array.
    pub chunks: ArrayShape,
    /// The data type of the Zarr array (e.g. `<i4`, `>f8`, `|b1`).
    pub dtype: String,
    /// The primary compression codec, or null if no compressor is to be used.
    pub compressor: Option<MetadataV2>,
    /// The default value to use for uninitialized portions of the array, or null if no fill value is to be used.
    pub fill_value: FillValueMetadataV2,
    /// Either "C" or "F", defining the layout of bytes within each chunk of the array.
    pub order: ArrayMetadataV2Order,
    /// A list of codec configurations, or null if no filters are to be applied.
    #[serde(default)]
    pub filters: Option<Vec<MetadataV2>>,
    /// If present, either the string "." or "/" defining the separator placed between the dimensions of a chunk.
    #[serde(default = "chunk_key_separator_default_zarr_v2")]
    pub dimension_separator: ChunkKeySeparator,
    /// User defined attributes merged from a separate `.zattrs` document.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

const fn chunk_key_separator_default_zarr_v2() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

/// Zarr group metadata (storage specification v2, the `.zgroup` document).
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct GroupMetadataV2 {
    /// An integer defining the version of the storage specification to which the group adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// User defined attributes merged from a separate `.zattrs` document.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Default for GroupMetadataV2 {
    fn default() -> Self {
        Self {
            zarr_format: monostate::MustBe!(2u64),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Zarr V2 consolidated metadata (the `.zmetadata` document at the store root).
///
/// ```json
/// {
///     "zarr_consolidated_format": 1,
///     "metadata": {
///         ".zgroup": { "zarr_format": 2 },
///         "latitude/.zarray": { ... },
///         "latitude/.zattrs": { ... }
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ConsolidatedMetadataV2 {
    /// An integer defining the consolidated metadata format version. Must be `1`.
    pub zarr_consolidated_format: monostate::MustBe!(1u64),
    /// A mapping from relative metadata keys (`<node>/.zgroup|.zarray|.zattrs`) to documents.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The fill value of a Zarr V2 array: a number, a non-finite float string, or null.
#[derive(Clone, PartialEq, Debug)]
pub enum FillValueMetadataV2 {
    /// No fill value.
    Null,
    /// NaN (not-a-number).
    NaN,
    /// Positive infinity.
    Infinity,
    /// Negative infinity.
    NegInfinity,
    /// A number.
    Number(serde_json::Number),
}

impl<'de> serde::Deserialize<'de> for FillValueMetadataV2 {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum FillValueMetadataV2Type {
            String(String),
            Number(serde_json::Number),
            Null,
        }
        let fill_value = FillValueMetadataV2Type::deserialize(d)?;
        match fill_value {
            FillValueMetadataV2Type::String(string) => match string.as_str() {
                "NaN" => Ok(Self::NaN),
                "Infinity" => Ok(Self::Infinity),
                "-Infinity" => Ok(Self::NegInfinity),
                _ => Err(serde::de::Error::custom("unsupported fill value")),
            },
            FillValueMetadataV2Type::Number(number) => Ok(Self::Number(number)),
            FillValueMetadataV2Type::Null => Ok(Self::Null),
        }
    }
}

impl Serialize for FillValueMetadataV2 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::NaN => serializer.serialize_str("NaN"),
            Self::Infinity => serializer.serialize_str("Infinity"),
            Self::NegInfinity => serializer.serialize_str("-Infinity"),
            Self::Number(number) => number.serialize(serializer),
        }
    }
}

/// The layout of bytes within each chunk of the array.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub enum ArrayMetadataV2Order {
    /// Row-major order. The last dimension varies fastest.
    C,
    /// Column-major order. The first dimension varies fastest.
    F,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_metadata_v2() {
        let json = r#"{
            "chunks": [1000, 1000],
            "compressor": {
                "id": "blosc",
                "cname": "lz4",
                "clevel": 5,
                "shuffle": 1
            },
            "dtype": "<f8",
            "fill_value": "NaN",
            "filters": null,
            "order": "C",
            "shape": [10000, 10000],
            "zarr_format": 2
        }"#;
        let metadata: ArrayMetadataV2 = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.dtype, "<f8");
        assert_eq!(metadata.order, ArrayMetadataV2Order::C);
        assert_eq!(metadata.dimension_separator, ChunkKeySeparator::Dot);
        let compressor = metadata.compressor.unwrap();
        assert_eq!(compressor.id(), "blosc");
        assert_eq!(
            compressor.configuration().get("shuffle").unwrap().as_u64(),
            Some(1)
        );
        assert_eq!(metadata.fill_value, FillValueMetadataV2::NaN);
    }

    #[test]
    fn consolidated_metadata_v2() {
        let json = r#"{
            "zarr_consolidated_format": 1,
            "metadata": {
                ".zgroup": { "zarr_format": 2 },
                "latitude/.zarray": {
                    "chunks": [720],
                    "compressor": null,
                    "dtype": "<f8",
                    "fill_value": null,
                    "filters": null,
                    "order": "C",
                    "shape": [720],
                    "zarr_format": 2
                }
            }
        }"#;
        let consolidated: ConsolidatedMetadataV2 = serde_json::from_str(json).unwrap();
        assert_eq!(consolidated.metadata.len(), 2);
        assert!(consolidated.metadata.contains_key("latitude/.zarray"));
    }

    #[test]
    fn fill_value_v2_null() {
        let fill_value: FillValueMetadataV2 = serde_json::from_str("null").unwrap();
        assert_eq!(fill_value, FillValueMetadataV2::Null);
    }
}
