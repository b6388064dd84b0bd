//! Conversion of Zarr V2 metadata to the V3 representation.

use serde::Deserialize;
use thiserror::Error;

use crate::array::{
    chunk_grid::{self, RegularChunkGridConfiguration},
    chunk_key_encoding::{self, V2ChunkKeyEncodingConfiguration},
    codec::{
        blosc, bytes, gzip, transpose, zstd, BloscCodecConfigurationV1, BloscCompressionLevel,
        BloscCompressor, BloscShuffleMode, BytesCodecConfigurationV1, Endianness,
        GzipCodecConfigurationV1, TransposeCodecConfigurationV1, TransposeOrder,
        ZstdCodecConfigurationV1,
    },
    DataType,
};

use super::{
    v2::{ArrayMetadataV2, ArrayMetadataV2Order, FillValueMetadataV2, GroupMetadataV2, MetadataV2},
    v3::{
        ArrayMetadataV3, FillValueFloat, FillValueFloatStringNonFinite, FillValueMetadata,
        GroupMetadataV3, MetadataV3,
    },
};

/// An error converting Zarr V2 array metadata to V3.
#[derive(Debug, Error)]
pub enum ArrayMetadataV2ToV3ConversionError {
    /// Unsupported data type.
    #[error("unsupported data type {_0:?}")]
    UnsupportedDataType(String),
    /// An unsupported codec.
    #[error("unsupported codec {_0} with configuration {_1:?}")]
    UnsupportedCodec(String, serde_json::Map<String, serde_json::Value>),
    /// Filters are not supported.
    #[error("filters are not supported: {_0:?}")]
    UnsupportedFilters(Vec<String>),
    /// An unsupported fill value.
    #[error("unsupported fill value {_1:?} for data type {_0}")]
    UnsupportedFillValue(String, FillValueMetadataV2),
    /// Serialization/deserialization error.
    #[error("JSON serialization or deserialization error: {_0}")]
    SerdeError(#[from] serde_json::Error),
    /// Other.
    #[error("{_0}")]
    Other(String),
}

/// Convert Zarr V2 group metadata to V3.
#[must_use]
pub fn group_metadata_v2_to_v3(group_metadata_v2: &GroupMetadataV2) -> GroupMetadataV3 {
    GroupMetadataV3::new(group_metadata_v2.attributes.clone())
}

/// Convert a Zarr V2 data type string (e.g. `<i4`, `>f8`, `|b1`) to a V3 data type and endianness.
///
/// # Errors
/// Returns an [`ArrayMetadataV2ToV3ConversionError`] if the data type is not supported.
pub fn data_type_metadata_v2_to_v3(
    dtype: &str,
) -> Result<(DataType, Option<Endianness>), ArrayMetadataV2ToV3ConversionError> {
    let unsupported = || ArrayMetadataV2ToV3ConversionError::UnsupportedDataType(dtype.to_string());

    let mut chars = dtype.chars();
    let endianness = match chars.next().ok_or_else(unsupported)? {
        '|' => None,
        '<' => Some(Endianness::Little),
        '>' => Some(Endianness::Big),
        _ => return Err(unsupported()),
    };
    let data_type = match &dtype[1..] {
        "b1" => DataType::Bool,
        "i1" => DataType::Int8,
        "i2" => DataType::Int16,
        "i4" => DataType::Int32,
        "i8" => DataType::Int64,
        "u1" => DataType::UInt8,
        "u2" => DataType::UInt16,
        "u4" => DataType::UInt32,
        "u8" => DataType::UInt64,
        "f4" => DataType::Float32,
        "f8" => DataType::Float64,
        _ => return Err(unsupported()),
    };
    Ok((data_type, endianness))
}

/// Convert Zarr V2 fill value metadata to [`FillValueMetadata`].
///
/// Returns [`None`] for [`FillValueMetadataV2::Null`], which means the fill value is unspecified.
#[must_use]
pub fn fill_value_metadata_v2_to_v3(fill_value: &FillValueMetadataV2) -> Option<FillValueMetadata> {
    match fill_value {
        FillValueMetadataV2::Null => None,
        FillValueMetadataV2::NaN => Some(FillValueMetadata::Float(FillValueFloat::NonFinite(
            FillValueFloatStringNonFinite::NaN,
        ))),
        FillValueMetadataV2::Infinity => Some(FillValueMetadata::Float(FillValueFloat::NonFinite(
            FillValueFloatStringNonFinite::PosInfinity,
        ))),
        FillValueMetadataV2::NegInfinity => Some(FillValueMetadata::Float(
            FillValueFloat::NonFinite(FillValueFloatStringNonFinite::NegInfinity),
        )),
        FillValueMetadataV2::Number(number) => {
            if let Some(u) = number.as_u64() {
                Some(FillValueMetadata::UInt(u))
            } else if let Some(i) = number.as_i64() {
                Some(FillValueMetadata::Int(i))
            } else if let Some(f) = number.as_f64() {
                Some(FillValueMetadata::Float(FillValueFloat::Float(f)))
            } else {
                unreachable!("number must be convertible to u64, i64 or f64")
            }
        }
    }
}

/// The numcodecs `blosc` configuration carried by Zarr V2 compressor metadata.
#[derive(Deserialize, Debug)]
struct BloscConfigurationNumcodecs {
    cname: BloscCompressor,
    clevel: BloscCompressionLevel,
    /// -1 auto, 0 none, 1 byte, 2 bit
    shuffle: i64,
    #[serde(default)]
    blocksize: usize,
}

fn codec_blosc_v2_numcodecs_to_v3(
    compressor: &MetadataV2,
    data_type: DataType,
) -> Result<BloscCodecConfigurationV1, ArrayMetadataV2ToV3ConversionError> {
    let configuration: BloscConfigurationNumcodecs =
        serde_json::from_value(serde_json::Value::Object(compressor.configuration().clone()))?;
    let shuffle = match configuration.shuffle {
        0 => BloscShuffleMode::NoShuffle,
        1 => BloscShuffleMode::Shuffle,
        2 => BloscShuffleMode::BitShuffle,
        -1 => BloscShuffleMode::default_for_data_type(data_type),
        _ => {
            return Err(ArrayMetadataV2ToV3ConversionError::UnsupportedCodec(
                compressor.id().to_string(),
                compressor.configuration().clone(),
            ))
        }
    };
    Ok(BloscCodecConfigurationV1 {
        cname: configuration.cname,
        clevel: configuration.clevel,
        shuffle,
        typesize: Some(data_type.size()),
        blocksize: configuration.blocksize,
    })
}

/// Convert Zarr V2 array metadata to V3.
///
/// # Errors
/// Returns an [`ArrayMetadataV2ToV3ConversionError`] if the metadata is invalid or is not
/// compatible with Zarr V3 metadata.
pub fn array_metadata_v2_to_v3(
    array_metadata_v2: &ArrayMetadataV2,
) -> Result<ArrayMetadataV3, ArrayMetadataV2ToV3ConversionError> {
    let shape = array_metadata_v2.shape.clone();
    let chunk_grid = MetadataV3::new_with_serializable_configuration(
        chunk_grid::IDENTIFIER,
        &RegularChunkGridConfiguration {
            chunk_shape: array_metadata_v2.chunks.clone(),
        },
    )?;

    let (data_type, endianness) = data_type_metadata_v2_to_v3(&array_metadata_v2.dtype)?;

    // an unspecified fill value falls back to the data type default
    let fill_value = fill_value_metadata_v2_to_v3(&array_metadata_v2.fill_value)
        .or_else(|| data_type.metadata_fill_value(&data_type.default_fill_value()))
        .ok_or_else(|| {
            ArrayMetadataV2ToV3ConversionError::UnsupportedFillValue(
                data_type.to_string(),
                array_metadata_v2.fill_value.clone(),
            )
        })?;

    if let Some(filters) = &array_metadata_v2.filters {
        if !filters.is_empty() {
            return Err(ArrayMetadataV2ToV3ConversionError::UnsupportedFilters(
                filters.iter().map(|f| f.id().to_string()).collect(),
            ));
        }
    }

    let mut codecs: Vec<MetadataV3> = vec![];

    // column-major storage is expressed with a transpose codec
    if array_metadata_v2.order == ArrayMetadataV2Order::F && shape.len() >= 2 {
        let order = TransposeOrder::new_reversed(shape.len())
            .map_err(|err| ArrayMetadataV2ToV3ConversionError::Other(err.to_string()))?;
        codecs.push(MetadataV3::new_with_serializable_configuration(
            transpose::IDENTIFIER,
            &TransposeCodecConfigurationV1 { order },
        )?);
    }

    codecs.push(MetadataV3::new_with_serializable_configuration(
        bytes::IDENTIFIER,
        &BytesCodecConfigurationV1 { endian: endianness },
    )?);

    if let Some(compressor) = &array_metadata_v2.compressor {
        let codec = match compressor.id() {
            blosc::IDENTIFIER => MetadataV3::new_with_serializable_configuration(
                blosc::IDENTIFIER,
                &codec_blosc_v2_numcodecs_to_v3(compressor, data_type)?,
            )?,
            gzip::IDENTIFIER => {
                let configuration: GzipCodecConfigurationV1 = serde_json::from_value(
                    serde_json::Value::Object(compressor.configuration().clone()),
                )?;
                MetadataV3::new_with_serializable_configuration(gzip::IDENTIFIER, &configuration)?
            }
            zstd::IDENTIFIER => {
                let configuration: ZstdCodecConfigurationV1 = serde_json::from_value(
                    serde_json::Value::Object(compressor.configuration().clone()),
                )?;
                MetadataV3::new_with_serializable_configuration(zstd::IDENTIFIER, &configuration)?
            }
            _ => {
                return Err(ArrayMetadataV2ToV3ConversionError::UnsupportedCodec(
                    compressor.id().to_string(),
                    compressor.configuration().clone(),
                ))
            }
        };
        codecs.push(codec);
    }

    let chunk_key_encoding = MetadataV3::new_with_serializable_configuration(
        chunk_key_encoding::V2_IDENTIFIER,
        &V2ChunkKeyEncodingConfiguration {
            separator: array_metadata_v2.dimension_separator,
        },
    )?;

    Ok(ArrayMetadataV3::new(
        shape,
        data_type.metadata(),
        chunk_grid,
        chunk_key_encoding,
        fill_value,
        codecs,
        array_metadata_v2.attributes.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_strings() {
        assert_eq!(
            data_type_metadata_v2_to_v3("<i4").unwrap(),
            (DataType::Int32, Some(Endianness::Little))
        );
        assert_eq!(
            data_type_metadata_v2_to_v3(">f8").unwrap(),
            (DataType::Float64, Some(Endianness::Big))
        );
        assert_eq!(
            data_type_metadata_v2_to_v3("|b1").unwrap(),
            (DataType::Bool, None)
        );
        assert_eq!(
            data_type_metadata_v2_to_v3("|u1").unwrap(),
            (DataType::UInt8, None)
        );
        assert!(data_type_metadata_v2_to_v3("<c16").is_err());
        assert!(data_type_metadata_v2_to_v3("i4").is_err());
        assert!(data_type_metadata_v2_to_v3("|S8").is_err());
    }

    #[test]
    fn array_v2_to_v3_with_blosc() {
        let json = r#"{
            "chunks": [1000, 100],
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
            "shape": [10000, 1000],
            "zarr_format": 2
        }"#;
        let metadata_v2: ArrayMetadataV2 = serde_json::from_str(json).unwrap();
        let metadata_v3 = array_metadata_v2_to_v3(&metadata_v2).unwrap();
        assert_eq!(metadata_v3.shape, vec![10000, 1000]);
        assert_eq!(metadata_v3.data_type.name(), "float64");
        assert_eq!(metadata_v3.chunk_key_encoding.name(), "v2");
        let codec_names: Vec<_> = metadata_v3.codecs.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(codec_names, vec!["bytes", "blosc"]);
        // typesize is derived from the data type
        let blosc_configuration = metadata_v3.codecs[1].configuration().unwrap();
        assert_eq!(
            blosc_configuration.get("typesize").unwrap().as_u64(),
            Some(8)
        );
    }

    #[test]
    fn array_v2_to_v3_f_order() {
        let json = r#"{
            "chunks": [10, 10],
            "compressor": null,
            "dtype": "<i4",
            "fill_value": 0,
            "filters": null,
            "order": "F",
            "shape": [100, 100],
            "zarr_format": 2
        }"#;
        let metadata_v2: ArrayMetadataV2 = serde_json::from_str(json).unwrap();
        let metadata_v3 = array_metadata_v2_to_v3(&metadata_v2).unwrap();
        let codec_names: Vec<_> = metadata_v3.codecs.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(codec_names, vec!["transpose", "bytes"]);
    }

    #[test]
    fn array_v2_to_v3_null_fill_value_uses_default() {
        let json = r#"{
            "chunks": [10],
            "compressor": null,
            "dtype": "<u2",
            "fill_value": null,
            "filters": null,
            "order": "C",
            "shape": [100],
            "zarr_format": 2
        }"#;
        let metadata_v2: ArrayMetadataV2 = serde_json::from_str(json).unwrap();
        let metadata_v3 = array_metadata_v2_to_v3(&metadata_v2).unwrap();
        assert_eq!(metadata_v3.fill_value.try_as_uint::<u64>(), Some(65535));
    }

    #[test]
    fn array_v2_to_v3_unsupported() {
        let json = r#"{
            "chunks": [10],
            "compressor": {"id": "zlib", "level": 5},
            "dtype": "<u2",
            "fill_value": 0,
            "filters": null,
            "order": "C",
            "shape": [100],
            "zarr_format": 2
        }"#;
        let metadata_v2: ArrayMetadataV2 = serde_json::from_str(json).unwrap();
        assert!(matches!(
            array_metadata_v2_to_v3(&metadata_v2),
            Err(ArrayMetadataV2ToV3ConversionError::UnsupportedCodec(_, _))
        ));

        let json = r#"{
            "chunks": [10],
            "compressor": null,
            "dtype": "<u2",
            "fill_value": 0,
            "filters": [{"id": "delta", "dtype": "<u2"}],
            "order": "C",
            "shape": [100],
            "zarr_format": 2
        }"#;
        let metadata_v2: ArrayMetadataV2 = serde_json::from_str(json).unwrap();
        assert!(matches!(
            array_metadata_v2_to_v3(&metadata_v2),
            Err(ArrayMetadataV2ToV3ConversionError::UnsupportedFilters(_))
        ));
    }
}
