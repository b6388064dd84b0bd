//! Zarr data types.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#data-types>.

use derive_more::From;
use thiserror::Error;

use crate::config::global_config;
use crate::metadata::v3::{FillValueFloat, FillValueFloatStringNonFinite, FillValueMetadata, MetadataV3};

use super::FillValue;

/// A data type.
///
/// Covers the Zarr V3 core fixed-width scalar data types.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataType {
    /// `bool` Boolean.
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
}

/// An unsupported data type error.
#[derive(Debug, Error, From)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

/// A fill value metadata incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueMetadataError(String, FillValueMetadata);

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl DataType {
    /// Returns the name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the metadata.
    #[must_use]
    pub fn metadata(&self) -> MetadataV3 {
        MetadataV3::new(self.name())
    }

    /// Returns the size in bytes of an element of this data type.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns true for signed integer and floating point data types.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Create a data type from metadata.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the metadata name is not a core data type.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, UnsupportedDataTypeError> {
        match metadata.name() {
            "bool" => Ok(Self::Bool),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            name => Err(UnsupportedDataTypeError(name.to_string())),
        }
    }

    /// The default fill value used when array metadata does not specify one.
    #[must_use]
    pub fn default_fill_value(&self) -> FillValue {
        match self {
            Self::Bool => FillValue::from(false),
            Self::Int8 => FillValue::from(-127_i8),
            Self::Int16 => FillValue::from(-32767_i16),
            Self::Int32 => FillValue::from(-2_147_483_647_i32),
            Self::Int64 => FillValue::from(i64::MAX),
            Self::UInt8 => FillValue::from(u8::MAX),
            Self::UInt16 => FillValue::from(u16::MAX),
            Self::UInt32 => FillValue::from(u32::MAX),
            Self::UInt64 => FillValue::from(u64::MAX),
            Self::Float32 => FillValue::from(9.969_209_968_386_869e36_f32),
            Self::Float64 => FillValue::from(9.969_209_968_386_869e36_f64),
        }
    }

    /// Create a fill value from metadata.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueMetadataError`] if the fill value is incompatible with the data type.
    pub fn fill_value_from_metadata(
        &self,
        fill_value: &FillValueMetadata,
    ) -> Result<FillValue, IncompatibleFillValueMetadataError> {
        let err = || IncompatibleFillValueMetadataError(self.name().to_string(), fill_value.clone());
        match self {
            Self::Bool => Ok(FillValue::from(fill_value.try_as_bool().ok_or_else(err)?)),
            Self::Int8 => Ok(FillValue::from(
                fill_value.try_as_int::<i8>().ok_or_else(err)?,
            )),
            Self::Int16 => Ok(FillValue::from(
                fill_value.try_as_int::<i16>().ok_or_else(err)?,
            )),
            Self::Int32 => Ok(FillValue::from(
                fill_value.try_as_int::<i32>().ok_or_else(err)?,
            )),
            Self::Int64 => Ok(FillValue::from(
                fill_value.try_as_int::<i64>().ok_or_else(err)?,
            )),
            Self::UInt8 => Ok(FillValue::from(
                fill_value.try_as_uint::<u8>().ok_or_else(err)?,
            )),
            Self::UInt16 => Ok(FillValue::from(
                fill_value.try_as_uint::<u16>().ok_or_else(err)?,
            )),
            Self::UInt32 => Ok(FillValue::from(
                fill_value.try_as_uint::<u32>().ok_or_else(err)?,
            )),
            Self::UInt64 => Ok(FillValue::from(
                fill_value.try_as_uint::<u64>().ok_or_else(err)?,
            )),
            Self::Float32 => Ok(FillValue::from(fill_value.try_as_f32().ok_or_else(err)?)),
            Self::Float64 => Ok(FillValue::from(fill_value.try_as_f64().ok_or_else(err)?)),
        }
    }

    /// Create fill value metadata from a fill value.
    ///
    /// Returns [`None`] if the fill value size does not match the data type size.
    #[must_use]
    pub fn metadata_fill_value(&self, fill_value: &FillValue) -> Option<FillValueMetadata> {
        let bytes = fill_value.as_ne_bytes();
        if bytes.len() != self.size() {
            return None;
        }
        Some(match self {
            Self::Bool => FillValueMetadata::Bool(bytes[0] != 0),
            Self::Int8 => FillValueMetadata::Int(i64::from(i8::from_ne_bytes([bytes[0]]))),
            Self::Int16 => {
                FillValueMetadata::Int(i64::from(i16::from_ne_bytes(bytes.try_into().ok()?)))
            }
            Self::Int32 => {
                FillValueMetadata::Int(i64::from(i32::from_ne_bytes(bytes.try_into().ok()?)))
            }
            Self::Int64 => FillValueMetadata::Int(i64::from_ne_bytes(bytes.try_into().ok()?)),
            Self::UInt8 => FillValueMetadata::UInt(u64::from(bytes[0])),
            Self::UInt16 => {
                FillValueMetadata::UInt(u64::from(u16::from_ne_bytes(bytes.try_into().ok()?)))
            }
            Self::UInt32 => {
                FillValueMetadata::UInt(u64::from(u32::from_ne_bytes(bytes.try_into().ok()?)))
            }
            Self::UInt64 => FillValueMetadata::UInt(u64::from_ne_bytes(bytes.try_into().ok()?)),
            Self::Float32 => float_fill_value_metadata(f64::from(f32::from_ne_bytes(
                bytes.try_into().ok()?,
            ))),
            Self::Float64 => float_fill_value_metadata(f64::from_ne_bytes(bytes.try_into().ok()?)),
        })
    }

    /// Check if a single element (in native endian bytes) matches the fill value.
    ///
    /// Floating point elements match approximately within `sqrt(machine epsilon)` (relative) unless
    /// [approximate fill value matching](crate::config::Config#approximate-fill-value-match) is disabled.
    ///
    /// # Panics
    /// Panics if the length of `element` does not equal the data type size.
    #[must_use]
    pub fn element_is_fill_value(&self, fill_value: &FillValue, element: &[u8]) -> bool {
        assert_eq!(element.len(), self.size());
        if element == fill_value.as_ne_bytes() {
            return true;
        }
        match self {
            Self::Float32 => {
                let x = f32::from_ne_bytes(element.try_into().unwrap());
                let fill = f32::from_ne_bytes(fill_value.as_ne_bytes().try_into().unwrap());
                floats_match(f64::from(x), f64::from(fill), f64::from(f32::EPSILON).sqrt())
            }
            Self::Float64 => {
                let x = f64::from_ne_bytes(element.try_into().unwrap());
                let fill = f64::from_ne_bytes(fill_value.as_ne_bytes().try_into().unwrap());
                floats_match(x, fill, f64::EPSILON.sqrt())
            }
            _ => false,
        }
    }

    /// Check if every element of `bytes` matches the fill value.
    ///
    /// # Panics
    /// Panics if the length of `bytes` is not a multiple of the data type size.
    #[must_use]
    pub fn all_fill_value(&self, fill_value: &FillValue, bytes: &[u8]) -> bool {
        assert_eq!(bytes.len() % self.size(), 0);
        if fill_value.equals_all(bytes) {
            return true;
        }
        matches!(self, Self::Float32 | Self::Float64)
            && bytes
                .chunks_exact(self.size())
                .all(|element| self.element_is_fill_value(fill_value, element))
    }
}

fn floats_match(x: f64, fill: f64, tolerance: f64) -> bool {
    if x.is_nan() && fill.is_nan() {
        return true;
    }
    if !global_config().approximate_fill_value_match() {
        return false;
    }
    (x - fill).abs() <= tolerance * x.abs().max(fill.abs())
}

fn float_fill_value_metadata(float: f64) -> FillValueMetadata {
    FillValueMetadata::Float(if float.is_nan() {
        FillValueFloat::NonFinite(FillValueFloatStringNonFinite::NaN)
    } else if float == f64::INFINITY {
        FillValueFloat::NonFinite(FillValueFloatStringNonFinite::PosInfinity)
    } else if float == f64::NEG_INFINITY {
        FillValueFloat::NonFinite(FillValueFloatStringNonFinite::NegInfinity)
    } else {
        FillValueFloat::Float(float)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names() {
        for data_type in [
            DataType::Bool,
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(
                DataType::from_metadata(&data_type.metadata()).unwrap(),
                data_type
            );
        }
        assert!(DataType::from_metadata(&MetadataV3::new("complex64")).is_err());
    }

    #[test]
    fn data_type_sizes() {
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::UInt64.size(), 8);
    }

    #[test]
    fn default_fill_values() {
        assert_eq!(DataType::Bool.default_fill_value(), FillValue::from(false));
        assert_eq!(DataType::Int8.default_fill_value(), FillValue::from(-127_i8));
        assert_eq!(
            DataType::Int32.default_fill_value(),
            FillValue::from(-2_147_483_647_i32)
        );
        assert_eq!(
            DataType::Int64.default_fill_value(),
            FillValue::from(i64::MAX)
        );
        assert_eq!(
            DataType::UInt64.default_fill_value(),
            FillValue::from(u64::MAX)
        );
        assert_eq!(
            DataType::Float64.default_fill_value(),
            FillValue::from(9.969_209_968_386_869e36_f64)
        );
    }

    #[test]
    fn fill_value_from_metadata() {
        let fill_value = DataType::Int32
            .fill_value_from_metadata(&FillValueMetadata::Int(-99))
            .unwrap();
        assert_eq!(fill_value, FillValue::from(-99_i32));
        assert!(DataType::UInt8
            .fill_value_from_metadata(&FillValueMetadata::Int(-1))
            .is_err());
        assert!(DataType::Bool
            .fill_value_from_metadata(&FillValueMetadata::Int(0))
            .is_err());
    }

    #[test]
    fn element_is_fill_value_approximate() {
        let data_type = DataType::Float64;
        let fill_value = data_type.default_fill_value();
        let fill = 9.969_209_968_386_869e36_f64;
        assert!(data_type.element_is_fill_value(&fill_value, &fill.to_ne_bytes()));
        // within sqrt(eps) relative tolerance of the sentinel
        let near = fill * (1.0 + 1e-9);
        assert!(data_type.element_is_fill_value(&fill_value, &near.to_ne_bytes()));
        let far = fill * 1.5;
        assert!(!data_type.element_is_fill_value(&fill_value, &far.to_ne_bytes()));
    }

    #[test]
    fn all_fill_value() {
        let data_type = DataType::Int32;
        let fill_value = FillValue::from(-1_i32);
        let bytes: Vec<u8> = [-1_i32, -1, -1]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        assert!(data_type.all_fill_value(&fill_value, &bytes));
        let bytes: Vec<u8> = [-1_i32, 0, -1]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        assert!(!data_type.all_fill_value(&fill_value, &bytes));
    }
}
