//! Typed array element access.
//!
//! [`Element`] connects host scalar types to Zarr data types and the native endian byte
//! representation used for decoded chunks.

use thiserror::Error;

use super::DataType;

/// An invalid bytes length error.
#[derive(Copy, Clone, Debug, Error)]
#[error("bytes length {0} is not a multiple of the element size {1}")]
pub struct InvalidBytesLengthError(usize, usize);

/// A scalar type with a corresponding Zarr data type.
pub trait Element: Copy + PartialEq + Send + Sync + 'static {
    /// The Zarr data type corresponding to this element type.
    const DATA_TYPE: DataType;

    /// Convert a slice of elements to their native endian byte representation.
    #[must_use]
    fn to_array_bytes(elements: &[Self]) -> Vec<u8>;

    /// Convert native endian bytes to a vector of elements.
    ///
    /// # Errors
    /// Returns [`InvalidBytesLengthError`] if the length of `bytes` is not a multiple of the
    /// element size.
    fn from_array_bytes(bytes: &[u8]) -> Result<Vec<Self>, InvalidBytesLengthError>;
}

macro_rules! impl_element_pod {
    ($t:ty, $data_type:expr) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $data_type;

            fn to_array_bytes(elements: &[Self]) -> Vec<u8> {
                bytemuck::cast_slice(elements).to_vec()
            }

            fn from_array_bytes(bytes: &[u8]) -> Result<Vec<Self>, InvalidBytesLengthError> {
                if bytes.len() % core::mem::size_of::<Self>() == 0 {
                    Ok(bytemuck::pod_collect_to_vec(bytes))
                } else {
                    Err(InvalidBytesLengthError(
                        bytes.len(),
                        core::mem::size_of::<Self>(),
                    ))
                }
            }
        }
    };
}

impl_element_pod!(i8, DataType::Int8);
impl_element_pod!(i16, DataType::Int16);
impl_element_pod!(i32, DataType::Int32);
impl_element_pod!(i64, DataType::Int64);
impl_element_pod!(u8, DataType::UInt8);
impl_element_pod!(u16, DataType::UInt16);
impl_element_pod!(u32, DataType::UInt32);
impl_element_pod!(u64, DataType::UInt64);
impl_element_pod!(f32, DataType::Float32);
impl_element_pod!(f64, DataType::Float64);

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn to_array_bytes(elements: &[Self]) -> Vec<u8> {
        elements.iter().map(|element| u8::from(*element)).collect()
    }

    fn from_array_bytes(bytes: &[u8]) -> Result<Vec<Self>, InvalidBytesLengthError> {
        Ok(bytes.iter().map(|byte| *byte != 0).collect())
    }
}
