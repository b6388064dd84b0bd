//! Zarr fill values.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#fill-value>.

/// The fill value of a Zarr array.
///
/// Provides an element value to use for uninitialised portions of the Zarr array.
/// Stored as the byte representation of one element in native endianness.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl core::fmt::Display for FillValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<u8>> for FillValue {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        Self(vec![u8::from(value)])
    }
}

macro_rules! impl_fill_value_from_ne_bytes {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FillValue {
                fn from(value: $t) -> Self {
                    Self(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from_ne_bytes!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl FillValue {
    /// Create a new fill value composed of `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Check if the bytes are equal to a sequence of the fill value (bitwise).
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        bytes.len() % self.0.len() == 0
            && bytes
                .chunks_exact(self.0.len())
                .all(|element| element == self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_value_bytes() {
        assert_eq!(FillValue::from(1.5_f32).as_ne_bytes(), 1.5_f32.to_ne_bytes());
        assert_eq!(FillValue::from(-5_i64).size(), 8);
        assert_eq!(FillValue::from(true).as_ne_bytes(), &[1]);
    }

    #[test]
    fn fill_value_equals_all() {
        let fill_value = FillValue::from(0x0201_u16);
        let element = 0x0201_u16.to_ne_bytes();
        let bytes: Vec<u8> = element.iter().copied().cycle().take(8).collect();
        assert!(fill_value.equals_all(&bytes));
        let mut bytes = bytes;
        bytes[2] = !bytes[2];
        assert!(!fill_value.equals_all(&bytes));
    }
}
