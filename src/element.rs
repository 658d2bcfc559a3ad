//! Scalar types that can live in a backing store.
//!
//! Arrays in a store are flat little-endian buffers tagged with a [`DType`].
//! The [`Element`] trait ties a Rust scalar to its on-disk tag and provides
//! the (de)serialization for whole slices at a time.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// On-disk scalar type of a stored array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE 754 float.
    F32,
    /// 64-bit IEEE 754 float.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F64 | DType::I64 | DType::U64 => 8,
        }
    }

    /// Single-byte code used in array file headers.
    pub fn code(self) -> u8 {
        match self {
            DType::F32 => b'f',
            DType::F64 => b'F',
            DType::I32 => b'i',
            DType::I64 => b'I',
            DType::U32 => b'u',
            DType::U64 => b'U',
        }
    }

    /// Inverse of [`DType::code`].
    pub fn from_code(code: u8) -> Option<DType> {
        match code {
            b'f' => Some(DType::F32),
            b'F' => Some(DType::F64),
            b'i' => Some(DType::I32),
            b'I' => Some(DType::I64),
            b'u' => Some(DType::U32),
            b'U' => Some(DType::U64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U32 => "u32",
            DType::U64 => "u64",
        };
        f.write_str(name)
    }
}

/// A scalar that can be stored in (and read back from) a backing array.
///
/// Implemented for the primitive numeric types a sparse matrix is made of.
/// Byte order on disk is always little-endian.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + 'static {
    /// The on-disk tag for this type.
    const DTYPE: DType;

    /// Decode a whole buffer of little-endian elements.
    ///
    /// Fails with [`Error::Format`] if the buffer length is not a multiple
    /// of the element size.
    fn decode(bytes: &[u8]) -> Result<Vec<Self>>;

    /// Encode a slice of elements to little-endian bytes.
    fn encode(values: &[Self]) -> Vec<u8>;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $read:ident, $write:ident) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            fn decode(bytes: &[u8]) -> Result<Vec<Self>> {
                let size = Self::DTYPE.size();
                if bytes.len() % size != 0 {
                    return Err(Error::Format(format!(
                        "buffer of {} bytes is not a whole number of {} elements",
                        bytes.len(),
                        Self::DTYPE,
                    )));
                }
                let mut out = vec![<$ty>::default(); bytes.len() / size];
                LittleEndian::$read(bytes, &mut out);
                Ok(out)
            }

            fn encode(values: &[Self]) -> Vec<u8> {
                let mut out = vec![0u8; values.len() * Self::DTYPE.size()];
                LittleEndian::$write(values, &mut out);
                out
            }
        }
    };
}

impl_element!(f32, DType::F32, read_f32_into, write_f32_into);
impl_element!(f64, DType::F64, read_f64_into, write_f64_into);
impl_element!(i32, DType::I32, read_i32_into, write_i32_into);
impl_element!(i64, DType::I64, read_i64_into, write_i64_into);
impl_element!(u32, DType::U32, read_u32_into, write_u32_into);
impl_element!(u64, DType::U64, read_u64_into, write_u64_into);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for dtype in [DType::F32, DType::F64, DType::I32, DType::I64, DType::U32, DType::U64] {
            assert_eq!(DType::from_code(dtype.code()), Some(dtype));
        }
        assert_eq!(DType::from_code(b'x'), None);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let values = vec![0u64, 1, 2, u64::MAX];
        assert_eq!(u64::decode(&u64::encode(&values)).unwrap(), values);

        let values = vec![-1.5f64, 0.0, 3.25];
        assert_eq!(f64::decode(&f64::encode(&values)).unwrap(), values);
    }

    #[test]
    fn decode_ragged_buffer_fails() {
        assert!(matches!(u64::decode(&[0u8; 7]), Err(Error::Format(_))));
    }
}
