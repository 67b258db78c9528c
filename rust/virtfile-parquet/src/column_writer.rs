//! Plain and dictionary-index payload encoders.
//!
//! All encoders write into a caller-provided slice through [`SliceWriter`]; running
//! past its end is an error rather than a silent truncation.

use arrow_array::{
    Array, ArrowPrimitiveType, PrimitiveArray, StringArray,
    cast::AsArray,
    types::{Float64Type, Int32Type},
};
use arrow_schema::DataType;
use virtfile_common::{
    Result,
    error::{Error, ErrorKind},
    verify_arg,
};

use crate::constants::{BIT_PACKED_GROUP_SIZE, BYTE_ARRAY_LENGTH_SIZE};
use crate::value_kind::ValueKind;

/// Sequential writer over a fixed destination slice.
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> SliceWriter<'a> {
        SliceWriter { buf, pos: 0 }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reserves the next `len` bytes of the destination for in-place writing.
    pub fn take(&mut self, len: usize) -> Result<&mut [u8]> {
        if len > self.remaining() {
            return Err(ErrorKind::DestBufferTooSmall.into());
        }
        let start = self.pos;
        self.pos += len;
        Ok(&mut self.buf[start..self.pos])
    }

    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.take(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn put_zeros(&mut self, len: usize) -> Result<()> {
        self.take(len)?.fill(0);
        Ok(())
    }
}

/// Copies the raw value buffer of a fixed-width array verbatim.
pub fn write_fixed_width<T: ArrowPrimitiveType>(
    values: &PrimitiveArray<T>,
    dest: &mut SliceWriter,
) -> Result<()> {
    verify_arg!(values, values.null_count() == 0);
    dest.put(values.values().inner().as_slice())
}

/// Writes each value as a 4-byte little-endian length followed by its bytes.
pub fn write_variable_width(values: &StringArray, dest: &mut SliceWriter) -> Result<()> {
    verify_arg!(values, values.null_count() == 0);
    let data = values.value_data();
    for window in values.value_offsets().windows(2) {
        let (start, end) = (window[0] as usize, window[1] as usize);
        dest.put(&((end - start) as u32).to_le_bytes())?;
        dest.put(&data[start..end])?;
    }
    Ok(())
}

/// Writes one dictionary index per value using `byte_length` bytes each, zero-padded
/// to whole bit-packed groups.
///
/// Only single-byte indices (dictionaries of at most 256 values) are supported.
pub fn write_dictionary_indices(
    indices: &[usize],
    dest: &mut SliceWriter,
    byte_length: u8,
) -> Result<()> {
    if byte_length != 1 {
        return Err(Error::not_implemented(format!(
            "dictionary indices of {byte_length} bytes"
        )));
    }
    let out = dest.take(indices.len())?;
    for (target, &index) in out.iter_mut().zip(indices) {
        *target = u8::try_from(index).map_err(|_| {
            Error::invalid_data("dictionary_indices", format!("index {index} exceeds one byte"))
        })?;
    }
    let group = BIT_PACKED_GROUP_SIZE as usize;
    dest.put_zeros(indices.len().next_multiple_of(group) - indices.len())
}

/// Number of index slots of a bit-packed run holding `num_values` indices, `None`
/// when that does not fit in `u64`.
pub fn padded_index_count(num_values: u64) -> Option<u64> {
    num_values
        .div_ceil(BIT_PACKED_GROUP_SIZE)
        .checked_mul(BIT_PACKED_GROUP_SIZE)
}

/// Plain-encodes `array`, dispatching on its value kind.
pub fn write_plain_values(array: &dyn Array, dest: &mut SliceWriter) -> Result<()> {
    match array.data_type() {
        DataType::Int32 => write_fixed_width(array.as_primitive::<Int32Type>(), dest),
        DataType::Float64 => write_fixed_width(array.as_primitive::<Float64Type>(), dest),
        DataType::Utf8 => write_variable_width(array.as_string::<i32>(), dest),
        other => Err(Error::unsupported_type(other.to_string())),
    }
}

/// Number of bytes [`write_plain_values`] produces for `array`.
pub fn plain_encoded_size(array: &dyn Array) -> Result<u64> {
    let kind = ValueKind::from_data_type(array.data_type())?;
    if matches!(array.data_type(), DataType::Dictionary(..)) {
        return Err(Error::unsupported_type(array.data_type().to_string()));
    }
    Ok(match kind.fixed_width() {
        Some(width) => array.len() as u64 * width,
        None => {
            let offsets = array.as_string::<i32>().value_offsets();
            let value_bytes = match (offsets.first(), offsets.last()) {
                (Some(&first), Some(&last)) => (last - first) as u64,
                _ => 0,
            };
            value_bytes + array.len() as u64 * BYTE_ARRAY_LENGTH_SIZE
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{ArrayRef, Float64Array, Int32Array, Int64Array};

    use super::*;

    fn encode(array: &dyn Array) -> Vec<u8> {
        let mut buf = vec![0u8; plain_encoded_size(array).unwrap() as usize];
        let mut writer = SliceWriter::new(&mut buf);
        write_plain_values(array, &mut writer).unwrap();
        assert_eq!(writer.remaining(), 0);
        buf
    }

    #[test]
    fn test_write_int32() {
        let array = Int32Array::from(vec![1, 2, -1]);
        assert_eq!(
            encode(&array),
            [1, 0, 0, 0, 2, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_write_sliced_int32() {
        let array = Int32Array::from(vec![7, 8, 9, 10]).slice(1, 2);
        assert_eq!(encode(&array), [8, 0, 0, 0, 9, 0, 0, 0]);
    }

    #[test]
    fn test_write_float64() {
        let array = Float64Array::from(vec![1.5]);
        assert_eq!(encode(&array), 1.5f64.to_le_bytes());
    }

    #[test]
    fn test_write_strings() {
        let array = StringArray::from(vec!["ab", "", "xyz"]);
        assert_eq!(
            encode(&array),
            [2, 0, 0, 0, b'a', b'b', 0, 0, 0, 0, 3, 0, 0, 0, b'x', b'y', b'z']
        );
    }

    #[test]
    fn test_write_sliced_strings() {
        let array = StringArray::from(vec!["skip", "ok", "skip"]).slice(1, 1);
        assert_eq!(encode(&array), [2, 0, 0, 0, b'o', b'k']);
    }

    #[test]
    fn test_unsupported_type() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![1]));
        let mut buf = vec![0u8; 8];
        let err = write_plain_values(array.as_ref(), &mut SliceWriter::new(&mut buf)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedType { type_name } if type_name == "Int64"));
    }

    #[test]
    fn test_dest_too_small() {
        let array = Int32Array::from(vec![1, 2]);
        let mut buf = vec![0u8; 7];
        let err = write_plain_values(&array, &mut SliceWriter::new(&mut buf)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DestBufferTooSmall));
    }

    #[test]
    fn test_write_dictionary_indices() {
        let mut buf = vec![0xaau8; 16];
        let mut writer = SliceWriter::new(&mut buf);
        write_dictionary_indices(&[0, 2, 1, 255, 0, 1, 2, 3, 4], &mut writer, 1).unwrap();
        assert_eq!(writer.position(), 16);
        assert_eq!(
            buf,
            [0, 2, 1, 255, 0, 1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_dictionary_indices_limits() {
        let mut buf = vec![0u8; 8];
        let err = write_dictionary_indices(&[0, 1], &mut SliceWriter::new(&mut buf), 2).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotImplemented { .. }));

        let err = write_dictionary_indices(&[256], &mut SliceWriter::new(&mut buf), 1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
    }

    #[test]
    fn test_padded_index_count() {
        assert_eq!(padded_index_count(0), Some(0));
        assert_eq!(padded_index_count(1), Some(8));
        assert_eq!(padded_index_count(8), Some(8));
        assert_eq!(padded_index_count(17), Some(24));
        assert_eq!(padded_index_count(u64::MAX), None);
    }
}
