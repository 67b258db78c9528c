//! Compact-protocol page headers.
//!
//! The bytes produced here are the exact prefix of every page in the virtual file:
//! the Thrift `PageHeader` struct followed, for data pages, by the v1 definition-level
//! run and, for dictionary-encoded data pages, by the index stream prefix. The size
//! predictor and the materializer both call [`build_page_header`], which keeps
//! predicted and produced page sizes in agreement.

use crate::constants::{
    ALL_DEFINED_LEVEL, BIT_PACKED_GROUP_SIZE, DATA_PAGE_HEADER_FIELD,
    DICTIONARY_PAGE_HEADER_FIELD, ENCODING_PLAIN, ENCODING_PLAIN_DICTIONARY, ENCODING_RLE,
    END_STRUCT, LEVELS_LENGTH_SIZE, NEXT_INTEGER_FIELD, PAGE_TYPE_DATA_PAGE,
    PAGE_TYPE_DICTIONARY_PAGE,
};

/// Number of bytes of the unsigned LEB128 varint encoding of `value`.
pub fn varint_length(value: u64) -> u8 {
    let bits = u64::BITS - value.leading_zeros();
    bits.div_ceil(7).max(1) as u8
}

/// Maps the two's-complement bits of a signed value onto an unsigned value
/// (0, -1, 1, -2, ... become 0, 1, 2, 3, ...).
pub fn zigzag_encode(value: u64) -> u64 {
    (((value as i64) >> 63) as u64) ^ (value << 1)
}

/// Appends `value` as an unsigned LEB128 varint.
pub fn append_varint(target: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            target.push(byte);
            return;
        }
        target.push(byte | 0x80);
    }
}

/// Appends a compact-protocol `i32` field with delta 1.
fn append_integer_field(target: &mut Vec<u8>, value: u64) {
    target.push(NEXT_INTEGER_FIELD);
    append_varint(target, zigzag_encode(value));
}

/// Header of a bit-packed run covering `num_values`, rounded up to whole groups.
pub fn bit_packed_run_header(num_values: u64) -> u64 {
    (num_values.div_ceil(BIT_PACKED_GROUP_SIZE) << 1) | 1
}

/// Appends the v1 definition levels of a page without nulls: a 4-byte length,
/// then a single RLE run of `num_values` levels equal to 1.
fn append_all_defined_levels(target: &mut Vec<u8>, num_values: u64) {
    let run_header = num_values << 1;
    let run_length = varint_length(run_header) as u32 + 1;
    debug_assert!(LEVELS_LENGTH_SIZE == std::mem::size_of::<u32>() as u64);
    target.extend_from_slice(&run_length.to_le_bytes());
    append_varint(target, run_header);
    target.push(ALL_DEFINED_LEVEL);
}

/// Builds the byte sequence preceding a page's payload.
///
/// # Arguments
///
/// * `payload_size` - Bytes of value payload that follow the returned prefix.
/// * `num_values` - Number of values in the page (distinct values for a dictionary page).
/// * `is_dictionary_page` - Dictionary page rather than data page.
/// * `is_dictionary_encoded` - Values are dictionary indices (`PLAIN_DICTIONARY`).
/// * `index_bit_width` - Bit width of the index stream of a dictionary-encoded data page.
///
/// The page size recorded in the header covers everything after the Thrift struct:
/// the level run, the index prefix and the payload.
pub fn build_page_header(
    payload_size: u64,
    num_values: u64,
    is_dictionary_page: bool,
    is_dictionary_encoded: bool,
    index_bit_width: u8,
) -> Vec<u8> {
    let mut body_prefix = Vec::with_capacity(16);
    if !is_dictionary_page {
        append_all_defined_levels(&mut body_prefix, num_values);
        if is_dictionary_encoded {
            body_prefix.push(index_bit_width);
            append_varint(&mut body_prefix, bit_packed_run_header(num_values));
        }
    }
    let page_size = payload_size + body_prefix.len() as u64;

    let mut header = Vec::with_capacity(40);
    append_integer_field(
        &mut header,
        if is_dictionary_page {
            PAGE_TYPE_DICTIONARY_PAGE
        } else {
            PAGE_TYPE_DATA_PAGE
        },
    );
    // Uncompressed and compressed size
    append_integer_field(&mut header, page_size);
    append_integer_field(&mut header, page_size);

    header.push(if is_dictionary_page {
        DICTIONARY_PAGE_HEADER_FIELD
    } else {
        DATA_PAGE_HEADER_FIELD
    });
    append_integer_field(&mut header, num_values);
    append_integer_field(
        &mut header,
        if is_dictionary_encoded {
            ENCODING_PLAIN_DICTIONARY
        } else {
            ENCODING_PLAIN
        },
    );
    if !is_dictionary_page {
        // Definition and repetition level encodings
        append_integer_field(&mut header, ENCODING_RLE);
        append_integer_field(&mut header, ENCODING_RLE);
    }
    header.push(END_STRUCT);
    header.push(END_STRUCT);

    header.extend_from_slice(&body_prefix);
    header
}

/// Length of [`build_page_header`]'s output.
pub fn page_header_size(
    payload_size: u64,
    num_values: u64,
    is_dictionary_page: bool,
    is_dictionary_encoded: bool,
    index_bit_width: u8,
) -> u64 {
    build_page_header(
        payload_size,
        num_values,
        is_dictionary_page,
        is_dictionary_encoded,
        index_bit_width,
    )
    .len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_length() {
        assert_eq!(varint_length(0), 1);
        assert_eq!(varint_length(1), 1);
        assert_eq!(varint_length(127), 1);
        assert_eq!(varint_length(128), 2);
        assert_eq!(varint_length(16383), 2);
        assert_eq!(varint_length(16384), 3);
        assert_eq!(varint_length(u32::MAX as u64), 5);
        assert_eq!(varint_length(u64::MAX), 10);
    }

    #[test]
    fn test_varint_length_matches_encoding() {
        for value in [0u64, 1, 63, 64, 127, 128, 300, 1 << 20, 1 << 35, u64::MAX - 1] {
            let mut buf = Vec::new();
            append_varint(&mut buf, value);
            assert_eq!(buf.len(), varint_length(value) as usize, "value {value}");
        }
    }

    #[test]
    fn test_append_varint() {
        let mut buf = Vec::new();
        append_varint(&mut buf, 300);
        assert_eq!(buf, [0xac, 0x02]);
    }

    #[test]
    fn test_zigzag_encode() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1i64 as u64), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2i64 as u64), 3);
        assert_eq!(zigzag_encode(2), 4);
        assert_eq!(zigzag_encode(i64::MAX as u64), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN as u64), u64::MAX);
    }

    #[test]
    fn test_plain_data_page_header() {
        let header = build_page_header(8, 2, false, false, 0);
        assert_eq!(
            header,
            [
                0x15, 0x00, // type = DATA_PAGE
                0x15, 0x1c, // uncompressed_page_size = 14
                0x15, 0x1c, // compressed_page_size = 14
                0x2c, // data_page_header
                0x15, 0x04, // num_values = 2
                0x15, 0x00, // encoding = PLAIN
                0x15, 0x06, // definition_level_encoding = RLE
                0x15, 0x06, // repetition_level_encoding = RLE
                0x00, 0x00, // end structs
                0x02, 0x00, 0x00, 0x00, // definition levels length
                0x04, 0x01, // RLE run of 2 defined values
            ]
        );
        assert_eq!(page_header_size(8, 2, false, false, 0), 23);
    }

    #[test]
    fn test_dictionary_page_header() {
        let header = build_page_header(20, 3, true, true, 0);
        assert_eq!(
            header,
            [
                0x15, 0x04, // type = DICTIONARY_PAGE
                0x15, 0x28, // uncompressed_page_size = 20
                0x15, 0x28, // compressed_page_size = 20
                0x4c, // dictionary_page_header
                0x15, 0x06, // num_values = 3
                0x15, 0x04, // encoding = PLAIN_DICTIONARY
                0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_dictionary_encoded_data_page_header() {
        let header = build_page_header(16, 10, false, true, 8);
        let page_size = 16 + 6 + 2;
        assert_eq!(&header[..4], &[0x15, 0x00, 0x15, (page_size * 2) as u8]);
        assert_eq!(&header[9..11], &[0x15, 0x04]);
        let tail = &header[header.len() - 8..];
        // levels length, RLE run of 10 defined values, bit width, 2 bit-packed groups
        assert_eq!(tail, &[0x02, 0x00, 0x00, 0x00, 0x14, 0x01, 0x08, 0x05]);
    }

    #[test]
    fn test_header_size_grows_with_varints() {
        let small = page_header_size(10, 10, false, false, 0);
        let large = page_header_size(1 << 20, 1 << 20, false, false, 0);
        // page sizes: 1 -> 4 varint bytes twice, num_values: 1 -> 4, levels run: 1 -> 4
        assert_eq!(large - small, 2 * 3 + 3 + 3);
    }

    #[test]
    fn test_bit_packed_run_header() {
        assert_eq!(bit_packed_run_header(0), 1);
        assert_eq!(bit_packed_run_header(1), 3);
        assert_eq!(bit_packed_run_header(8), 3);
        assert_eq!(bit_packed_run_header(9), 5);
    }
}
