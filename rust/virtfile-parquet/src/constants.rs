//! Format constants shared by the header encoder, the size predictor and the
//! range materializer.
//!
//! Thrift compact-protocol short field headers pack the field-id delta into the high
//! nibble and the field type into the low nibble.

/// Leading and trailing file magic.
pub const MAGIC: &[u8; 4] = b"PAR1";
pub const MAGIC_SIZE: u64 = 4;

/// Little-endian footer length preceding the trailing magic.
pub const FOOTER_LENGTH_SIZE: u64 = 4;

/// Footer length field plus trailing magic.
pub const TRAILER_SIZE: u64 = FOOTER_LENGTH_SIZE + MAGIC_SIZE;

/// Next field (delta 1), type `i32`.
pub const NEXT_INTEGER_FIELD: u8 = 0x15;
/// `PageHeader.data_page_header` (field 5, delta 2 from field 3), type struct.
pub const DATA_PAGE_HEADER_FIELD: u8 = 0x2c;
/// `PageHeader.dictionary_page_header` (field 7, delta 4 from field 3), type struct.
pub const DICTIONARY_PAGE_HEADER_FIELD: u8 = 0x4c;
pub const END_STRUCT: u8 = 0x00;

/// `PageType` values.
pub const PAGE_TYPE_DATA_PAGE: u64 = 0;
pub const PAGE_TYPE_DICTIONARY_PAGE: u64 = 2;

/// `Encoding` values.
pub const ENCODING_PLAIN: u64 = 0;
pub const ENCODING_PLAIN_DICTIONARY: u64 = 2;
pub const ENCODING_RLE: u64 = 3;

/// Byte length of the little-endian size prefix of v1 definition levels.
pub const LEVELS_LENGTH_SIZE: u64 = 4;

/// Value `1` of a bit-width-1 RLE run: every value is defined.
pub const ALL_DEFINED_LEVEL: u8 = 0x01;

/// Bit-packed runs always hold a whole number of groups of this many values.
pub const BIT_PACKED_GROUP_SIZE: u64 = 8;

/// Length prefix of a plain-encoded `BYTE_ARRAY` value.
pub const BYTE_ARRAY_LENGTH_SIZE: u64 = 4;

/// Thrift encodes page sizes as `i32`.
pub const MAX_PAGE_SIZE: u64 = i32::MAX as u64;

/// Thrift encodes page value counts as `i32`.
pub const MAX_PAGE_VALUES: u64 = i32::MAX as u64;
