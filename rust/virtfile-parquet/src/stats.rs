//! Per-chunk statistics consumed by the size predictor.

use arrow_arith::aggregate::{max, max_string, min, min_string};
use arrow_array::{
    Array, RecordBatch,
    cast::AsArray,
    types::{Float64Type, Int32Type},
};
use virtfile_common::{Result, error::Error, verify_arg};

use crate::value_kind::ValueKind;

/// Cardinality summary of a dictionary-encoded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryChunkInfo {
    /// Number of distinct values, i.e. entries of the dictionary page.
    pub unique_value_count: u64,
    /// Raw byte length of the distinct values: value bytes for text,
    /// `unique_value_count * width` for fixed-width kinds.
    pub unique_values_byte_length: u64,
}

/// A single zone-map bound, typed as the column's value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneValue {
    Int32(i32),
    Float64(f64),
    Utf8(String),
}

impl ZoneValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ZoneValue::Int32(_) => ValueKind::Int32,
            ZoneValue::Float64(_) => ValueKind::Float64,
            ZoneValue::Utf8(_) => ValueKind::Utf8,
        }
    }
}

/// Min/max summary of a chunk.
///
/// Zone maps never influence the byte layout of chunks; they are only surfaced as
/// footer statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMap {
    pub min: ZoneValue,
    pub max: ZoneValue,
}

impl ZoneMap {
    pub fn new(min: ZoneValue, max: ZoneValue) -> ZoneMap {
        ZoneMap { min, max }
    }

    /// Value kind of both bounds, `None` if they disagree.
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = self.min.kind();
        (kind == self.max.kind()).then_some(kind)
    }
}

/// Describes one column chunk (one column within one row group).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfo {
    /// Bytes of logical payload (values only).
    ///
    /// Fixed-width kinds: `tuple_count * width`. Text: value bytes plus the
    /// `tuple_count + 1` four-byte entries of the Arrow offsets buffer. Not consulted
    /// for dictionary-encoded chunks, where `dictionary` drives the layout.
    pub uncompressed_size: u64,
    /// Number of values in the chunk.
    pub tuple_count: u64,
    /// Present iff the chunk is dictionary-encoded.
    pub dictionary: Option<DictionaryChunkInfo>,
    pub zone_map: Option<ZoneMap>,
}

impl ChunkInfo {
    pub fn new(uncompressed_size: u64, tuple_count: u64) -> ChunkInfo {
        ChunkInfo {
            uncompressed_size,
            tuple_count,
            dictionary: None,
            zone_map: None,
        }
    }

    pub fn with_dictionary(mut self, unique_value_count: u64, unique_values_byte_length: u64) -> Self {
        self.dictionary = Some(DictionaryChunkInfo {
            unique_value_count,
            unique_values_byte_length,
        });
        self
    }

    pub fn with_zone_map(mut self, zone_map: ZoneMap) -> Self {
        self.zone_map = Some(zone_map);
        self
    }

    pub fn is_dictionary_encoded(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Collects the statistics of an Arrow array holding one chunk.
    ///
    /// Dictionary arrays yield dictionary info and a zone map over the dictionary
    /// values. Arrays with nulls are rejected, the virtual file carries none. Size
    /// arithmetic saturates instead of wrapping.
    pub fn from_array(array: &dyn Array) -> Result<ChunkInfo> {
        let kind = ValueKind::from_data_type(array.data_type())?;
        verify_arg!(array, array.null_count() == 0);
        let tuple_count = array.len() as u64;

        if let Some(dictionary) = array.as_any_dictionary_opt() {
            let values = dictionary.values();
            verify_arg!(dictionary_values, values.null_count() == 0);
            let key_width = dictionary
                .keys()
                .data_type()
                .primitive_width()
                .unwrap_or_default() as u64;
            let unique_values_byte_length = match kind.fixed_width() {
                Some(width) => (values.len() as u64).saturating_mul(width),
                None => text_value_bytes(values.as_ref()),
            };
            let info = ChunkInfo::new(tuple_count.saturating_mul(key_width), tuple_count)
                .with_dictionary(values.len() as u64, unique_values_byte_length);
            return Ok(match collect_zone_map(values.as_ref(), kind) {
                Some(zone_map) => info.with_zone_map(zone_map),
                None => info,
            });
        }

        let uncompressed_size = match kind.fixed_width() {
            Some(width) => tuple_count.saturating_mul(width),
            None => text_value_bytes(array).saturating_add((tuple_count + 1).saturating_mul(4)),
        };
        let info = ChunkInfo::new(uncompressed_size, tuple_count);
        Ok(match collect_zone_map(array, kind) {
            Some(zone_map) => info.with_zone_map(zone_map),
            None => info,
        })
    }
}

/// Bytes spanned by the values of a `Utf8` array.
fn text_value_bytes(array: &dyn Array) -> u64 {
    let offsets = array.as_string::<i32>().value_offsets();
    match (offsets.first(), offsets.last()) {
        (Some(&first), Some(&last)) => (last - first) as u64,
        _ => 0,
    }
}

fn collect_zone_map(array: &dyn Array, kind: ValueKind) -> Option<ZoneMap> {
    match kind {
        ValueKind::Int32 => {
            let values = array.as_primitive::<Int32Type>();
            Some(ZoneMap::new(
                ZoneValue::Int32(min(values)?),
                ZoneValue::Int32(max(values)?),
            ))
        }
        ValueKind::Float64 => {
            let values = array.as_primitive::<Float64Type>();
            Some(ZoneMap::new(
                ZoneValue::Float64(min(values)?),
                ZoneValue::Float64(max(values)?),
            ))
        }
        ValueKind::Utf8 => {
            let values = array.as_string::<i32>();
            Some(ZoneMap::new(
                ZoneValue::Utf8(min_string(values)?.to_string()),
                ZoneValue::Utf8(max_string(values)?.to_string()),
            ))
        }
    }
}

/// Statistics of every chunk of the file, addressed by (column, row group).
///
/// The matrix is rectangular and all columns agree on the tuple count of each row
/// group. It is immutable once constructed.
#[derive(Debug, Clone)]
pub struct ChunkStatisticsMatrix {
    columns: Vec<Vec<ChunkInfo>>,
    num_row_groups: usize,
}

impl ChunkStatisticsMatrix {
    /// Creates the matrix from per-column vectors of per-row-group chunk infos.
    pub fn try_new(columns: Vec<Vec<ChunkInfo>>) -> Result<ChunkStatisticsMatrix> {
        let num_row_groups = columns.first().map_or(0, Vec::len);
        for (column, chunks) in columns.iter().enumerate() {
            if chunks.len() != num_row_groups {
                return Err(Error::invalid_arg(
                    "chunk_infos",
                    format!(
                        "column {column} has {} row groups, expected {num_row_groups}",
                        chunks.len()
                    ),
                ));
            }
        }
        for row_group in 0..num_row_groups {
            let expected = columns[0][row_group].tuple_count;
            if let Some(column) = columns
                .iter()
                .position(|chunks| chunks[row_group].tuple_count != expected)
            {
                return Err(Error::invalid_arg(
                    "chunk_infos",
                    format!(
                        "row group {row_group}: column {column} has {} tuples, expected {expected}",
                        columns[column][row_group].tuple_count
                    ),
                ));
            }
        }
        Ok(ChunkStatisticsMatrix {
            columns,
            num_row_groups,
        })
    }

    /// Collects the statistics of record batches, one batch per row group.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<ChunkStatisticsMatrix> {
        let num_columns = batches.first().map_or(0, RecordBatch::num_columns);
        let mut columns = vec![Vec::with_capacity(batches.len()); num_columns];
        for (row_group, batch) in batches.iter().enumerate() {
            if batch.num_columns() != num_columns {
                return Err(Error::invalid_arg(
                    "batches",
                    format!(
                        "row group {row_group} has {} columns, expected {num_columns}",
                        batch.num_columns()
                    ),
                ));
            }
            for (column, array) in batch.columns().iter().enumerate() {
                columns[column].push(ChunkInfo::from_array(array.as_ref())?);
            }
        }
        ChunkStatisticsMatrix::try_new(columns)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_row_groups(&self) -> usize {
        self.num_row_groups
    }

    /// Statistics of the chunk of `column` in `row_group`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, column: usize, row_group: usize) -> &ChunkInfo {
        &self.columns[column][row_group]
    }

    /// Number of rows in `row_group`, zero for a matrix without columns.
    pub fn row_group_tuple_count(&self, row_group: usize) -> u64 {
        self.columns
            .first()
            .map_or(0, |chunks| chunks[row_group].tuple_count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::{DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};

    use super::*;

    #[test]
    fn test_from_int32_array() {
        let array = Int32Array::from(vec![5, -3, 9]);
        let info = ChunkInfo::from_array(&array).unwrap();
        assert_eq!(info.uncompressed_size, 12);
        assert_eq!(info.tuple_count, 3);
        assert!(info.dictionary.is_none());
        assert_eq!(
            info.zone_map,
            Some(ZoneMap::new(ZoneValue::Int32(-3), ZoneValue::Int32(9)))
        );
    }

    #[test]
    fn test_from_float64_array() {
        let array = Float64Array::from(vec![1.5, 0.25]);
        let info = ChunkInfo::from_array(&array).unwrap();
        assert_eq!(info.uncompressed_size, 16);
        assert_eq!(info.zone_map.unwrap().kind(), Some(ValueKind::Float64));
    }

    #[test]
    fn test_from_string_array() {
        let array = StringArray::from(vec!["ab", "", "cde"]);
        let info = ChunkInfo::from_array(&array).unwrap();
        // 5 value bytes + 4 offsets
        assert_eq!(info.uncompressed_size, 5 + 16);
        assert_eq!(
            info.zone_map,
            Some(ZoneMap::new(
                ZoneValue::Utf8(String::new()),
                ZoneValue::Utf8("cde".to_string())
            ))
        );
    }

    #[test]
    fn test_from_sliced_string_array() {
        let array = StringArray::from(vec!["xxxx", "ab", "c", "yyyy"]);
        let sliced = array.slice(1, 2);
        let info = ChunkInfo::from_array(&sliced).unwrap();
        assert_eq!(info.tuple_count, 2);
        assert_eq!(info.uncompressed_size, 3 + 12);
    }

    #[test]
    fn test_from_dictionary_array() {
        let array: DictionaryArray<Int32Type> =
            vec!["red", "green", "red", "blue"].into_iter().collect();
        let info = ChunkInfo::from_array(&array).unwrap();
        assert_eq!(info.tuple_count, 4);
        assert_eq!(
            info.dictionary,
            Some(DictionaryChunkInfo {
                unique_value_count: 3,
                unique_values_byte_length: 12,
            })
        );
        assert_eq!(
            info.zone_map,
            Some(ZoneMap::new(
                ZoneValue::Utf8("blue".to_string()),
                ZoneValue::Utf8("red".to_string())
            ))
        );
    }

    #[test]
    fn test_from_array_rejects_nulls_and_unsupported() {
        let array = Int32Array::from(vec![Some(1), None]);
        assert!(ChunkInfo::from_array(&array).is_err());

        let array = Int64Array::from(vec![1, 2]);
        let err = ChunkInfo::from_array(&array).unwrap_err();
        assert_eq!(err.to_string(), "unsupported column type Int64");
    }

    #[test]
    fn test_matrix_rejects_ragged_columns() {
        let columns = vec![
            vec![ChunkInfo::new(8, 2), ChunkInfo::new(8, 2)],
            vec![ChunkInfo::new(8, 2)],
        ];
        assert!(ChunkStatisticsMatrix::try_new(columns).is_err());
    }

    #[test]
    fn test_matrix_rejects_inconsistent_tuple_counts() {
        let columns = vec![vec![ChunkInfo::new(8, 2)], vec![ChunkInfo::new(12, 3)]];
        assert!(ChunkStatisticsMatrix::try_new(columns).is_err());
    }

    #[test]
    fn test_matrix_from_batches() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, false),
        ]));
        let batches = [
            RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Int32Array::from(vec![1, 2])),
                    Arc::new(StringArray::from(vec!["x", "yz"])),
                ],
            )
            .unwrap(),
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(Int32Array::from(vec![3])),
                    Arc::new(StringArray::from(vec!["w"])),
                ],
            )
            .unwrap(),
        ];
        let matrix = ChunkStatisticsMatrix::from_batches(&batches).unwrap();
        assert_eq!(matrix.num_columns(), 2);
        assert_eq!(matrix.num_row_groups(), 2);
        assert_eq!(matrix.get(0, 1).uncompressed_size, 4);
        assert_eq!(matrix.get(1, 0).uncompressed_size, 3 + 12);
        assert_eq!(matrix.row_group_tuple_count(0), 2);
        assert_eq!(matrix.row_group_tuple_count(1), 1);
    }
}
