//! Footer serialization.
//!
//! The footer is assembled from the finished [`OffsetTable`] with the `parquet`
//! crate's metadata model and serialized by `ParquetMetaDataWriter`.

use std::sync::Arc;

use arrow_schema::Schema;
use parquet::{
    arrow::ArrowSchemaConverter,
    basic::{ColumnOrder, Compression, Encoding},
    data_type::ByteArray,
    file::{
        metadata::{
            ColumnChunkMetaData, FileMetaData, KeyValue, ParquetMetaData, ParquetMetaDataWriter,
            RowGroupMetaData,
        },
        statistics::Statistics,
    },
    schema::types::SchemaDescriptor,
};
use virtfile_common::{Result, error::Error};

use crate::{
    constants::{MAGIC, TRAILER_SIZE},
    layout::{ChunkLayout, OffsetTable, PageKind},
    options::VirtualFileOptions,
    stats::{ChunkInfo, ChunkStatisticsMatrix, ZoneValue},
};

/// Serialized `FileMetaData`, without the length field and trailing magic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterBlob {
    bytes: Vec<u8>,
}

impl FooterBlob {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Final eight bytes of the file: little-endian footer length, then the magic.
    pub fn trailer(&self) -> [u8; TRAILER_SIZE as usize] {
        let mut trailer = [0u8; TRAILER_SIZE as usize];
        trailer[..4].copy_from_slice(&(self.bytes.len() as u32).to_le_bytes());
        trailer[4..].copy_from_slice(MAGIC);
        trailer
    }
}

/// Converts the Arrow schema into the Parquet schema of the virtual file.
///
/// Every field is declared nullable so that leaves are `OPTIONAL`: data pages always
/// carry the all-defined level run.
pub fn parquet_schema(schema: &Schema) -> Result<SchemaDescriptor> {
    let fields = schema
        .fields()
        .iter()
        .map(|field| field.as_ref().clone().with_nullable(true))
        .collect::<Vec<_>>();
    let nullable = Schema::new_with_metadata(fields, schema.metadata().clone());
    ArrowSchemaConverter::new()
        .convert(&nullable)
        .map_err(|e| Error::parquet("convert schema", e))
}

/// Builds the footer metadata of the laid-out chunks and serializes it.
pub fn build_footer(
    schema: &Schema,
    table: &OffsetTable,
    stats: &ChunkStatisticsMatrix,
    options: &VirtualFileOptions,
) -> Result<(Arc<ParquetMetaData>, FooterBlob)> {
    let schema_descr = Arc::new(parquet_schema(schema)?);
    if schema_descr.num_columns() != table.num_columns() {
        return Err(Error::invalid_arg(
            "schema",
            format!(
                "{} leaf columns for {} statistics columns",
                schema_descr.num_columns(),
                table.num_columns()
            ),
        ));
    }

    let mut row_groups = Vec::with_capacity(table.num_row_groups());
    let mut num_rows = 0i64;
    for row_group in 0..table.num_row_groups() {
        let chunks = table.row_group(row_group);
        let columns = chunks
            .iter()
            .map(|chunk| {
                column_chunk_metadata(
                    &schema_descr,
                    chunk,
                    stats.get(chunk.column, chunk.row_group),
                    options,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let row_count = stats.row_group_tuple_count(row_group) as i64;
        let total_byte_size = chunks.iter().map(|chunk| chunk.size() as i64).sum();
        let mut builder = RowGroupMetaData::builder(schema_descr.clone())
            .set_num_rows(row_count)
            .set_total_byte_size(total_byte_size)
            .set_column_metadata(columns);
        // Thrift ordinals are i16; later row groups go without one.
        if let Ok(ordinal) = i16::try_from(row_group) {
            builder = builder.set_ordinal(ordinal);
        }
        let metadata = builder
            .build()
            .map_err(|e| Error::parquet("row group metadata", e))?;
        num_rows += row_count;
        row_groups.push(metadata);
    }

    let key_value_metadata = (!options.key_value_metadata.is_empty()).then(|| {
        options
            .key_value_metadata
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect()
    });
    let column_orders = schema_descr
        .columns()
        .iter()
        .map(|column| {
            ColumnOrder::TYPE_DEFINED_ORDER(ColumnOrder::get_sort_order(
                column.logical_type(),
                column.converted_type(),
                column.physical_type(),
            ))
        })
        .collect();
    let file_metadata = FileMetaData::new(
        1,
        num_rows,
        Some(options.created_by()),
        key_value_metadata,
        schema_descr,
        Some(column_orders),
    );
    let metadata = ParquetMetaData::new(file_metadata, row_groups);

    let blob = serialize(&metadata)?;
    Ok((Arc::new(metadata), blob))
}

fn column_chunk_metadata(
    schema_descr: &Arc<SchemaDescriptor>,
    chunk: &ChunkLayout,
    info: &ChunkInfo,
    options: &VirtualFileOptions,
) -> Result<ColumnChunkMetaData> {
    let encodings = match chunk.data_page.kind {
        PageKind::DictionaryIndices { .. } => vec![Encoding::PLAIN_DICTIONARY, Encoding::RLE],
        _ => vec![Encoding::PLAIN, Encoding::RLE],
    };
    let mut builder = ColumnChunkMetaData::builder(schema_descr.column(chunk.column))
        .set_num_values(chunk.tuple_count as i64)
        .set_encodings(encodings)
        .set_compression(Compression::UNCOMPRESSED)
        .set_total_compressed_size(chunk.size() as i64)
        .set_total_uncompressed_size(chunk.size() as i64)
        .set_data_page_offset(chunk.data_page.offset as i64)
        .set_dictionary_page_offset(chunk.dictionary_page.map(|page| page.offset as i64));
    if options.zone_map_statistics {
        if let Some(statistics) = zone_map_statistics(info) {
            builder = builder.set_statistics(statistics);
        }
    }
    builder
        .build()
        .map_err(|e| Error::parquet("column chunk metadata", e))
}

fn zone_map_statistics(info: &ChunkInfo) -> Option<Statistics> {
    let zone_map = info.zone_map.as_ref()?;
    let distinct = info.dictionary.map(|dict| dict.unique_value_count);
    let nulls = Some(0);
    match (&zone_map.min, &zone_map.max) {
        (ZoneValue::Int32(min), ZoneValue::Int32(max)) => Some(Statistics::int32(
            Some(*min),
            Some(*max),
            distinct,
            nulls,
            false,
        )),
        (ZoneValue::Float64(min), ZoneValue::Float64(max)) => Some(Statistics::double(
            Some(*min),
            Some(*max),
            distinct,
            nulls,
            false,
        )),
        (ZoneValue::Utf8(min), ZoneValue::Utf8(max)) => Some(Statistics::byte_array(
            Some(ByteArray::from(min.as_str())),
            Some(ByteArray::from(max.as_str())),
            distinct,
            nulls,
            false,
        )),
        _ => None,
    }
}

/// Serializes `metadata` and splits the writer's output into the blob and trailer.
fn serialize(metadata: &ParquetMetaData) -> Result<FooterBlob> {
    let mut buf = Vec::new();
    ParquetMetaDataWriter::new(&mut buf, metadata)
        .finish()
        .map_err(|e| Error::parquet("serialize footer", e))?;

    let trailer_size = TRAILER_SIZE as usize;
    if buf.len() < trailer_size || &buf[buf.len() - 4..] != MAGIC {
        return Err(Error::invalid_data("footer", "missing trailing magic"));
    }
    let length_field = &buf[buf.len() - trailer_size..buf.len() - 4];
    let footer_len = u32::from_le_bytes([
        length_field[0],
        length_field[1],
        length_field[2],
        length_field[3],
    ]) as usize;
    if footer_len != buf.len() - trailer_size {
        return Err(Error::layout_mismatch(
            "footer",
            (buf.len() - trailer_size) as u64,
            footer_len as u64,
        ));
    }
    buf.truncate(footer_len);
    Ok(FooterBlob { bytes: buf })
}
