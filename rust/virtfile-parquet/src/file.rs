//! The virtual Parquet file: layout computed up front, bytes synthesized per request.

use std::{ops::Range, sync::Arc};

use arrow_array::{Array, ArrayRef, RecordBatch, cast::AsArray};
use arrow_schema::{DataType, SchemaRef};
use log::{debug, trace};
use parquet::file::metadata::ParquetMetaData;
use virtfile_common::{Result, error::Error, verify_arg, verify_data};
use virtfile_io::{ByteRange, ReadAt, StorageProfile, check_range};

use crate::{
    column_writer::{
        SliceWriter, padded_index_count, plain_encoded_size, write_dictionary_indices,
        write_plain_values,
    },
    constants::{MAGIC, TRAILER_SIZE},
    footer::{FooterBlob, build_footer},
    layout::{ChunkLayout, OffsetTable, PageKind, PageLayout, plan},
    options::VirtualFileOptions,
    predictor::ParquetSizePredictor,
    source::{ColumnSource, InMemoryColumnSource},
    stats::ChunkStatisticsMatrix,
    value_kind::ValueKind,
};

/// A Parquet file that exists only as a layout over a [`ColumnSource`].
///
/// Construction predicts the size and position of every page and serializes the
/// footer. Afterwards the file is immutable and [`get_range`](Self::get_range)
/// produces any byte window on demand, reading from the source only the chunks the
/// window touches. Concurrent reads are safe; each call owns its buffers.
pub struct VirtualParquetFile {
    schema: SchemaRef,
    kinds: Vec<ValueKind>,
    stats: ChunkStatisticsMatrix,
    table: OffsetTable,
    metadata: Arc<ParquetMetaData>,
    footer: FooterBlob,
    size: u64,
    source: Arc<dyn ColumnSource>,
    options: VirtualFileOptions,
}

impl VirtualParquetFile {
    /// Lays out the file described by `schema` and `stats`.
    ///
    /// Fails before any bytes are produced if a column type is unsupported, the
    /// statistics disagree with the schema or with themselves, or a dictionary needs
    /// indices wider than one byte.
    pub fn try_new(
        schema: SchemaRef,
        stats: ChunkStatisticsMatrix,
        source: Arc<dyn ColumnSource>,
        options: VirtualFileOptions,
    ) -> Result<VirtualParquetFile> {
        let kinds = schema
            .fields()
            .iter()
            .map(|field| ValueKind::from_data_type(field.data_type()))
            .collect::<Result<Vec<_>>>()?;
        if kinds.len() != stats.num_columns() {
            return Err(Error::invalid_arg(
                "stats",
                format!(
                    "{} statistics columns for {} schema fields",
                    stats.num_columns(),
                    kinds.len()
                ),
            ));
        }

        let predictor = ParquetSizePredictor::new(kinds.clone());
        let table = plan(&predictor, &stats)?;
        let (metadata, footer) = build_footer(&schema, &table, &stats, &options)?;
        let size = table.data_end() + footer.len() + TRAILER_SIZE;

        debug!(
            "virtual file laid out: {} row groups, {} columns, data {}..{}, footer {} bytes, size {}",
            table.num_row_groups(),
            table.num_columns(),
            table.data_start(),
            table.data_end(),
            footer.len(),
            size
        );

        Ok(VirtualParquetFile {
            schema,
            kinds,
            stats,
            table,
            metadata,
            footer,
            size,
            source,
            options,
        })
    }

    /// Lays out a file over in-memory record batches, one batch per row group.
    pub fn from_batches(
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
        options: VirtualFileOptions,
    ) -> Result<VirtualParquetFile> {
        if let Some(batch) = batches.iter().find(|batch| batch.schema() != schema) {
            return Err(Error::invalid_arg(
                "batches",
                format!("batch schema {:?} differs from file schema", batch.schema()),
            ));
        }
        let stats = if batches.is_empty() {
            ChunkStatisticsMatrix::try_new(vec![Vec::new(); schema.fields().len()])?
        } else {
            ChunkStatisticsMatrix::from_batches(&batches)?
        };
        let source = Arc::new(InMemoryColumnSource::new(batches));
        VirtualParquetFile::try_new(schema, stats, source, options)
    }

    /// Total byte length of the file.
    pub fn predicted_size(&self) -> u64 {
        self.size
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn statistics(&self) -> &ChunkStatisticsMatrix {
        &self.stats
    }

    pub fn offset_table(&self) -> &OffsetTable {
        &self.table
    }

    pub fn footer(&self) -> &FooterBlob {
        &self.footer
    }

    /// Footer metadata as the `parquet` crate models it.
    pub fn parquet_metadata(&self) -> &Arc<ParquetMetaData> {
        &self.metadata
    }

    pub fn options(&self) -> &VirtualFileOptions {
        &self.options
    }

    /// Returns the `end - begin + 1` bytes of the inclusive window `[begin, end]`.
    pub fn get_range(&self, begin: u64, end: u64) -> Result<Vec<u8>> {
        self.get_byte_range(ByteRange::new(begin, end))
    }

    pub fn get_byte_range(&self, range: ByteRange) -> Result<Vec<u8>> {
        verify_arg!(range, range.is_valid());
        if range.end >= self.size {
            return Err(Error::invalid_arg(
                "end",
                format!("{} is past the end of a {} byte file", range.end, self.size),
            ));
        }
        trace!("get_range {}..={}", range.begin, range.end);

        let mut out = vec![0u8; range.size() as usize];
        copy_region(&mut out, &range, 0, MAGIC);
        for chunk in self.table.overlapping(&range) {
            self.write_chunk(chunk, &range, &mut out)?;
        }
        let footer_start = self.table.data_end();
        copy_region(&mut out, &range, footer_start, self.footer.as_slice());
        copy_region(
            &mut out,
            &range,
            footer_start + self.footer.len(),
            &self.footer.trailer(),
        );
        Ok(out)
    }

    /// Materializes the pages of `chunk` that intersect `range` into `out`.
    fn write_chunk(&self, chunk: &ChunkLayout, range: &ByteRange, out: &mut [u8]) -> Result<()> {
        let array = self.source.read_chunk(chunk.row_group, chunk.column)?;
        let values = self.chunk_values(chunk, array)?;

        for page in chunk.pages() {
            let page_range = page.range();
            if range.intersect(page_range.clone()).is_none() {
                continue;
            }
            if range.covers(&page_range) {
                let start = (page_range.start - range.begin) as usize;
                let dest = &mut out[start..start + page.size() as usize];
                self.encode_page(chunk, page, &values, dest)?;
            } else {
                trace!(
                    "partial page: row group {} column {} {:?} at {}",
                    chunk.row_group, chunk.column, page.kind, page.offset
                );
                let mut scratch = vec![0u8; page.size() as usize];
                self.encode_page(chunk, page, &values, &mut scratch)?;
                copy_region(out, range, page_range.start, &scratch);
            }
        }
        Ok(())
    }

    /// Validates a chunk returned by the source against the layout.
    fn chunk_values(&self, chunk: &ChunkLayout, array: ArrayRef) -> Result<ChunkValues> {
        let element = chunk_name(chunk);
        let kind = self.kinds[chunk.column];
        if array.len() as u64 != chunk.tuple_count {
            return Err(Error::invalid_data(
                element,
                format!(
                    "source returned {} values, expected {}",
                    array.len(),
                    chunk.tuple_count
                ),
            ));
        }
        verify_data!(source_values, array.null_count() == 0);

        match chunk.data_page.kind {
            PageKind::DictionaryIndices { .. } => {
                let Some(dictionary) = array.as_any_dictionary_opt() else {
                    return Err(Error::invalid_data(
                        element,
                        format!("expected dictionary values, got {}", array.data_type()),
                    ));
                };
                let values = dictionary.values().clone();
                check_plain_kind(&element, values.data_type(), kind)?;
                verify_data!(dictionary_values, values.null_count() == 0);
                let expected = chunk.dictionary_page.map_or(0, |page| page.num_values);
                if values.len() as u64 != expected {
                    return Err(Error::invalid_data(
                        element,
                        format!("dictionary of {} values, expected {expected}", values.len()),
                    ));
                }
                Ok(ChunkValues::Dictionary {
                    indices: dictionary.normalized_keys(),
                    values,
                })
            }
            _ => {
                check_plain_kind(&element, array.data_type(), kind)?;
                Ok(ChunkValues::Plain(array))
            }
        }
    }

    /// Encodes one whole page into `dest`, which must be exactly the page size.
    fn encode_page(
        &self,
        chunk: &ChunkLayout,
        page: &PageLayout,
        values: &ChunkValues,
        dest: &mut [u8],
    ) -> Result<()> {
        let (num_values, payload_size) = match (page.kind, values) {
            (PageKind::Plain, ChunkValues::Plain(array)) => {
                (array.len() as u64, plain_encoded_size(array.as_ref())?)
            }
            (PageKind::Dictionary, ChunkValues::Dictionary { values, .. }) => {
                (values.len() as u64, plain_encoded_size(values.as_ref())?)
            }
            (PageKind::DictionaryIndices { bit_width }, ChunkValues::Dictionary { indices, .. }) => {
                let count = indices.len() as u64;
                let slots = padded_index_count(count).ok_or_else(|| {
                    Error::invalid_data(chunk_name(chunk), format!("{count} indices overflow"))
                })?;
                (count, slots * (bit_width / 8) as u64)
            }
            (kind, _) => {
                return Err(Error::invalid_data(
                    chunk_name(chunk),
                    format!("{kind:?} page without matching values"),
                ));
            }
        };
        let element = || format!("{} {:?} page", chunk_name(chunk), page.kind);
        if payload_size != page.payload_size {
            return Err(Error::layout_mismatch(
                element(),
                page.payload_size,
                payload_size,
            ));
        }
        let header = page.kind.build_header(payload_size, num_values);
        if header.len() as u64 != page.header_size {
            return Err(Error::layout_mismatch(
                format!("{} header", element()),
                page.header_size,
                header.len() as u64,
            ));
        }

        let mut writer = SliceWriter::new(dest);
        writer.put(&header)?;
        match (page.kind, values) {
            (PageKind::Plain, ChunkValues::Plain(array)) => {
                write_plain_values(array.as_ref(), &mut writer)?
            }
            (PageKind::Dictionary, ChunkValues::Dictionary { values, .. }) => {
                write_plain_values(values.as_ref(), &mut writer)?
            }
            (PageKind::DictionaryIndices { bit_width }, ChunkValues::Dictionary { indices, .. }) => {
                write_dictionary_indices(indices, &mut writer, bit_width / 8)?
            }
            _ => unreachable!("page kind checked above"),
        }
        if writer.position() as u64 != page.size() || writer.remaining() != 0 {
            return Err(Error::layout_mismatch(
                element(),
                page.size(),
                writer.position() as u64,
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for VirtualParquetFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualParquetFile")
            .field("size", &self.size)
            .field("num_row_groups", &self.table.num_row_groups())
            .field("num_columns", &self.table.num_columns())
            .field("footer_len", &self.footer.len())
            .finish_non_exhaustive()
    }
}

impl ReadAt for VirtualParquetFile {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        check_range(&range)?;
        let end = range.end.min(self.size);
        match ByteRange::from_range(range.start..end) {
            Some(window) => Ok(self.get_byte_range(window)?),
            None => Ok(Vec::new()),
        }
    }

    fn storage_profile(&self) -> StorageProfile {
        let default = StorageProfile::default();
        StorageProfile {
            min_io_size: default.min_io_size.min(self.options.max_io_size),
            max_io_size: self.options.max_io_size,
        }
    }
}

/// Values of one chunk, shaped for its pages.
enum ChunkValues {
    Plain(ArrayRef),
    Dictionary {
        values: ArrayRef,
        indices: Vec<usize>,
    },
}

fn chunk_name(chunk: &ChunkLayout) -> String {
    format!("chunk[{}, {}]", chunk.row_group, chunk.column)
}

/// Source values of a plain page must be of the column's physical kind, not a
/// dictionary.
fn check_plain_kind(element: &str, data_type: &DataType, kind: ValueKind) -> Result<()> {
    let matches = !matches!(data_type, DataType::Dictionary(..))
        && ValueKind::from_data_type(data_type).is_ok_and(|actual| actual == kind);
    if matches {
        Ok(())
    } else {
        Err(Error::invalid_data(
            element,
            format!("source returned {data_type}, expected {kind}"),
        ))
    }
}

/// Copies the part of `bytes`, placed at file offset `region_start`, that falls within
/// `range` to its position in `out`.
fn copy_region(out: &mut [u8], range: &ByteRange, region_start: u64, bytes: &[u8]) {
    let region = region_start..region_start + bytes.len() as u64;
    if let Some(overlap) = range.intersect(region) {
        let src = (overlap.start - region_start) as usize..(overlap.end - region_start) as usize;
        let dst = (overlap.start - range.begin) as usize;
        out[dst..dst + src.len()].copy_from_slice(&bytes[src]);
    }
}
