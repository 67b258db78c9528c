//! Phase-one layout planning.
//!
//! [`plan`] folds the chunks of a statistics matrix, in row-group-major order, through
//! a [`SizePredictor`] into an [`OffsetTable`]. The table is the only state shared
//! between size prediction and range materialization and is never mutated once built.

use virtfile_common::{Result, error::Error};
use virtfile_io::ByteRange;

use crate::{
    constants::{MAX_PAGE_SIZE, MAX_PAGE_VALUES},
    page_header::build_page_header,
    stats::{ChunkInfo, ChunkStatisticsMatrix},
};

/// Kind of a page within a column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Data page of plain-encoded values.
    Plain,
    /// Dictionary page of plain-encoded distinct values.
    Dictionary,
    /// Data page of dictionary indices stored with `bit_width` bits each.
    DictionaryIndices { bit_width: u8 },
}

impl PageKind {
    pub fn is_dictionary_page(&self) -> bool {
        matches!(self, PageKind::Dictionary)
    }

    /// Header bytes of a page of this kind; see [`build_page_header`].
    pub fn build_header(&self, payload_size: u64, num_values: u64) -> Vec<u8> {
        match *self {
            PageKind::Plain => build_page_header(payload_size, num_values, false, false, 0),
            PageKind::Dictionary => build_page_header(payload_size, num_values, true, true, 0),
            PageKind::DictionaryIndices { bit_width } => {
                build_page_header(payload_size, num_values, false, true, bit_width)
            }
        }
    }
}

/// Predicted shape of one page, before placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictedPage {
    pub kind: PageKind,
    pub num_values: u64,
    pub header_size: u64,
    pub payload_size: u64,
}

impl PredictedPage {
    /// Predicts a page from its payload size, measuring the header it will carry.
    pub fn new(kind: PageKind, num_values: u64, payload_size: u64) -> Result<PredictedPage> {
        if num_values > MAX_PAGE_VALUES || payload_size > MAX_PAGE_SIZE {
            return Err(Error::invalid_arg(
                "chunk_info",
                format!(
                    "page of {num_values} values over {payload_size} bytes exceeds the format limit"
                ),
            ));
        }
        let header_size = kind.build_header(payload_size, num_values).len() as u64;
        let page = PredictedPage {
            kind,
            num_values,
            header_size,
            payload_size,
        };
        // Thrift page sizes are i32.
        if page.size() > MAX_PAGE_SIZE {
            return Err(Error::invalid_arg(
                "chunk_info",
                format!("page of {} bytes exceeds the format limit", page.size()),
            ));
        }
        Ok(page)
    }

    pub fn size(&self) -> u64 {
        self.header_size + self.payload_size
    }
}

/// Predicted physical shape of one column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictedChunkInfo {
    pub dictionary_page: Option<PredictedPage>,
    pub data_page: PredictedPage,
}

impl PredictedChunkInfo {
    /// Bytes the chunk occupies in the file.
    pub fn physical_size(&self) -> u64 {
        self.dictionary_page.map_or(0, |page| page.size()) + self.data_page.size()
    }
}

/// Chunk handed to a [`SizePredictor`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkDescriptor<'a> {
    pub row_group: usize,
    pub column: usize,
    pub info: &'a ChunkInfo,
}

/// Format-specific size prediction, invoked by [`plan`] for every chunk.
pub trait SizePredictor {
    /// Bytes preceding the first chunk (the leading magic).
    fn data_offset(&self) -> u64;

    /// Predicts the pages of one chunk. Must agree exactly with the bytes the
    /// materializer emits for it.
    fn predict_chunk(&self, chunk: &ChunkDescriptor) -> Result<PredictedChunkInfo>;
}

/// Placed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub kind: PageKind,
    /// Absolute file offset of the first header byte.
    pub offset: u64,
    pub header_size: u64,
    pub payload_size: u64,
    pub num_values: u64,
}

impl PageLayout {
    fn place(page: &PredictedPage, offset: u64) -> PageLayout {
        PageLayout {
            kind: page.kind,
            offset,
            header_size: page.header_size,
            payload_size: page.payload_size,
            num_values: page.num_values,
        }
    }

    pub fn size(&self) -> u64 {
        self.header_size + self.payload_size
    }

    /// Half-open file range of the page.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.offset..self.offset + self.size()
    }
}

/// Placed column chunk: an optional dictionary page immediately followed by the
/// data page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub row_group: usize,
    pub column: usize,
    pub tuple_count: u64,
    pub dictionary_page: Option<PageLayout>,
    pub data_page: PageLayout,
}

impl ChunkLayout {
    pub fn has_dictionary_page(&self) -> bool {
        self.dictionary_page.is_some()
    }

    pub fn start(&self) -> u64 {
        self.dictionary_page
            .map_or(self.data_page.offset, |page| page.offset)
    }

    pub fn end(&self) -> u64 {
        self.data_page.range().end
    }

    pub fn size(&self) -> u64 {
        self.end() - self.start()
    }

    pub fn range(&self) -> std::ops::Range<u64> {
        self.start()..self.end()
    }

    /// Pages in file order.
    pub fn pages(&self) -> impl Iterator<Item = &PageLayout> {
        self.dictionary_page.iter().chain(std::iter::once(&self.data_page))
    }
}

/// Frozen placement of every chunk, in row-group-major order.
#[derive(Debug, Clone)]
pub struct OffsetTable {
    chunks: Vec<ChunkLayout>,
    num_columns: usize,
    num_row_groups: usize,
    data_start: u64,
    data_end: u64,
}

impl OffsetTable {
    pub fn chunks(&self) -> &[ChunkLayout] {
        &self.chunks
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn num_row_groups(&self) -> usize {
        self.num_row_groups
    }

    /// Offset of the first chunk byte.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Offset one past the last chunk byte, where the footer begins.
    pub fn data_end(&self) -> u64 {
        self.data_end
    }

    /// Layout of `column` within `row_group`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, row_group: usize, column: usize) -> &ChunkLayout {
        assert!(column < self.num_columns);
        &self.chunks[row_group * self.num_columns + column]
    }

    /// Chunks of `row_group`, ordered by column.
    pub fn row_group(&self, row_group: usize) -> &[ChunkLayout] {
        let start = row_group * self.num_columns;
        &self.chunks[start..start + self.num_columns]
    }

    /// Chunks intersecting `range`, in file order.
    pub fn overlapping(&self, range: &ByteRange) -> &[ChunkLayout] {
        let first = self.chunks.partition_point(|chunk| chunk.end() <= range.begin);
        let last = self.chunks.partition_point(|chunk| chunk.start() <= range.end);
        &self.chunks[first..last.max(first)]
    }
}

/// Runs phase one: places every chunk of `stats` back to back, starting at the
/// predictor's data offset.
pub fn plan<P>(predictor: &P, stats: &ChunkStatisticsMatrix) -> Result<OffsetTable>
where
    P: SizePredictor + ?Sized,
{
    let num_columns = stats.num_columns();
    let num_row_groups = stats.num_row_groups();
    let data_start = predictor.data_offset();

    let (chunks, data_end) = (0..num_row_groups)
        .flat_map(|row_group| (0..num_columns).map(move |column| (row_group, column)))
        .try_fold(
            (Vec::with_capacity(num_columns * num_row_groups), data_start),
            |(mut chunks, offset), (row_group, column)| -> Result<_> {
                let info = stats.get(column, row_group);
                let predicted = predictor.predict_chunk(&ChunkDescriptor {
                    row_group,
                    column,
                    info,
                })?;
                let dictionary_page = predicted
                    .dictionary_page
                    .map(|page| PageLayout::place(&page, offset));
                let data_offset = dictionary_page.map_or(offset, |page| page.range().end);
                let chunk = ChunkLayout {
                    row_group,
                    column,
                    tuple_count: info.tuple_count,
                    dictionary_page,
                    data_page: PageLayout::place(&predicted.data_page, data_offset),
                };
                let next = chunk.end();
                chunks.push(chunk);
                Ok((chunks, next))
            },
        )?;

    Ok(OffsetTable {
        chunks,
        num_columns,
        num_row_groups,
        data_start,
        data_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predicts a plain page carrying `uncompressed_size` bytes, and a dictionary
    /// page of `unique_values_byte_length` bytes when present.
    struct RawPredictor;

    impl SizePredictor for RawPredictor {
        fn data_offset(&self) -> u64 {
            4
        }

        fn predict_chunk(&self, chunk: &ChunkDescriptor) -> Result<PredictedChunkInfo> {
            let info = chunk.info;
            let dictionary_page = info
                .dictionary
                .map(|dict| {
                    PredictedPage::new(
                        PageKind::Dictionary,
                        dict.unique_value_count,
                        dict.unique_values_byte_length,
                    )
                })
                .transpose()?;
            Ok(PredictedChunkInfo {
                dictionary_page,
                data_page: PredictedPage::new(
                    PageKind::Plain,
                    info.tuple_count,
                    info.uncompressed_size,
                )?,
            })
        }
    }

    fn matrix() -> ChunkStatisticsMatrix {
        ChunkStatisticsMatrix::try_new(vec![
            vec![ChunkInfo::new(8, 2), ChunkInfo::new(12, 3)],
            vec![
                ChunkInfo::new(2, 2).with_dictionary(1, 6),
                ChunkInfo::new(3, 3),
            ],
        ])
        .unwrap()
    }

    #[test]
    fn test_plan_row_group_major_order() {
        let table = plan(&RawPredictor, &matrix()).unwrap();
        assert_eq!(table.num_row_groups(), 2);
        assert_eq!(table.num_columns(), 2);
        let order = table
            .chunks()
            .iter()
            .map(|chunk| (chunk.row_group, chunk.column))
            .collect::<Vec<_>>();
        assert_eq!(order, [(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_plan_chunks_are_contiguous() {
        let table = plan(&RawPredictor, &matrix()).unwrap();
        assert_eq!(table.data_start(), 4);
        assert_eq!(table.chunks()[0].start(), 4);
        for pair in table.chunks().windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert_eq!(table.chunks().last().unwrap().end(), table.data_end());

        let dict_chunk = table.get(0, 1);
        let dict_page = dict_chunk.dictionary_page.unwrap();
        assert_eq!(dict_page.offset, dict_chunk.start());
        assert_eq!(dict_page.range().end, dict_chunk.data_page.offset);
        assert_eq!(dict_chunk.pages().count(), 2);
        assert_eq!(table.get(1, 0).pages().count(), 1);
    }

    #[test]
    fn test_plan_header_sizes_match_encoder() {
        let table = plan(&RawPredictor, &matrix()).unwrap();
        for chunk in table.chunks() {
            for page in chunk.pages() {
                let header = page.kind.build_header(page.payload_size, page.num_values);
                assert_eq!(header.len() as u64, page.header_size);
            }
        }
    }

    #[test]
    fn test_overlapping() {
        let table = plan(&RawPredictor, &matrix()).unwrap();
        let chunks = table.chunks();

        let all = table.overlapping(&ByteRange::new(0, table.data_end() + 100));
        assert_eq!(all.len(), 4);

        assert!(table.overlapping(&ByteRange::new(0, 3)).is_empty());
        assert!(table.overlapping(&ByteRange::new(table.data_end(), table.data_end() + 5)).is_empty());

        let single = table.overlapping(&ByteRange::new(chunks[1].start(), chunks[1].end() - 1));
        assert_eq!(single, &chunks[1..2]);

        let straddle = table.overlapping(&ByteRange::new(chunks[1].end() - 1, chunks[2].start()));
        assert_eq!(straddle, &chunks[1..3]);
    }

    #[test]
    fn test_predicted_page_limits() {
        let page = PredictedPage::new(PageKind::Plain, 2, 8).unwrap();
        assert_eq!(page.size(), 31);

        for (num_values, payload_size) in [
            (u64::MAX, 0),
            (MAX_PAGE_VALUES + 1, 8),
            (2, u64::MAX),
            (2, MAX_PAGE_SIZE),
        ] {
            let err = PredictedPage::new(PageKind::Plain, num_values, payload_size).unwrap_err();
            assert!(matches!(
                err.kind(),
                virtfile_common::error::ErrorKind::InvalidArgument { .. }
            ));
        }
    }

    #[test]
    fn test_empty_matrix() {
        let table = plan(&RawPredictor, &ChunkStatisticsMatrix::try_new(vec![]).unwrap()).unwrap();
        assert!(table.chunks().is_empty());
        assert_eq!(table.data_end(), 4);
        assert!(table.overlapping(&ByteRange::new(0, 10)).is_empty());
    }
}
