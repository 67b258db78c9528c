//! Virtual Parquet files.
//!
//! A [`VirtualParquetFile`] answers arbitrary byte-range reads of a Parquet file that
//! is never materialized as a whole. The size and position of every page are
//! predicted up front from per-chunk statistics ([`stats`]); each read then encodes
//! only the pages it overlaps, pulling values from a [`ColumnSource`].

pub mod column_writer;
pub mod constants;
pub mod file;
pub mod footer;
pub mod layout;
pub mod options;
pub mod page_header;
pub mod predictor;
pub mod source;
pub mod stats;
pub mod value_kind;

#[cfg(test)]
mod tests;

pub use file::VirtualParquetFile;
pub use layout::{ChunkLayout, OffsetTable, PageKind, PageLayout, SizePredictor};
pub use options::VirtualFileOptions;
pub use source::{ColumnSource, InMemoryColumnSource};
pub use stats::{ChunkInfo, ChunkStatisticsMatrix, DictionaryChunkInfo, ZoneMap, ZoneValue};
pub use value_kind::ValueKind;
