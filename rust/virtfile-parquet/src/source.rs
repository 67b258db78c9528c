//! Column data supplied on demand to the range materializer.

use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch};
use virtfile_common::{Result, error::Error};

/// Supplier of column chunk values.
///
/// `read_chunk` must be deterministic: repeated calls with the same arguments return
/// equal values. The virtual file reads each overlapping chunk once per range request
/// and keeps nothing between requests. Implementations are called concurrently when
/// the virtual file is shared across threads.
pub trait ColumnSource: Send + Sync + 'static {
    /// Returns the values of `column` within `row_group`.
    fn read_chunk(&self, row_group: usize, column: usize) -> Result<ArrayRef>;
}

impl<T> ColumnSource for Arc<T>
where
    T: ColumnSource + ?Sized,
{
    fn read_chunk(&self, row_group: usize, column: usize) -> Result<ArrayRef> {
        self.as_ref().read_chunk(row_group, column)
    }
}

/// Column source over record batches held in memory, one batch per row group.
#[derive(Debug, Clone)]
pub struct InMemoryColumnSource {
    batches: Arc<[RecordBatch]>,
}

impl InMemoryColumnSource {
    pub fn new(batches: impl Into<Arc<[RecordBatch]>>) -> InMemoryColumnSource {
        InMemoryColumnSource {
            batches: batches.into(),
        }
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }
}

impl ColumnSource for InMemoryColumnSource {
    fn read_chunk(&self, row_group: usize, column: usize) -> Result<ArrayRef> {
        let batch = self.batches.get(row_group).ok_or_else(|| {
            Error::invalid_arg(
                "row_group",
                format!("{row_group} out of {} row groups", self.batches.len()),
            )
        })?;
        if column >= batch.num_columns() {
            return Err(Error::invalid_arg(
                "column",
                format!("{column} out of {} columns", batch.num_columns()),
            ));
        }
        Ok(batch.column(column).clone())
    }
}
