//! Implementation of `ReadAt` for memory buffers.

use std::ops::Range;

use crate::{ReadAt, StorageProfile, check_range};

impl ReadAt for Vec<u8> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        check_range(&range)?;
        let start = range.start as usize;
        let end = std::cmp::min(range.end as usize, self.len());
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self[start..end].to_vec())
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            max_io_size: StorageProfile::default().max_io_size,
        }
    }
}
