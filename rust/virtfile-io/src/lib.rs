//! Positional reads over virtual files.
//!
//! [`ReadAt`] is the seam between byte producers (a virtual file, a memory buffer) and
//! their consumers; [`ByteRange`] is the inclusive window range servers ask for, and
//! [`ReadAdapter`] turns any `ReadAt` into `std::io::Read + Seek`.

use std::{ops::Range, sync::Arc};

pub mod memory;
pub mod read_adapter;

pub use read_adapter::ReadAdapter;

/// Random-access byte source of known size.
pub trait ReadAt: Send + Sync + 'static {
    fn size(&self) -> std::io::Result<u64>;

    /// Returns the bytes of the half-open `range`.
    ///
    /// The result is shorter than requested only when `range` runs past the end of
    /// the source, and empty when it starts at or past the end. An inverted range
    /// (`start > end`) fails with `InvalidInput`, see [`check_range`].
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>>;

    /// Request sizes this source handles efficiently.
    fn storage_profile(&self) -> StorageProfile;
}

/// Rejects an inverted `read_at` range with `InvalidInput`.
pub fn check_range(range: &Range<u64>) -> std::io::Result<()> {
    if range.start > range.end {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("inverted range {}..{}", range.start, range.end),
        ));
    }
    Ok(())
}

/// Inclusive byte window `[begin, end]`.
///
/// HTTP `Range: bytes=b-e` requests and storage-virtualization layers describe reads
/// this way; `Range<u64>` is the half-open equivalent used by [`ReadAt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub begin: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(begin: u64, end: u64) -> ByteRange {
        ByteRange { begin, end }
    }

    /// Number of bytes covered by the window, `end - begin + 1`.
    ///
    /// Callers must have validated `begin <= end`.
    pub fn size(&self) -> u64 {
        self.end - self.begin + 1
    }

    /// Whether `begin <= end`, i.e. the window covers at least one byte.
    pub fn is_valid(&self) -> bool {
        self.begin <= self.end
    }

    /// Converts a non-empty half-open range into the inclusive form.
    pub fn from_range(range: Range<u64>) -> Option<ByteRange> {
        (range.start < range.end).then(|| ByteRange::new(range.start, range.end - 1))
    }

    /// Half-open equivalent of this window.
    pub fn to_range(&self) -> Range<u64> {
        self.begin..self.end + 1
    }

    /// Intersection with the half-open `other`, as a half-open range.
    pub fn intersect(&self, other: Range<u64>) -> Option<Range<u64>> {
        let start = self.begin.max(other.start);
        let end = (self.end + 1).min(other.end);
        (start < end).then_some(start..end)
    }

    /// Whether this window contains every byte of the half-open `other`.
    pub fn covers(&self, other: &Range<u64>) -> bool {
        self.begin <= other.start && other.end <= self.end + 1
    }
}

/// Preferred request sizes of a [`ReadAt`] source.
///
/// Consumers streaming a source (such as [`ReadAdapter`]) never issue a single request
/// larger than `max_io_size`.
#[derive(Debug, Clone)]
pub struct StorageProfile {
    /// Requests below this size are dominated by per-request overhead.
    pub min_io_size: usize,
    /// Upper bound on a single request.
    pub max_io_size: usize,
}

const KIB: usize = 1024;

impl Default for StorageProfile {
    fn default() -> StorageProfile {
        StorageProfile {
            min_io_size: 4 * KIB,
            max_io_size: 4 * KIB * KIB,
        }
    }
}

impl<R: ReadAt + ?Sized> ReadAt for Arc<R> {
    fn size(&self) -> std::io::Result<u64> {
        (**self).size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        (**self).read_at(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        (**self).storage_profile()
    }
}
