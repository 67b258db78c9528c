//! Sequential `std::io::Read` view over a `ReadAt` source.

use std::io::{Read, Seek, SeekFrom};

use crate::ReadAt;

/// Streams a `ReadAt` source front to back through `std::io::Read` and `std::io::Seek`,
/// so that it can be handed to `std::io::copy` or to readers expecting a file handle.
///
/// Every `read` call issues at most one `read_at` request, no larger than the source's
/// `max_io_size`.
pub struct ReadAdapter<R> {
    inner: R,
    pos: u64,
    size: u64,
    max_io_size: u64,
}

impl<R: ReadAt> ReadAdapter<R> {
    /// Wraps `inner`, positioned at the start. Queries the source size once.
    pub fn new(inner: R) -> std::io::Result<Self> {
        let size = inner.size()?;
        let max_io_size = inner.storage_profile().max_io_size.max(1) as u64;
        Ok(ReadAdapter {
            inner,
            pos: 0,
            size,
            max_io_size,
        })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ReadAt> Read for ReadAdapter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.size.saturating_sub(self.pos);
        let len = (buf.len() as u64).min(remaining).min(self.max_io_size);
        if len == 0 {
            return Ok(0);
        }
        let bytes = self.inner.read_at(self.pos..self.pos + len)?;
        if bytes.len() as u64 != len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("requested {len} bytes at {}, got {}", self.pos, bytes.len()),
            ));
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        self.pos += len;
        Ok(bytes.len())
    }
}

fn shift(base: u64, delta: i64) -> u64 {
    if delta >= 0 {
        base.saturating_add(delta as u64)
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}

impl<R: ReadAt> Seek for ReadAdapter<R> {
    /// Positions past the end are accepted; subsequent reads return EOF.
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.pos = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::End(delta) => shift(self.size, delta),
            SeekFrom::Current(delta) => shift(self.pos, delta),
        };
        Ok(self.pos)
    }
}
