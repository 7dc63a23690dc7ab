//! # Khanda
//!
//! Khanda (खण्ड - "segment" in Sanskrit) writes byte ranges out of larger
//! resources. Give it a buffer, a file, or any factory that can produce a
//! readable source, and it will stream `[offset, offset + length)` slices
//! of that source into whatever `Write` sink you hand it - repeatedly,
//! out of order, and without reopening the source more often than it has to.
//!
//! ## Basic usage
//!
//! ```rust
//! use khanda::for_path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let dir = std::env::temp_dir();
//! # let path = dir.join("khanda-doc.bin");
//! # std::fs::write(&path, vec![0u8; 128])?;
//! let mut writer = for_path(&path);
//!
//! let mut sink = Vec::new();
//! writer.write_to(&mut sink, 100, 20)?; // bytes 100..120
//! writer.write_to(&mut sink, 0, 10)?;   // going backwards is fine
//!
//! writer.close()?;
//! # std::fs::remove_file(&path)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Picking a writer
//!
//! There are three interchangeable implementations behind the
//! [`RangeWriter`] trait, and three helpers that pick one for you:
//!
//! - [`for_bytes`] wraps an in-memory buffer. Random access is free and
//!   every call is independent.
//! - [`for_path`] / [`for_channel`] wrap a seekable channel. Ranges are
//!   served with real seeks. If the channel turns out not to support
//!   positioning (archive-backed filesystems tend not to), the writer
//!   quietly switches to skipping forward by reading, and stays in that
//!   mode for good.
//! - [`for_stream`] wraps a forward-only source such as a decompressor or
//!   a socket. Skipping forward reads and discards; going backwards
//!   reopens the source through your factory.
//!
//! Parsing `bytes=` range headers into the `(offset, length)` pairs these
//! writers consume lives in [`satisfiable_ranges`].
//!
//! ## Some things to know
//!
//! Writers open their source lazily, on the first call, through the
//! factory you construct them with. The same factory is used to reopen
//! the source when a writer without a working seek has to go backwards.
//! That reopen-and-skip is an accepted performance cliff: repeating or
//! rewinding ranges on a seek-incapable source costs a full re-read up to
//! the target offset, in exchange for byte-identical output on every
//! source type.
//!
//! Forward skips are guarded: a source that keeps returning zero bytes
//! without advancing fails the call after a few attempts instead of
//! spinning forever.
//!
//! ## Errors
//!
//! You'll get different errors for different problems:
//! - Out of bounds: the requested range exceeds an in-memory buffer
//! - No progress: forward skipping stalled without reaching the offset
//! - Premature end of data: the source ended mid-range
//! - IO errors: standard Rust IO problems
//! - Writer is closed: you tried to write a range after closing
//!
//! ## Using it from C
//!
//! Build with `--features capi` to get C bindings:
//!
//! ```c
//! #include <khanda.h>
//!
//! khanda_writer_t* writer = khanda_writer_from_path("data.bin");
//! if (!writer) {
//!     fprintf(stderr, "Error: %s\n", khanda_last_error());
//!     return 1;
//! }
//!
//! char buffer[1024];
//! ssize_t n = khanda_write_range(writer, 4096, buffer, sizeof(buffer));
//!
//! khanda_writer_close(writer);
//! ```
//!
//! ## Thread safety
//!
//! A writer instance tracks its position between calls and is meant to be
//! driven from one thread at a time - typically one writer per served
//! response. Independent writers over the same underlying resource are
//! fine to use concurrently, since each owns its own handle.
//!
//! ## Feature flags
//!
//! - `capi`: build the C API

pub mod buffer;
pub mod channel;
pub mod core;
pub mod range;
pub mod stream;

pub use buffer::*;
pub use channel::*;
pub use core::*;
pub use range::*;
pub use stream::*;

#[cfg(feature = "capi")]
pub mod ffi;

use std::io::{self, Read, Seek, SeekFrom};

/// Adapter exposing a [`RangeWriter`] of known length as `std::io::Read`
/// and `Seek`, for libraries that want a plain readable handle.
pub struct RangeReader {
    inner: Box<dyn RangeWriter>,
    len: u64,
    pos: u64,
}

impl RangeReader {
    pub fn new(writer: Box<dyn RangeWriter>, len: u64) -> Self {
        Self {
            inner: writer,
            len,
            pos: 0,
        }
    }

    pub fn into_inner(self) -> Box<dyn RangeWriter> {
        self.inner
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }

        let n = (self.len - self.pos).min(buf.len() as u64) as usize;
        let mut out = &mut buf[..n];
        self.inner
            .write_to(&mut out, self.pos, n as u64)
            .map_err(io::Error::other)?;

        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for RangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(offset) => {
                if offset >= 0 {
                    self.pos.saturating_add(offset as u64)
                } else {
                    self.pos.saturating_sub((-offset) as u64)
                }
            }
            SeekFrom::End(offset) => {
                if offset >= 0 {
                    self.len.saturating_add(offset as u64)
                } else {
                    self.len.saturating_sub((-offset) as u64)
                }
            }
        };

        self.pos = new_pos;
        Ok(new_pos)
    }
}
