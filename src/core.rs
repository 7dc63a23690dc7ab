use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scratch buffer size used by the channel and stream writers.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Range out of bounds: {0}")]
    OutOfBounds(String),

    #[error("No progress: {0}")]
    NoProgress(String),

    #[error("Premature end of data: {0}")]
    PrematureEof(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Writer is closed")]
    WriterClosed,
}

pub type Result<T> = std::result::Result<T, RangeError>;

/// Abstract range writer interface
pub trait RangeWriter: Send {
    /// Write exactly `length` bytes of the source, starting at `offset`,
    /// to `sink`. Calls against one instance may repeat offsets, overlap,
    /// or move backwards; each call produces the same bytes a fresh
    /// single-range read at that offset would.
    fn write_to(&mut self, sink: &mut dyn Write, offset: u64, length: u64) -> Result<()>;

    /// Release the underlying resource. Writers that hold a handle fail
    /// any later `write_to` call; the buffer variant has nothing to
    /// release and stays usable.
    fn close(&mut self) -> Result<()>;
}

/// Create a writer over an in-memory buffer.
pub fn for_bytes(data: impl Into<Arc<[u8]>>) -> Box<dyn RangeWriter> {
    Box::new(crate::buffer::BufferRangeWriter::new(data))
}

/// Create a writer over a filesystem path.
///
/// The file is opened lazily on the first call and reopened through the
/// path if the writer ever has to rewind without a working seek.
pub fn for_path(path: impl Into<PathBuf>) -> Box<dyn RangeWriter> {
    let path = path.into();
    Box::new(crate::channel::ChannelRangeWriter::new(move || {
        fs::File::open(&path)
    }))
}

/// Create a writer over a factory producing seekable channels.
pub fn for_channel<C, F>(open: F) -> Box<dyn RangeWriter>
where
    C: Read + Seek + Send + 'static,
    F: FnMut() -> io::Result<C> + Send + 'static,
{
    Box::new(crate::channel::ChannelRangeWriter::new(open))
}

/// Create a writer over a factory producing forward-only streams.
pub fn for_stream<R, F>(open: F) -> Box<dyn RangeWriter>
where
    R: Read + Send + 'static,
    F: FnMut() -> io::Result<R> + Send + 'static,
{
    Box::new(crate::stream::StreamRangeWriter::new(open))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use std::io::{Cursor, SeekFrom};

    const SOURCE: &[u8] =
        b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!#$%&'()*+,-./:;<=>[]";

    /// Channel that accepts reads but rejects every positioning attempt,
    /// like an archive-backed filesystem channel.
    struct SeekDenied<C>(C);

    impl<C: Read> Read for SeekDenied<C> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl<C> Seek for SeekDenied<C> {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "seek not supported",
            ))
        }
    }

    fn collect(writer: &mut dyn RangeWriter, offset: u64, length: u64) -> Vec<u8> {
        let mut out = Vec::new();
        writer
            .write_to(&mut out, offset, length)
            .expect("range should be writable");
        out
    }

    #[test]
    fn fixture_is_83_bytes() {
        assert_eq!(SOURCE.len(), 83);
    }

    #[test]
    fn every_variant_writes_the_same_range() {
        let mut writers: Vec<Box<dyn RangeWriter>> = vec![
            for_bytes(SOURCE),
            for_channel(|| Ok(Cursor::new(SOURCE.to_vec()))),
            for_channel(|| Ok(SeekDenied(Cursor::new(SOURCE.to_vec())))),
            for_stream(|| Ok(Cursor::new(SOURCE.to_vec()))),
        ];

        for writer in writers.iter_mut() {
            assert_eq!(collect(writer.as_mut(), 10, 50), &SOURCE[10..60]);
        }
    }

    #[quickcheck]
    fn variants_agree_on_any_valid_range(data: Vec<u8>, offset: u16, length: u16) -> TestResult {
        let offset = offset as u64;
        let length = length as u64;
        if offset + length > data.len() as u64 {
            return TestResult::discard();
        }

        let expected = &data[offset as usize..(offset + length) as usize];

        let channel_data = data.clone();
        let denied_data = data.clone();
        let stream_data = data.clone();
        let mut writers: Vec<Box<dyn RangeWriter>> = vec![
            for_bytes(data.clone()),
            for_channel(move || Ok(Cursor::new(channel_data.clone()))),
            for_channel(move || Ok(SeekDenied(Cursor::new(denied_data.clone())))),
            for_stream(move || Ok(Cursor::new(stream_data.clone()))),
        ];

        TestResult::from_bool(
            writers
                .iter_mut()
                .all(|w| collect(w.as_mut(), offset, length) == expected),
        )
    }
}
