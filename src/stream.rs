use std::io::{self, ErrorKind, Read, Write};

use crate::core::{DEFAULT_BUFFER_SIZE, RangeError, RangeWriter, Result};

/// Streams ranges from a forward-only source.
///
/// The source has no positioning at all, so the writer always skips by
/// reading and discarding. Any range starting before the current position
/// throws the stream away and opens a fresh one through the factory.
pub struct StreamRangeWriter<R, F>
where
    R: Read,
    F: FnMut() -> io::Result<R>,
{
    open_stream: F,
    stream: Option<R>,
    pos: u64,
    scratch: Vec<u8>,
    closed: bool,
}

impl<R, F> StreamRangeWriter<R, F>
where
    R: Read,
    F: FnMut() -> io::Result<R>,
{
    const NO_PROGRESS_LIMIT: usize = 3;

    pub fn new(open_stream: F) -> Self {
        Self::with_buffer_size(open_stream, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(open_stream: F, buffer_size: usize) -> Self {
        Self {
            open_stream,
            stream: None,
            pos: 0,
            scratch: vec![0u8; buffer_size.max(1)],
            closed: false,
        }
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.closed {
            return Err(RangeError::WriterClosed);
        }

        if self.stream.is_none() {
            log::trace!("opening stream");
            self.stream = Some((self.open_stream)()?);
            self.pos = 0;
        }

        Ok(())
    }

    fn skip_to(&mut self, skip_to: u64) -> Result<()> {
        if skip_to < self.pos {
            log::debug!(
                "cannot rewind from {} to {skip_to}, reopening stream",
                self.pos
            );
            self.stream = None;
            self.ensure_open()?;
        }

        let stream = self.stream.as_mut().ok_or(RangeError::WriterClosed)?;
        let mut no_progress = 0usize;

        while self.pos < skip_to {
            let want = (skip_to - self.pos).min(self.scratch.len() as u64) as usize;
            match stream.read(&mut self.scratch[..want]) {
                Ok(0) => {
                    no_progress += 1;
                    if no_progress > Self::NO_PROGRESS_LIMIT {
                        return Err(RangeError::NoProgress(format!(
                            "stalled at {} while skipping to {skip_to}",
                            self.pos
                        )));
                    }
                }
                Ok(n) => {
                    no_progress = 0;
                    self.pos += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    fn copy_to(&mut self, sink: &mut dyn Write, length: u64) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(RangeError::WriterClosed)?;
        let mut remaining = length;

        while remaining > 0 {
            let want = remaining.min(self.scratch.len() as u64) as usize;
            match stream.read(&mut self.scratch[..want]) {
                Ok(0) => {
                    return Err(RangeError::PrematureEof(format!(
                        "stream ended at {} with {remaining} bytes of the range left",
                        self.pos
                    )));
                }
                Ok(n) => {
                    sink.write_all(&self.scratch[..n])?;
                    self.pos += n as u64;
                    remaining -= n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

impl<R, F> RangeWriter for StreamRangeWriter<R, F>
where
    R: Read + Send,
    F: FnMut() -> io::Result<R> + Send,
{
    fn write_to(&mut self, sink: &mut dyn Write, offset: u64, length: u64) -> Result<()> {
        self.ensure_open()?;
        self.skip_to(offset)?;
        self.copy_to(sink, length)
    }

    fn close(&mut self) -> Result<()> {
        self.stream = None;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempdir::TempDir;

    const SOURCE: &[u8] =
        b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!#$%&'()*+,-./:;<=>[]";

    struct Stall;

    impl Read for Stall {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    fn collect<R, F>(writer: &mut StreamRangeWriter<R, F>, offset: u64, length: u64) -> Vec<u8>
    where
        R: Read + Send,
        F: FnMut() -> io::Result<R> + Send,
    {
        let mut out = Vec::new();
        writer.write_to(&mut out, offset, length).unwrap();
        out
    }

    #[test]
    fn forward_ranges_reuse_one_stream() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opens);

        let mut writer = StreamRangeWriter::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(io::Cursor::new(SOURCE.to_vec()))
        });

        assert_eq!(collect(&mut writer, 10, 20), &SOURCE[10..30]);
        assert_eq!(collect(&mut writer, 50, 10), &SOURCE[50..60]);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test_log::test]
    fn backward_range_reopens_the_stream() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opens);

        let mut writer = StreamRangeWriter::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(io::Cursor::new(SOURCE.to_vec()))
        });

        assert_eq!(collect(&mut writer, 55, 10), &SOURCE[55..65]);
        assert_eq!(collect(&mut writer, 35, 10), &SOURCE[35..45]);
        assert_eq!(collect(&mut writer, 10, 20), &SOURCE[10..30]);
        assert_eq!(opens.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn repeated_range_is_idempotent() {
        let mut writer = StreamRangeWriter::new(|| Ok(io::Cursor::new(SOURCE.to_vec())));

        let first = collect(&mut writer, 20, 30);
        let second = collect(&mut writer, 20, 30);
        assert_eq!(first, second);
        assert_eq!(first, &SOURCE[20..50]);
    }

    #[test]
    fn tiny_scratch_buffer_still_writes_exact_ranges() {
        let mut writer =
            StreamRangeWriter::with_buffer_size(|| Ok(io::Cursor::new(SOURCE.to_vec())), 7);

        assert_eq!(collect(&mut writer, 55, 10), &SOURCE[55..65]);
        assert_eq!(collect(&mut writer, 10, 20), &SOURCE[10..30]);
    }

    #[test]
    fn stalled_skip_fails_after_bounded_retries() {
        let mut writer = StreamRangeWriter::new(|| Ok(Stall));
        let mut out = Vec::new();

        let err = writer.write_to(&mut out, 5, 1).unwrap_err();
        assert!(matches!(err, RangeError::NoProgress(_)));
    }

    #[test]
    fn short_stream_fails_with_premature_eof() {
        let mut writer = StreamRangeWriter::new(|| Ok(io::Cursor::new(SOURCE[..10].to_vec())));
        let mut out = Vec::new();

        let err = writer.write_to(&mut out, 0, 20).unwrap_err();
        assert!(matches!(err, RangeError::PrematureEof(_)));
    }

    #[test]
    fn write_after_close_fails() {
        let mut writer = StreamRangeWriter::new(|| Ok(io::Cursor::new(SOURCE.to_vec())));
        assert_eq!(collect(&mut writer, 0, 5), &SOURCE[..5]);

        writer.close().unwrap();

        let mut out = Vec::new();
        let err = writer.write_to(&mut out, 0, 5).unwrap_err();
        assert!(matches!(err, RangeError::WriterClosed));
    }

    #[test_log::test]
    fn reads_ranges_from_a_compressed_stream() {
        let dir = TempDir::new("khanda").unwrap();
        let path = dir.path().join("source.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SOURCE).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut writer =
            StreamRangeWriter::new(move || fs::File::open(&path).map(GzDecoder::new));

        assert_eq!(collect(&mut writer, 10, 50), &SOURCE[10..60]);
        // rewinding a decompressor means decoding from scratch
        assert_eq!(collect(&mut writer, 0, 10), &SOURCE[..10]);
    }
}
