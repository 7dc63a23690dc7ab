use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::core::{DEFAULT_BUFFER_SIZE, RangeError, RangeWriter, Result};

/// Streams ranges from a seekable channel.
///
/// The channel is obtained lazily from the factory and repositioned with
/// real seeks while those work. A channel that rejects positioning (an
/// archive-backed filesystem, typically) flips the writer into a
/// read-and-discard skip mode; the switch is permanent for the lifetime
/// of the instance. In that mode a backward range forces the channel to
/// be reopened through the factory and skipped forward from the start,
/// which is the documented performance cliff of seek-incapable channels.
pub struct ChannelRangeWriter<C, F>
where
    C: Read + Seek,
    F: FnMut() -> io::Result<C>,
{
    open_channel: F,
    channel: Option<C>,
    pos: u64,
    native_seek: bool,
    scratch: Vec<u8>,
    closed: bool,
}

impl<C, F> ChannelRangeWriter<C, F>
where
    C: Read + Seek,
    F: FnMut() -> io::Result<C>,
{
    const NO_PROGRESS_LIMIT: usize = 3;

    pub fn new(open_channel: F) -> Self {
        Self::with_buffer_size(open_channel, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(open_channel: F, buffer_size: usize) -> Self {
        Self {
            open_channel,
            channel: None,
            pos: 0,
            native_seek: true,
            scratch: vec![0u8; buffer_size.max(1)],
            closed: false,
        }
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.closed {
            return Err(RangeError::WriterClosed);
        }

        if self.channel.is_none() {
            log::trace!("opening channel");
            self.channel = Some((self.open_channel)()?);
            self.pos = 0;
        }

        Ok(())
    }

    fn skip_to(&mut self, skip_to: u64) -> Result<()> {
        if self.native_seek {
            if self.pos == skip_to {
                return Ok(());
            }

            let channel = self.channel.as_mut().ok_or(RangeError::WriterClosed)?;
            match channel.seek(SeekFrom::Start(skip_to)) {
                Ok(_) => {
                    self.pos = skip_to;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Unsupported => {
                    log::debug!("channel rejected seek to {skip_to}, falling back to read-skip");
                    self.native_seek = false;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.fallback_skip_to(skip_to)
    }

    fn fallback_skip_to(&mut self, skip_to: u64) -> Result<()> {
        if skip_to < self.pos {
            log::debug!(
                "cannot rewind from {} to {skip_to}, reopening channel",
                self.pos
            );
            self.channel = None;
            self.ensure_open()?;
        }

        let channel = self.channel.as_mut().ok_or(RangeError::WriterClosed)?;
        let mut no_progress = 0usize;

        while self.pos < skip_to {
            let want = (skip_to - self.pos).min(self.scratch.len() as u64) as usize;
            match channel.read(&mut self.scratch[..want]) {
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
        let channel = self.channel.as_mut().ok_or(RangeError::WriterClosed)?;
        let mut remaining = length;

        while remaining > 0 {
            let want = remaining.min(self.scratch.len() as u64) as usize;
            match channel.read(&mut self.scratch[..want]) {
                Ok(0) => {
                    return Err(RangeError::PrematureEof(format!(
                        "channel ended at {} with {remaining} bytes of the range left",
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

impl<C, F> RangeWriter for ChannelRangeWriter<C, F>
where
    C: Read + Seek + Send,
    F: FnMut() -> io::Result<C> + Send,
{
    fn write_to(&mut self, sink: &mut dyn Write, offset: u64, length: u64) -> Result<()> {
        self.ensure_open()?;
        self.skip_to(offset)?;
        self.copy_to(sink, length)
    }

    fn close(&mut self) -> Result<()> {
        self.channel = None;
        self.closed = true;
        Ok(())
    }
}
