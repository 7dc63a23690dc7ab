use std::io::Write;
use std::sync::Arc;

use crate::core::{RangeError, RangeWriter, Result};

/// Streams ranges out of an immutable in-memory buffer.
///
/// Random access is free, so there is no position state: every call is
/// independent of the ones before it. There is no resource to release
/// either, closing is a no-op.
pub struct BufferRangeWriter {
    data: Arc<[u8]>,
}

impl BufferRangeWriter {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl RangeWriter for BufferRangeWriter {
    fn write_to(&mut self, sink: &mut dyn Write, offset: u64, length: u64) -> Result<()> {
        let end = offset.checked_add(length).ok_or_else(|| {
            RangeError::OutOfBounds(format!("range {offset}+{length} overflows"))
        })?;

        if end > self.data.len() as u64 {
            return Err(RangeError::OutOfBounds(format!(
                "range {offset}..{end} exceeds buffer of {} bytes",
                self.data.len()
            )));
        }

        // end <= len, so both bounds fit in usize
        sink.write_all(&self.data[offset as usize..end as usize])?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
