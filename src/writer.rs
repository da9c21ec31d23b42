//! # Interlocked Writer

use std::io::{self, BufWriter, Write};
use std::sync::{Mutex, PoisonError};

/// An output sink that is safe to share between producer threads.
///
/// Every call to [`write_all`](Self::write_all) writes its whole payload and
/// flushes it while holding the lock, so concurrent
/// [`Logger::write`](crate::Logger::write) calls never interleave inside a
/// single rendered event.
pub struct InterlockedWriter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
}

impl InterlockedWriter {
    /// Wraps a destination implementing `Write + Send`, such as a file,
    /// `stdout`, or an in-memory buffer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(Box::new(writer))),
        }
    }

    /// Writes the payload and flushes the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error raised by either the write or the flush.
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(buf)?;
        writer.flush()
    }
}

impl std::fmt::Debug for InterlockedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterlockedWriter").finish_non_exhaustive()
    }
}
