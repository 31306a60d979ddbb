//! Implementations of embedded_io_async traits for cursor streams.
//!
//! These bridge [`CursorStream`] to the embedded_io_async ecosystem. The trait
//! methods take `&mut self` and simply forward to the stream's `&self` methods.

use crate::{
    domain::{AccessError, SectorDevice},
    infrastructure::streaming::{CursorStream, SeekFrom},
};
use embedded_io_async::{ErrorType, Read, Seek, Write};

// Convert embedded_io_async's SeekFrom to ours
fn convert_seek_from<E>(from: embedded_io_async::SeekFrom) -> Result<SeekFrom, AccessError<E>> {
    match from {
        embedded_io_async::SeekFrom::Start(n) => i64::try_from(n)
            .map(SeekFrom::Start)
            .map_err(|_| AccessError::InvalidOffset),
        embedded_io_async::SeekFrom::End(n) => Ok(SeekFrom::End(n)),
        embedded_io_async::SeekFrom::Current(n) => Ok(SeekFrom::Current(n)),
    }
}

impl<D: SectorDevice> ErrorType for CursorStream<D> {
    type Error = AccessError<D::Error>;
}

impl<D: SectorDevice> Read for CursorStream<D> {
    /// Reads at the cursor. Reaching the end of the device is reported as a short
    /// (or zero-length) read, the end-of-file convention of the `Read` trait.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match CursorStream::read(self, buf).await {
            Err(AccessError::EndOfStream { transferred }) => Ok(transferred),
            other => other,
        }
    }
}

impl<D: SectorDevice> Write for CursorStream<D> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        CursorStream::write(self, buf).await
    }

    /// Writes reach the device before returning; there is nothing to flush.
    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<D: SectorDevice> Seek for CursorStream<D> {
    async fn seek(&mut self, pos: embedded_io_async::SeekFrom) -> Result<u64, Self::Error> {
        CursorStream::seek(self, convert_seek_from(pos)?).await
    }
}
