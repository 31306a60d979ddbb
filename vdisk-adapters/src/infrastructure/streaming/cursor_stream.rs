//! Cursor-tracking stream over an aligned device.

use crate::{
    adapters::AlignedDevice,
    domain::{AccessError, BlockDescriptor, SectorDevice},
    infrastructure::streaming::SeekFrom,
};
use alloc::vec::Vec;
use async_lock::Mutex;

/// A read/write/seek stream over an [`AlignedDevice`].
///
/// The stream keeps one cursor. [`read`](Self::read), [`write`](Self::write) and
/// [`seek`](Self::seek) hold the cursor lock for their whole duration, so two
/// sequential callers never interleave their transfers with each other's cursor
/// updates. [`read_at`](Self::read_at) and [`write_at`](Self::write_at) go straight to
/// the device and neither read nor move the cursor; they are only ordered against
/// cursor operations by the device's own locking.
///
/// The stream owns its device, so a device backs at most one cursor.
///
/// # Examples
///
/// ```ignore
/// use vdisk_adapters::{AlignedDevice, CursorStream, SeekFrom};
///
/// let stream = CursorStream::new(AlignedDevice::open(device).await?);
///
/// stream.write(b"header").await?;
/// assert_eq!(stream.seek(SeekFrom::Current(0)).await?, 6);
///
/// stream.seek(SeekFrom::Start(0)).await?;
/// let mut buf = [0u8; 6];
/// stream.read(&mut buf).await?;
/// ```
pub struct CursorStream<D: SectorDevice> {
    device: AlignedDevice<D>,
    cursor: Mutex<u64>,
}

impl<D: SectorDevice> CursorStream<D> {
    /// Wrap `device` with the cursor at the start of the device.
    pub fn new(device: AlignedDevice<D>) -> Self {
        Self {
            device,
            cursor: Mutex::new(0),
        }
    }

    /// Read at the cursor and advance it by the bytes read.
    ///
    /// The cursor also advances by the partial count carried by an error.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, AccessError<D::Error>> {
        let mut cursor = self.cursor.lock().await;
        let result = self.device.read_at(buf, *cursor).await;
        let n = transferred(&result);
        *cursor = cursor.checked_add(n as u64).ok_or(AccessError::OffsetOverflow)?;
        log::debug!("Read returning {}, len(buf) = {}, cursor = {}", n, buf.len(), *cursor);
        result
    }

    /// Write at the cursor and advance it by the bytes written.
    ///
    /// The cursor also advances by the partial count carried by an error.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, AccessError<D::Error>> {
        let mut cursor = self.cursor.lock().await;
        let result = self.device.write_at(buf, *cursor).await;
        let n = transferred(&result);
        *cursor = cursor.checked_add(n as u64).ok_or(AccessError::OffsetOverflow)?;
        log::debug!("Write returning {}, len(buf) = {}, cursor = {}", n, buf.len(), *cursor);
        result
    }

    /// Move the cursor and return its new value.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Unsupported`] for [`SeekFrom::End`]
    /// - [`AccessError::InvalidOffset`] if the target would be negative
    /// - [`AccessError::OffsetOverflow`] if the target does not fit in an `i64`
    ///
    /// The cursor is unchanged on error.
    pub async fn seek(&self, pos: SeekFrom) -> Result<u64, AccessError<D::Error>> {
        let mut cursor = self.cursor.lock().await;
        let target = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => i64::try_from(*cursor)
                .ok()
                .and_then(|current| current.checked_add(delta))
                .ok_or(AccessError::OffsetOverflow)?,
            SeekFrom::End(_) => return Err(AccessError::Unsupported("seek relative to end")),
        };

        let Ok(target) = u64::try_from(target) else {
            return Err(AccessError::InvalidOffset);
        };
        *cursor = target;
        log::debug!("Seek to {:?}, cursor = {}", pos, target);
        Ok(target)
    }

    /// Current cursor position.
    pub async fn position(&self) -> u64 {
        *self.cursor.lock().await
    }

    /// Read at `offset` without touching the cursor.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, AccessError<D::Error>> {
        self.device.read_at(buf, offset).await
    }

    /// Write at `offset` without touching the cursor.
    pub async fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, AccessError<D::Error>> {
        self.device.write_at(buf, offset).await
    }

    /// Report allocated runs of the underlying device.
    pub async fn query_allocated_blocks(
        &self,
        start_sector: u64,
        num_sectors: u64,
        chunk_size: u64,
    ) -> Result<Vec<BlockDescriptor>, D::Error> {
        self.device
            .query_allocated_blocks(start_sector, num_sectors, chunk_size)
            .await
    }

    /// Device capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.device.capacity()
    }

    /// Get a reference to the aligned device.
    pub fn device(&self) -> &AlignedDevice<D> {
        &self.device
    }

    /// Close the underlying device, consuming the stream.
    pub async fn close(self) -> Result<(), D::Error> {
        self.device.close().await
    }
}

fn transferred<E>(result: &Result<usize, AccessError<E>>) -> usize {
    match result {
        Ok(n) => *n,
        Err(e) => e.transferred(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::aligned_device::tests::MockSectorDevice;

    async fn stream(sectors: u64) -> CursorStream<MockSectorDevice> {
        CursorStream::new(AlignedDevice::open(MockSectorDevice::new(sectors)).await.unwrap())
    }

    #[tokio::test]
    async fn test_write_advances_cursor() {
        let stream = stream(4).await;

        assert_eq!(stream.write(&[9u8; 700]).await.unwrap(), 700);
        assert_eq!(stream.seek(SeekFrom::Current(0)).await.unwrap(), 700);
        assert_eq!(stream.position().await, 700);
    }

    #[tokio::test]
    async fn test_negative_seek_keeps_cursor() {
        let stream = stream(4).await;
        stream.write(&[1u8; 10]).await.unwrap();

        assert!(matches!(
            stream.seek(SeekFrom::Start(-1)).await,
            Err(AccessError::InvalidOffset)
        ));
        assert!(matches!(
            stream.seek(SeekFrom::Current(-11)).await,
            Err(AccessError::InvalidOffset)
        ));
        assert_eq!(stream.position().await, 10);
    }

    #[tokio::test]
    async fn test_seek_from_end_unsupported() {
        let stream = stream(4).await;
        stream.seek(SeekFrom::Start(100)).await.unwrap();

        assert!(matches!(
            stream.seek(SeekFrom::End(0)).await,
            Err(AccessError::Unsupported(_))
        ));
        assert_eq!(stream.position().await, 100);
    }

    #[tokio::test]
    async fn test_positional_access_ignores_cursor() {
        let stream = stream(4).await;
        stream.seek(SeekFrom::Start(1000)).await.unwrap();

        stream.write_at(b"abc", 10).await.unwrap();
        let mut buf = [0u8; 3];
        stream.read_at(&mut buf, 10).await.unwrap();
        assert_eq!(&buf, b"abc");
        assert_eq!(stream.position().await, 1000);
    }

    #[tokio::test]
    async fn test_clipped_read_advances_to_end() {
        let stream = stream(2).await;
        stream.seek(SeekFrom::Start(1000)).await.unwrap();

        let mut buf = [0u8; 100];
        assert_eq!(stream.read(&mut buf).await.unwrap(), 24);
        assert_eq!(stream.position().await, 1024);

        let err = stream.read(&mut buf).await.unwrap_err();
        assert!(err.is_end_of_stream());
        assert_eq!(stream.position().await, 1024);
    }
}
