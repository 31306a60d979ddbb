//! Generic stream sector device adapter
//!
//! Provides a `SectorDevice` implementation wrapping any async I/O stream.

use alloc::{vec, vec::Vec};
use async_lock::Mutex;
use core::fmt;
use embedded_io_async::{ErrorKind, Read, ReadExactError, Seek, SeekFrom, Write};
use vdisk_sector_device::{
    BlockDescriptor, DeviceError, ErrorCode, SECTOR_SIZE, SectorDevice, check_block_query,
};

/// Errors from [`StreamSectorDevice`].
#[derive(Debug)]
pub enum StreamDeviceError<E> {
    /// The requested sectors lie outside the stream.
    OutOfRange {
        /// First requested sector.
        start: u64,
        /// Number of requested sectors.
        count: u64,
        /// Stream size in sectors.
        capacity: u64,
    },
    /// A block query had a malformed chunk size or unaligned bounds.
    InvalidArgument,
    /// The stream ended before a whole sector could be read.
    UnexpectedEof,
    /// The device has been closed.
    Closed,
    /// The underlying stream failed.
    Io(E),
}

impl<E: fmt::Debug> fmt::Display for StreamDeviceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                start,
                count,
                capacity,
            } => write!(
                f,
                "Sectors {}..{} are outside the stream ({} sectors)",
                start,
                start.saturating_add(*count),
                capacity
            ),
            Self::InvalidArgument => write!(f, "Invalid block query arguments"),
            Self::UnexpectedEof => write!(f, "Unexpected end of stream"),
            Self::Closed => write!(f, "Device is closed"),
            Self::Io(e) => write!(f, "Stream error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for StreamDeviceError<E> {}

impl<E: fmt::Debug> DeviceError for StreamDeviceError<E> {
    fn code(&self) -> ErrorCode {
        match self {
            Self::OutOfRange { .. } => ErrorCode::OUT_OF_RANGE,
            Self::InvalidArgument => ErrorCode::INVALID_ARGUMENT,
            Self::UnexpectedEof | Self::Io(_) => ErrorCode::IO,
            Self::Closed => ErrorCode::NOT_CONNECTED,
        }
    }
}

impl<E: embedded_io_async::Error> embedded_io_async::Error for StreamDeviceError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange { .. } | Self::InvalidArgument => ErrorKind::InvalidInput,
            Self::UnexpectedEof | Self::Closed => ErrorKind::Other,
            Self::Io(e) => e.kind(),
        }
    }
}

impl<E> From<E> for StreamDeviceError<E> {
    fn from(e: E) -> Self {
        Self::Io(e)
    }
}

/// Sector device wrapper for async I/O streams
///
/// Wraps any type implementing `embedded_io_async::{Read, Write, Seek}` and provides
/// the `SectorDevice` trait. The capacity is the stream length rounded down to whole
/// sectors, measured once in [`open`](Self::open).
///
/// The stream sits behind an async mutex, so each sector request seeks and transfers
/// without another request moving the stream position in between.
///
/// # Example
///
/// ```ignore
/// use vdisk_block_platform::StreamSectorDevice;
/// use embedded_io_adapters::tokio_1::FromTokio;
///
/// let file = tokio::fs::OpenOptions::new().read(true).write(true).open("disk.img").await?;
/// let device = StreamSectorDevice::open(FromTokio::new(file)).await?;
/// ```
pub struct StreamSectorDevice<T> {
    inner: Mutex<T>,
    capacity_sectors: u64,
    closed: bool,
}

impl<T> StreamSectorDevice<T>
where
    T: Read + Write + Seek,
{
    /// Wrap `inner`, measuring its length.
    pub async fn open(mut inner: T) -> Result<Self, StreamDeviceError<T::Error>> {
        let len = inner.seek(SeekFrom::End(0)).await?;
        inner.seek(SeekFrom::Start(0)).await?;

        let capacity_sectors = len / SECTOR_SIZE as u64;
        let trailing = len % SECTOR_SIZE as u64;
        if trailing != 0 {
            log::warn!(
                "Stream length {} is not a multiple of {}, ignoring {} trailing bytes",
                len,
                SECTOR_SIZE,
                trailing
            );
        }
        log::debug!("Opened stream device with {} sectors", capacity_sectors);

        Ok(Self {
            inner: Mutex::new(inner),
            capacity_sectors,
            closed: false,
        })
    }

    /// Consume the wrapper and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    fn check_range(&self, start: u64, count: u64) -> Result<u64, StreamDeviceError<T::Error>> {
        if self.closed {
            return Err(StreamDeviceError::Closed);
        }
        match start.checked_add(count) {
            Some(end) if end <= self.capacity_sectors => Ok(start * SECTOR_SIZE as u64),
            _ => Err(StreamDeviceError::OutOfRange {
                start,
                count,
                capacity: self.capacity_sectors,
            }),
        }
    }
}

impl<T> SectorDevice for StreamSectorDevice<T>
where
    T: Read + Write + Seek,
{
    type Error = StreamDeviceError<T::Error>;

    async fn capacity_sectors(&self) -> Result<u64, Self::Error> {
        if self.closed {
            return Err(StreamDeviceError::Closed);
        }
        Ok(self.capacity_sectors)
    }

    async fn read_sectors(
        &self,
        start_sector: u64,
        count: u64,
        out: &mut [u8],
    ) -> Result<(), Self::Error> {
        let pos = self.check_range(start_sector, count)?;
        let mut inner = self.inner.lock().await;
        inner.seek(SeekFrom::Start(pos)).await?;
        inner.read_exact(out).await.map_err(|e| match e {
            ReadExactError::UnexpectedEof => StreamDeviceError::UnexpectedEof,
            ReadExactError::Other(e) => StreamDeviceError::Io(e),
        })
    }

    async fn write_sectors(
        &self,
        start_sector: u64,
        count: u64,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let pos = self.check_range(start_sector, count)?;
        let mut inner = self.inner.lock().await;
        inner.seek(SeekFrom::Start(pos)).await?;
        inner.write_all(data).await?;
        Ok(())
    }

    /// Streams carry no allocation map, so the whole queried range is reported as one
    /// allocated run.
    async fn query_allocated_blocks(
        &self,
        start_sector: u64,
        num_sectors: u64,
        chunk_size: u64,
    ) -> Result<Vec<BlockDescriptor>, Self::Error> {
        if self.closed {
            return Err(StreamDeviceError::Closed);
        }
        check_block_query(start_sector, num_sectors, chunk_size, self.capacity_sectors).map_err(
            |code| match code {
                ErrorCode::OUT_OF_RANGE => StreamDeviceError::OutOfRange {
                    start: start_sector,
                    count: num_sectors,
                    capacity: self.capacity_sectors,
                },
                _ => StreamDeviceError::InvalidArgument,
            },
        )?;

        if num_sectors == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![BlockDescriptor {
            offset: start_sector,
            length: num_sectors,
        }])
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        log::debug!("Closing stream device, flushing");
        self.inner.get_mut().flush().await?;
        Ok(())
    }
}
