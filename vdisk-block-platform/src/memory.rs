//! RAM-backed sector device.

use alloc::{collections::BTreeSet, vec, vec::Vec};
use async_lock::RwLock;
use core::{fmt, ops::Range};
use vdisk_sector_device::{
    BlockDescriptor, DeviceError, ErrorCode, SECTOR_SIZE, SendSectorDevice, check_block_query,
};

/// Errors from [`MemorySectorDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryDeviceError {
    /// The requested sectors lie outside the image.
    OutOfRange {
        /// First requested sector.
        start: u64,
        /// Number of requested sectors.
        count: u64,
        /// Image size in sectors.
        capacity: u64,
    },
    /// A block query had a malformed chunk size or unaligned bounds.
    InvalidArgument,
    /// The requested image does not fit in memory.
    TooLarge {
        /// Requested image size in sectors.
        sectors: usize,
    },
    /// The device has been closed.
    Closed,
}

impl fmt::Display for MemoryDeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                start,
                count,
                capacity,
            } => write!(
                f,
                "Sectors {}..{} are outside the image ({} sectors)",
                start,
                start.saturating_add(*count),
                capacity
            ),
            Self::InvalidArgument => write!(f, "Invalid block query arguments"),
            Self::TooLarge { sectors } => {
                write!(f, "Image of {} sectors does not fit in memory", sectors)
            }
            Self::Closed => write!(f, "Device is closed"),
        }
    }
}

impl core::error::Error for MemoryDeviceError {}

impl DeviceError for MemoryDeviceError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::OutOfRange { .. } => ErrorCode::OUT_OF_RANGE,
            Self::InvalidArgument | Self::TooLarge { .. } => ErrorCode::INVALID_ARGUMENT,
            Self::Closed => ErrorCode::NOT_CONNECTED,
        }
    }
}

struct MemoryImage {
    data: Vec<u8>,
    // Sectors that have been written, or came with the initial image
    allocated: BTreeSet<u64>,
}

/// A disk image held in memory.
///
/// Tracks which sectors have been written so that allocated-block queries behave
/// like a sparse image: sectors never written report as unallocated.
///
/// Reads take a shared lock and writes an exclusive one, so every single device call
/// is atomic.
///
/// # Example
///
/// ```ignore
/// use vdisk_block_platform::MemorySectorDevice;
///
/// let device = MemorySectorDevice::new(2048)?; // 1 MiB
/// ```
pub struct MemorySectorDevice {
    image: RwLock<MemoryImage>,
    capacity_sectors: u64,
    closed: bool,
}

impl MemorySectorDevice {
    /// Create a zero-filled image of `capacity_sectors` sectors with nothing allocated.
    ///
    /// # Errors
    ///
    /// [`MemoryDeviceError::TooLarge`] if the image size in bytes exceeds what a
    /// single allocation can hold.
    pub fn new(capacity_sectors: usize) -> Result<Self, MemoryDeviceError> {
        let bytes = capacity_sectors
            .checked_mul(SECTOR_SIZE)
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or(MemoryDeviceError::TooLarge {
                sectors: capacity_sectors,
            })?;

        Ok(Self {
            image: RwLock::new(MemoryImage {
                data: vec![0u8; bytes],
                allocated: BTreeSet::new(),
            }),
            capacity_sectors: capacity_sectors as u64,
            closed: false,
        })
    }

    /// Create a device over existing image bytes, all of them allocated.
    ///
    /// Trailing bytes beyond the last whole sector are dropped.
    pub fn from_image(mut data: Vec<u8>) -> Self {
        let sectors = data.len() / SECTOR_SIZE;
        data.truncate(sectors * SECTOR_SIZE);
        Self {
            image: RwLock::new(MemoryImage {
                data,
                allocated: (0..sectors as u64).collect(),
            }),
            capacity_sectors: sectors as u64,
            closed: false,
        }
    }

    /// Copy of the whole image.
    pub async fn contents(&self) -> Vec<u8> {
        self.image.read().await.data.clone()
    }

    /// Whether [`close`](SendSectorDevice::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn byte_range(&self, start: u64, count: u64) -> Result<Range<usize>, MemoryDeviceError> {
        if self.closed {
            return Err(MemoryDeviceError::Closed);
        }
        match start.checked_add(count) {
            // Bounded by capacity, which came from a usize
            Some(end) if end <= self.capacity_sectors => {
                Ok(start as usize * SECTOR_SIZE..end as usize * SECTOR_SIZE)
            }
            _ => Err(MemoryDeviceError::OutOfRange {
                start,
                count,
                capacity: self.capacity_sectors,
            }),
        }
    }
}

impl SendSectorDevice for MemorySectorDevice {
    type Error = MemoryDeviceError;

    async fn capacity_sectors(&self) -> Result<u64, Self::Error> {
        if self.closed {
            return Err(MemoryDeviceError::Closed);
        }
        Ok(self.capacity_sectors)
    }

    async fn read_sectors(
        &self,
        start_sector: u64,
        count: u64,
        out: &mut [u8],
    ) -> Result<(), Self::Error> {
        let range = self.byte_range(start_sector, count)?;
        assert_eq!(out.len(), range.len(), "buffer must be exactly count sectors");

        let image = self.image.read().await;
        out.copy_from_slice(&image.data[range]);
        Ok(())
    }

    async fn write_sectors(
        &self,
        start_sector: u64,
        count: u64,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let range = self.byte_range(start_sector, count)?;
        assert_eq!(data.len(), range.len(), "buffer must be exactly count sectors");

        let mut image = self.image.write().await;
        image.data[range].copy_from_slice(data);
        image.allocated.extend(start_sector..start_sector + count);
        Ok(())
    }

    async fn query_allocated_blocks(
        &self,
        start_sector: u64,
        num_sectors: u64,
        chunk_size: u64,
    ) -> Result<Vec<BlockDescriptor>, Self::Error> {
        if self.closed {
            return Err(MemoryDeviceError::Closed);
        }
        check_block_query(start_sector, num_sectors, chunk_size, self.capacity_sectors).map_err(
            |code| match code {
                ErrorCode::OUT_OF_RANGE => MemoryDeviceError::OutOfRange {
                    start: start_sector,
                    count: num_sectors,
                    capacity: self.capacity_sectors,
                },
                _ => MemoryDeviceError::InvalidArgument,
            },
        )?;

        let image = self.image.read().await;
        let mut blocks: Vec<BlockDescriptor> = Vec::new();
        let end = start_sector + num_sectors;
        let mut chunk = start_sector;
        while chunk < end {
            if image.allocated.range(chunk..chunk + chunk_size).next().is_some() {
                match blocks.last_mut() {
                    Some(last) if last.offset + last.length == chunk => last.length += chunk_size,
                    _ => blocks.push(BlockDescriptor {
                        offset: chunk,
                        length: chunk_size,
                    }),
                }
            }
            chunk += chunk_size;
        }
        Ok(blocks)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        log::debug!("Closing memory device ({} sectors)", self.capacity_sectors);
        self.closed = true;
        Ok(())
    }
}
