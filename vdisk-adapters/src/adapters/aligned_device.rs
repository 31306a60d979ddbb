//! Byte-granular random access over a sector device.
//!
//! `AlignedDevice` owns a [`SectorDevice`] and turns arbitrary `(offset, len)`
//! requests into whole-sector device calls following an [`AccessPlan`]. Partial
//! sectors are read into a bounce buffer; partial-sector writes read the sector,
//! patch the touched bytes and write it back.

use crate::domain::{
    AccessConfig, AccessError, AccessPlan, BlockDescriptor, PartialSector, SECTOR_SIZE,
    SectorDevice,
};
use aligned::{A4, Aligned};
use alloc::vec::Vec;
use async_lock::{Mutex, MutexGuard};
use vdisk_sector_device::sectors_to_bytes;

type SectorBuf = Aligned<A4, [u8; SECTOR_SIZE]>;

/// Random-access byte reads and writes over a sector device.
///
/// Requests whose offset or length is not a multiple of [`SECTOR_SIZE`] hold an
/// adapter-wide lock for their whole duration, device I/O included, which makes
/// every partial-sector read-modify-write atomic with respect to the others. Under
/// the default [`LockPolicy::Misaligned`](crate::domain::LockPolicy::Misaligned),
/// aligned requests skip the lock.
///
/// All methods take `&self`; share the adapter (e.g. behind an `Arc`) to issue
/// requests concurrently.
///
/// # Examples
///
/// ```ignore
/// use vdisk_adapters::AlignedDevice;
///
/// let disk = AlignedDevice::open(device).await?;
/// disk.write_at(b"hello", 510).await?;
///
/// let mut buf = [0u8; 5];
/// disk.read_at(&mut buf, 510).await?;
/// assert_eq!(&buf, b"hello");
///
/// disk.close().await?;
/// ```
pub struct AlignedDevice<D: SectorDevice> {
    device: D,
    capacity: u64,
    capacity_sectors: u64,
    config: AccessConfig,
    misaligned: Mutex<()>,
}

impl<D: SectorDevice> AlignedDevice<D> {
    /// Take ownership of `device` with the default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the device cannot report its capacity or the capacity in bytes does
    /// not fit in a `u64`. The device is closed before the error is returned.
    pub async fn open(device: D) -> Result<Self, AccessError<D::Error>> {
        Self::open_with_config(device, AccessConfig::new()).await
    }

    /// Take ownership of `device` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`AlignedDevice::open`].
    pub async fn open_with_config(
        mut device: D,
        config: AccessConfig,
    ) -> Result<Self, AccessError<D::Error>> {
        let capacity_sectors = match device.capacity_sectors().await {
            Ok(sectors) => sectors,
            Err(source) => {
                release(&mut device).await;
                return Err(AccessError::Device {
                    source,
                    transferred: 0,
                });
            }
        };

        let Some(capacity) = sectors_to_bytes(capacity_sectors) else {
            release(&mut device).await;
            return Err(AccessError::OffsetOverflow);
        };

        log::debug!(
            "Opened device: {} sectors ({} bytes), lock policy {:?}",
            capacity_sectors,
            capacity,
            config.lock_policy()
        );

        Ok(Self {
            device,
            capacity,
            capacity_sectors,
            config,
            misaligned: Mutex::new(()),
        })
    }

    /// Device capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Device capacity in sectors.
    #[inline]
    pub fn capacity_sectors(&self) -> u64 {
        self.capacity_sectors
    }

    /// The configuration this adapter was opened with.
    #[inline]
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Get a reference to the underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Read into `buf` starting at byte `offset`.
    ///
    /// A read running past the end of the device is clipped and returns the number
    /// of bytes that were available.
    ///
    /// # Errors
    ///
    /// - [`AccessError::EndOfStream`] if `offset` is at or past the end of the
    ///   device, or the device reports the range as out of range
    /// - [`AccessError::Device`] for any other device failure
    ///
    /// Both carry the bytes read before the failure.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, AccessError<D::Error>> {
        if offset >= self.capacity {
            log::trace!("Read at {} is at or past end of device ({})", offset, self.capacity);
            return Err(AccessError::EndOfStream { transferred: 0 });
        }

        let available = self.capacity - offset;
        let len = usize::try_from(available).map_or(buf.len(), |available| buf.len().min(available));
        let buf = &mut buf[..len];
        if buf.is_empty() {
            return Ok(0);
        }

        let plan = AccessPlan::new(offset, len).ok_or(AccessError::OffsetOverflow)?;
        log::trace!("Read {} bytes at {}: {:?}", len, offset, plan);
        let _guard = self.lock_for(&plan).await;

        let mut done = 0;
        if let Some(head) = plan.head() {
            self.read_partial(head, buf)
                .await
                .map_err(|e| AccessError::from_device(e, done))?;
            done += head.len;
        }
        if let Some(body) = plan.body() {
            let range = body.buf_range();
            let bytes = range.len();
            self.device
                .read_sectors(body.start.value(), body.count, &mut buf[range])
                .await
                .map_err(|e| AccessError::from_device(e, done))?;
            done += bytes;
        }
        if let Some(tail) = plan.tail() {
            self.read_partial(tail, buf)
                .await
                .map_err(|e| AccessError::from_device(e, done))?;
            done += tail.len;
        }

        Ok(done)
    }

    /// Write all of `buf` starting at byte `offset`.
    ///
    /// Writes are never clipped: a write that would cross the end of the device is
    /// rejected before any byte is written.
    ///
    /// # Errors
    ///
    /// - [`AccessError::ShortWrite`] if the write would cross the end of the device
    /// - [`AccessError::OffsetOverflow`] if `offset + buf.len()` overflows
    /// - [`AccessError::EndOfStream`] / [`AccessError::Device`] if the device fails,
    ///   with the bytes written before the failure
    pub async fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, AccessError<D::Error>> {
        if offset > self.capacity {
            return Err(AccessError::ShortWrite);
        }
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(AccessError::OffsetOverflow)?;
        if end > self.capacity {
            log::trace!(
                "Rejecting write of {} bytes at {}: device holds {} bytes",
                buf.len(),
                offset,
                self.capacity
            );
            return Err(AccessError::ShortWrite);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let plan = AccessPlan::new(offset, buf.len()).ok_or(AccessError::OffsetOverflow)?;
        log::trace!("Write {} bytes at {}: {:?}", buf.len(), offset, plan);
        let _guard = self.lock_for(&plan).await;

        let mut done = 0;
        if let Some(head) = plan.head() {
            self.patch_sector(head, buf)
                .await
                .map_err(|e| AccessError::from_device(e, done))?;
            done += head.len;
        }
        if let Some(body) = plan.body() {
            let range = body.buf_range();
            let bytes = range.len();
            self.device
                .write_sectors(body.start.value(), body.count, &buf[range])
                .await
                .map_err(|e| AccessError::from_device(e, done))?;
            done += bytes;
        }
        if let Some(tail) = plan.tail() {
            self.patch_sector(tail, buf)
                .await
                .map_err(|e| AccessError::from_device(e, done))?;
        }

        Ok(buf.len())
    }

    /// Report allocated runs of the underlying device.
    ///
    /// Sector granular already, so the query is passed through untouched.
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

    /// Close the underlying device, consuming the adapter.
    pub async fn close(mut self) -> Result<(), D::Error> {
        log::debug!("Closing device ({} bytes)", self.capacity);
        self.device.close().await
    }

    async fn lock_for(&self, plan: &AccessPlan) -> Option<MutexGuard<'_, ()>> {
        if self.config.requires_lock(plan.is_aligned()) {
            log::trace!("Taking misalignment lock");
            Some(self.misaligned.lock().await)
        } else {
            None
        }
    }

    async fn read_partial(&self, part: &PartialSector, buf: &mut [u8]) -> Result<(), D::Error> {
        let mut sector: SectorBuf = Aligned([0u8; SECTOR_SIZE]);
        self.device
            .read_sectors(part.sector.value(), 1, &mut sector[..])
            .await?;
        buf[part.buf_range()].copy_from_slice(&sector[part.sector_range()]);
        Ok(())
    }

    async fn patch_sector(&self, part: &PartialSector, buf: &[u8]) -> Result<(), D::Error> {
        let mut sector: SectorBuf = Aligned([0u8; SECTOR_SIZE]);
        self.device
            .read_sectors(part.sector.value(), 1, &mut sector[..])
            .await?;
        sector[part.sector_range()].copy_from_slice(&buf[part.buf_range()]);
        self.device
            .write_sectors(part.sector.value(), 1, &sector[..])
            .await
    }
}

async fn release<D: SectorDevice>(device: &mut D) {
    if let Err(e) = device.close().await {
        log::warn!("Failed to close device after open failure: {}", e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{DeviceError, ErrorCode};
    use core::fmt;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Op {
        Read(u64, u64),
        Write(u64, u64),
    }

    #[derive(Debug)]
    pub(crate) struct MockError(pub(crate) ErrorCode);

    impl fmt::Display for MockError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Mock device error ({})", self.0)
        }
    }

    impl DeviceError for MockError {
        fn code(&self) -> ErrorCode {
            self.0
        }
    }

    // Mock SectorDevice recording every call it receives
    pub(crate) struct MockSectorDevice {
        sectors: StdMutex<HashMap<u64, [u8; SECTOR_SIZE]>>,
        ops: StdMutex<Vec<Op>>,
        capacity: u64,
    }

    impl MockSectorDevice {
        pub(crate) fn new(capacity: u64) -> Self {
            Self {
                sectors: StdMutex::new(HashMap::new()),
                ops: StdMutex::new(Vec::new()),
                capacity,
            }
        }

        pub(crate) fn take_ops(&self) -> Vec<Op> {
            core::mem::take(&mut *self.ops.lock().unwrap())
        }
    }

    impl SectorDevice for MockSectorDevice {
        type Error = MockError;

        async fn capacity_sectors(&self) -> Result<u64, Self::Error> {
            Ok(self.capacity)
        }

        async fn read_sectors(&self, start: u64, count: u64, out: &mut [u8]) -> Result<(), Self::Error> {
            assert_eq!(out.len() as u64, count * SECTOR_SIZE as u64);
            self.ops.lock().unwrap().push(Op::Read(start, count));
            if start + count > self.capacity {
                return Err(MockError(ErrorCode::OUT_OF_RANGE));
            }
            let sectors = self.sectors.lock().unwrap();
            for (i, chunk) in out.chunks_mut(SECTOR_SIZE).enumerate() {
                match sectors.get(&(start + i as u64)) {
                    Some(stored) => chunk.copy_from_slice(stored),
                    // Return zeros for unwritten sectors
                    None => chunk.fill(0),
                }
            }
            Ok(())
        }

        async fn write_sectors(&self, start: u64, count: u64, data: &[u8]) -> Result<(), Self::Error> {
            assert_eq!(data.len() as u64, count * SECTOR_SIZE as u64);
            self.ops.lock().unwrap().push(Op::Write(start, count));
            if start + count > self.capacity {
                return Err(MockError(ErrorCode::OUT_OF_RANGE));
            }
            let mut sectors = self.sectors.lock().unwrap();
            for (i, chunk) in data.chunks(SECTOR_SIZE).enumerate() {
                let mut stored = [0u8; SECTOR_SIZE];
                stored.copy_from_slice(chunk);
                sectors.insert(start + i as u64, stored);
            }
            Ok(())
        }

        async fn query_allocated_blocks(
            &self,
            _start: u64,
            _num: u64,
            _chunk: u64,
        ) -> Result<Vec<BlockDescriptor>, Self::Error> {
            Err(MockError(ErrorCode::UNSUPPORTED))
        }

        async fn close(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_adapter_read_write() {
        let adapter = AlignedDevice::open(MockSectorDevice::new(2048)).await.unwrap();

        let write_data = vec![42u8; 1024];
        assert_eq!(adapter.write_at(&write_data, 0).await.unwrap(), 1024);

        let mut read_data = vec![0u8; 1024];
        assert_eq!(adapter.read_at(&mut read_data, 0).await.unwrap(), 1024);
        assert_eq!(read_data, write_data);
    }

    #[tokio::test]
    async fn test_adapter_capacity() {
        let adapter = AlignedDevice::open(MockSectorDevice::new(4)).await.unwrap();
        assert_eq!(adapter.capacity(), 2048);
        assert_eq!(adapter.capacity_sectors(), 4);
    }

    #[tokio::test]
    async fn test_single_sector_read_issues_one_call() {
        let adapter = AlignedDevice::open(MockSectorDevice::new(8)).await.unwrap();

        let mut buf = [0u8; 20];
        adapter.read_at(&mut buf, 1034).await.unwrap();
        assert_eq!(adapter.device().take_ops(), vec![Op::Read(2, 1)]);
    }

    #[tokio::test]
    async fn test_aligned_write_skips_reads() {
        let adapter = AlignedDevice::open(MockSectorDevice::new(8)).await.unwrap();

        adapter.write_at(&[7u8; 1536], 512).await.unwrap();
        assert_eq!(adapter.device().take_ops(), vec![Op::Write(1, 3)]);
    }

    #[tokio::test]
    async fn test_misaligned_write_call_sequence() {
        let adapter = AlignedDevice::open(MockSectorDevice::new(8)).await.unwrap();

        adapter.write_at(&[1u8; SECTOR_SIZE + 14], 500).await.unwrap();
        assert_eq!(
            adapter.device().take_ops(),
            vec![
                Op::Read(0, 1),
                Op::Write(0, 1),
                Op::Write(1, 1),
                Op::Read(2, 1),
                Op::Write(2, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_sector_write_preserves_neighbours() {
        let adapter = AlignedDevice::open(MockSectorDevice::new(8)).await.unwrap();

        adapter.write_at(&[0xAAu8; SECTOR_SIZE], 0).await.unwrap();
        adapter.write_at(&[0x55u8; 16], 100).await.unwrap();

        let mut sector = [0u8; SECTOR_SIZE];
        adapter.read_at(&mut sector, 0).await.unwrap();
        assert!(sector[..100].iter().all(|&b| b == 0xAA));
        assert!(sector[100..116].iter().all(|&b| b == 0x55));
        assert!(sector[116..].iter().all(|&b| b == 0xAA));
    }
}
