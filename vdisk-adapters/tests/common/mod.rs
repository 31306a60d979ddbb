//! Test devices shared by the integration tests.

#![allow(dead_code)]

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};
use vdisk_adapters::{BlockDescriptor, DeviceError, ErrorCode, SectorDevice};
use vdisk_block_platform::MemorySectorDevice;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug)]
pub enum TestError {
    Injected(ErrorCode),
    Inner(String, ErrorCode),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injected(code) => write!(f, "Injected failure ({})", code),
            Self::Inner(msg, _) => write!(f, "{}", msg),
        }
    }
}

impl DeviceError for TestError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Injected(code) | Self::Inner(_, code) => *code,
        }
    }
}

fn inner<E: DeviceError>(e: E) -> TestError {
    TestError::Inner(e.to_string(), e.code())
}

/// Memory device that fails any transfer touching one sector.
pub struct FaultyDevice {
    pub inner: MemorySectorDevice,
    fail_sector: u64,
    code: ErrorCode,
}

impl FaultyDevice {
    pub fn new(capacity_sectors: usize, fail_sector: u64, code: ErrorCode) -> Self {
        Self {
            inner: MemorySectorDevice::new(capacity_sectors).expect("test image fits in memory"),
            fail_sector,
            code,
        }
    }

    fn check(&self, start: u64, count: u64) -> Result<(), TestError> {
        if (start..start + count).contains(&self.fail_sector) {
            return Err(TestError::Injected(self.code));
        }
        Ok(())
    }
}

impl SectorDevice for FaultyDevice {
    type Error = TestError;

    async fn capacity_sectors(&self) -> Result<u64, Self::Error> {
        self.inner.capacity_sectors().await.map_err(inner)
    }

    async fn read_sectors(&self, start: u64, count: u64, out: &mut [u8]) -> Result<(), Self::Error> {
        self.check(start, count)?;
        self.inner.read_sectors(start, count, out).await.map_err(inner)
    }

    async fn write_sectors(&self, start: u64, count: u64, data: &[u8]) -> Result<(), Self::Error> {
        self.check(start, count)?;
        self.inner.write_sectors(start, count, data).await.map_err(inner)
    }

    async fn query_allocated_blocks(
        &self,
        start: u64,
        num: u64,
        chunk: u64,
    ) -> Result<Vec<BlockDescriptor>, Self::Error> {
        self.inner
            .query_allocated_blocks(start, num, chunk)
            .await
            .map_err(inner)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.inner.close().await.map_err(inner)
    }
}

/// Device whose capacity query fails or reports a fixed value, recording whether it
/// was closed.
pub struct CapacityDevice {
    capacity: Result<u64, ErrorCode>,
    pub closed: Arc<AtomicBool>,
}

impl CapacityDevice {
    pub fn new(capacity: Result<u64, ErrorCode>) -> Self {
        Self {
            capacity,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SectorDevice for CapacityDevice {
    type Error = TestError;

    async fn capacity_sectors(&self) -> Result<u64, Self::Error> {
        self.capacity.map_err(TestError::Injected)
    }

    async fn read_sectors(&self, _: u64, _: u64, _: &mut [u8]) -> Result<(), Self::Error> {
        Err(TestError::Injected(ErrorCode::UNSUPPORTED))
    }

    async fn write_sectors(&self, _: u64, _: u64, _: &[u8]) -> Result<(), Self::Error> {
        Err(TestError::Injected(ErrorCode::UNSUPPORTED))
    }

    async fn query_allocated_blocks(
        &self,
        _: u64,
        _: u64,
        _: u64,
    ) -> Result<Vec<BlockDescriptor>, Self::Error> {
        Err(TestError::Injected(ErrorCode::UNSUPPORTED))
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// Pending exactly once, waking itself
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Memory device that suspends once before every transfer, so that requests joined
/// on one task interleave at each device call.
pub struct YieldingDevice {
    pub inner: MemorySectorDevice,
}

impl YieldingDevice {
    pub fn new(capacity_sectors: usize) -> Self {
        Self {
            inner: MemorySectorDevice::new(capacity_sectors).expect("test image fits in memory"),
        }
    }
}

impl SectorDevice for YieldingDevice {
    type Error = TestError;

    async fn capacity_sectors(&self) -> Result<u64, Self::Error> {
        self.inner.capacity_sectors().await.map_err(inner)
    }

    async fn read_sectors(&self, start: u64, count: u64, out: &mut [u8]) -> Result<(), Self::Error> {
        YieldOnce(false).await;
        self.inner.read_sectors(start, count, out).await.map_err(inner)
    }

    async fn write_sectors(&self, start: u64, count: u64, data: &[u8]) -> Result<(), Self::Error> {
        YieldOnce(false).await;
        self.inner.write_sectors(start, count, data).await.map_err(inner)
    }

    async fn query_allocated_blocks(
        &self,
        start: u64,
        num: u64,
        chunk: u64,
    ) -> Result<Vec<BlockDescriptor>, Self::Error> {
        self.inner
            .query_allocated_blocks(start, num, chunk)
            .await
            .map_err(inner)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.inner.close().await.map_err(inner)
    }
}
