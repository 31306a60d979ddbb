//! Sector device trait for virtual disk images.
//!
//! A sector device only understands whole sectors: every request names a starting
//! sector and a sector count, and the buffer handed over is exactly
//! `count * SECTOR_SIZE` bytes long. Byte-granular access is layered on top by
//! `vdisk-adapters`.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

/// Size of one sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Numeric error code reported by a sector device.
///
/// Codes are an open set: devices may report vendor codes beyond the named ones.
/// Consumers only rely on telling [`ErrorCode::OUT_OF_RANGE`] apart from the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(u64);

impl ErrorCode {
    /// The operation succeeded.
    pub const SUCCESS: Self = Self(0);
    /// Unspecified failure.
    pub const FAIL: Self = Self(1);
    /// An argument was malformed (bad chunk size, misaligned query, ...).
    pub const INVALID_ARGUMENT: Self = Self(3);
    /// The operation is not supported by this device.
    pub const UNSUPPORTED: Self = Self(6);
    /// Generic I/O failure on the backing storage.
    pub const IO: Self = Self(11);
    /// The device has been closed or was never connected.
    pub const NOT_CONNECTED: Self = Self(3008);
    /// The requested sector range lies outside the device.
    pub const OUT_OF_RANGE: Self = Self(16009);

    /// Wrap a raw code.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw code.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error code {}", self.0)
    }
}

/// Errors reported by a [`SectorDevice`].
pub trait DeviceError: fmt::Debug + fmt::Display {
    /// The numeric code classifying this failure.
    fn code(&self) -> ErrorCode;
}

/// A run of allocated sectors reported by [`SectorDevice::query_allocated_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockDescriptor {
    /// First sector of the run.
    pub offset: u64,
    /// Length of the run in sectors.
    pub length: u64,
}

/// Validate the arguments of an allocated-block query against a device capacity.
///
/// The chunk size must be non-zero and both `start_sector` and `num_sectors` must be
/// multiples of it; the queried range must lie within `capacity_sectors`.
pub fn check_block_query(
    start_sector: u64,
    num_sectors: u64,
    chunk_size: u64,
    capacity_sectors: u64,
) -> Result<(), ErrorCode> {
    if chunk_size == 0 || start_sector % chunk_size != 0 || num_sectors % chunk_size != 0 {
        return Err(ErrorCode::INVALID_ARGUMENT);
    }
    match start_sector.checked_add(num_sectors) {
        Some(end) if end <= capacity_sectors => Ok(()),
        _ => Err(ErrorCode::OUT_OF_RANGE),
    }
}

/// A device addressed in whole sectors.
///
/// All transfer methods take `&self` so that independent requests can be in flight
/// at the same time; implementations synchronize internally.
///
/// Callers must pass buffers of exactly `count * SECTOR_SIZE` bytes. A mismatch is a
/// programming error and implementations are free to panic on it.
#[trait_variant::make(SendSectorDevice: Send)]
pub trait SectorDevice {
    /// The error type of this device.
    type Error: DeviceError;

    /// Total number of addressable sectors. Fixed for the lifetime of the handle.
    async fn capacity_sectors(&self) -> Result<u64, Self::Error>;

    /// Read `count` sectors starting at `start_sector` into `out`.
    async fn read_sectors(
        &self,
        start_sector: u64,
        count: u64,
        out: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write `count` sectors starting at `start_sector` from `data`.
    async fn write_sectors(
        &self,
        start_sector: u64,
        count: u64,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Report the allocated runs within `num_sectors` sectors from `start_sector`,
    /// at `chunk_size` sector granularity.
    async fn query_allocated_blocks(
        &self,
        start_sector: u64,
        num_sectors: u64,
        chunk_size: u64,
    ) -> Result<Vec<BlockDescriptor>, Self::Error>;

    /// Release the device.
    async fn close(&mut self) -> Result<(), Self::Error>;
}

/// Number of bytes covered by `count` sectors, or `None` on overflow.
#[inline]
pub const fn sectors_to_bytes(count: u64) -> Option<u64> {
    count.checked_mul(SECTOR_SIZE as u64)
}
