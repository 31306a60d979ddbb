//! Platform sector devices for vdisk
//!
//! This crate provides ready-made [`SectorDevice`](vdisk_sector_device::SectorDevice)
//! implementations:
//!
//! - [`MemorySectorDevice`] - a RAM-backed image that tracks which sectors were written
//! - [`StreamSectorDevice`] - wraps any `embedded_io_async` Read/Write/Seek stream,
//!   such as a disk image file opened through `embedded-io-adapters`
//!
//! # Example
//!
//! ```ignore
//! use vdisk_block_platform::StreamSectorDevice;
//! use vdisk_adapters::AlignedDevice;
//!
//! let device = StreamSectorDevice::open(stream).await?;
//! let disk = AlignedDevice::open(device).await?;
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod memory;
mod stream;

pub use memory::{MemoryDeviceError, MemorySectorDevice};
pub use stream::{StreamDeviceError, StreamSectorDevice};
