//! Byte-addressable access to sector-granular virtual disks.
//!
//! Virtual disk libraries only move whole 512-byte sectors. This crate turns such a
//! device into something callers can read and write at any byte offset and length,
//! structured using hexagonal architecture (ports and adapters pattern).
//!
//! # Architecture
//!
//! ## Domain Layer (`domain`)
//! Alignment rules with no device dependencies:
//! - **Value Objects**: `SectorIndex`, `AccessConfig`
//! - **Services**: `AccessPlan`, splitting a byte range into head/body/tail
//! - **Ports**: `SectorDevice` interface
//! - **Errors**: `AccessError` and the device error-code mapping
//!
//! ## Adapter Layer (`adapters`)
//! - **`AlignedDevice`**: random-access reads and writes at any offset, with
//!   read-modify-write for partial sectors
//!
//! ## Infrastructure Layer (`infrastructure`)
//! - **`CursorStream`**: sequential read/write/seek with one shared cursor,
//!   implementing the `embedded_io_async` traits
//!
//! # Quick Start
//!
//! ```ignore
//! use vdisk_adapters::{AlignedDevice, CursorStream, SeekFrom};
//!
//! let disk = AlignedDevice::open(device).await?;
//!
//! // Random access at any offset
//! disk.write_at(&[0xAB; 100], 1000).await?;
//!
//! // Or sequential access through a cursor
//! let stream = CursorStream::new(disk);
//! stream.seek(SeekFrom::Start(1000)).await?;
//! let mut buf = [0u8; 100];
//! stream.read(&mut buf).await?;
//!
//! stream.close().await?;
//! ```
//!
//! # Concurrency
//!
//! Every operation takes `&self`. Requests that touch a partial sector serialize on
//! one adapter-wide lock so their read-modify-write cycles cannot interleave.
//! Aligned requests skip that lock unless [`LockPolicy::Always`] is configured.
//!
//! # Features
//!
//! - `std`: Enable standard library features of `embedded-io-async`

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

extern crate alloc;

// Core layers
pub mod domain;
pub mod adapters;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    AccessConfig, AccessError, AccessPlan, ErrorClass, LockPolicy, SectorIndex, classify,
};

pub use adapters::AlignedDevice;

pub use infrastructure::streaming::{CursorStream, SeekFrom};

// Re-export embedded_io_async for convenience
pub use embedded_io_async;

// Re-export vdisk_sector_device types for convenience
// This allows users to depend only on vdisk-adapters without needing vdisk-sector-device directly
pub use vdisk_sector_device::{
    BlockDescriptor, DeviceError, ErrorCode, SECTOR_SIZE, SectorDevice, SendSectorDevice,
    check_block_query,
};
