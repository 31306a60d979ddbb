//! Domain layer - alignment rules with no device dependencies.
//!
//! - **Value Objects**: `SectorIndex`, `AccessConfig`
//! - **Domain Services**: `AccessPlan`, the head/body/tail decomposition of a byte
//!   range
//! - **Ports**: the `SectorDevice` interface
//! - **Domain Errors**: `AccessError` and the device error-code mapping
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer (Core)         │
//!     │  - AccessPlan, AccessConfig      │
//!     │  - AccessError, classify         │
//!     │  - SectorDevice (port)           │
//!     └──────────────────────────────────┘
//!                    ▲
//!                    │ used by
//!                    │
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │
//!     │  - AlignedDevice                 │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use vdisk_adapters::domain::AccessPlan;
//!
//! let plan = AccessPlan::new(4096, 1024).unwrap();
//! assert!(plan.is_aligned());
//! assert_eq!(plan.body().unwrap().count, 2);
//! ```

pub mod error;
pub mod ports;
pub mod value_objects;

mod access_plan;

pub use access_plan::{AccessPlan, PartialSector, SectorRun};
pub use error::{AccessError, ErrorClass, classify};
pub use ports::{
    BlockDescriptor, DeviceError, ErrorCode, SECTOR_SIZE, SectorDevice, SendSectorDevice,
};
pub use value_objects::{AccessConfig, LockPolicy, SectorIndex};
