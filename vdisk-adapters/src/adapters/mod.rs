//! Adapter layer - connects the domain's alignment rules to a sector device.
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer                │
//!     │  - AccessPlan (service)          │
//!     │  - SectorDevice (port)           │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ executes plans against
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │  ◄── This module
//!     │  - AlignedDevice                 │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ uses
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │  Infrastructure (SectorDevice)   │
//!     └──────────────────────────────────┘
//! ```

pub(crate) mod aligned_device;

pub use aligned_device::AlignedDevice;
