//! Ports define the interfaces between the domain and the outside world.
//!
//! The only secondary (driven) port is the sector device. It lives in its own crate
//! so that device implementations do not depend on the adapters; it is re-exported
//! here so domain code names it through the port module.

pub use vdisk_sector_device::{
    BlockDescriptor, DeviceError, ErrorCode, SECTOR_SIZE, SectorDevice, SendSectorDevice,
};
