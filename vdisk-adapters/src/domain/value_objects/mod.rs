//! Value objects for the domain layer.
//!
//! Small immutable types that keep sector numbers, byte offsets and
//! configuration from being mixed up.

mod access_config;
mod sector_index;

pub use access_config::{AccessConfig, LockPolicy};
pub use sector_index::SectorIndex;
