//! Type-safe sector index value object.

use core::fmt;
use vdisk_sector_device::SECTOR_SIZE;

/// Index of a sector on the device.
///
/// Keeps sector numbers apart from byte offsets, which are the other `u64` flowing
/// through the alignment code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorIndex(u64);

impl SectorIndex {
    /// Create a new sector index.
    ///
    /// # Examples
    ///
    /// ```
    /// use vdisk_adapters::domain::SectorIndex;
    ///
    /// let sector = SectorIndex::new(3);
    /// assert_eq!(sector.value(), 3);
    /// ```
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The sector containing byte `offset`.
    #[inline]
    pub const fn containing(offset: u64) -> Self {
        Self(offset / SECTOR_SIZE as u64)
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The sector `count` sectors after this one, or `None` past `u64::MAX`.
    #[inline]
    pub const fn checked_add(self, count: u64) -> Option<Self> {
        match self.0.checked_add(count) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for SectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sector({})", self.0)
    }
}
