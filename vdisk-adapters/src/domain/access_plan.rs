//! Decomposition of a byte range into sector-granular device operations.
//!
//! An arbitrary `(offset, len)` request maps onto at most three pieces:
//!
//! ```text
//!   sector k        sector k+1 .. k+n          sector k+n+1
//! ┌────────┬───┐ ┌──────────────────────┐ ┌────┬──────────┐
//! │        │ H │ │          B           │ │ T  │          │
//! └────────┴───┘ └──────────────────────┘ └────┴──────────┘
//!          ^ offset                             ^ offset + len
//! ```
//!
//! - **H**ead: the tail end of a sector the request starts inside of
//! - **B**ody: the whole sectors in between
//! - **T**ail: the leading bytes of the sector the request ends inside of
//!
//! Pieces of zero size are absent, so executing a plan never issues an empty
//! device call.

use crate::domain::value_objects::SectorIndex;
use vdisk_sector_device::SECTOR_SIZE;

/// Part of a single sector touched by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialSector {
    /// The sector holding the bytes.
    pub sector: SectorIndex,
    /// First touched byte within the sector.
    pub sector_offset: usize,
    /// Number of touched bytes.
    pub len: usize,
    /// Position of the first touched byte within the caller's buffer.
    pub buf_offset: usize,
}

impl PartialSector {
    /// Range of the touched bytes within the sector.
    #[inline]
    pub fn sector_range(&self) -> core::ops::Range<usize> {
        self.sector_offset..self.sector_offset + self.len
    }

    /// Range of the touched bytes within the caller's buffer.
    #[inline]
    pub fn buf_range(&self) -> core::ops::Range<usize> {
        self.buf_offset..self.buf_offset + self.len
    }
}

/// Run of whole sectors touched by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRun {
    /// First sector of the run.
    pub start: SectorIndex,
    /// Number of sectors.
    pub count: u64,
    /// Position of the run's first byte within the caller's buffer.
    pub buf_offset: usize,
}

impl SectorRun {
    /// Range of the run's bytes within the caller's buffer.
    #[inline]
    pub fn buf_range(&self) -> core::ops::Range<usize> {
        // count was derived from a usize byte length, so this cannot overflow.
        self.buf_offset..self.buf_offset + self.count as usize * SECTOR_SIZE
    }
}

/// Sector-level execution plan for one byte-range request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPlan {
    head: Option<PartialSector>,
    body: Option<SectorRun>,
    tail: Option<PartialSector>,
    len: usize,
    aligned: bool,
}

impl AccessPlan {
    /// Plan a request of `len` bytes starting at byte `offset`.
    ///
    /// Returns `None` if the request would end beyond `u64::MAX`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vdisk_adapters::domain::AccessPlan;
    ///
    /// // 526 bytes at offset 500: 12 bytes of sector 0, all of sector 1, 2 bytes of sector 2
    /// let plan = AccessPlan::new(500, 526).unwrap();
    /// assert_eq!(plan.head().unwrap().len, 12);
    /// assert_eq!(plan.body().unwrap().count, 1);
    /// assert_eq!(plan.tail().unwrap().len, 2);
    /// assert!(!plan.is_aligned());
    /// ```
    pub fn new(offset: u64, len: usize) -> Option<Self> {
        offset.checked_add(len as u64)?;

        let sector_size = SECTOR_SIZE as u64;
        let mut sector = SectorIndex::containing(offset);
        let mut planned = 0usize;

        let lead = (offset % sector_size) as usize;
        let head = if lead != 0 && len > 0 {
            let part = PartialSector {
                sector,
                sector_offset: lead,
                len: (SECTOR_SIZE - lead).min(len),
                buf_offset: 0,
            };
            sector = sector.checked_add(1)?;
            planned += part.len;
            Some(part)
        } else {
            None
        };

        let whole = (len - planned) / SECTOR_SIZE;
        let body = if whole > 0 {
            let run = SectorRun {
                start: sector,
                count: whole as u64,
                buf_offset: planned,
            };
            sector = sector.checked_add(run.count)?;
            planned += whole * SECTOR_SIZE;
            Some(run)
        } else {
            None
        };

        let tail = if len > planned {
            Some(PartialSector {
                sector,
                sector_offset: 0,
                len: len - planned,
                buf_offset: planned,
            })
        } else {
            None
        };

        Some(Self {
            head,
            body,
            tail,
            len,
            aligned: lead == 0 && len % SECTOR_SIZE == 0,
        })
    }

    /// Partial sector at the start of the request, if it starts mid-sector.
    #[inline]
    pub fn head(&self) -> Option<&PartialSector> {
        self.head.as_ref()
    }

    /// Whole sectors covered by the request.
    #[inline]
    pub fn body(&self) -> Option<&SectorRun> {
        self.body.as_ref()
    }

    /// Partial sector at the end of the request, if it ends mid-sector.
    #[inline]
    pub fn tail(&self) -> Option<&PartialSector> {
        self.tail.as_ref()
    }

    /// Total bytes covered by the plan.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the plan covers no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether both offset and length are multiples of the sector size.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

}
