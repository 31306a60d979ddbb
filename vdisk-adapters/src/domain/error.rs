//! Access errors and the device error-code mapping.
//!
//! Every device failure passes through [`classify`] exactly once, at the point the
//! adapter observes it. Adding a device code that should read as end-of-stream means
//! adding it there and nowhere else.

use core::fmt;
use vdisk_sector_device::{DeviceError, ErrorCode};

/// How a device error code surfaces to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request ran past the end of the device.
    EndOfStream,
    /// Any other device failure, propagated with its code.
    Device,
}

/// Map a device error code onto the error class callers see.
pub const fn classify(code: ErrorCode) -> ErrorClass {
    match code {
        ErrorCode::OUT_OF_RANGE => ErrorClass::EndOfStream,
        _ => ErrorClass::Device,
    }
}

/// Errors returned by aligned devices and cursor streams.
///
/// Variants that can occur after part of a transfer completed carry the number of
/// bytes moved before the failure.
#[derive(Debug)]
#[non_exhaustive]
pub enum AccessError<E> {
    /// The read started at or ran into the end of the device.
    EndOfStream {
        /// Bytes transferred before the end was reached.
        transferred: usize,
    },

    /// The write would cross the end of the device. Nothing was written.
    ShortWrite,

    /// A seek would move the cursor before the start of the device.
    InvalidOffset,

    /// The operation is not supported.
    Unsupported(&'static str),

    /// Offset arithmetic would overflow.
    OffsetOverflow,

    /// The sector device failed.
    Device {
        /// The device error.
        source: E,
        /// Bytes transferred before the failure.
        transferred: usize,
    },
}

impl<E: DeviceError> AccessError<E> {
    /// Wrap a device error observed after `transferred` bytes were moved.
    pub fn from_device(source: E, transferred: usize) -> Self {
        match classify(source.code()) {
            ErrorClass::EndOfStream => AccessError::EndOfStream { transferred },
            ErrorClass::Device => AccessError::Device {
                source,
                transferred,
            },
        }
    }
}

impl<E> AccessError<E> {
    /// Bytes transferred before the error, zero for errors raised up front.
    pub fn transferred(&self) -> usize {
        match self {
            Self::EndOfStream { transferred } | Self::Device { transferred, .. } => *transferred,
            _ => 0,
        }
    }

    /// Whether this error marks the end of the device.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream { .. })
    }
}

impl<E: fmt::Display> fmt::Display for AccessError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream { transferred } => {
                write!(f, "End of stream after {} bytes", transferred)
            }
            Self::ShortWrite => write!(f, "Write would extend past the end of the device"),
            Self::InvalidOffset => write!(f, "Cannot seek to a negative offset"),
            Self::Unsupported(what) => write!(f, "Unsupported operation: {}", what),
            Self::OffsetOverflow => write!(f, "Offset arithmetic overflowed"),
            Self::Device {
                source,
                transferred,
            } => write!(f, "Device error after {} bytes: {}", transferred, source),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> core::error::Error for AccessError<E> {}

impl<E: fmt::Debug + fmt::Display> embedded_io_async::Error for AccessError<E> {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::InvalidOffset | Self::Unsupported(_) | Self::OffsetOverflow => {
                embedded_io_async::ErrorKind::InvalidInput
            }
            Self::EndOfStream { .. } | Self::ShortWrite | Self::Device { .. } => {
                embedded_io_async::ErrorKind::Other
            }
        }
    }
}
