//! Sequential streams over aligned devices.
//!
//! [`CursorStream`] layers a shared read/write position on top of an
//! [`AlignedDevice`](crate::adapters::AlignedDevice) and implements the
//! `embedded_io_async` Read/Write/Seek traits for integration with file systems
//! and other I/O frameworks.

mod cursor_stream;
mod embedded_io_impl;

pub use cursor_stream::CursorStream;

/// Seek position for stream operations.
///
/// Offsets are signed in every mode so that a negative target can be requested and
/// rejected, rather than being unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Offset from the start of the stream.
    Start(i64),
    /// Offset relative to the current position.
    Current(i64),
    /// Offset from the end of the stream. Not supported by [`CursorStream`].
    End(i64),
}
