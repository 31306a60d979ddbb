//! Infrastructure layer - high-level I/O built on the adapters.
//!
//! Adds a cursor and async Read/Write/Seek on top of an aligned device for
//! integration with file systems and other I/O frameworks.

pub mod streaming;
