//! Atomic output writing.
//!
//! Output files are staged next to their destination and renamed into
//! place, so an interrupted run never leaves a half-written CSV behind.

mod atomic_writer;

pub use atomic_writer::{write_atomic, AtomicCsvWriter, UTF8_BOM};
