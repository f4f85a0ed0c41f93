//! Tabular data loaded from CSV.

mod frame;

pub use frame::{is_null_marker, reindex, Cell, Table, NULL_MARKERS};
