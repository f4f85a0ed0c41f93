//! Encoding detection and conversion to UTF-8.

pub mod convert;
pub mod detect;

pub use convert::{convert_to_utf8, decode_strict, Conversion};
pub use detect::{detect_bytes, detect_encoding, Detection, DetectionMethod};
