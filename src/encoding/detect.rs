//! Byte-encoding detection for input files.
//!
//! Detection order:
//! - a byte-order mark decides outright
//! - bytes that are valid UTF-8 are UTF-8 (ASCII included)
//! - otherwise `chardetng` guesses a legacy encoding

use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// How an encoding was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionMethod {
    /// A byte-order mark was found.
    Bom,
    /// The bytes decode cleanly as UTF-8.
    Utf8Valid,
    /// Statistical guess over the whole file.
    Guessed,
    /// Given by the user.
    Override,
}

/// Result of encoding detection.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    /// Length of the byte-order mark to skip before decoding.
    pub bom_len: usize,
    pub method: DetectionMethod,
}

impl Detection {
    /// Canonical WHATWG name of the detected encoding.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Builds a detection from a user-supplied label.
    ///
    /// A BOM matching the forced encoding is still skipped.
    pub fn from_label(label: &str, bytes: &[u8]) -> Result<Self, AppError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| AppError::UnknownEncoding(label.to_string()))?;

        let bom_len = match Encoding::for_bom(bytes) {
            Some((bom_encoding, len)) if bom_encoding == encoding => len,
            _ => 0,
        };

        Ok(Self {
            encoding,
            bom_len,
            method: DetectionMethod::Override,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Infers the encoding of raw file bytes.
pub fn detect_bytes(bytes: &[u8]) -> Detection {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return Detection {
            encoding,
            bom_len,
            method: DetectionMethod::Bom,
        };
    }

    if std::str::from_utf8(bytes).is_ok() {
        return Detection {
            encoding: UTF_8,
            bom_len: 0,
            method: DetectionMethod::Utf8Valid,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    debug!("[ENCODING] chardetng guessed {}", encoding.name());

    Detection {
        encoding,
        bom_len: 0,
        method: DetectionMethod::Guessed,
    }
}

/// Reads the whole file at `path` and infers its encoding.
///
/// # Errors
///
/// Returns `AppError::FileNotFound` if the file does not exist, or
/// `AppError::Conversion` if it cannot be read.
pub async fn detect_encoding(path: &Path) -> Result<Detection, AppError> {
    let bytes = read_input(path).await?;
    Ok(detect_bytes(&bytes))
}

pub(crate) async fn read_input(path: &Path) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound(path.display().to_string())
        } else {
            AppError::Conversion(format!("Failed to read {}: {}", path.display(), e))
        }
    })
}
