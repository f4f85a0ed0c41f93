//! Re-encoding of input files to UTF-8.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::encoding::detect::{detect_bytes, read_input, Detection};
use crate::error::AppError;
use crate::streaming::write_atomic;

/// Outcome of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub detection: Detection,
    pub temp_path: PathBuf,
    /// Size of the source file in bytes.
    pub input_bytes: usize,
    /// Size of the UTF-8 output in bytes.
    pub output_bytes: usize,
}

/// Decodes `bytes` with the detected encoding, rejecting malformed input.
///
/// Returns `None` when the bytes are not valid in that encoding.
pub fn decode_strict<'a>(bytes: &'a [u8], detection: &Detection) -> Option<Cow<'a, str>> {
    let body = bytes.get(detection.bom_len..).unwrap_or_default();
    detection
        .encoding
        .decode_without_bom_handling_and_without_replacement(body)
}

/// Converts the file at `input` to UTF-8 (no BOM) at `temp`.
///
/// When `encoding_label` is given it replaces detection.
///
/// # Errors
///
/// - `AppError::FileNotFound` if `input` does not exist
/// - `AppError::UnknownEncoding` for an unrecognised label
/// - `AppError::Decode` if the bytes are malformed for the encoding
/// - `AppError::Conversion` / `AppError::CsvWrite` for I/O failures
pub async fn convert_to_utf8(
    input: &Path,
    temp: &Path,
    encoding_label: Option<&str>,
) -> Result<Conversion, AppError> {
    let result = convert_inner(input, temp, encoding_label).await;
    if let Err(e) = &result {
        error!("[ENCODING] Failed to convert {} to UTF-8: {}", input.display(), e);
    }
    result
}

async fn convert_inner(
    input: &Path,
    temp: &Path,
    encoding_label: Option<&str>,
) -> Result<Conversion, AppError> {
    let bytes = read_input(input).await?;

    let detection = match encoding_label {
        Some(label) => Detection::from_label(label, &bytes)?,
        None => detect_bytes(&bytes),
    };
    info!(
        "[ENCODING] Detected file encoding: {} ({:?})",
        detection.name(),
        detection.method
    );

    let decoded = decode_strict(&bytes, &detection).ok_or_else(|| AppError::Decode {
        path: input.display().to_string(),
        encoding: detection.name().to_string(),
    })?;

    let temp_path = write_atomic(temp, decoded.as_bytes())?;

    Ok(Conversion {
        detection,
        temp_path,
        input_bytes: bytes.len(),
        output_bytes: decoded.len(),
    })
}
