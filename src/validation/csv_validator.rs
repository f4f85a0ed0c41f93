//! Sample-based inspection of the intermediate UTF-8 CSV.
//!
//! Reads at most `VALIDATION_SAMPLE_SIZE` bytes, so the check stays cheap
//! even for large exports. Catches the problems that would otherwise
//! surface as confusing load errors:
//! - missing intermediate file
//! - empty file or missing header
//! - rows wider than the header
//! - mixed line endings

use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::error::AppError;
use crate::streaming::UTF8_BOM;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Size of the sample buffer for validation (512 KB).
pub const VALIDATION_SAMPLE_SIZE: usize = 512 * 1024;

/// Maximum number of records to inspect in the sample.
const MAX_RECORDS_TO_VALIDATE: usize = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of CSV validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvValidationResult {
    /// Whether the file passed validation (no errors).
    pub ok: bool,
    pub errors: Vec<CsvValidationError>,
    pub warnings: Vec<CsvValidationWarning>,
    pub stats: CsvValidationStats,
}

/// Statistics collected during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvValidationStats {
    pub file_size_bytes: u64,
    /// Number of bytes actually inspected.
    pub sample_bytes: u64,
    pub headers: Vec<String>,
    pub line_endings: LineEndings,
    /// Data rows seen in the sample.
    pub sampled_rows: u64,
    /// Estimated total data rows, extrapolated from the sample.
    pub estimated_total_rows: Option<u64>,
}

/// Detected line ending style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEndings {
    LF,
    CRLF,
    Mixed,
    #[default]
    Unknown,
}

/// Problems that make the file unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvValidationError {
    NotUtf8,
    EmptyFile,
    NoHeaders,
    /// A row carries more fields than the header.
    TooManyFields {
        expected: usize,
        found: usize,
        /// 1-based line number, header included.
        row: u64,
    },
    CsvParseError { message: String },
}

/// Findings that don't stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvValidationWarning {
    /// A BOM survived conversion; it would become part of the first header.
    HasBom,
    MixedLineEndings,
    /// Rows shorter than the header; missing cells load as null.
    ShortRows { count: u64 },
    /// Only a sample of the file was inspected.
    SampleOnlyValidation { validated_rows: u64 },
}

impl CsvValidationResult {
    fn failed(error: CsvValidationError, stats: CsvValidationStats) -> Self {
        Self {
            ok: false,
            errors: vec![error],
            warnings: vec![],
            stats,
        }
    }

    /// Converts the first validation error into an `AppError`.
    pub fn into_result(self) -> Result<Self, AppError> {
        match self.errors.first() {
            None => Ok(self),
            Some(CsvValidationError::NotUtf8) => {
                Err(AppError::CsvInvalid("intermediate file is not UTF-8".into()))
            }
            Some(CsvValidationError::EmptyFile) => {
                Err(AppError::CsvInvalid("file is empty".into()))
            }
            Some(CsvValidationError::NoHeaders) => {
                Err(AppError::CsvInvalid("no header row".into()))
            }
            Some(CsvValidationError::TooManyFields {
                expected,
                found,
                row,
            }) => Err(AppError::CsvInvalid(format!(
                "expected {} fields in line {}, saw {}",
                expected, row, found
            ))),
            Some(CsvValidationError::CsvParseError { message }) => {
                Err(AppError::CsvInvalid(message.clone()))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Validates a UTF-8 CSV file from a fixed-size sample.
///
/// # Errors
///
/// Returns `AppError::FileNotFound` when the file is missing and
/// `AppError::Internal` for other I/O failures. Content problems are
/// reported in `CsvValidationResult.errors`.
pub async fn validate(path: &Path) -> Result<CsvValidationResult, AppError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound(path.display().to_string())
        } else {
            AppError::Internal(format!("Failed to read file metadata: {}", e))
        }
    })?;

    let file_size_bytes = metadata.len();
    if file_size_bytes == 0 {
        return Ok(CsvValidationResult::failed(
            CsvValidationError::EmptyFile,
            CsvValidationStats::default(),
        ));
    }

    let sample_size = (file_size_bytes as usize).min(VALIDATION_SAMPLE_SIZE);
    let mut buffer = vec![0u8; sample_size];
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to open file: {}", e)))?;
    file.read_exact(&mut buffer)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read file: {}", e)))?;

    Ok(validate_sample(&buffer, file_size_bytes))
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn validate_sample(buffer: &[u8], file_size_bytes: u64) -> CsvValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let sample_bytes = buffer.len() as u64;
    let is_sample_only = file_size_bytes > sample_bytes;

    let mut stats = CsvValidationStats {
        file_size_bytes,
        sample_bytes,
        ..CsvValidationStats::default()
    };

    if buffer.starts_with(UTF8_BOM) {
        warnings.push(CsvValidationWarning::HasBom);
    }
    let data = buffer.strip_prefix(UTF8_BOM).unwrap_or(buffer);

    // A sample may cut a multi-byte character in half; only the tail may be invalid.
    if let Err(e) = std::str::from_utf8(data) {
        let truncated_tail = is_sample_only && e.error_len().is_none();
        if !truncated_tail {
            return CsvValidationResult::failed(CsvValidationError::NotUtf8, stats);
        }
    }

    stats.line_endings = detect_line_endings(data);
    if stats.line_endings == LineEndings::Mixed {
        warnings.push(CsvValidationWarning::MixedLineEndings);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(data));

    stats.headers = match reader.headers() {
        Ok(h) => h.iter().map(String::from).collect(),
        Err(e) => {
            return CsvValidationResult::failed(
                CsvValidationError::CsvParseError {
                    message: e.to_string(),
                },
                stats,
            );
        }
    };
    if stats.headers.is_empty() || stats.headers.iter().all(|h| h.trim().is_empty()) {
        return CsvValidationResult::failed(CsvValidationError::NoHeaders, stats);
    }

    let expected = stats.headers.len();
    let mut short_rows: u64 = 0;
    let mut total_record_bytes: usize = 0;

    for result in reader.records().take(MAX_RECORDS_TO_VALIDATE) {
        match result {
            Ok(record) => {
                stats.sampled_rows += 1;
                total_record_bytes +=
                    record.iter().map(str::len).sum::<usize>() + record.len() + 1;

                if record.len() > expected {
                    errors.push(CsvValidationError::TooManyFields {
                        expected,
                        found: record.len(),
                        row: stats.sampled_rows + 1,
                    });
                    break;
                } else if record.len() < expected {
                    short_rows += 1;
                }
            }
            Err(e) => {
                if is_sample_only && is_likely_truncation_error(&e) {
                    break;
                }
                errors.push(CsvValidationError::CsvParseError {
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    if short_rows > 0 {
        warnings.push(CsvValidationWarning::ShortRows { count: short_rows });
    }
    if is_sample_only {
        warnings.push(CsvValidationWarning::SampleOnlyValidation {
            validated_rows: stats.sampled_rows,
        });
    }

    stats.estimated_total_rows = if !is_sample_only {
        Some(stats.sampled_rows)
    } else if stats.sampled_rows > 0 && total_record_bytes > 0 {
        let avg_bytes_per_row = total_record_bytes as f64 / stats.sampled_rows as f64;
        Some((file_size_bytes as f64 / avg_bytes_per_row).ceil() as u64)
    } else {
        None
    };

    CsvValidationResult {
        ok: errors.is_empty(),
        errors,
        warnings,
        stats,
    }
}

/// Detects line ending style in the given bytes.
fn detect_line_endings(data: &[u8]) -> LineEndings {
    let mut has_lf = false;
    let mut has_crlf = false;

    let mut prev = 0u8;
    for &byte in data {
        if byte == b'\n' {
            if prev == b'\r' {
                has_crlf = true;
            } else {
                has_lf = true;
            }
        }
        prev = byte;
    }

    match (has_lf, has_crlf) {
        (true, true) => LineEndings::Mixed,
        (true, false) => LineEndings::LF,
        (false, true) => LineEndings::CRLF,
        (false, false) => LineEndings::Unknown,
    }
}

/// Checks if the error is likely due to the sample cutting a record.
fn is_likely_truncation_error(err: &csv::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("unexpected eof") || msg.contains("premature eof") || msg.contains("utf-8")
}
