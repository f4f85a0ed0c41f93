//! Atomic file writers with automatic cleanup on failure.
//!
//! Both writers stage their output in a temporary file in the same
//! directory as the destination, then rename it onto the destination
//! once everything is flushed. If dropped before finishing, the
//! temporary file is removed and the destination is left untouched.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::Writer;
use tempfile::NamedTempFile;

use crate::error::AppError;

/// UTF-8 BOM bytes.
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Returns the directory a temporary sibling of `path` should live in.
///
/// A bare file name has an empty parent, which means the working directory.
fn staging_dir(path: &Path) -> Result<&Path, AppError> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(Path::new(".")),
        Some(parent) => Ok(parent),
        None => Err(AppError::CsvWrite(format!(
            "Cannot determine parent directory for: {}",
            path.display()
        ))),
    }
}

fn create_staging_file(final_path: &Path) -> Result<NamedTempFile, AppError> {
    let parent_dir = staging_dir(final_path)?;
    NamedTempFile::new_in(parent_dir)
        .map_err(|e| AppError::CsvWrite(format!("Failed to create temporary file: {}", e)))
}

fn persist(named_temp: NamedTempFile, final_path: &Path) -> Result<(), AppError> {
    named_temp.persist(final_path).map_err(|e| {
        AppError::CsvWrite(format!(
            "Failed to persist file to {}: {}",
            final_path.display(),
            e.error
        ))
    })?;
    Ok(())
}

/// Writes `bytes` to `final_path` atomically.
///
/// Used for the UTF-8 intermediate file, which is plain text rather
/// than records.
pub fn write_atomic(final_path: impl AsRef<Path>, bytes: &[u8]) -> Result<PathBuf, AppError> {
    let final_path = final_path.as_ref();
    let mut named_temp = create_staging_file(final_path)?;

    named_temp
        .write_all(bytes)
        .and_then(|_| named_temp.flush())
        .map_err(|e| AppError::CsvWrite(format!("Failed to write temporary file: {}", e)))?;

    persist(named_temp, final_path)?;
    Ok(final_path.to_path_buf())
}

/// An atomic CSV writer that ensures data integrity.
///
/// Writes to a temporary file and atomically persists to the final path
/// on `finish()`. If dropped without calling `finish()`, the temporary
/// file is automatically deleted.
pub struct AtomicCsvWriter {
    writer: Writer<BufWriter<NamedTempFile>>,
    final_path: PathBuf,
}

impl AtomicCsvWriter {
    #[cfg(test)]
    fn new(final_path: impl AsRef<Path>) -> Result<Self, AppError> {
        Self::create(final_path.as_ref(), false)
    }

    /// Creates a writer whose output starts with a UTF-8 byte-order mark.
    ///
    /// Spreadsheet tools use the BOM to recognise the file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CsvWrite` if the parent directory cannot be
    /// determined or the temporary file cannot be created.
    pub fn with_bom(final_path: impl AsRef<Path>) -> Result<Self, AppError> {
        Self::create(final_path.as_ref(), true)
    }

    fn create(final_path: &Path, bom: bool) -> Result<Self, AppError> {
        let temp_file = create_staging_file(final_path)?;
        let mut buf_writer = BufWriter::new(temp_file);

        if bom {
            buf_writer
                .write_all(UTF8_BOM)
                .map_err(|e| AppError::CsvWrite(format!("Failed to write BOM: {}", e)))?;
        }

        Ok(Self {
            writer: Writer::from_writer(buf_writer),
            final_path: final_path.to_path_buf(),
        })
    }

    /// Returns a mutable reference to the underlying CSV writer.
    pub fn writer_mut(&mut self) -> &mut Writer<BufWriter<NamedTempFile>> {
        &mut self.writer
    }

    /// Flushes all buffers and atomically persists the file to the final path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CsvWrite` if flushing or persisting fails.
    /// On error, the temporary file is cleaned up automatically.
    pub fn finish(self) -> Result<PathBuf, AppError> {
        let buf_writer = self.writer.into_inner().map_err(|e| {
            AppError::CsvWrite(format!("Failed to flush CSV writer: {}", e.error()))
        })?;

        let named_temp = buf_writer
            .into_inner()
            .map_err(|e| AppError::CsvWrite(format!("Failed to flush buffer: {}", e.error())))?;

        persist(named_temp, &self.final_path)?;
        Ok(self.final_path)
    }
}
