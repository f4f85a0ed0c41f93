//! The end-to-end run: re-encode, load, translate columns, write.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{same_path, RunOptions};
use crate::encoding::convert_to_utf8;
use crate::error::AppError;
use crate::table::{reindex, Table};
use crate::translation::{translate_texts, Translator};
use crate::validation::{self, CsvValidationWarning};

/// Rows shown in the post-load preview.
const PREVIEW_ROWS: usize = 5;

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Encoding the input was decoded with.
    pub encoding: String,
    pub rows: usize,
    /// Columns added to the output, in request order.
    pub translated_columns: Vec<String>,
    /// Requested columns absent from the input.
    pub skipped_columns: Vec<String>,
    /// Intermediate file, `None` once removed.
    pub temp_path: Option<PathBuf>,
    pub output_path: PathBuf,
}

/// Translates `columns` of `input` and writes the result to `output`.
///
/// # Errors
///
/// An intermediate file that aliases the input or output is refused before
/// anything is written. Conversion failures, a missing or malformed
/// intermediate file, and output write failures abort the run. Translation failures do not: the affected
/// column is filled with the original texts instead.
pub async fn translate_csv(
    input: &Path,
    output: &Path,
    columns: &[String],
    options: &RunOptions,
    translator: &dyn Translator,
) -> Result<RunReport, AppError> {
    let temp = options.temp_file.as_path();
    if same_path(temp, input) || same_path(temp, output) {
        return Err(AppError::Config(format!(
            "Intermediate file {} must differ from the input and output paths",
            temp.display()
        )));
    }

    let conversion = convert_to_utf8(input, temp, options.source_encoding.as_deref())
        .await
        .inspect_err(|_| error!("[CSV] File conversion failed, cannot continue translating"))?;

    if !tokio::fs::try_exists(temp).await.unwrap_or(false) {
        error!("[CSV] Intermediate file {} does not exist", temp.display());
        return Err(AppError::FileNotFound(temp.display().to_string()));
    }

    let validation = validation::validate(temp).await?.into_result()?;
    for warning in &validation.warnings {
        match warning {
            CsvValidationWarning::SampleOnlyValidation { .. } => {}
            other => warn!("[CSV] {}: {:?}", temp.display(), other),
        }
    }

    let mut table = Table::from_path(temp)?;
    info!(
        "[CSV] Loaded {} rows, preview:\n{}",
        table.row_count(),
        table.preview(PREVIEW_ROWS)
    );

    let mut translated_columns = Vec::new();
    let mut skipped_columns = Vec::new();

    for column in columns {
        let Some(col) = table.column_index(column) else {
            warn!("[CSV] Column {} not found in data, skipping translation", column);
            skipped_columns.push(column.clone());
            continue;
        };

        let (positions, texts): (Vec<usize>, Vec<String>) = table
            .non_null(col)
            .into_iter()
            .map(|(row, text)| (row, text.to_string()))
            .unzip();

        info!(
            "[CSV] Translating column {} ({} non-empty of {} rows)",
            column,
            texts.len(),
            table.row_count()
        );
        let translations = translate_texts(
            texts,
            translator,
            &options.source_lang,
            &options.target_lang,
        )
        .await;

        let values = reindex(table.row_count(), &positions, translations)?;
        let new_column = format!("{}{}", column, options.suffix);
        table.set_column(&new_column, values)?;
        if !translated_columns.contains(&new_column) {
            translated_columns.push(new_column);
        }
    }

    table.write_with_bom(output)?;
    info!("[CSV] Translation complete, result saved to {}", output.display());

    let temp_path = if options.keep_temp {
        Some(conversion.temp_path)
    } else {
        if let Err(e) = tokio::fs::remove_file(&conversion.temp_path).await {
            warn!(
                "[CSV] Failed to remove {}: {}",
                conversion.temp_path.display(),
                e
            );
        }
        None
    };

    Ok(RunReport {
        encoding: conversion.detection.name().to_string(),
        rows: table.row_count(),
        translated_columns,
        skipped_columns,
        temp_path,
        output_path: output.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::UTF8_BOM;
    use crate::translation::testing::{FailingTranslator, TaggingTranslator};
    use encoding_rs::WINDOWS_1252;
    use std::fs;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    struct Fixture {
        dir: TempDir,
        input: PathBuf,
        output: PathBuf,
        options: RunOptions,
    }

    fn fixture(input_bytes: &[u8]) -> Fixture {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let input = dir.path().join("mib.csv");
        fs::write(&input, input_bytes).expect("Failed to write input");
        let options = RunOptions {
            temp_file: dir.path().join("temp_utf8.csv"),
            ..RunOptions::default()
        };
        Fixture {
            output: dir.path().join("mib-cn.csv"),
            input,
            options,
            dir,
        }
    }

    fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let bytes = fs::read(path).expect("output should exist");
        assert!(bytes.starts_with(UTF8_BOM), "output should carry a BOM");

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(&bytes[UTF8_BOM.len()..]);
        let headers = reader
            .headers()
            .unwrap()
            .iter()
            .map(String::from)
            .collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        (headers, rows)
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const MIB: &str = "OBJECT_NAME,OBJECT_DESCRIPTION\n\
        hwWlanApName,Name of the AP\n\
        hwWlanApReserved,\n\
        hwWlanApState,Running state\n";

    #[tokio::test]
    async fn translated_column_is_aligned_with_nulls() {
        let fx = fixture(MIB.as_bytes());
        let translator = TaggingTranslator::default();

        let report = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["OBJECT_DESCRIPTION"]),
            &fx.options,
            &translator,
        )
        .await
        .expect("run should succeed");

        let (headers, rows) = read_output(&fx.output);
        assert_eq!(
            headers,
            columns(&["OBJECT_NAME", "OBJECT_DESCRIPTION", "OBJECT_DESCRIPTION_translated"])
        );
        assert_eq!(rows.len(), 3, "row count is preserved");
        assert_eq!(rows[0][2], "[zh] Name of the AP");
        assert_eq!(rows[1][2], "", "null rows stay null");
        assert_eq!(rows[2][2], "[zh] Running state");

        assert_eq!(report.rows, 3);
        assert_eq!(report.encoding, "UTF-8");
        assert_eq!(report.translated_columns, columns(&["OBJECT_DESCRIPTION_translated"]));
        assert!(report.skipped_columns.is_empty());
        assert_eq!(report.temp_path.as_deref(), Some(fx.options.temp_file.as_path()));
        assert!(fx.options.temp_file.exists(), "intermediate file is kept");
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_column_is_skipped() {
        let fx = fixture(MIB.as_bytes());
        let translator = TaggingTranslator::default();

        let report = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["NO_SUCH_COLUMN", "OBJECT_NAME"]),
            &fx.options,
            &translator,
        )
        .await
        .unwrap();

        let (headers, rows) = read_output(&fx.output);
        assert_eq!(
            headers,
            columns(&["OBJECT_NAME", "OBJECT_DESCRIPTION", "OBJECT_NAME_translated"])
        );
        assert_eq!(rows[1][1], "", "source columns are untouched");
        assert_eq!(report.skipped_columns, columns(&["NO_SUCH_COLUMN"]));
        assert!(logs_contain(
            "Column NO_SUCH_COLUMN not found in data, skipping translation"
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn translation_failure_copies_the_source_column() {
        let fx = fixture(MIB.as_bytes());

        translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["OBJECT_DESCRIPTION"]),
            &fx.options,
            &FailingTranslator,
        )
        .await
        .expect("translation failures do not abort the run");

        let (_, rows) = read_output(&fx.output);
        for row in &rows {
            assert_eq!(row[2], row[1]);
        }
        assert!(logs_contain("[TRANSLATE] Translation failed"));
    }

    #[tokio::test]
    async fn legacy_encoded_input_is_translated() {
        let (bytes, _, _) = WINDOWS_1252.encode("Name,Desc\ncafé,crème brûlée\n");
        let mut fx = fixture(&bytes);
        fx.options.source_encoding = Some("windows-1252".into());
        let translator = TaggingTranslator::default();

        let report = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["Desc"]),
            &fx.options,
            &translator,
        )
        .await
        .unwrap();

        let (_, rows) = read_output(&fx.output);
        assert_eq!(rows[0], columns(&["café", "crème brûlée", "[zh] crème brûlée"]));
        assert_eq!(report.encoding, "windows-1252");
    }

    #[tokio::test]
    #[traced_test]
    async fn conversion_failure_aborts_before_writing() {
        let mut fx = fixture(b"a,b\n\xff,1\n");
        fx.options.source_encoding = Some("utf-8".into());
        let translator = TaggingTranslator::default();

        let result = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["a"]),
            &fx.options,
            &translator,
        )
        .await;

        assert!(matches!(result, Err(AppError::Decode { .. })));
        assert!(!fx.output.exists());
        assert!(logs_contain("File conversion failed, cannot continue translating"));
    }

    #[tokio::test]
    async fn empty_input_aborts() {
        let fx = fixture(b"");
        let translator = TaggingTranslator::default();

        let result = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["a"]),
            &fx.options,
            &translator,
        )
        .await;

        assert!(matches!(result, Err(AppError::CsvInvalid(_))));
        assert!(!fx.output.exists());
    }

    #[tokio::test]
    async fn remove_temp_deletes_intermediate_file() {
        let mut fx = fixture(MIB.as_bytes());
        fx.options.keep_temp = false;
        let translator = TaggingTranslator::default();

        let report = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["OBJECT_DESCRIPTION"]),
            &fx.options,
            &translator,
        )
        .await
        .unwrap();

        assert!(report.temp_path.is_none());
        assert!(!fx.options.temp_file.exists());
        assert!(fx.dir.path().join("mib-cn.csv").exists());
    }

    #[tokio::test]
    async fn requesting_a_column_twice_overwrites_it() {
        let fx = fixture(MIB.as_bytes());
        let translator = TaggingTranslator::default();

        let report = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["OBJECT_DESCRIPTION", "OBJECT_DESCRIPTION"]),
            &fx.options,
            &translator,
        )
        .await
        .unwrap();

        let (headers, _) = read_output(&fx.output);
        assert_eq!(headers.len(), 3);
        assert_eq!(
            report.translated_columns,
            columns(&["OBJECT_DESCRIPTION_translated"])
        );
    }

    #[tokio::test]
    async fn temp_file_aliasing_output_is_refused() {
        let mut fx = fixture(MIB.as_bytes());
        fx.options.temp_file = fx.output.clone();
        fx.options.keep_temp = false;
        let translator = TaggingTranslator::default();

        let result = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["OBJECT_DESCRIPTION"]),
            &fx.options,
            &translator,
        )
        .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(!fx.output.exists());
        assert_eq!(translator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn temp_file_aliasing_input_leaves_input_untouched() {
        let (bytes, _, _) = WINDOWS_1252.encode("Name,Desc\ncafé,crème\n");
        let mut fx = fixture(&bytes);
        fx.options.temp_file = fx.input.clone();
        fx.options.keep_temp = false;
        let translator = TaggingTranslator::default();

        let result = translate_csv(
            &fx.input,
            &fx.output,
            &columns(&["Desc"]),
            &fx.options,
            &translator,
        )
        .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(fs::read(&fx.input).unwrap(), &bytes[..]);
        assert!(!fx.output.exists());
    }
}
