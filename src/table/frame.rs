//! In-memory CSV table with null-aware cells.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::warn;

use crate::error::AppError;
use crate::streaming::AtomicCsvWriter;

/// Raw cell texts treated as missing values when loading.
pub const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Returns true if `raw` is a missing-value marker.
pub fn is_null_marker(raw: &str) -> bool {
    NULL_MARKERS.contains(&raw)
}

/// A single cell: the raw text as read, and whether it counts as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    raw: String,
    null: bool,
}

impl Cell {
    /// Cell loaded from CSV text.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let null = is_null_marker(&raw);
        Self { raw, null }
    }

    /// Cell produced by the tool; `None` is written as an empty field.
    pub fn from_value(value: Option<String>) -> Self {
        match value {
            Some(raw) => Self { raw, null: false },
            None => Self::null(),
        }
    }

    pub fn null() -> Self {
        Self {
            raw: String::new(),
            null: true,
        }
    }

    /// The value, or `None` when the cell is null.
    pub fn value(&self) -> Option<&str> {
        if self.null {
            None
        } else {
            Some(&self.raw)
        }
    }

    /// The text written back to CSV.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Rows × named columns, fully loaded into memory.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Loads a UTF-8 CSV file with a header row.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileNotFound(path.display().to_string())
            } else {
                AppError::CsvInvalid(format!("Failed to open {}: {}", path.display(), e))
            }
        })?;
        Self::from_reader(file)
    }

    /// Loads CSV from any reader. Short rows are padded with nulls.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CsvInvalid` for parse errors and for rows with more
    /// fields than the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AppError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::CsvInvalid(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(String::from)
            .collect();

        for (index, header) in headers.iter().enumerate() {
            if headers[..index].contains(header) {
                warn!(
                    "[CSV] Duplicate column {} at position {}, lookups use the first one",
                    header,
                    index + 1
                );
            }
        }

        let width = headers.len();
        let mut rows = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::CsvInvalid(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.len() > width {
                return Err(AppError::CsvInvalid(format!(
                    "Expected {} fields in row {}, saw {}",
                    width,
                    index + 1,
                    record.len()
                )));
            }

            let mut row: Vec<Cell> = record.iter().map(Cell::from_raw).collect();
            row.resize(width, Cell::null());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of column `col`, `None` where null.
    pub fn column(&self, col: usize) -> Vec<Option<&str>> {
        self.rows.iter().map(|row| row[col].value()).collect()
    }

    /// Non-null entries of column `col` with their row positions, in row order.
    pub fn non_null(&self, col: usize) -> Vec<(usize, &str)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row[col].value().map(|v| (i, v)))
            .collect()
    }

    /// Appends a column, or replaces an existing column with the same name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if `values` does not have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<(), AppError> {
        if values.len() != self.rows.len() {
            return Err(AppError::Internal(format!(
                "Column {} has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        let cells = values.into_iter().map(Cell::from_value);
        match self.column_index(name) {
            Some(col) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[col] = cell;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
        Ok(())
    }

    /// Header and the first `n` rows as aligned text, for logging.
    pub fn preview(&self, n: usize) -> String {
        let mut lines = Vec::with_capacity(n + 1);
        lines.push(self.headers.join(" | "));
        for row in self.rows.iter().take(n) {
            let cells: Vec<&str> = row
                .iter()
                .map(|c| c.value().unwrap_or("<null>"))
                .collect();
            lines.push(cells.join(" | "));
        }
        if self.rows.len() > n {
            lines.push(format!("... ({} rows total)", self.rows.len()));
        }
        lines.join("\n")
    }

    /// Writes the table as UTF-8 CSV with BOM, atomically.
    pub fn write_with_bom(&self, path: &Path) -> Result<(), AppError> {
        let mut writer = AtomicCsvWriter::with_bom(path)?;
        let out = writer.writer_mut();

        out.write_record(&self.headers)
            .map_err(|e| AppError::CsvWrite(format!("Failed to write header: {}", e)))?;
        for row in &self.rows {
            out.write_record(row.iter().map(Cell::raw))
                .map_err(|e| AppError::CsvWrite(format!("Failed to write row: {}", e)))?;
        }

        writer.finish()?;
        Ok(())
    }
}

/// Scatters `values` to `positions` in a column of `len` rows; every other
/// position is null.
///
/// # Errors
///
/// Returns `AppError::Internal` if the lengths differ or a position is out
/// of range.
pub fn reindex(
    len: usize,
    positions: &[usize],
    values: Vec<String>,
) -> Result<Vec<Option<String>>, AppError> {
    if positions.len() != values.len() {
        return Err(AppError::Internal(format!(
            "{} values for {} positions",
            values.len(),
            positions.len()
        )));
    }

    let mut column = vec![None; len];
    for (&pos, value) in positions.iter().zip(values) {
        let slot = column
            .get_mut(pos)
            .ok_or_else(|| AppError::Internal(format!("Row {} out of range", pos)))?;
        *slot = Some(value);
    }
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::UTF8_BOM;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn load(content: &str) -> Table {
        Table::from_reader(content.as_bytes()).expect("Failed to load table")
    }

    #[test]
    fn test_null_markers() {
        let table = load("Name,Desc\na,NA\nb,\nc,text\nd,null\n");
        assert_eq!(
            table.column(1),
            vec![None, None, Some("text"), None]
        );
        assert_eq!(table.non_null(1), vec![(2, "text")]);
    }

    #[test]
    #[traced_test]
    fn test_duplicate_headers_warn_and_resolve_to_first() {
        let table = load("A,B,A\n1,2,3\n");

        assert_eq!(table.column_index("A"), Some(0));
        assert!(logs_contain("Duplicate column A at position 3"));
    }

    #[test]
    #[traced_test]
    fn test_unique_headers_do_not_warn() {
        load("A,B\n1,2\n");
        assert!(!logs_contain("Duplicate column"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = load("A,B,C\n1,2\n3,4,5\n");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column(2), vec![None, Some("5")]);
    }

    #[test]
    fn test_wide_rows_are_rejected() {
        let result = Table::from_reader("A,B\n1,2,3\n".as_bytes());
        assert!(matches!(result, Err(AppError::CsvInvalid(_))));
    }

    #[test]
    fn test_quoted_fields() {
        let table = load("Name,Desc\n\"x\",\"Line1\nLine2, with comma\"\n");
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.non_null(1), vec![(0, "Line1\nLine2, with comma")]);
    }

    #[test]
    fn test_reindex_restores_positions() {
        let column = reindex(5, &[1, 3], vec!["x".into(), "y".into()]).unwrap();
        assert_eq!(
            column,
            vec![None, Some("x".into()), None, Some("y".into()), None]
        );
    }

    #[test]
    fn test_reindex_rejects_mismatch() {
        assert!(reindex(3, &[0, 1], vec!["x".into()]).is_err());
        assert!(reindex(1, &[4], vec!["x".into()]).is_err());
    }

    #[test]
    fn test_set_column_appends_and_replaces() {
        let mut table = load("A\n1\n2\n");
        table
            .set_column("A_translated", vec![Some("one".into()), None])
            .unwrap();
        assert_eq!(table.headers(), ["A", "A_translated"]);
        assert_eq!(table.column(1), vec![Some("one"), None]);

        table
            .set_column("A_translated", vec![None, Some("two".into())])
            .unwrap();
        assert_eq!(table.headers().len(), 2);
        assert_eq!(table.column(1), vec![None, Some("two")]);

        assert!(table.set_column("B", vec![None]).is_err());
    }

    #[test]
    fn test_write_with_bom_keeps_raw_markers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut table = load("Name,Desc\na,NA\nb,hello\n");
        table
            .set_column("Desc_translated", vec![None, Some("你好".into())])
            .unwrap();

        table.write_with_bom(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text, "Name,Desc,Desc_translated\na,NA,\nb,hello,你好\n");
    }

    #[test]
    fn test_preview_limits_rows() {
        let table = load("A,B\n1,\n2,x\n3,y\n");
        let preview = table.preview(2);
        assert_eq!(preview, "A | B\n1 | <null>\n2 | x\n... (3 rows total)");
    }
}
