//! CSV <-> `Table`.
//!
//! Parsing is strict: every record must have exactly as many fields as the
//! header. Cell text is kept verbatim; only header names are cleaned up.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::domain::Table;
use crate::error::AppError;

/// Parse a CSV document into a `Table`.
pub fn read_table<R: Read>(reader: R) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| format!("failed to read CSV header: {e}"))?
        .iter()
        .map(normalize_header_name)
        .collect();

    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err("CSV has no header".to_string());
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| format!("CSV parse error at line {line}: {e}"))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Table::new(columns, rows)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Serialize a `Table` as CSV.
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new().from_writer(writer);
    writer
        .write_record(table.columns())
        .map_err(|e| format!("failed to write CSV header: {e}"))?;
    for row in table.rows() {
        writer
            .write_record(row)
            .map_err(|e| format!("failed to write CSV row: {e}"))?;
    }
    writer.flush().map_err(|e| format!("failed to flush CSV: {e}"))?;
    Ok(())
}

/// Write a `Table` to `path`, or to stdout when `path` is `-`.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), AppError> {
    if path.as_os_str() == "-" {
        let stdout = std::io::stdout();
        return write_table(stdout.lock(), table).map_err(|e| AppError::new(2, e));
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create output CSV '{}': {e}", path.display())))?;
    write_table(file, table)
        .map_err(|e| AppError::new(2, format!("Failed to write output CSV '{}': {e}", path.display())))
}
