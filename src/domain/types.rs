//! Shared table and settings types.
//!
//! Cells are kept as the text that was fetched. Only cells an override or a
//! fallback actually touches are rewritten, so everything else round-trips
//! unchanged into the output CSV.

use crate::error::BlendError;

/// Column holding each row's timestamp.
pub const TIMESTAMP_COLUMN: &str = "weather_datetime";

/// Column holding each row's category.
pub const CATEGORY_COLUMN: &str = "subsector";

/// Number of leading descriptive columns in the upstream files.
pub const DEFAULT_ENTITY_OFFSET: usize = 4;

/// An ordered header plus ordered rows, one cell per header column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, String> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(format!(
                "row {} has {} fields, header has {}",
                idx + 1,
                row.len(),
                columns.len()
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, BlendError> {
        self.column_index(name).ok_or_else(|| BlendError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Columns after the fixed non-entity prefix.
    pub fn entity_columns(&self, entity_offset: usize) -> &[String] {
        self.columns.get(entity_offset..).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    pub(crate) fn set_cell(&mut self, row: usize, col: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Indices of rows whose `col` equals `value`, in table order.
    pub fn rows_matching(&self, col: usize, value: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.get(col).is_some_and(|c| c == value))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Copy of this table keeping only the rows at `indices` (in the given order).
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
        }
    }
}

/// What to do with a `weather_datetime` value that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Treat the row as "not this year" and drop it.
    #[default]
    Exclude,
    /// Fail the run.
    Reject,
}

/// Knobs that shape the transform but are not part of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendSettings {
    pub entity_offset: usize,
    pub timestamp_policy: TimestampPolicy,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            entity_offset: DEFAULT_ENTITY_OFFSET,
            timestamp_policy: TimestampPolicy::Exclude,
        }
    }
}

impl BlendSettings {
    /// Read `BLEND_ENTITY_OFFSET` and `BLEND_STRICT_TIMESTAMPS`, falling back to defaults.
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenvy::dotenv().ok();
        let mut settings = Self::default();

        if let Ok(raw) = std::env::var("BLEND_ENTITY_OFFSET") {
            settings.entity_offset = raw.trim().parse::<usize>().map_err(|e| {
                crate::error::AppError::new(2, format!("Invalid BLEND_ENTITY_OFFSET '{raw}': {e}"))
            })?;
        }
        if let Ok(raw) = std::env::var("BLEND_STRICT_TIMESTAMPS") {
            if parse_flag(&raw).ok_or_else(|| {
                crate::error::AppError::new(2, format!("Invalid BLEND_STRICT_TIMESTAMPS '{raw}'"))
            })? {
                settings.timestamp_policy = TimestampPolicy::Reject;
            }
        }

        Ok(settings)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::table;
    use super::*;

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Table::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        )
        .unwrap_err();
        assert!(err.contains("row 1"));
    }

    #[test]
    fn entity_columns_skip_prefix() {
        let t = table(&["weather_datetime", "subsector", "TX", "CA"], &[]);
        assert_eq!(t.entity_columns(2), ["TX".to_string(), "CA".to_string()]);
        assert!(t.entity_columns(10).is_empty());
    }

    #[test]
    fn rows_matching_preserves_order() {
        let t = table(
            &["subsector", "TX"],
            &[&["res", "1"], &["ind", "2"], &["res", "3"]],
        );
        assert_eq!(t.rows_matching(0, "res"), vec![0, 2]);
        assert_eq!(t.select_rows(&[2]).cell(0, 1), Some("3"));
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
