//! Column-scoped multiplier overrides.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{CATEGORY_COLUMN, OverrideKey, Table};
use crate::error::BlendError;

/// Result of applying overrides: the new table plus what was done.
#[derive(Debug, Clone)]
pub struct OverrideOutcome {
    pub table: Table,
    /// Overrides that found their column, with the number of cells rescaled.
    pub applied: Vec<(OverrideKey, usize)>,
    /// Overrides whose entity column does not exist in the table.
    pub skipped: Vec<OverrideKey>,
}

/// Multiply `entity` cells of `category` rows by each override's multiplier.
///
/// The input table is left untouched. Empty cells are missing values and stay
/// empty; any other non-numeric cell is a `TypeMismatch`. Errors report the
/// row's position in `table` as its data line.
pub fn apply_overrides(
    table: &Table,
    overrides: &BTreeMap<OverrideKey, f64>,
) -> Result<OverrideOutcome, BlendError> {
    apply_overrides_at(table, overrides, |row| row + 2)
}

/// Like `apply_overrides`, with `source_line` mapping a row index to the data
/// line it came from in the fetched file.
pub fn apply_overrides_at(
    table: &Table,
    overrides: &BTreeMap<OverrideKey, f64>,
    source_line: impl Fn(usize) -> usize,
) -> Result<OverrideOutcome, BlendError> {
    let mut out = table.clone();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    if overrides.is_empty() {
        return Ok(OverrideOutcome {
            table: out,
            applied,
            skipped,
        });
    }

    let category_col = table.require_column(CATEGORY_COLUMN)?;

    for (key, &multiplier) in overrides {
        let Some(entity_col) = table.column_index(&key.entity) else {
            warn!(entity = %key.entity, category = %key.category, "override column not in dataset; skipped");
            skipped.push(key.clone());
            continue;
        };

        let rows = table.rows_matching(category_col, &key.category);
        let mut scaled = 0usize;
        for row in &rows {
            let raw = table.cell(*row, entity_col).unwrap_or("");
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value = trimmed.parse::<f64>().map_err(|_| BlendError::TypeMismatch {
                entity: key.entity.clone(),
                category: key.category.clone(),
                line: source_line(*row),
                value: raw.to_string(),
            })?;
            let result = value * multiplier;
            if !result.is_finite() {
                return Err(BlendError::NonFiniteResult {
                    entity: key.entity.clone(),
                    category: key.category.clone(),
                    line: source_line(*row),
                    value: raw.to_string(),
                    multiplier,
                });
            }
            out.set_cell(*row, entity_col, format_number(result));
            scaled += 1;
        }

        debug!(entity = %key.entity, category = %key.category, multiplier, cells = scaled, "override applied");
        applied.push((key.clone(), scaled));
    }

    Ok(OverrideOutcome {
        table: out,
        applied,
        skipped,
    })
}

/// Shortest decimal text that round-trips to `value`.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::fixtures::table;

    fn overrides(entries: &[(&str, &str, f64)]) -> BTreeMap<OverrideKey, f64> {
        entries
            .iter()
            .map(|(e, c, m)| (OverrideKey::new(*e, *c), *m))
            .collect()
    }

    #[test]
    fn scales_only_matching_category_and_column() {
        let t = table(
            &["weather_datetime", "subsector", "TX", "CA"],
            &[
                &["2023-01-01", "residential", "100", "200"],
                &["2023-01-01", "industrial", "100", "200"],
            ],
        );
        let out = apply_overrides(&t, &overrides(&[("TX", "residential", 1.5)])).unwrap();

        assert_eq!(out.table.cell(0, 2), Some("150"));
        assert_eq!(out.table.cell(0, 3), Some("200"));
        assert_eq!(out.table.cell(1, 2), Some("100"));
        assert_eq!(out.applied, vec![(OverrideKey::new("TX", "residential"), 1)]);
        // Input is not modified.
        assert_eq!(t.cell(0, 2), Some("100"));
    }

    #[test]
    fn missing_entity_column_is_a_noop() {
        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[&["2023-01-01", "residential", "100"]],
        );
        let out = apply_overrides(&t, &overrides(&[("NY", "residential", 3.0)])).unwrap();
        assert_eq!(out.table, t);
        assert_eq!(out.skipped, vec![OverrideKey::new("NY", "residential")]);
        assert!(out.applied.is_empty());
    }

    #[test]
    fn non_numeric_cell_is_type_mismatch() {
        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[&["2023-01-01", "residential", "n/a"]],
        );
        let err = apply_overrides(&t, &overrides(&[("TX", "residential", 2.0)])).unwrap_err();
        match err {
            BlendError::TypeMismatch { entity, line, value, .. } => {
                assert_eq!(entity, "TX");
                assert_eq!(line, 2);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_cells_stay_empty() {
        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[&["2023-01-01", "residential", ""], &["2023-01-02", "residential", "2.5"]],
        );
        let out = apply_overrides(&t, &overrides(&[("TX", "residential", 2.0)])).unwrap();
        assert_eq!(out.table.cell(0, 2), Some(""));
        assert_eq!(out.table.cell(1, 2), Some("5"));
        assert_eq!(out.applied[0].1, 1);
    }

    #[test]
    fn missing_category_column_is_an_error() {
        let t = table(&["weather_datetime", "TX"], &[&["2023-01-01", "1"]]);
        let err = apply_overrides(&t, &overrides(&[("TX", "residential", 2.0)])).unwrap_err();
        assert_eq!(err.kind(), "missing-column");
    }

    #[test]
    fn no_overrides_needs_no_category_column() {
        let t = table(&["weather_datetime", "TX"], &[&["2023-01-01", "1"]]);
        let out = apply_overrides(&t, &BTreeMap::new()).unwrap();
        assert_eq!(out.table, t);
    }

    #[test]
    fn overflowing_product_is_rejected() {
        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[&["2023-01-01", "residential", "1e308"]],
        );
        let err = apply_overrides(&t, &overrides(&[("TX", "residential", 10.0)])).unwrap_err();
        assert_eq!(err.kind(), "non-finite-result");
        assert!(err.to_string().contains("1e308"));

        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[&["2023-01-01", "residential", "inf"]],
        );
        let err = apply_overrides(&t, &overrides(&[("TX", "residential", 1.0)])).unwrap_err();
        assert_eq!(err.kind(), "non-finite-result");
    }

    #[test]
    fn error_line_uses_source_mapping() {
        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[&["2023-01-01", "residential", "oops"]],
        );
        let err = apply_overrides_at(&t, &overrides(&[("TX", "residential", 2.0)]), |row| row + 5).unwrap_err();
        assert!(matches!(err, BlendError::TypeMismatch { line: 5, .. }), "{err:?}");
    }

    #[test]
    fn number_formatting_is_shortest_round_trip() {
        assert_eq!(format_number(150.0), "150");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(-2.5), "-2.5");
    }
}
