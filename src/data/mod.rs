//! Dataset retrieval.
//!
//! The pipeline only sees `DatasetSource`; `HttpDatasetSource` is the
//! production implementation that reads `<year>_<scenario>.<ext>` files from a
//! configured base URL.

pub mod http;

pub use http::*;

use crate::domain::Table;
use crate::error::BlendError;

/// Resolves a `(year, scenario)` pair to a table.
///
/// Implementations must not cache: every call is a fresh read. `Sync` is
/// required because distinct fallback scenarios are fetched in parallel.
pub trait DatasetSource: Sync {
    fn fetch(&self, year: i32, scenario: &str) -> Result<Table, BlendError>;
}

/// File name for a dataset under the base location.
pub fn dataset_file_name(year: i32, scenario: &str, extension: &str) -> String {
    format!("{year}_{scenario}.{extension}")
}
