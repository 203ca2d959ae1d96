//! The blend transforms, applied in this order by the pipeline:
//!
//! - weather-year filtering (`temporal`)
//! - multiplier overrides (`overrides`)
//! - fallback substitution (`fallback`)

pub mod fallback;
pub mod overrides;
pub mod temporal;

pub use fallback::{AppliedFallback, FallbackOutcome, apply_fallbacks};
pub use overrides::{OverrideOutcome, apply_overrides, apply_overrides_at};
pub use temporal::{FilteredTable, filter_by_weather_year, timestamp_year};
