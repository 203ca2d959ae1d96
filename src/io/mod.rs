//! Input/output helpers.
//!
//! - CSV parse/write for tables (`table`)
//! - request JSON read (`request`)

pub mod request;
pub mod table;

pub use request::*;
pub use table::*;
