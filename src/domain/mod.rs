//! Domain types used throughout the pipeline.
//!
//! - tables and blend settings (`types`)
//! - the blend request and its JSON wire form (`request`)

pub mod request;
pub mod types;

pub use request::*;
pub use types::*;
