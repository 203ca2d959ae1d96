//! `scenario-blend` library crate.
//!
//! The binary (`blend`) is a thin wrapper around this library so that:
//!
//! - the blend pipeline is testable without network access or processes
//! - other callers (an HTTP service, a notebook bridge) can reuse it as-is

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod transform;
