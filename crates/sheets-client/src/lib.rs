//! REST client for the spreadsheet service.
//!
//! Implements the core's [`banca_core::sync::SpreadsheetPort`] over the
//! service's HTTP API: sheet listing, tabular reads, and wholesale
//! clear-then-write updates gated on a write-capable credential.

mod client;
mod error;
mod types;

pub use client::*;
pub use error::*;
pub use types::*;
