//! Core synchronization engine between spreadsheet sheets and the bankroll
//! destination tables.
//!
//! The engine takes a named sheet of loosely-typed rows, maps its headers onto
//! a destination table schema, coerces and validates the cell values, computes
//! a full-replace reconciling diff against the current destination rows, and
//! applies that diff behind a human-reviewable preview. External collaborators
//! (the spreadsheet service, the relational store, mapping persistence) are
//! consumed through trait ports.

pub mod catalog;
pub mod errors;
pub mod sync;
