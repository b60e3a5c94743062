//! Data models for grid test runs
//!
//! This module contains all data structures used throughout the application.

mod definition;
mod outcome;

pub(crate) use definition::is_yaml_file;
pub use definition::{TestDefinition, TestStep};
pub use outcome::{CellError, CellResult, GridError, RunCoordinate, RunOutcome, TestSummary};
