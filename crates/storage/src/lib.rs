//! Result persistence for OSINTMaster.
//!
//! The run report is always written as pretty JSON. A flattened
//! `tool,path,value` table is written alongside it when the `csv`
//! feature is enabled.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod tabular;

pub use trait_::{ReportStore, StorageError, Result};
pub use json_storage::JsonReportStore;
pub use tabular::{flatten, Row};
#[cfg(feature = "csv")]
pub use tabular::CsvReportStore;
