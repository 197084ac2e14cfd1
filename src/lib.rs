//! Export the result of a SQLite query to a CSV file.
//!
//! # Intention
//!
//! - Open a database file read-only, run one statement (a whole table or an
//!   explicit query) and write the result set as CSV.
//! - The header record is the statement's column metadata, in column order.
//!
//! # Architectural Boundaries
//!
//! - `sqlite`: opening, preparing and reading cells. Only SQLite code belongs here.
//! - `export`: CSV dialects and the row streaming loop.
//! - `config`: layered configuration (file, environment, command line).
//! - No pooling, batching or resume: one pass, one thread.

pub mod config;
pub mod error;
pub mod export;
pub mod sqlite;

pub use config::{ExportConfig, Output, Overrides};
pub use error::{ExportError, Result};
pub use export::{export, export_to_writer, Dialect, ExportOptions, ExportSummary};
pub use sqlite::{QuerySource, Value};
