//! CSV ingestion: raw tables for exploration and labeled datasets for training.

pub mod loader;
pub mod table;

pub use loader::{Dataset, DatasetSchema, load_dataset};
pub use table::{Cell, ColumnKind, CsvOptions, DEFAULT_NA_VALUES, Table};
