//! Flurry: drives a content-understanding analysis service and lands the
//! extracted fields in daily CSV ledgers on blob storage.
//!
//! The flow runs one direction: an input file or URL goes to the analysis
//! service, the service's asynchronous operation is polled to completion,
//! the structured fields in the result are decoded, and one CSV row per
//! content entry is appended to the day's ledger object.
//!
//! - `storage/` - Object-store adapter (Azure Blob, local, in-memory)
//! - `ledger` - Daily CSV append writer
//! - `client` - Submit-and-poll HTTP client for the service
//! - `fields` - Typed field extraction from analysis results
//! - `provision` - Analyzer delete-and-recreate lifecycle
//! - `analyze` - Submit, poll, extract, append
//! - `config/` - YAML configuration with environment interpolation
//! - `error` - Error types

pub mod analyze;
pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod ledger;
pub mod provision;
pub mod storage;
pub mod tracing;

// Re-export commonly used items
pub use client::{AnalysisClient, AnalysisOperation, AnalyzeSource, Credentials, TokenSource};
pub use config::Config;
pub use error::{AppError, ClientError, ConfigError, FieldError, StorageError};
pub use fields::{ContentFields, FieldValue, extract_fields};
pub use ledger::{ledger_key, write_csv_row};
pub use storage::BlobStore;
pub use tracing::init_tracing;
