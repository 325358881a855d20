//! A Rust library for validating, ordering and persisting traffic fatality
//! records across flat workbooks, partitioned cloud worksheets and a
//! best-effort PostgreSQL mirror.

pub mod calc;
pub mod config;
pub mod error;
pub mod mirror;
pub mod record;
pub mod schema;
pub mod store;
pub mod submission;
pub mod validate;

// Re-export the most common types for easier use
// Core types
pub use error::{Result, StoreError};
pub use record::Record;
pub use schema::{Column, ColumnKind, Layout};

// Store backends
pub use store::transport::{MemoryTransport, RestTransport, SheetTransport};
pub use store::workbook::WorkbookStore;
pub use store::worksheets::WorksheetStore;
pub use store::{InsertOutcome, RecordStore, StoreSummary};

// Configuration and mirror
pub use config::{MirrorConfig, SheetsConfig};
pub use mirror::RelationalMirror;

// Submission pipeline
pub use submission::{SubmissionOutcome, SubmissionPipeline};
