//! Session persistence and export for Parley.
//!
//! Provides the injectable key-value storage abstraction, in-memory and
//! SQLite-backed implementations, the durable session message log, and
//! CSV export of panel payloads.

pub mod db;
pub mod error;
pub mod export;
pub mod kv;
pub mod session;

pub use db::SqliteStore;
pub use error::StoreError;
pub use export::{export_filename, export_payload, payload_to_csv, ExportSink, FileExportSink};
pub use kv::{KeyValueStore, MemoryStore};
pub use session::SessionStore;
