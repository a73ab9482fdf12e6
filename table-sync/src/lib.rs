//! # Table Sync
//!
//! Keeps a search cluster continuously synchronized with the tables of a
//! primary document store: derives index mappings from model metadata,
//! reconciles drift at startup, backfills from the authoritative tables, and
//! follows per-table change streams into bulk writes with retry,
//! partial-failure isolation, and graceful shutdown.

pub mod backfill;
pub mod errors;
pub mod manager;
pub mod reconciler;
pub mod server;
pub mod watcher;

pub use errors::SyncError;
pub use manager::TableManager;
