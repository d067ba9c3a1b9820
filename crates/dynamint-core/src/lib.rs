//! An embedded, DynamoDB-compatible key-value engine.
//!
//! The crate keeps tables, items, and secondary indexes in process, backed
//! by a pluggable [`KeyValueStore`]. Items are addressed by an
//! order-preserving string key built from their primary key attributes, so
//! range scans over the store walk items in key order. The full expression
//! language (condition, update, and projection dialects) and the legacy
//! `Expected` / `AttributeUpdates` request forms are supported, with error
//! messages matching the real service.
//!
//! ```
//! use dynamint_core::Provider;
//! use dynamint_model::input::ListTablesInput;
//!
//! let provider = Provider::new();
//! let tables = provider.list_tables(ListTablesInput::default()).unwrap();
//! assert!(tables.table_names.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod expression;
pub mod filter;
pub mod keys;
pub mod lexicodec;
pub mod provider;
pub mod size;
pub mod state;
pub mod storage;

pub use config::EngineConfig;
pub use provider::Provider;
pub use state::{Table, TableRegistry};
pub use storage::{KeyValueStore, MemoryStore};
