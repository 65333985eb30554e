//! Table-level database operations and process logging setup.
//!
//! # Intention
//!
//! - Provide a small, validated API for everyday table work: existence checks,
//!   creation from DDL or declarative definitions, inserts, and queries into
//!   tabular structures.
//! - Provide an explicit logging context that writes to a timestamped file and
//!   to stdout with zone-adjusted timestamps.
//!
//! # Architectural Boundaries
//!
//! - SQL execution, durability and transactions belong to the [`Backend`];
//!   this crate only validates and delegates.
//! - The logging context and the table wrapper are independent of each other.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod ops;
pub mod schema;
pub mod sql;
pub mod sqlite;
pub mod table;
pub mod value;

pub use backend::{Backend, ResultSet};
pub use engine::{ConnectionParams, ConnectionUrl, EngineFamily};
pub use error::{Error, Result};
pub use logging::{LogLevel, LoggingConfig, LoggingContext, LoggingError};
pub use ops::{DbTableOps, QueryOptions, QueryOutput};
pub use schema::{ColumnDefinition, DataType, Schema, TableDefinition, TableModel};
pub use sql::TableRef;
pub use sqlite::SqliteBackend;
pub use table::{ColumnMap, RowKey, Table, TableMapping, TabularData};
pub use value::Value;
