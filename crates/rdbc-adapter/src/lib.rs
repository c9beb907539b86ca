//! # rdbc-adapter
//!
//! Resilient relational database connectivity for host data-mapping layers.
//!
//! The crate owns a single driver connection, recovers it after transient
//! failures, introspects schema metadata with vendor-specific casing rules
//! and converts values between driver rows and a generic value model.
//!
//! ## Features
//!
//! - **Retry Guard**: autocommit operations are retried after the connection is diagnosed as broken
//! - **Schema Introspection**: tables, columns and primary keys normalized across Oracle, Derby and PostgreSQL
//! - **Result Marshalling**: large objects drained from streams, timestamps rendered as text
//! - **Parameter Binding**: closed set of host type tokens, nothing bound on an unknown token
//! - **SQL Classification**: insert-like and select-like detection from the leading keyword
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rdbc_adapter::prelude::*;
//!
//! let config = AdapterConfig::new()
//!     .with_retry_count(3)
//!     .with_connection_alive_sql("SELECT 1 FROM DUAL");
//! let mut manager = ConnectionManager::connect(Arc::new(OracleFactory::new(url)), config)?;
//!
//! let tables = manager.tables(None, None, None, &[])?;
//! let columns = manager.columns("scott.emp", None)?;
//!
//! manager.begin()?;
//! manager.update_bind(
//!     "UPDATE emp SET sal = ? WHERE empno = ?",
//!     &[Value::from(1200.0), Value::from(7369)],
//!     &["float", "integer"],
//! )?;
//! manager.commit()?;
//! ```
//!
//! Drivers plug in through the traits in [`connection`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bind;
pub mod classify;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod marshal;
pub mod memory;
pub mod operations;
pub mod schema;
pub mod security;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{
        ColumnDescriptor, ResultColumn, Row, SqlType, TypeToken, TypedValue, Value,
    };

    // Driver traits
    pub use crate::connection::{
        Connection, ConnectionFactory, DatabaseType, IdentifierCase, LobStream, Metadata, Param,
        PreparedStatement, ResultSet, Statement,
    };

    // Configuration
    pub use crate::config::{AdapterConfig, SharedConfig};

    // Components
    pub use crate::bind::ParameterBinder;
    pub use crate::classify::{is_insert, is_select, StatementKind};
    pub use crate::manager::ConnectionManager;
    pub use crate::marshal::ResultMarshaller;
    pub use crate::memory::MemoryResultSet;
    pub use crate::operations::{LargeObject, LargeObjectTarget};
    pub use crate::schema::{DefaultNativeTypes, NativeTypeMap, SchemaIntrospector};

    pub use std::sync::Arc;
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::Value;
