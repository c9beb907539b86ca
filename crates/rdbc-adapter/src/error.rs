//! Error types for rdbc-adapter
//!
//! Four kinds reach the host:
//! - `NotConnected`: an operation needed a live connection and none exists
//! - `TableNotFound`: schema introspection target does not resolve
//! - `UnsupportedType`: the binder was handed an unknown type token
//! - `Database`: any driver failure, unwrapped to its root cause after the retry decision
//!
//! Driver implementations report raw failures as `Driver`; the retry guard turns
//! them into `Database` once it has decided not to retry.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Result type for rdbc-adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used as a cause
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No live connection
    Connection,
    /// Schema lookup failed
    Schema,
    /// Unknown or unconvertible value types
    TypeConversion,
    /// Raw failure reported by the driver
    Driver,
    /// Driver failure after the retry boundary
    Database,
    /// Invalid configuration or arguments
    Configuration,
}

impl ErrorCategory {
    /// Whether errors in this category pass the retry guard untouched
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Connection | Self::Schema)
    }
}

/// Main error type for rdbc-adapter
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Operation required a live connection and none exists
    #[error("no connection available")]
    NotConnected,

    /// Introspection target is neither a table nor a view
    #[error("table {table} does not exist")]
    TableNotFound { table: String },

    /// Type token outside the supported set
    #[error("type {token} not supported in bind")]
    UnsupportedType { token: String },

    /// Driver failure, carrying the root-cause message and the original chain
    #[error("{message}")]
    Database {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Raw driver failure
    #[error("driver error: {message}")]
    Driver {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    /// Value could not be converted for the requested binding
    #[error("type conversion error: {message}")]
    TypeConversion { message: String },

    /// Configuration error
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConnected => ErrorCategory::Connection,
            Self::TableNotFound { .. } => ErrorCategory::Schema,
            Self::UnsupportedType { .. } | Self::TypeConversion { .. } => {
                ErrorCategory::TypeConversion
            }
            Self::Database { .. } => ErrorCategory::Database,
            Self::Driver { .. } => ErrorCategory::Driver,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether this error must surface unchanged, without a retry decision.
    ///
    /// Unsupported type tokens are fatal as well: binding never started, so
    /// there is nothing a reconnect could fix.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. }) || self.category().is_fatal()
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a driver error with source
    pub fn driver_with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            sql: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a driver error with the failing SQL
    pub fn driver_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a table-not-found error
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Create an unsupported type error
    pub fn unsupported_type(token: impl Into<String>) -> Self {
        Self::UnsupportedType {
            token: token.into(),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap this error as a `Database` error.
    ///
    /// The message is taken from the root cause; the full chain stays reachable
    /// through `source()`.
    pub fn wrap(self) -> Self {
        let root = root_cause(&self);
        let message = match root.downcast_ref::<Error>() {
            Some(err) => err.message(),
            None => root.to_string(),
        };
        Self::Database {
            message,
            source: Some(Box::new(self)),
        }
    }

    /// Message without the variant prefix
    fn message(&self) -> String {
        match self {
            Self::Database { message, .. }
            | Self::Driver { message, .. }
            | Self::TypeConversion { message }
            | Self::Configuration { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Innermost cause of this error
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        root_cause(self)
    }
}

/// Walk the `source()` chain to its end.
///
/// Stops at the first node without a source, or at a node that was already
/// visited, so self-referencing or cyclic chains terminate.
pub fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    let mut seen: Vec<*const ()> = vec![address(current)];
    while let Some(next) = current.source() {
        let addr = address(next);
        if seen.contains(&addr) {
            break;
        }
        seen.push(addr);
        current = next;
    }
    current
}

fn address(err: &(dyn StdError + 'static)) -> *const () {
    err as *const dyn StdError as *const ()
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Schema => write!(f, "schema"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Driver => write!(f, "driver"),
            Self::Database => write!(f, "database"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
