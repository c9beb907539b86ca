//! Driver traits for rdbc-adapter
//!
//! Core abstractions the host's driver layer implements:
//! - Connection: one physical connection with autocommit state
//! - Statement / PreparedStatement: ad-hoc and parameterized execution
//! - ResultSet / LobStream: forward-only cursors and large-object streams
//! - Metadata: catalog and identifier-casing information
//! - ConnectionFactory: opens new connections on (re)connect
//!
//! All calls block until the driver answers. Every resource here has a
//! `close`; [`Guarded`] closes on drop and swallows close failures.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::io::Read;
use std::ops::{Deref, DerefMut};
use tracing::debug;

use crate::error::Result;
use crate::types::{ResultColumn, SqlType};

/// A driver resource that must be released
pub trait Resource {
    /// Release the resource
    fn close(&mut self) -> Result<()>;
}

/// Owns a driver resource and closes it when dropped.
///
/// Close failures are logged at debug level and never propagated, so an
/// error raised while the resource was in use is never masked by teardown.
pub struct Guarded<R: ?Sized + Resource> {
    inner: Box<R>,
    kind: &'static str,
}

impl<R: ?Sized + Resource> Guarded<R> {
    /// Guard a resource; `kind` names it in logs
    pub fn new(inner: Box<R>, kind: &'static str) -> Self {
        Self { inner, kind }
    }
}

impl<R: ?Sized + Resource> Deref for Guarded<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<R: ?Sized + Resource> DerefMut for Guarded<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<R: ?Sized + Resource> Drop for Guarded<R> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            debug!(resource = self.kind, error = %e, "ignoring close failure");
        }
    }
}

/// A connection to a database
pub trait Connection: Send {
    /// Whether each statement commits on its own
    fn auto_commit(&self) -> Result<bool>;

    /// Switch autocommit mode
    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()>;

    /// Commit the current transaction
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction
    fn rollback(&mut self) -> Result<()>;

    /// Close the connection
    fn close(&mut self) -> Result<()>;

    /// Whether the driver knows the connection is closed
    fn is_closed(&self) -> Result<bool>;

    /// Prepare a parameterized statement
    fn prepare_statement(
        &mut self,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<Box<dyn PreparedStatement>>;

    /// Create a statement for ad-hoc SQL
    fn create_statement(&mut self) -> Result<Box<dyn Statement>>;

    /// Catalog and identifier metadata
    fn metadata(&mut self) -> Result<Box<dyn Metadata>>;

    /// Current catalog, if the driver has one
    fn catalog(&self) -> Result<Option<String>>;
}

/// Statement for ad-hoc SQL
pub trait Statement: Resource + Send {
    /// Limit the rows any result set may hold (0 = unlimited)
    fn set_max_rows(&mut self, max_rows: u32) -> Result<()>;

    /// Execute any statement; true when it produced a result set
    fn execute(&mut self, sql: &str) -> Result<bool>;

    /// Execute a query
    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn ResultSet>>;

    /// Execute a modifying statement, returns affected row count
    fn execute_update(&mut self, sql: &str, return_generated_keys: bool) -> Result<u64>;

    /// Keys generated by the last update
    fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>>;
}

/// Parameter bound on a prepared statement
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// SQL NULL of the given type
    Null(SqlType),
    /// Character data
    String(String),
    /// 64-bit signed integer
    Long(i64),
    /// IEEE double
    Double(f64),
    /// Exact decimal
    Decimal(Decimal),
    /// Timestamp (microsecond precision)
    Timestamp(NaiveDateTime),
    /// Boolean
    Bool(bool),
    /// Binary data
    Bytes(Vec<u8>),
    /// Binary large object, streamed by the driver
    BinaryStream(Vec<u8>),
    /// Character large object, streamed by the driver
    CharacterStream(String),
}

/// A prepared statement
pub trait PreparedStatement: Resource + Send {
    /// Bind a parameter (1-based index)
    fn set_param(&mut self, index: usize, param: Param) -> Result<()>;

    /// Execute with the bound parameters, returns affected row count
    fn execute_update(&mut self) -> Result<u64>;

    /// Keys generated by the last update
    fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>>;

    /// Get the SQL string
    fn sql(&self) -> &str;
}

/// Forward-only result cursor. Column indexes are 1-based.
pub trait ResultSet: Resource + Send {
    /// Column labels and types
    fn columns(&self) -> Result<Vec<ResultColumn>>;

    /// Advance to the next row; false when exhausted
    fn next(&mut self) -> Result<bool>;

    /// Column as text, `None` for NULL
    fn get_string(&mut self, column: usize) -> Result<Option<String>>;

    /// Column as integer, `None` for NULL
    fn get_long(&mut self, column: usize) -> Result<Option<i64>>;

    /// Column as timestamp, `None` for NULL
    fn get_timestamp(&mut self, column: usize) -> Result<Option<NaiveDateTime>>;

    /// Column as binary stream, `None` for NULL
    fn get_binary_stream(&mut self, column: usize) -> Result<Option<Box<dyn LobStream>>>;

    /// Column as UTF-8 character stream, `None` for NULL
    fn get_character_stream(&mut self, column: usize) -> Result<Option<Box<dyn LobStream>>>;
}

/// Large-object stream handed out by a result set
pub trait LobStream: Read + Send {
    /// Release the stream
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LobStream for std::io::Cursor<Vec<u8>> {}

/// Table row from [`Metadata::tables`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// Catalog
    pub catalog: Option<String>,
    /// Schema
    pub schema: Option<String>,
    /// Table name as stored
    pub name: String,
    /// Table type ("TABLE", "VIEW", ...)
    pub table_type: String,
}

/// Column row from [`Metadata::columns`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    /// Column name as stored
    pub name: String,
    /// Driver type code
    pub data_type: SqlType,
    /// Vendor type name
    pub type_name: String,
    /// Column size / precision
    pub column_size: Option<i32>,
    /// Decimal digits / scale
    pub decimal_digits: Option<i32>,
    /// Default value expression
    pub default: Option<String>,
    /// "YES", "NO" or empty when unknown
    pub is_nullable: String,
}

/// Primary key row from [`Metadata::primary_keys`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyEntry {
    /// Column name as stored
    pub column_name: String,
    /// Position within the key (1-based)
    pub key_seq: u32,
}

/// Catalog metadata for a connection
pub trait Metadata: Send {
    /// Tables matching the patterns
    fn tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        name_pattern: Option<&str>,
        types: &[&str],
    ) -> Result<Vec<TableEntry>>;

    /// Columns of a table
    fn columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        column_pattern: Option<&str>,
    ) -> Result<Vec<ColumnEntry>>;

    /// Primary key columns of a table
    fn primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<PrimaryKeyEntry>>;

    /// Available schemas
    fn schemas(&self) -> Result<Vec<String>>;

    /// Type information, as a result set
    fn type_info(&self) -> Result<Box<dyn ResultSet>>;

    /// Unquoted identifiers are stored upper case
    fn stores_upper_case_identifiers(&self) -> Result<bool>;

    /// Unquoted identifiers are stored lower case
    fn stores_lower_case_identifiers(&self) -> Result<bool>;

    /// Connected user
    fn user_name(&self) -> Result<Option<String>>;

    /// Database product name ("PostgreSQL", "Oracle", ...)
    fn database_product_name(&self) -> Result<String>;

    /// Driver implementation name, used to detect the vendor family
    fn driver_name(&self) -> Result<String>;
}

/// How the backend stores unquoted identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierCase {
    /// Stored upper case (Oracle, Derby, ...)
    Upper,
    /// Stored lower case (PostgreSQL, ...)
    Lower,
    /// Stored as written
    Mixed,
}

impl IdentifierCase {
    /// Read the convention from driver metadata
    pub fn detect(metadata: &dyn Metadata) -> Result<Self> {
        if metadata.stores_upper_case_identifiers()? {
            Ok(Self::Upper)
        } else if metadata.stores_lower_case_identifiers()? {
            Ok(Self::Lower)
        } else {
            Ok(Self::Mixed)
        }
    }
}

/// Factory for creating connections
pub trait ConnectionFactory: Send + Sync {
    /// Open a new connection
    fn new_connection(&self) -> Result<Box<dyn Connection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn() -> Result<Box<dyn Connection>> + Send + Sync,
{
    fn new_connection(&self) -> Result<Box<dyn Connection>> {
        self()
    }
}

/// Database type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// PostgreSQL
    PostgreSQL,
    /// Oracle
    Oracle,
    /// Apache Derby
    Derby,
    /// MySQL/MariaDB
    MySQL,
    /// SQL Server
    SqlServer,
    /// SQLite
    SQLite,
    /// Unknown/custom
    Unknown,
}

impl DatabaseType {
    /// Detect the vendor family from driver and product names.
    ///
    /// Oracle and Derby are recognized by driver name (thin and OCI drivers
    /// both count as Oracle); everything else by product name.
    pub fn detect(driver_name: &str, product_name: &str) -> Self {
        let driver = driver_name.to_lowercase();
        if driver.contains("oracle") || driver.contains("oci") {
            return Self::Oracle;
        }
        if driver.contains("derby") {
            return Self::Derby;
        }
        match product_name {
            "PostgreSQL" => Self::PostgreSQL,
            "MySQL" | "MariaDB" => Self::MySQL,
            "Microsoft SQL Server" => Self::SqlServer,
            "SQLite" => Self::SQLite,
            _ => Self::Unknown,
        }
    }

    /// Detect from connection metadata
    pub fn of(metadata: &dyn Metadata) -> Result<Self> {
        Ok(Self::detect(
            &metadata.driver_name()?,
            &metadata.database_product_name()?,
        ))
    }

    /// Oracle family
    #[inline]
    pub fn is_oracle(self) -> bool {
        self == Self::Oracle
    }

    /// Derby family
    #[inline]
    pub fn is_derby(self) -> bool {
        self == Self::Derby
    }

    /// PostgreSQL
    #[inline]
    pub fn is_postgres(self) -> bool {
        self == Self::PostgreSQL
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PostgreSQL => write!(f, "PostgreSQL"),
            Self::Oracle => write!(f, "Oracle"),
            Self::Derby => write!(f, "Derby"),
            Self::MySQL => write!(f, "MySQL"),
            Self::SqlServer => write!(f, "SQL Server"),
            Self::SQLite => write!(f, "SQLite"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
