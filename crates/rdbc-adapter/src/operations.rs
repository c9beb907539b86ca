//! Host-facing database operations.
//!
//! Everything except [`ConnectionManager::native_database_types`] and
//! [`ConnectionManager::database_name`] runs under the retry guard.

use tracing::debug;

use crate::connection::{Connection, Guarded, IdentifierCase, Param};
use crate::error::Result;
use crate::manager::ConnectionManager;
use crate::schema::DEFAULT_TABLE_TYPES;
use crate::security::{validate_qualified_identifier, validate_sql_identifier};
use crate::types::{ColumnDescriptor, Row, Value};

/// Database name reported when the driver knows neither catalog nor user
pub const FALLBACK_DATABASE_NAME: &str = "db1";

/// Row and column addressed by [`ConnectionManager::write_large_object`]
#[derive(Debug, Clone, PartialEq)]
pub struct LargeObjectTarget {
    /// Table, optionally `schema.table`
    pub table: String,
    /// Large-object column
    pub column: String,
    /// Key column
    pub key_column: String,
    /// Key of the row to update
    pub id: Value,
}

impl LargeObjectTarget {
    /// Address `table.column` on the row where `key_column = id`
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        key_column: impl Into<String>,
        id: impl Into<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            key_column: key_column.into(),
            id: id.into(),
        }
    }

    /// Parameterized update statement; identifiers are validated first
    pub fn update_sql(&self) -> Result<String> {
        validate_qualified_identifier(&self.table)?;
        validate_sql_identifier(&self.column)?;
        validate_sql_identifier(&self.key_column)?;
        Ok(format!(
            "UPDATE {} SET {} = ? WHERE {} = ?",
            self.table, self.column, self.key_column
        ))
    }
}

/// Content written by [`ConnectionManager::write_large_object`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LargeObject {
    /// Binary content, streamed as a BLOB
    Binary(Vec<u8>),
    /// Character content, streamed as a CLOB
    Text(String),
}

impl From<Vec<u8>> for LargeObject {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

impl From<String> for LargeObject {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl ConnectionManager {
    /// Table names matching the patterns; no `types` means plain tables
    pub fn tables(
        &mut self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        types: &[&str],
    ) -> Result<Vec<String>> {
        let types = if types.is_empty() {
            DEFAULT_TABLE_TYPES
        } else {
            types
        };
        let introspector = self.introspector.clone();
        self.run_guarded(|conn| {
            introspector.list_tables(conn, catalog, schema_pattern, table_pattern, types)
        })
    }

    /// Columns of a table (`table` may be `schema.table`)
    pub fn columns(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        let introspector = self.introspector.clone();
        self.run_guarded(|conn| introspector.list_columns(conn, table, schema))
    }

    /// Primary key column names of a table
    pub fn primary_keys(&mut self, table: &str) -> Result<Vec<String>> {
        let introspector = self.introspector.clone();
        self.run_guarded(|conn| introspector.list_primary_keys(conn, table))
    }

    /// Run a query and marshal every row; `max_rows` of 0 means no limit
    pub fn execute_query(&mut self, sql: &str, max_rows: u32) -> Result<Vec<Row>> {
        let marshaller = self.marshaller.clone();
        self.run_guarded(|conn| {
            let identifiers = identifier_case(conn)?;
            let mut stmt = Guarded::new(conn.create_statement()?, "statement");
            stmt.set_max_rows(max_rows)?;
            let rs = stmt.execute_query(sql)?;
            marshaller.unmarshal_result(rs, false, identifiers)
        })
    }

    /// Run a statement and return the affected row count
    pub fn execute_update(&mut self, sql: &str) -> Result<u64> {
        self.run_guarded(|conn| {
            let mut stmt = Guarded::new(conn.create_statement()?, "statement");
            stmt.execute_update(sql, false)
        })
    }

    /// Run an insert and return the key it generated
    pub fn execute_insert(&mut self, sql: &str) -> Result<Option<i64>> {
        let marshaller = self.marshaller.clone();
        self.run_guarded(|conn| {
            let mut stmt = Guarded::new(conn.create_statement()?, "statement");
            stmt.execute_update(sql, true)?;
            marshaller.extract_generated_key(stmt.generated_keys()?)
        })
    }

    /// Run an insert with `id` bound as its only parameter; returns `id`
    pub fn execute_id_insert(&mut self, sql: &str, id: i64) -> Result<i64> {
        self.run_guarded(|conn| {
            let mut stmt = Guarded::new(conn.prepare_statement(sql, false)?, "prepared statement");
            stmt.set_param(1, Param::Long(id))?;
            stmt.execute_update()?;
            Ok(id)
        })
    }

    /// Bind `values` by `types`, run the insert and return the generated key
    pub fn insert_bind(
        &mut self,
        sql: &str,
        values: &[Value],
        types: &[&str],
    ) -> Result<Option<i64>> {
        let binder = self.binder.clone();
        let marshaller = self.marshaller.clone();
        self.run_guarded(|conn| {
            let mut stmt = Guarded::new(conn.prepare_statement(sql, true)?, "prepared statement");
            binder.bind(&mut *stmt, values, types)?;
            stmt.execute_update()?;
            marshaller.extract_generated_key(stmt.generated_keys()?)
        })
    }

    /// Bind `values` by `types` and run the update; returns the affected row count
    pub fn update_bind(&mut self, sql: &str, values: &[Value], types: &[&str]) -> Result<u64> {
        let binder = self.binder.clone();
        self.run_guarded(|conn| {
            let mut stmt = Guarded::new(conn.prepare_statement(sql, false)?, "prepared statement");
            binder.bind(&mut *stmt, values, types)?;
            stmt.execute_update()
        })
    }

    /// Store a large object into one row
    pub fn write_large_object(
        &mut self,
        target: &LargeObjectTarget,
        content: &LargeObject,
    ) -> Result<u64> {
        let sql = target.update_sql()?;
        debug!(table = %target.table, column = %target.column, "writing large object");
        self.run_guarded(|conn| {
            let mut stmt =
                Guarded::new(conn.prepare_statement(&sql, false)?, "prepared statement");
            let param = match content {
                LargeObject::Binary(bytes) => Param::BinaryStream(bytes.clone()),
                LargeObject::Text(text) => Param::CharacterStream(text.clone()),
            };
            stmt.set_param(1, param)?;
            stmt.set_param(2, key_param(&target.id))?;
            stmt.execute_update()
        })
    }

    /// Driver type information, column labels lower-cased
    pub fn native_database_types(&mut self) -> Result<Vec<Row>> {
        let marshaller = self.marshaller.clone();
        let conn = self.connection()?;
        let identifiers = identifier_case(conn)?;
        let rs = conn.metadata()?.type_info()?;
        marshaller.unmarshal_result(rs, true, identifiers)
    }

    /// Catalog of the connection, else the connected user, else a fixed name
    pub fn database_name(&mut self) -> Result<String> {
        let conn = self.connection()?;
        if let Some(catalog) = conn.catalog()? {
            return Ok(catalog);
        }
        Ok(conn
            .metadata()?
            .user_name()?
            .unwrap_or_else(|| FALLBACK_DATABASE_NAME.to_string()))
    }
}

fn identifier_case(conn: &mut dyn Connection) -> Result<IdentifierCase> {
    IdentifierCase::detect(&*conn.metadata()?)
}

fn key_param(id: &Value) -> Param {
    match id {
        Value::Int(n) => Param::Long(*n),
        other => Param::String(other.to_text()),
    }
}
