//! Schema introspection for rdbc-adapter
//!
//! Provides:
//! - SchemaIntrospector: table, column and primary key listing
//! - NativeTypeMap: the host's logical-to-native type table
//!
//! Identifier casing is normalized per backend before metadata lookups:
//! patterns are upper-cased on backends that store upper-case identifiers
//! and lower-cased on backends that store lower-case ones (PostgreSQL
//! excepted). Oracle and Derby resolve an unset schema from the user name.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::connection::{ColumnEntry, Connection, DatabaseType, IdentifierCase, Metadata};
use crate::error::{Error, Result};
use crate::types::{ColumnDescriptor, SqlType, TypeToken};

/// Table types listed when the caller names none
pub const DEFAULT_TABLE_TYPES: &[&str] = &["TABLE"];

/// Table types that satisfy the column lookup existence check
const EXISTENCE_TABLE_TYPES: &[&str] = &["TABLE", "VIEW"];

/// Oracle recycle-bin objects
const RECYCLE_BIN_PREFIX: &str = "bin$";

/// Host type table consulted when describing columns
pub trait NativeTypeMap: Send + Sync {
    /// Simplify a logical column type to a host token
    fn simplified_type(&self, sql_type: &str) -> Option<TypeToken> {
        TypeToken::from_sql_type(sql_type)
    }

    /// Whether the native type registered for `token` declares a size limit.
    ///
    /// `None` when no native type is registered.
    fn declares_limit(&self, token: TypeToken) -> Option<bool>;
}

/// Native types where only strings carry a limit
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNativeTypes;

impl NativeTypeMap for DefaultNativeTypes {
    fn declares_limit(&self, token: TypeToken) -> Option<bool> {
        Some(token == TypeToken::String)
    }
}

/// Token to declared limit
impl NativeTypeMap for HashMap<TypeToken, Option<u32>> {
    fn declares_limit(&self, token: TypeToken) -> Option<bool> {
        self.get(&token).map(Option::is_some)
    }
}

/// Backend traits that drive casing and vendor rules
#[derive(Debug, Clone, Copy)]
struct Vendor {
    db: DatabaseType,
    case: IdentifierCase,
}

impl Vendor {
    fn of(meta: &dyn Metadata) -> Result<Self> {
        Ok(Self {
            db: DatabaseType::of(meta)?,
            case: IdentifierCase::detect(meta)?,
        })
    }

    /// Case an identifier the way the backend stores it
    fn normalize(&self, ident: &str) -> String {
        match self.case {
            IdentifierCase::Upper => ident.to_uppercase(),
            IdentifierCase::Lower if !self.db.is_postgres() => ident.to_lowercase(),
            _ => ident.to_string(),
        }
    }

    /// Name as reported to the host: mixed-case names survive on upper-case backends
    fn report_name(&self, raw: &str) -> String {
        if self.case == IdentifierCase::Upper && raw.chars().any(char::is_lowercase) {
            raw.to_string()
        } else {
            raw.to_lowercase()
        }
    }

    fn quotes_defaults(&self) -> bool {
        self.db.is_oracle() || self.db.is_derby()
    }

    /// Column lookups without a schema fall back to the user's own schema
    fn resolves_user_schema(&self) -> bool {
        self.db.is_oracle() || self.db.is_derby()
    }
}

/// Lists tables, columns and primary keys with vendor normalization
#[derive(Clone)]
pub struct SchemaIntrospector {
    types: Arc<dyn NativeTypeMap>,
}

impl std::fmt::Debug for SchemaIntrospector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaIntrospector").finish_non_exhaustive()
    }
}

impl Default for SchemaIntrospector {
    fn default() -> Self {
        Self::new(Arc::new(DefaultNativeTypes))
    }
}

impl SchemaIntrospector {
    /// Create an introspector over a host type table
    pub fn new(types: Arc<dyn NativeTypeMap>) -> Self {
        Self { types }
    }

    /// Table names matching the patterns, lower-cased
    pub fn list_tables(
        &self,
        conn: &mut dyn Connection,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        types: &[&str],
    ) -> Result<Vec<String>> {
        let meta = conn.metadata()?;
        let vendor = Vendor::of(&*meta)?;
        self.tables_with(&*meta, vendor, catalog, schema_pattern, table_pattern, types)
    }

    /// Columns of `table_name`, which may be qualified as `schema.table`.
    ///
    /// `schema` overrides a qualifier in the name. Fails with
    /// [`Error::TableNotFound`] when no table or view matches.
    pub fn list_columns(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        let catalog = conn.catalog()?;
        let meta = conn.metadata()?;
        self.columns_with(&*meta, catalog.as_deref(), table_name, schema)
    }

    /// Primary key column names of `table_name`
    pub fn list_primary_keys(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> Result<Vec<String>> {
        let meta = conn.metadata()?;
        self.primary_keys_with(&*meta, table_name)
    }

    fn tables_with(
        &self,
        meta: &dyn Metadata,
        vendor: Vendor,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        types: &[&str],
    ) -> Result<Vec<String>> {
        let mut schema = schema_pattern.map(|s| vendor.normalize(s));
        let table = table_pattern.map(|t| vendor.normalize(t));

        if schema.is_none() && vendor.db.is_oracle() {
            schema = user_schema(meta)?;
        }

        debug!(
            catalog = ?catalog,
            schema = ?schema,
            table = ?table,
            types = ?types,
            "looking up tables"
        );

        let names = meta
            .tables(catalog, schema.as_deref(), table.as_deref(), types)?
            .into_iter()
            .map(|entry| entry.name.to_lowercase())
            .filter(|name| !(vendor.db.is_oracle() && name.starts_with(RECYCLE_BIN_PREFIX)))
            .collect();
        Ok(names)
    }

    fn columns_with(
        &self,
        meta: &dyn Metadata,
        catalog: Option<&str>,
        table_name: &str,
        explicit_schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        let vendor = Vendor::of(meta)?;

        let (qualifier, table) = match table_name.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, table_name),
        };
        let mut schema = explicit_schema.or(qualifier).map(|s| vendor.normalize(s));
        let table = vendor.normalize(table);

        if schema.is_none() && vendor.resolves_user_schema() {
            schema = user_schema(meta)?;
        }

        let matching = self.tables_with(
            meta,
            vendor,
            catalog,
            schema.as_deref(),
            Some(&table),
            EXISTENCE_TABLE_TYPES,
        )?;
        if matching.is_empty() {
            return Err(Error::table_not_found(table));
        }

        debug!(schema = ?schema, table = %table, "looking up columns");

        let columns = meta
            .columns(catalog, schema.as_deref(), &table, None)?
            .iter()
            .map(|entry| self.describe(entry, vendor))
            .collect();
        Ok(columns)
    }

    fn primary_keys_with(&self, meta: &dyn Metadata, table_name: &str) -> Result<Vec<String>> {
        let vendor = Vendor::of(meta)?;
        let table = vendor.normalize(table_name);

        debug!(table = %table, "looking up primary keys");

        Ok(meta
            .primary_keys(None, None, &table)?
            .iter()
            .map(|key| vendor.report_name(&key.column_name))
            .collect())
    }

    fn describe(&self, entry: &ColumnEntry, vendor: Vendor) -> ColumnDescriptor {
        let scale = entry.decimal_digits;
        let precision = match entry.column_size {
            // Oracle NUMBER without scale
            Some(_)
                if scale.is_none()
                    && vendor.db.is_oracle()
                    && entry.data_type == SqlType::Decimal =>
            {
                None
            }
            other => other,
        };

        let sql_type = match (precision.filter(|p| *p > 0), scale.filter(|s| *s > 0)) {
            (Some(p), Some(s)) => format!("{}({},{})", entry.type_name, p, s),
            (Some(p), None) => format!("{}({})", entry.type_name, p),
            (None, _) => entry.type_name.clone(),
        };

        let mut column = ColumnDescriptor::new(
            vendor.report_name(&entry.name),
            sql_type,
            normalize_default(entry.default.as_deref(), vendor),
            entry.is_nullable.trim() != "NO",
        );
        column.type_token = self.types.simplified_type(&column.sql_type);

        if let Some(token) = column.type_token {
            if self.types.declares_limit(token) == Some(false) {
                column.limit = None;
                if token != TypeToken::Decimal {
                    column.precision = None;
                }
            }
        }
        column
    }
}

/// Schema whose name matches the connected user, ignoring case
fn user_schema(meta: &dyn Metadata) -> Result<Option<String>> {
    let Some(user) = meta.user_name()? else {
        return Ok(None);
    };
    let user = user.to_lowercase();
    Ok(meta
        .schemas()?
        .into_iter()
        .find(|schema| schema.to_lowercase() == user))
}

fn normalize_default(raw: Option<&str>, vendor: Vendor) -> Option<String> {
    let raw = raw?;
    let oracle = vendor.db.is_oracle();
    if oracle && raw.trim().eq_ignore_ascii_case("null") {
        return None;
    }
    let value = if oracle { raw.trim() } else { raw };
    if vendor.quotes_defaults() {
        if let Some(rest) = value.strip_prefix('\'') {
            let mut chars = rest.chars();
            chars.next_back();
            return Some(chars.as_str().to_string());
        }
    }
    Some(value.to_string())
}
