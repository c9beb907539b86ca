//! Scripted in-memory driver shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;

use rdbc_adapter::connection::{
    ColumnEntry, Connection, ConnectionFactory, Metadata, Param, PreparedStatement,
    PrimaryKeyEntry, Resource, ResultSet, Statement, TableEntry,
};
use rdbc_adapter::error::{Error, Result};
use rdbc_adapter::memory::MemoryResultSet;
use rdbc_adapter::types::{ResultColumn, SqlType, Value};

/// Everything the fake database knows and records
#[derive(Debug)]
pub struct DbState {
    pub opened: usize,
    pub closed: usize,
    pub refuse_connections: bool,

    /// Upcoming statement executions that fail with a socket error
    pub pending_failures: usize,
    /// Liveness probe outcome
    pub probe_fails: bool,
    /// What `is_closed` reports
    pub report_closed: bool,
    pub auto_commit_fails: bool,
    pub commit_fails: bool,

    pub executed: Vec<String>,
    pub probes: Vec<String>,
    pub bound: Vec<(usize, Param)>,
    pub max_rows: Vec<u32>,
    pub commits: usize,
    pub rollbacks: usize,
    pub statements_closed: usize,

    pub driver_name: String,
    pub product_name: String,
    pub stores_upper: bool,
    pub stores_lower: bool,
    pub user_name: Option<String>,
    pub catalog: Option<String>,
    pub schemas: Vec<String>,
    pub tables: Vec<String>,
    pub columns: Vec<ColumnEntry>,
    pub primary_keys: Vec<String>,
    pub table_lookups: Vec<(Option<String>, Option<String>)>,

    pub result_columns: Vec<ResultColumn>,
    pub result_rows: Vec<Vec<Value>>,
    pub generated_key: Option<i64>,
    pub update_count: u64,
}

impl Default for DbState {
    fn default() -> Self {
        Self {
            opened: 0,
            closed: 0,
            refuse_connections: false,
            pending_failures: 0,
            probe_fails: false,
            report_closed: false,
            auto_commit_fails: false,
            commit_fails: false,
            executed: Vec::new(),
            probes: Vec::new(),
            bound: Vec::new(),
            max_rows: Vec::new(),
            commits: 0,
            rollbacks: 0,
            statements_closed: 0,
            driver_name: "org.h2.Driver".into(),
            product_name: "H2".into(),
            stores_upper: false,
            stores_lower: false,
            user_name: None,
            catalog: None,
            schemas: Vec::new(),
            tables: Vec::new(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            table_lookups: Vec::new(),
            result_columns: Vec::new(),
            result_rows: Vec::new(),
            generated_key: None,
            update_count: 1,
        }
    }
}

impl DbState {
    fn take_failure(&mut self) -> Result<()> {
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "socket closed");
            return Err(Error::driver_with_source("statement failed", io));
        }
        Ok(())
    }
}

/// Handle on the fake database
#[derive(Debug, Clone, Default)]
pub struct FakeDb {
    pub state: Arc<Mutex<DbState>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle-like backend: upper-case identifiers, user schema
    pub fn oracle() -> Self {
        let db = Self::new();
        db.with(|s| {
            s.driver_name = "oracle.jdbc.driver.OracleDriver".into();
            s.product_name = "Oracle".into();
            s.stores_upper = true;
            s.user_name = Some("scott".into());
            s.schemas = vec!["SYS".into(), "SCOTT".into()];
        });
        db
    }

    /// Derby-like backend: upper-case identifiers, user schema
    pub fn derby() -> Self {
        let db = Self::new();
        db.with(|s| {
            s.driver_name = "org.apache.derby.jdbc.EmbeddedDriver".into();
            s.product_name = "Apache Derby".into();
            s.stores_upper = true;
            s.user_name = Some("app".into());
            s.schemas = vec!["SYS".into(), "APP".into()];
        });
        db
    }

    /// MySQL-like backend: lower-case identifiers
    pub fn mysql() -> Self {
        let db = Self::new();
        db.with(|s| {
            s.driver_name = "com.mysql.cj.jdbc.Driver".into();
            s.product_name = "MySQL".into();
            s.stores_lower = true;
            s.user_name = Some("app".into());
        });
        db
    }

    /// PostgreSQL-like backend
    pub fn postgres() -> Self {
        let db = Self::new();
        db.with(|s| {
            s.driver_name = "org.postgresql.Driver".into();
            s.product_name = "PostgreSQL".into();
            s.stores_lower = true;
            s.user_name = Some("app".into());
        });
        db
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut DbState) -> T) -> T {
        f(&mut self.state.lock())
    }

    pub fn factory(&self) -> Arc<dyn ConnectionFactory> {
        let state = self.state.clone();
        Arc::new(move || -> Result<Box<dyn Connection>> {
            let mut s = state.lock();
            if s.refuse_connections {
                return Err(Error::driver("connection refused"));
            }
            s.opened += 1;
            Ok(Box::new(FakeConnection {
                state: state.clone(),
                auto_commit: true,
                closed: false,
            }))
        })
    }

    /// Connections opened and not yet closed
    pub fn live_connections(&self) -> usize {
        self.with(|s| s.opened - s.closed)
    }
}

pub struct FakeConnection {
    state: Arc<Mutex<DbState>>,
    auto_commit: bool,
    closed: bool,
}

impl Connection for FakeConnection {
    fn auto_commit(&self) -> Result<bool> {
        if self.state.lock().auto_commit_fails {
            return Err(Error::driver("autocommit unavailable"));
        }
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut s = self.state.lock();
        if s.commit_fails {
            return Err(Error::driver("commit failed"));
        }
        s.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.state.lock().rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.state.lock().closed += 1;
        }
        Ok(())
    }

    fn is_closed(&self) -> Result<bool> {
        Ok(self.state.lock().report_closed)
    }

    fn prepare_statement(
        &mut self,
        sql: &str,
        _return_generated_keys: bool,
    ) -> Result<Box<dyn PreparedStatement>> {
        Ok(Box::new(FakePrepared {
            state: self.state.clone(),
            sql: sql.to_string(),
        }))
    }

    fn create_statement(&mut self) -> Result<Box<dyn Statement>> {
        Ok(Box::new(FakeStatement {
            state: self.state.clone(),
        }))
    }

    fn metadata(&mut self) -> Result<Box<dyn Metadata>> {
        Ok(Box::new(FakeMetadata {
            state: self.state.clone(),
        }))
    }

    fn catalog(&self) -> Result<Option<String>> {
        Ok(self.state.lock().catalog.clone())
    }
}

fn keys_result(key: Option<i64>) -> Box<dyn ResultSet> {
    let rows = key.map(|k| vec![vec![Value::Int(k)]]).unwrap_or_default();
    Box::new(MemoryResultSet::new(
        vec![ResultColumn::new("GENERATED_KEY", SqlType::BigInt)],
        rows,
    ))
}

pub struct FakeStatement {
    state: Arc<Mutex<DbState>>,
}

impl Resource for FakeStatement {
    fn close(&mut self) -> Result<()> {
        self.state.lock().statements_closed += 1;
        Ok(())
    }
}

impl Statement for FakeStatement {
    fn set_max_rows(&mut self, max_rows: u32) -> Result<()> {
        self.state.lock().max_rows.push(max_rows);
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<bool> {
        let mut s = self.state.lock();
        s.probes.push(sql.to_string());
        if s.probe_fails {
            return Err(Error::driver("probe failed"));
        }
        Ok(true)
    }

    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn ResultSet>> {
        let mut s = self.state.lock();
        s.executed.push(sql.to_string());
        s.take_failure()?;
        Ok(Box::new(MemoryResultSet::new(
            s.result_columns.clone(),
            s.result_rows.clone(),
        )))
    }

    fn execute_update(&mut self, sql: &str, _return_generated_keys: bool) -> Result<u64> {
        let mut s = self.state.lock();
        s.executed.push(sql.to_string());
        s.take_failure()?;
        Ok(s.update_count)
    }

    fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>> {
        Ok(keys_result(self.state.lock().generated_key))
    }
}

pub struct FakePrepared {
    state: Arc<Mutex<DbState>>,
    sql: String,
}

impl Resource for FakePrepared {
    fn close(&mut self) -> Result<()> {
        self.state.lock().statements_closed += 1;
        Ok(())
    }
}

impl PreparedStatement for FakePrepared {
    fn set_param(&mut self, index: usize, param: Param) -> Result<()> {
        self.state.lock().bound.push((index, param));
        Ok(())
    }

    fn execute_update(&mut self) -> Result<u64> {
        let mut s = self.state.lock();
        s.executed.push(self.sql.clone());
        s.take_failure()?;
        Ok(s.update_count)
    }

    fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>> {
        Ok(keys_result(self.state.lock().generated_key))
    }

    fn sql(&self) -> &str {
        &self.sql
    }
}

pub struct FakeMetadata {
    state: Arc<Mutex<DbState>>,
}

impl Metadata for FakeMetadata {
    fn tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        name_pattern: Option<&str>,
        types: &[&str],
    ) -> Result<Vec<TableEntry>> {
        let mut s = self.state.lock();
        s.table_lookups.push((
            schema_pattern.map(str::to_string),
            name_pattern.map(str::to_string),
        ));
        Ok(s.tables
            .iter()
            .filter(|name| name_pattern.map_or(true, |p| p == name.as_str()))
            .map(|name| TableEntry {
                catalog: catalog.map(str::to_string),
                schema: schema_pattern.map(str::to_string),
                name: name.clone(),
                table_type: types.first().copied().unwrap_or("TABLE").to_string(),
            })
            .collect())
    }

    fn columns(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        _table: &str,
        _column_pattern: Option<&str>,
    ) -> Result<Vec<ColumnEntry>> {
        Ok(self.state.lock().columns.clone())
    }

    fn primary_keys(
        &self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        _table: &str,
    ) -> Result<Vec<PrimaryKeyEntry>> {
        Ok(self
            .state
            .lock()
            .primary_keys
            .iter()
            .zip(1..)
            .map(|(name, seq)| PrimaryKeyEntry {
                column_name: name.clone(),
                key_seq: seq,
            })
            .collect())
    }

    fn schemas(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().schemas.clone())
    }

    fn type_info(&self) -> Result<Box<dyn ResultSet>> {
        Ok(Box::new(MemoryResultSet::new(
            vec![
                ResultColumn::new("TYPE_NAME", SqlType::Varchar),
                ResultColumn::new("DATA_TYPE", SqlType::Integer),
            ],
            vec![
                vec![Value::from("VARCHAR"), Value::Int(12)],
                vec![Value::from("INTEGER"), Value::Int(4)],
            ],
        )))
    }

    fn stores_upper_case_identifiers(&self) -> Result<bool> {
        Ok(self.state.lock().stores_upper)
    }

    fn stores_lower_case_identifiers(&self) -> Result<bool> {
        Ok(self.state.lock().stores_lower)
    }

    fn user_name(&self) -> Result<Option<String>> {
        Ok(self.state.lock().user_name.clone())
    }

    fn database_product_name(&self) -> Result<String> {
        Ok(self.state.lock().product_name.clone())
    }

    fn driver_name(&self) -> Result<String> {
        Ok(self.state.lock().driver_name.clone())
    }
}

/// Column metadata row with sensible defaults
pub fn column_entry(
    name: &str,
    data_type: SqlType,
    type_name: &str,
    size: Option<i32>,
) -> ColumnEntry {
    ColumnEntry {
        name: name.into(),
        data_type,
        type_name: type_name.into(),
        column_size: size,
        decimal_digits: None,
        default: None,
        is_nullable: "YES".into(),
    }
}
