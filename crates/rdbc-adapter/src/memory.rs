//! In-memory result set.
//!
//! Drivers can hand out materialized results (generated keys, type info)
//! through [`MemoryResultSet`]; it is also the cursor used by the test drivers.

use chrono::{NaiveDateTime, NaiveTime};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::connection::{LobStream, Resource, ResultSet};
use crate::error::{Error, Result};
use crate::types::{ResultColumn, Value};

/// Result set over rows held in memory
#[derive(Debug, Clone)]
pub struct MemoryResultSet {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<Value>>,
    /// Index of the current row plus one; 0 before the first `next`
    cursor: usize,
    closed: Arc<AtomicBool>,
}

impl MemoryResultSet {
    /// Create a result set
    pub fn new(columns: Vec<ResultColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            cursor: 0,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Result set without columns or rows
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Flag that flips to true once the result set is closed
    pub fn close_handle(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    fn cell(&self, column: usize) -> Result<&Value> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::driver("result set is closed"));
        }
        let row = self
            .cursor
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
            .ok_or_else(|| Error::driver("no current row"))?;
        column
            .checked_sub(1)
            .and_then(|idx| row.get(idx))
            .ok_or_else(|| Error::driver(format!("column index {} out of range", column)))
    }
}

impl Resource for MemoryResultSet {
    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl ResultSet for MemoryResultSet {
    fn columns(&self) -> Result<Vec<ResultColumn>> {
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> Result<bool> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::driver("result set is closed"));
        }
        if self.cursor < self.rows.len() {
            self.cursor += 1;
            Ok(true)
        } else {
            self.cursor = self.rows.len() + 1;
            Ok(false)
        }
    }

    fn get_string(&mut self, column: usize) -> Result<Option<String>> {
        Ok(match self.cell(column)? {
            Value::Null => None,
            other => Some(other.to_text()),
        })
    }

    fn get_long(&mut self, column: usize) -> Result<Option<i64>> {
        match self.cell(column)? {
            Value::Null => Ok(None),
            other => other
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::driver(format!("column {} is not an integer", column))),
        }
    }

    fn get_timestamp(&mut self, column: usize) -> Result<Option<NaiveDateTime>> {
        match self.cell(column)? {
            Value::Null => Ok(None),
            Value::DateTime(dt) => Ok(Some(*dt)),
            Value::DateTimeTz(dt) => Ok(Some(dt.naive_utc())),
            Value::Date(d) => Ok(Some(d.and_time(NaiveTime::MIN))),
            Value::String(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map(Some)
                .map_err(|e| Error::driver_with_source(format!("bad timestamp '{}'", s), e)),
            _ => Err(Error::driver(format!("column {} is not a timestamp", column))),
        }
    }

    fn get_binary_stream(&mut self, column: usize) -> Result<Option<Box<dyn LobStream>>> {
        Ok(match self.cell(column)? {
            Value::Null => None,
            Value::Bytes(b) => lob(b.clone()),
            other => lob(other.to_text().into_bytes()),
        })
    }

    fn get_character_stream(&mut self, column: usize) -> Result<Option<Box<dyn LobStream>>> {
        Ok(match self.cell(column)? {
            Value::Null => None,
            other => lob(other.to_text().into_bytes()),
        })
    }
}

fn lob(bytes: Vec<u8>) -> Option<Box<dyn LobStream>> {
    Some(Box::new(Cursor::new(bytes)))
}
