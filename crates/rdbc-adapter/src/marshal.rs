//! Result marshalling: driver rows into generic [`Row`] values.
//!
//! Binary and character large objects are drained from their streams,
//! timestamps are rendered as text (dropping a zero time-of-day), and every
//! other column is read as plain text.

use chrono::{NaiveDateTime, Timelike};
use std::io::{ErrorKind, Read};
use tracing::debug;

use crate::connection::{Guarded, IdentifierCase, LobStream, ResultSet};
use crate::error::{Error, Result};
use crate::types::{ResultColumn, Row, SqlType, Value};

/// Suffix of a rendered timestamp whose time of day is midnight
const ZERO_TIME_SUFFIX: &str = " 00:00:00.0";

/// Default read buffer for large-object streams
const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Converts driver result sets into rows of generic values
#[derive(Debug, Clone)]
pub struct ResultMarshaller {
    chunk_size: usize,
}

impl Default for ResultMarshaller {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ResultMarshaller {
    /// Create a marshaller with the default stream buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read buffer used when draining streams
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Normalize result column labels.
    ///
    /// Labels are lowercased, except when `downcase` is false, the backend
    /// stores upper-case identifiers and the label already contains a
    /// lowercase letter (an intentionally mixed-case alias).
    pub fn describe_columns(
        &self,
        columns: &[ResultColumn],
        downcase: bool,
        identifiers: IdentifierCase,
    ) -> Vec<ResultColumn> {
        let stores_upper = !downcase && identifiers == IdentifierCase::Upper;
        columns
            .iter()
            .map(|col| {
                let label = if stores_upper && has_lowercase(&col.label) {
                    col.label.clone()
                } else {
                    col.label.to_lowercase()
                };
                ResultColumn::new(label, col.sql_type)
            })
            .collect()
    }

    /// Read every remaining row of `rs`.
    ///
    /// A label repeated across columns keeps its first position and takes
    /// the value of its last column.
    pub fn marshal_rows(&self, rs: &mut dyn ResultSet, columns: &[ResultColumn]) -> Result<Vec<Row>> {
        let mut labels: Vec<String> = Vec::with_capacity(columns.len());
        let mut slots = Vec::with_capacity(columns.len());
        for col in columns {
            match labels.iter().position(|l| *l == col.label) {
                Some(slot) => slots.push(slot),
                None => {
                    slots.push(labels.len());
                    labels.push(col.label.clone());
                }
            }
        }

        let mut rows = Vec::new();
        while rs.next()? {
            let mut values = vec![Value::Null; labels.len()];
            for (idx, (col, &slot)) in columns.iter().zip(&slots).enumerate() {
                values[slot] = self.read_value(rs, idx + 1, col.sql_type)?;
            }
            rows.push(Row::new(labels.clone(), values));
        }
        Ok(rows)
    }

    /// Describe and read a whole result set, closing it afterwards
    pub fn unmarshal_result(
        &self,
        rs: Box<dyn ResultSet>,
        downcase: bool,
        identifiers: IdentifierCase,
    ) -> Result<Vec<Row>> {
        let mut rs = Guarded::new(rs, "result set");
        let columns = self.describe_columns(&rs.columns()?, downcase, identifiers);
        let rows = self.marshal_rows(&mut *rs, &columns)?;
        debug!(rows = rows.len(), columns = columns.len(), "unmarshalled result set");
        Ok(rows)
    }

    /// First column of the first row as an integer; the result set is always closed
    pub fn extract_generated_key(&self, rs: Box<dyn ResultSet>) -> Result<Option<i64>> {
        let mut rs = Guarded::new(rs, "generated keys");
        if rs.next()? && !rs.columns()?.is_empty() {
            return rs.get_long(1);
        }
        Ok(None)
    }

    fn read_value(&self, rs: &mut dyn ResultSet, column: usize, sql_type: SqlType) -> Result<Value> {
        if sql_type.is_binary() {
            return match rs.get_binary_stream(column)? {
                Some(stream) => Ok(Value::Bytes(self.drain(stream)?)),
                None => Ok(Value::Null),
            };
        }
        if sql_type.is_character_stream() {
            return match rs.get_character_stream(column)? {
                Some(stream) => {
                    let bytes = self.drain(stream)?;
                    String::from_utf8(bytes).map(Value::String).map_err(|e| {
                        let message = e.to_string();
                        Error::driver_with_source(
                            message,
                            std::io::Error::new(ErrorKind::InvalidData, e),
                        )
                    })
                }
                None => Ok(Value::Null),
            };
        }
        if sql_type == SqlType::Timestamp {
            return Ok(rs
                .get_timestamp(column)?
                .map(|ts| Value::String(render_timestamp(&ts)))
                .unwrap_or(Value::Null));
        }
        Ok(rs
            .get_string(column)?
            .map(Value::String)
            .unwrap_or(Value::Null))
    }

    /// Read a stream to its end; the stream is closed on every path
    fn drain(&self, stream: Box<dyn LobStream>) -> Result<Vec<u8>> {
        let mut stream = StreamGuard(stream);
        let mut out = Vec::with_capacity(self.chunk_size);
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match stream.0.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::driver_with_source(e.to_string(), e)),
            }
        }
        Ok(out)
    }
}

struct StreamGuard(Box<dyn LobStream>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            debug!(error = %e, "ignoring stream close failure");
        }
    }
}

/// Render a timestamp as `yyyy-mm-dd hh:mm:ss.f`, the fraction trimmed of
/// trailing zeros but keeping at least one digit. A midnight timestamp is
/// rendered date-only.
pub fn render_timestamp(ts: &NaiveDateTime) -> String {
    let nanos = format!("{:09}", ts.nanosecond() % 1_000_000_000);
    let fraction = nanos.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    let text = format!("{}.{}", ts.format("%Y-%m-%d %H:%M:%S"), fraction);
    match text.strip_suffix(ZERO_TIME_SUFFIX) {
        Some(date) => date.to_string(),
        None => text,
    }
}

fn has_lowercase(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_lowercase())
}
