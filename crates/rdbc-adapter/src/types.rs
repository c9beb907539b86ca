//! Value types for rdbc-adapter
//!
//! - `Value`: generic value exchanged with the host (row cells, bind parameters)
//! - `TypeToken`: closed set of host type names used for outbound binding
//! - `SqlType`: driver-level type codes
//! - `Row`, `ResultColumn`, `ColumnDescriptor`: marshalled results and schema metadata

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Generic value exchanged between the host and the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// Text string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Date without time
    Date(NaiveDate),
    /// Time without date
    Time(NaiveTime),
    /// Timestamp without timezone
    DateTime(NaiveDateTime),
    /// Timestamp with timezone
    DateTimeTz(DateTime<Utc>),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to convert to bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(n) => Some(*n != 0),
            Self::String(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(n) => {
                if n.is_finite() {
                    Some(*n as i64)
                } else {
                    None
                }
            }
            Self::Decimal(d) => d.trunc().to_i64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            Self::Decimal(d) => d.to_f64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to an exact decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Int(n) => Some(Decimal::from(*n)),
            Self::Float(n) => Decimal::try_from(*n).ok(),
            Self::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Borrow as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow as bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            Self::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Text form of the value, used for character bindings and date parsing
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => s.clone(),
            Self::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Self::Date(d) => d.to_string(),
            Self::Time(t) => t.to_string(),
            Self::DateTime(dt) => dt.to_string(),
            Self::DateTimeTz(dt) => dt.to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTimeTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Self::Null,
        }
    }
}

/// Host type names accepted for outbound binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum TypeToken {
    String,
    Text,
    Integer,
    Decimal,
    Float,
    DateTime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
}

impl TypeToken {
    /// All tokens, in declaration order
    pub const ALL: [TypeToken; 11] = [
        Self::String,
        Self::Text,
        Self::Integer,
        Self::Decimal,
        Self::Float,
        Self::DateTime,
        Self::Timestamp,
        Self::Time,
        Self::Date,
        Self::Binary,
        Self::Boolean,
    ];

    /// Host-side name of the token
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Time => "time",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
        }
    }

    /// Driver type used when binding a value of this token
    pub const fn sql_type(self) -> SqlType {
        match self {
            Self::String => SqlType::Varchar,
            Self::Text => SqlType::Clob,
            Self::Integer => SqlType::Integer,
            Self::Decimal => SqlType::Decimal,
            Self::Float => SqlType::Float,
            Self::DateTime | Self::Timestamp => SqlType::Timestamp,
            Self::Time => SqlType::Time,
            Self::Date => SqlType::Date,
            Self::Binary => SqlType::Blob,
            Self::Boolean => SqlType::Boolean,
        }
    }

    /// Simplify a vendor type name ("VARCHAR2(30)", "bigint", ...) to a token
    pub fn from_sql_type(sql_type: &str) -> Option<Self> {
        let t = sql_type.to_ascii_lowercase();
        let has = |needle: &str| t.contains(needle);

        if has("bool") {
            Some(Self::Boolean)
        } else if has("clob") || has("text") {
            Some(Self::Text)
        } else if has("blob") || has("binary") || has("bytea") {
            Some(Self::Binary)
        } else if has("char") || has("string") {
            Some(Self::String)
        } else if has("timestamp") {
            Some(Self::Timestamp)
        } else if has("datetime") {
            Some(Self::DateTime)
        } else if has("date") {
            Some(Self::Date)
        } else if has("time") {
            Some(Self::Time)
        } else if has("decimal") || has("numeric") || has("number") {
            Some(Self::Decimal)
        } else if has("float") || has("double") || has("real") {
            Some(Self::Float)
        } else if has("int") {
            Some(Self::Integer)
        } else if has("bit") {
            Some(Self::Boolean)
        } else {
            None
        }
    }
}

impl FromStr for TypeToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|token| token.as_str() == s)
            .ok_or_else(|| Error::unsupported_type(s))
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value paired with the host type it should be bound as
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    /// The raw value
    pub value: Value,
    /// Host type token, resolved at bind time
    pub type_token: String,
}

impl TypedValue {
    /// Create a typed value
    pub fn new(value: impl Into<Value>, type_token: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            type_token: type_token.into(),
        }
    }
}

/// Driver type codes (numeric values follow `java.sql.Types`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Null,
    Blob,
    Clob,
    Boolean,
    /// Any code without a dedicated variant
    Other(i32),
}

impl SqlType {
    /// Numeric type code
    pub const fn code(self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Float => 6,
            Self::Real => 7,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::Binary => -2,
            Self::VarBinary => -3,
            Self::LongVarBinary => -4,
            Self::Null => 0,
            Self::Blob => 2004,
            Self::Clob => 2005,
            Self::Boolean => 16,
            Self::Other(code) => code,
        }
    }

    /// Type for a numeric code
    pub const fn from_code(code: i32) -> Self {
        match code {
            -7 => Self::Bit,
            -6 => Self::TinyInt,
            5 => Self::SmallInt,
            4 => Self::Integer,
            -5 => Self::BigInt,
            6 => Self::Float,
            7 => Self::Real,
            8 => Self::Double,
            2 => Self::Numeric,
            3 => Self::Decimal,
            1 => Self::Char,
            12 => Self::Varchar,
            -1 => Self::LongVarchar,
            91 => Self::Date,
            92 => Self::Time,
            93 => Self::Timestamp,
            -2 => Self::Binary,
            -3 => Self::VarBinary,
            -4 => Self::LongVarBinary,
            0 => Self::Null,
            2004 => Self::Blob,
            2005 => Self::Clob,
            16 => Self::Boolean,
            other => Self::Other(other),
        }
    }

    /// Binary stream types
    #[inline]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Binary | Self::Blob | Self::LongVarBinary | Self::VarBinary
        )
    }

    /// Character stream types
    #[inline]
    pub const fn is_character_stream(self) -> bool {
        matches!(self, Self::LongVarchar | Self::Clob)
    }
}

/// One column of a result set as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    /// Column label
    pub label: String,
    /// Driver type code
    pub sql_type: SqlType,
}

impl ResultColumn {
    /// Create a result column
    pub fn new(label: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            label: label.into(),
            sql_type,
        }
    }
}

/// Database row as ordered column values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column labels
    columns: Vec<String>,
    /// Column values (same order as columns)
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Get column count
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column labels
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get all values
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get value by column index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get value by exact column label
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Iterate `(label, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Column description produced by schema introspection
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name (case-normalized)
    pub name: String,
    /// Logical type: base type name, optionally suffixed `(precision[,scale])`
    pub sql_type: String,
    /// Default value expression
    pub default: Option<String>,
    /// Whether column is nullable
    pub nullable: bool,
    /// Host type the logical type simplifies to
    pub type_token: Option<TypeToken>,
    /// Size limit taken from the logical type
    pub limit: Option<u32>,
    /// Precision taken from the logical type
    pub precision: Option<u32>,
    /// Scale taken from the logical type
    pub scale: Option<u32>,
}

impl ColumnDescriptor {
    /// Build a descriptor, deriving token, limit, precision and scale from `sql_type`
    pub fn new(
        name: impl Into<String>,
        sql_type: impl Into<String>,
        default: Option<String>,
        nullable: bool,
    ) -> Self {
        let sql_type = sql_type.into();
        let (first, second) = parse_size_suffix(&sql_type);
        Self {
            name: name.into(),
            type_token: TypeToken::from_sql_type(&sql_type),
            sql_type,
            default,
            nullable,
            limit: first,
            precision: first,
            scale: second,
        }
    }
}

fn parse_size_suffix(sql_type: &str) -> (Option<u32>, Option<u32>) {
    let Some(open) = sql_type.find('(') else {
        return (None, None);
    };
    let Some(close) = sql_type[open..].find(')') else {
        return (None, None);
    };
    let mut parts = sql_type[open + 1..open + close].split(',');
    let first = parts.next().and_then(|p| p.trim().parse().ok());
    let second = parts.next().and_then(|p| p.trim().parse().ok());
    (first, second)
}
