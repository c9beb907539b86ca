//! Parameter binding: generic values onto prepared statements.
//!
//! Every type token is resolved before the first parameter is set, so an
//! unknown token fails the whole call with [`Error::UnsupportedType`] and the
//! statement is left untouched.

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::connection::{Param, PreparedStatement};
use crate::error::{Error, Result};
use crate::types::{TypeToken, TypedValue, Value};

/// Pattern tried when a date-like token carries text
pub const DATE_TIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Binds positional parameters according to host type tokens
#[derive(Debug, Clone, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    /// Create a binder
    pub fn new() -> Self {
        Self
    }

    /// Bind `values[i]` with `types[i]` at position `i + 1`
    pub fn bind(
        &self,
        stmt: &mut dyn PreparedStatement,
        values: &[Value],
        types: &[&str],
    ) -> Result<()> {
        let tokens = values
            .iter()
            .enumerate()
            .map(|(idx, _)| match types.get(idx) {
                Some(token) => token.parse::<TypeToken>(),
                None => Err(Error::unsupported_type("")),
            })
            .collect::<Result<Vec<_>>>()?;

        for (idx, (value, token)) in values.iter().zip(tokens).enumerate() {
            stmt.set_param(idx + 1, self.param_for(value, token)?)?;
        }
        Ok(())
    }

    /// Bind a list of value/token pairs
    pub fn bind_typed(&self, stmt: &mut dyn PreparedStatement, values: &[TypedValue]) -> Result<()> {
        let raw: Vec<Value> = values.iter().map(|v| v.value.clone()).collect();
        let types: Vec<&str> = values.iter().map(|v| v.type_token.as_str()).collect();
        self.bind(stmt, &raw, &types)
    }

    /// Driver parameter for one value
    pub fn param_for(&self, value: &Value, token: TypeToken) -> Result<Param> {
        if value.is_null() {
            return Ok(Param::Null(token.sql_type()));
        }
        let param = match token {
            TypeToken::String | TypeToken::Text => Param::String(value.to_text()),
            TypeToken::Integer => Param::Long(
                value
                    .as_i64()
                    .ok_or_else(|| mismatch(value, token))?,
            ),
            TypeToken::Float => Param::Double(
                value
                    .as_f64()
                    .ok_or_else(|| mismatch(value, token))?,
            ),
            TypeToken::Decimal => Param::Decimal(
                value
                    .as_decimal()
                    .ok_or_else(|| mismatch(value, token))?,
            ),
            TypeToken::Binary => Param::Bytes(
                value
                    .as_bytes()
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| mismatch(value, token))?,
            ),
            TypeToken::Boolean => Param::Bool(
                value
                    .as_bool()
                    .ok_or_else(|| mismatch(value, token))?,
            ),
            TypeToken::DateTime | TypeToken::Timestamp | TypeToken::Time | TypeToken::Date => {
                date_param(value)
            }
        };
        Ok(param)
    }
}

/// Structured date-times bind as timestamps; anything else is parsed as
/// text, and bound as the raw text when it does not parse
fn date_param(value: &Value) -> Param {
    let structured = match value {
        Value::DateTime(dt) => Some(*dt),
        Value::DateTimeTz(dt) => Some(dt.naive_utc()),
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        _ => None,
    };
    if let Some(ts) = structured {
        return Param::Timestamp(truncate_to_micros(ts));
    }

    let text = value.to_text();
    match NaiveDateTime::parse_from_str(text.trim(), DATE_TIME_PATTERN) {
        Ok(ts) => Param::Timestamp(ts),
        Err(_) => Param::String(text),
    }
}

fn truncate_to_micros(ts: NaiveDateTime) -> NaiveDateTime {
    let nanos = ts.nanosecond();
    ts.with_nanosecond(nanos - nanos % 1_000).unwrap_or(ts)
}

fn mismatch(value: &Value, token: TypeToken) -> Error {
    Error::type_conversion(format!("cannot bind {:?} as {}", value, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Resource, ResultSet};
    use crate::types::SqlType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[derive(Default)]
    struct Recorder {
        params: Vec<(usize, Param)>,
    }

    impl Resource for Recorder {
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl PreparedStatement for Recorder {
        fn set_param(&mut self, index: usize, param: Param) -> Result<()> {
            self.params.push((index, param));
            Ok(())
        }

        fn execute_update(&mut self) -> Result<u64> {
            Ok(0)
        }

        fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>> {
            Err(Error::driver("no keys"))
        }

        fn sql(&self) -> &str {
            ""
        }
    }

    #[test]
    fn test_bind_positional() {
        let mut stmt = Recorder::default();
        ParameterBinder::new()
            .bind(
                &mut stmt,
                &[Value::from("a"), Value::from(7), Value::Null, Value::from(true)],
                &["string", "integer", "float", "boolean"],
            )
            .unwrap();

        assert_eq!(
            stmt.params,
            vec![
                (1, Param::String("a".into())),
                (2, Param::Long(7)),
                (3, Param::Null(SqlType::Float)),
                (4, Param::Bool(true)),
            ]
        );
    }

    #[test]
    fn test_unknown_token_binds_nothing() {
        let mut stmt = Recorder::default();
        let err = ParameterBinder::new()
            .bind(
                &mut stmt,
                &[Value::from("a"), Value::from(1)],
                &["string", "money"],
            )
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedType { ref token } if token == "money"));
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_missing_token_is_unsupported() {
        let mut stmt = Recorder::default();
        let err = ParameterBinder::new()
            .bind(&mut stmt, &[Value::from(1)], &[])
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { .. }));
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_date_text_parsed_or_passed_through() {
        let binder = ParameterBinder::new();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();

        assert_eq!(
            binder
                .param_for(&Value::from("2024-01-02 03:04:05"), TypeToken::DateTime)
                .unwrap(),
            Param::Timestamp(expected)
        );
        assert_eq!(
            binder
                .param_for(&Value::from("next tuesday"), TypeToken::Date)
                .unwrap(),
            Param::String("next tuesday".into())
        );
    }

    #[test]
    fn test_structured_time_truncated_to_micros() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_nano_opt(3, 4, 5, 123_456_789)
            .unwrap();
        let param = ParameterBinder::new()
            .param_for(&Value::DateTime(ts), TypeToken::Timestamp)
            .unwrap();

        let Param::Timestamp(bound) = param else {
            panic!("expected timestamp, got {:?}", param);
        };
        assert_eq!(bound.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_decimal_and_binary() {
        let binder = ParameterBinder::new();
        assert_eq!(
            binder
                .param_for(&Value::from("12.50"), TypeToken::Decimal)
                .unwrap(),
            Param::Decimal(Decimal::new(1250, 2))
        );
        assert_eq!(
            binder
                .param_for(&Value::from(vec![1u8, 2]), TypeToken::Binary)
                .unwrap(),
            Param::Bytes(vec![1, 2])
        );
    }

    #[test]
    fn test_conversion_failure() {
        let err = ParameterBinder::new()
            .param_for(&Value::from("abc"), TypeToken::Integer)
            .unwrap_err();
        assert!(matches!(err, Error::TypeConversion { .. }));
    }

    #[test]
    fn test_bind_typed() {
        let mut stmt = Recorder::default();
        ParameterBinder::new()
            .bind_typed(
                &mut stmt,
                &[TypedValue::new("x", "text"), TypedValue::new(1.5, "float")],
            )
            .unwrap();
        assert_eq!(
            stmt.params,
            vec![(1, Param::String("x".into())), (2, Param::Double(1.5))]
        );
    }
}
