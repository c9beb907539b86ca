//! Identifier checks for SQL that has to be assembled from names.
//!
//! Values always travel as bound parameters; only table and column names are
//! spliced into statement text, and they must pass these checks first.

use crate::error::{Error, Result};

/// Longest identifier accepted
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Validate a single SQL identifier (table, column or schema name).
///
/// Rules:
/// - Must not be empty
/// - At most [`MAX_IDENTIFIER_LEN`] characters
/// - Must start with an ASCII letter or underscore
/// - May only contain ASCII alphanumerics, underscores and `$`
///
/// # Examples
///
/// ```
/// use rdbc_adapter::security::validate_sql_identifier;
///
/// assert!(validate_sql_identifier("users").is_ok());
/// assert!(validate_sql_identifier("SYS$LOB").is_ok());
///
/// assert!(validate_sql_identifier("x; DROP TABLE users--").is_err());
/// assert!(validate_sql_identifier("").is_err());
/// assert!(validate_sql_identifier("1abc").is_err());
/// ```
pub fn validate_sql_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("SQL identifier cannot be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::config(format!(
            "SQL identifier too long: {} chars (max {})",
            name.len(),
            MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(Error::config(format!(
                "Invalid SQL identifier '{}': must start with a letter or underscore",
                name
            )));
        }
    }

    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$')) {
        return Err(Error::config(format!(
            "Invalid SQL identifier '{}': contains invalid character '{}'",
            name, c
        )));
    }

    Ok(())
}

/// Validate a possibly schema-qualified name (`schema.table`)
pub fn validate_qualified_identifier(name: &str) -> Result<()> {
    match name.split_once('.') {
        Some((schema, object)) => {
            validate_sql_identifier(schema)?;
            validate_sql_identifier(object)
        }
        None => validate_sql_identifier(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_sql_identifier("users").is_ok());
        assert!(validate_sql_identifier("_private").is_ok());
        assert!(validate_sql_identifier("TABLE_123").is_ok());
        assert!(validate_sql_identifier("a$b").is_ok());
    }

    #[test]
    fn test_length_limit() {
        assert!(validate_sql_identifier(&"a".repeat(256)).is_err());
        assert!(validate_sql_identifier(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_injection_attempts() {
        assert!(validate_sql_identifier("x' OR '1'='1").is_err());
        assert!(validate_sql_identifier("x--").is_err());
        assert!(validate_sql_identifier("user name").is_err());
        assert!(validate_sql_identifier("x\nDROP TABLE").is_err());
        assert!(validate_sql_identifier("tabl\u{0435}").is_err());
        assert!(validate_sql_identifier("$x").is_err());
    }

    #[test]
    fn test_qualified() {
        assert!(validate_qualified_identifier("scott.emp").is_ok());
        assert!(validate_qualified_identifier("emp").is_ok());
        assert!(validate_qualified_identifier("scott.").is_err());
        assert!(validate_qualified_identifier("a.b.c").is_err());
        assert!(matches!(
            validate_qualified_identifier("x;y"),
            Err(Error::Configuration { .. })
        ));
    }
}
