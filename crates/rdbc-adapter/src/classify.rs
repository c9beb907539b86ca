//! Lexical classification of raw SQL text.
//!
//! Only the leading keyword is inspected: leading whitespace and at most one
//! opening parenthesis (plus the whitespace after it) are skipped, then the
//! remaining text is compared case-insensitively against the keyword. The
//! comparison covers the shorter of the two, so a truncated keyword still
//! matches.

/// Coarse kind of a SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Starts with `INSERT`
    Insert,
    /// Starts with `SELECT` or `SHOW`
    Select,
    /// Anything else
    Other,
}

impl StatementKind {
    /// Classify a statement; insert-like wins over select-like
    pub fn of(sql: &str) -> Self {
        if is_insert(sql) {
            Self::Insert
        } else if is_select(sql) {
            Self::Select
        } else {
            Self::Other
        }
    }
}

/// Whether `sql` starts like an `INSERT`
pub fn is_insert(sql: &str) -> bool {
    starts_with_keyword(sql, "insert")
}

/// Whether `sql` starts like a `SELECT` or `SHOW`
pub fn is_select(sql: &str) -> bool {
    starts_with_keyword(sql, "select") || starts_with_keyword(sql, "show")
}

/// Compares only as far as `sql` reaches, so blank text matches any keyword.
fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let mut rest = sql.trim_start();
    if let Some(inner) = rest.strip_prefix('(') {
        rest = inner.trim_start();
    }
    rest.chars()
        .zip(keyword.chars())
        .all(|(c, k)| c.to_ascii_lowercase() == k)
}
