use std::borrow::Cow;

mod params;
mod scanner;

pub use params::{NamedParams, StructParams};

use scanner::{closing_quote, is_quote, scan_name};

use crate::error::DbcError;
use crate::types::SqlValue;

/// Positional placeholder written in place of every `@name` reference.
pub const PLACEHOLDER: char = '?';

/// A query with its named references replaced by positional placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenQuery<'a> {
    pub sql: Cow<'a, str>,
    /// One argument per placeholder, in placeholder order.
    pub args: Vec<SqlValue>,
}

/// Rewrite `@name` references into positional placeholders.
///
/// Text between matching backticks, single quotes or double quotes is copied verbatim. Every
/// other `@` followed by a letter and then letters, digits or underscores is looked up in
/// `params`; a name used twice yields two placeholders and two copies of its value.
///
/// ```rust
/// use std::collections::HashMap;
/// use sql_dbc::prelude::*;
///
/// let mut params = HashMap::new();
/// params.insert("x".to_string(), SqlValue::Int(5));
///
/// let out = rewrite("SELECT @x, '@x', @x", &params)?;
/// assert_eq!(out.sql, "SELECT ?, '@x', ?");
/// assert_eq!(out.args, vec![SqlValue::Int(5), SqlValue::Int(5)]);
/// # Ok::<(), DbcError>(())
/// ```
///
/// Returns a borrowed `Cow` when the query has no named references.
///
/// # Errors
/// Returns `DbcError::NamedParameterNotFound` for the first reference `params` cannot
/// resolve. The rewritten text is discarded in that case and must not be executed.
pub fn rewrite<'a>(
    sql: &'a str,
    params: &dyn NamedParams,
) -> Result<RewrittenQuery<'a>, DbcError> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut args = Vec::new();
    let mut missing: Option<String> = None;
    // Start of the input not yet copied into `out`.
    let mut copied = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        if is_quote(b) {
            if let Some(close) = closing_quote(bytes, idx) {
                idx = close + 1;
                continue;
            }
        } else if b == b'@'
            && let Some((end, name)) = scan_name(bytes, idx + 1)
        {
            match params.get(name) {
                Some(value) => args.push(value),
                None => {
                    if missing.is_none() {
                        missing = Some(name.to_owned());
                    }
                }
            }
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
            buf.push_str(&sql[copied..idx]);
            buf.push(PLACEHOLDER);
            copied = end;
            idx = end;
            continue;
        }
        idx += 1;
    }

    if let Some(name) = missing {
        return Err(DbcError::NamedParameterNotFound { name });
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    Ok(RewrittenQuery { sql, args })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn params(pairs: &[(&str, SqlValue)]) -> HashMap<String, SqlValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn repeated_names_repeat_arguments() {
        let p = params(&[("x", SqlValue::Int(5))]);
        let out = rewrite("SELECT a FROM t WHERE a = @x OR b = @x", &p).unwrap();
        assert_eq!(out.sql, "SELECT a FROM t WHERE a = ? OR b = ?");
        assert_eq!(out.args, vec![SqlValue::Int(5), SqlValue::Int(5)]);
    }

    #[test]
    fn order_follows_source_text() {
        let p = params(&[("a", SqlValue::Int(1)), ("b", SqlValue::from("two"))]);
        let out = rewrite("INSERT INTO t VALUES (@b, @a, @b)", &p).unwrap();
        assert_eq!(out.sql, "INSERT INTO t VALUES (?, ?, ?)");
        assert_eq!(
            out.args,
            vec![
                SqlValue::from("two"),
                SqlValue::Int(1),
                SqlValue::from("two")
            ]
        );
    }

    #[test]
    fn quoted_text_is_left_alone() {
        let p = params(&[("x", SqlValue::Int(5))]);
        let out = rewrite(r#"SELECT "@x""#, &p).unwrap();
        assert!(matches!(out.sql, Cow::Borrowed(_)));
        assert_eq!(out.sql, r#"SELECT "@x""#);
        assert!(out.args.is_empty());

        let out = rewrite("SELECT `@x`, '@x', @x", &p).unwrap();
        assert_eq!(out.sql, "SELECT `@x`, '@x', ?");
        assert_eq!(out.args.len(), 1);
    }

    #[test]
    fn unterminated_quote_does_not_hide_parameters() {
        let p = params(&[("x", SqlValue::Int(5))]);
        let out = rewrite("SELECT 'it @x", &p).unwrap();
        assert_eq!(out.sql, "SELECT 'it ?");
        assert_eq!(out.args, vec![SqlValue::Int(5)]);
    }

    #[test]
    fn missing_name_is_reported() {
        let p = params(&[("x", SqlValue::Int(5))]);
        let err = rewrite("SELECT @x, @missing, @gone", &p).unwrap_err();
        match err {
            DbcError::NamedParameterNotFound { name } => assert_eq!(name, "missing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_names_are_not_parameters() {
        let p = params(&[("session", SqlValue::Int(1))]);
        let out = rewrite("SELECT @1, @_x, @@session, email@", &p).unwrap();
        assert_eq!(out.sql, "SELECT @1, @_x, @?, email@");
        assert_eq!(out.args, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn multibyte_text_survives() {
        let p = params(&[("név", SqlValue::Int(1)), ("n", SqlValue::Int(2))]);
        let out = rewrite("SELECT 'ünï' || @n || 'ø'", &p).unwrap();
        assert_eq!(out.sql, "SELECT 'ünï' || ? || 'ø'");
        assert_eq!(out.args, vec![SqlValue::Int(2)]);
    }
}
