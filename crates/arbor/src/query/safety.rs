//! Pre-execution checks and parameter flattening.

use crate::value::Value;

/// Strip leading whitespace, SQL comments (`--` and `/* */`), and parentheses
/// from a SQL string to find the first meaningful keyword.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Whether `s` starts with `keyword` as a whole word.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(keyword) => s[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_word_char(c)),
        _ => false,
    }
}

fn is_word_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphanumeric()
}

/// `false` for a DELETE or UPDATE with no WHERE at the statement's top level.
///
/// A WHERE inside a subquery, a quoted identifier, a string literal or a
/// comment does not count.
pub fn query_is_safe(sql: &str) -> bool {
    let body = strip_sql_prefix(sql);
    if !(starts_with_keyword(body, "DELETE") || starts_with_keyword(body, "UPDATE")) {
        return true;
    }
    has_top_level_where(body)
}

fn has_top_level_where(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        // Doubled quote is an escaped quote.
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    if bytes[i] == b'\\' && quote == b'\'' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'w' | b'W' if depth == 0 => {
                let preceded = i > 0 && is_word_char(bytes[i - 1] as char);
                if !preceded && starts_with_keyword(&sql[i..], "WHERE") {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Flatten bound values into the driver's positional parameter list.
///
/// Lists and entity keys are expanded in order; raw SQL was written inline at
/// compile time and binds nothing.
pub fn prepare_values_for_execution(params: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(params.len());
    flatten_into(&mut out, params);
    out
}

fn flatten_into(out: &mut Vec<Value>, values: &[Value]) {
    for value in values {
        match value {
            Value::List(items) | Value::Entity(items) => flatten_into(out, items),
            Value::Raw(_) => {}
            other => out.push(other.clone()),
        }
    }
}
