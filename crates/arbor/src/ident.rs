//! Safe SQL identifier handling.
//!
//! Registered table and column names go through [`Ident::parse`], which accepts
//! `[A-Za-z_][A-Za-z0-9_$]*` segments separated by dots (`schema.table`).
//! Everything that reaches SQL is quoted with backticks; embedded backticks are
//! doubled, so aliases such as `articles.author` are emitted as a single quoted
//! identifier.
//!
//! # Example
//! ```
//! use arbor::ident::{Ident, quote};
//!
//! let t = Ident::parse("blog.articles")?;
//! assert_eq!(t.to_sql(), "`blog`.`articles`");
//! assert_eq!(quote("articles.author"), "`articles.author`");
//! # Ok::<(), arbor::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// Quote character for identifiers.
pub const QUOTE: char = '`';

/// A validated SQL identifier (table or column), possibly schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse and validate a dotted identifier.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }

        let mut parts = Vec::new();
        for seg in s.split('.') {
            let mut chars = seg.chars();
            let Some(first) = chars.next() else {
                return Err(OrmError::validation(format!(
                    "Empty identifier segment in '{s}'"
                )));
            };
            if !(first == '_' || first.is_ascii_alphabetic()) {
                return Err(OrmError::validation(format!(
                    "Invalid identifier start character '{first}' in '{s}'"
                )));
            }
            if let Some(c) = chars.find(|c| !(*c == '_' || *c == '$' || c.is_ascii_alphanumeric()))
            {
                return Err(OrmError::validation(format!(
                    "Invalid character '{c}' in identifier '{s}'"
                )));
            }
            parts.push(seg.to_string());
        }

        Ok(Self { parts })
    }

    /// The identifier as written, without quoting.
    pub fn as_str(&self) -> String {
        self.parts.join(".")
    }

    /// Render the identifier as quoted SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            write_quoted(&mut out, part);
        }
        out
    }
}

/// Quote a single identifier, alias or result name.
pub fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_quoted(&mut out, name);
    out
}

pub(crate) fn write_quoted(out: &mut String, name: &str) {
    out.push(QUOTE);
    for ch in name.chars() {
        if ch == QUOTE {
            out.push(QUOTE);
        }
        out.push(ch);
    }
    out.push(QUOTE);
}
