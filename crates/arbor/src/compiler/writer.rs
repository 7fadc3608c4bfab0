use crate::ident::write_quoted;
use crate::value::Value;

/// SQL text plus the values bound to its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    /// One entry per bound value; lists and entity keys stay nested until
    /// execution.
    pub params: Vec<Value>,
}

/// Append-only SQL buffer with `?` placeholders.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL.
    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append one quoted identifier. Dots are part of the name.
    pub(crate) fn push_ident(&mut self, name: &str) -> &mut Self {
        write_quoted(&mut self.sql, name);
        self
    }

    /// Append a possibly schema-qualified table name, quoting each segment.
    pub(crate) fn push_table(&mut self, name: &str) -> &mut Self {
        for (i, segment) in name.split('.').enumerate() {
            if i > 0 {
                self.sql.push('.');
            }
            write_quoted(&mut self.sql, segment);
        }
        self
    }

    /// `alias.column` when `qualified`, else the bare column.
    pub(crate) fn push_column(&mut self, alias: &str, column: &str, qualified: bool) -> &mut Self {
        if qualified {
            self.push_ident(alias).push(".");
        }
        self.push_ident(column)
    }

    /// Append placeholders for `value` and bind it.
    ///
    /// Raw SQL is written inline, a list becomes `(?,?,…)` and a compound
    /// entity key `(?,?)`.
    pub(crate) fn push_bind(&mut self, value: Value) -> &mut Self {
        write_placeholders(&mut self.sql, &value);
        self.params.push(value);
        self
    }

    /// Append `items` separated by `,`.
    pub(crate) fn push_list<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        mut each: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.sql.push(',');
            }
            each(self, item);
        }
        self
    }

    pub(crate) fn finish(self) -> Compiled {
        Compiled {
            sql: self.sql,
            params: self.params,
        }
    }
}

fn write_placeholders(out: &mut String, value: &Value) {
    match value {
        Value::Raw(sql) => out.push_str(sql),
        Value::List(items) | Value::Entity(items) if items.len() != 1 || value.is_list() => {
            if items.is_empty() {
                out.push_str("(NULL)");
                return;
            }
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_placeholders(out, item);
            }
            out.push(')');
        }
        _ => out.push('?'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_follow_value_shape() {
        let mut w = SqlWriter::new();
        w.push("a = ")
            .push_bind(Value::Int(1))
            .push(" AND b IN ")
            .push_bind(Value::list([1, 2, 3]))
            .push(" AND c = ")
            .push_bind(Value::raw("NOW()"))
            .push(" AND (d,e) = ")
            .push_bind(Value::Entity(vec![Value::Int(1), Value::Int(2)]))
            .push(" AND f = ")
            .push_bind(Value::Entity(vec![Value::Int(9)]));
        let compiled = w.finish();
        assert_eq!(
            compiled.sql,
            "a = ? AND b IN (?,?,?) AND c = NOW() AND (d,e) = (?,?) AND f = ?"
        );
        assert_eq!(compiled.params.len(), 5);
    }

    #[test]
    fn empty_list_renders_null() {
        let mut w = SqlWriter::new();
        w.push_bind(Value::List(Vec::new()));
        assert_eq!(w.finish().sql, "(NULL)");
    }

    #[test]
    fn identifiers_are_quoted() {
        let mut w = SqlWriter::new();
        w.push_table("shop.orders")
            .push(" ")
            .push_ident("articles.author")
            .push(" ")
            .push_column("_", "first_name", true)
            .push(" ")
            .push_column("_", "first_name", false);
        assert_eq!(
            w.finish().sql,
            "`shop`.`orders` `articles.author` `_`.`first_name` `first_name`"
        );
    }
}
