use super::{LogicalOp, Operator};
use crate::builder::Components;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Model-defined rewrite of a derived attribute into real conditions.
///
/// The produced conditions are relative to the model that registered the hook.
pub type AttributeHook = Arc<dyn Fn(Operator, &Value) -> OrmResult<Conditions> + Send + Sync>;

#[derive(Debug, Clone)]
pub(crate) enum Entry {
    Compare {
        path: String,
        operator: String,
        value: Value,
    },
    Group(Conditions),
    In {
        path: String,
        values: Vec<Value>,
        negate: bool,
    },
    Attributes {
        left: String,
        operator: String,
        right: String,
    },
    Exists {
        subquery: Box<Components>,
        negate: bool,
    },
    SubQuery {
        subquery: Box<Components>,
        operator: String,
        value: Value,
    },
}

/// Raw condition spec, keyed by relation paths such as `articles/author/age`.
///
/// Entries are AND-combined unless [`or`](Conditions::or) precedes them; the
/// token affects the next entry only.
///
/// # Example
///
/// ```
/// use arbor::Conditions;
///
/// let conds = Conditions::new()
///     .eq("authorId", 12)
///     .eq("blogId", 1)
///     .group(Conditions::new().eq("title", vec!["A", "B"]).or().eq("authorId", 1));
/// assert_eq!(conds.len(), 3);
/// ```
#[derive(Clone, Default)]
pub struct Conditions {
    pub(crate) entries: Vec<(LogicalOp, Entry)>,
    pending: LogicalOp,
}

impl fmt::Debug for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(mut self, entry: Entry) -> Self {
        self.push_entry(entry);
        self
    }

    fn push_entry(&mut self, entry: Entry) {
        let logic = std::mem::take(&mut self.pending);
        self.entries.push((logic, entry));
    }

    /// Combine the next entry with OR.
    pub fn or(mut self) -> Self {
        self.pending = LogicalOp::Or;
        self
    }

    /// Combine the next entry with AND (the default).
    pub fn and(mut self) -> Self {
        self.pending = LogicalOp::And;
        self
    }

    /// Set the combinator for the next entry from a token string.
    pub fn logic(mut self, token: &str) -> OrmResult<Self> {
        self.pending = LogicalOp::parse(token)?;
        Ok(self)
    }

    /// `path = value`
    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(path, "=", value)
    }

    /// `path != value`
    pub fn ne(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(path, "!=", value)
    }

    pub fn gt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(path, ">", value)
    }

    pub fn lt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(path, "<", value)
    }

    pub fn like(self, path: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.op(path, "LIKE", pattern)
    }

    /// Comparison with any operator. The operator is validated when the
    /// conditions are normalized.
    pub fn op(
        self,
        path: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(Entry::Compare {
            path: path.into(),
            operator: operator.into(),
            value: value.into(),
        })
    }

    /// Parenthesized sub-group.
    pub fn group(self, conditions: Conditions) -> Self {
        self.push(Entry::Group(conditions))
    }

    /// Explicit set membership.
    pub fn in_list<T: Into<Value>>(
        self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.push(Entry::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
            negate: false,
        })
    }

    pub fn not_in_list<T: Into<Value>>(
        self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.push(Entry::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
            negate: true,
        })
    }

    /// Column-to-column comparison, e.g. `("updatedAt", ">", "author/createdAt")`.
    pub fn compare_attributes(
        self,
        left: impl Into<String>,
        operator: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.push(Entry::Attributes {
            left: left.into(),
            operator: operator.into(),
            right: right.into(),
        })
    }

    /// `EXISTS (subquery)`
    pub fn exists(self, subquery: Components) -> Self {
        self.push(Entry::Exists {
            subquery: Box::new(subquery),
            negate: false,
        })
    }

    /// `NOT EXISTS (subquery)`
    pub fn not_exists(self, subquery: Components) -> Self {
        self.push(Entry::Exists {
            subquery: Box::new(subquery),
            negate: true,
        })
    }

    /// `(subquery) op value`
    pub fn subquery(
        self,
        subquery: Components,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(Entry::SubQuery {
            subquery: Box::new(subquery),
            operator: operator.into(),
            value: value.into(),
        })
    }

    /// Append another spec; its first entry is AND-combined with ours.
    pub fn extend(&mut self, other: Conditions) {
        let mut entries = other.entries.into_iter();
        if let Some((_, first)) = entries.next() {
            self.entries.push((LogicalOp::And, first));
        }
        self.entries.extend(entries);
        self.pending = LogicalOp::And;
    }

    /// Parse the JSON form of a condition spec.
    ///
    /// - An object is a set of AND-combined entries. Keys are paths with an
    ///   optional operator after the first space (`"age >"`); the default is `=`.
    /// - An array is a group. `"AND"` / `"OR"` strings set the combinator of the
    ///   next element, objects are flattened into the group and nested arrays
    ///   become sub-groups.
    /// - A three-element array `[path, op, value]` is a single comparison.
    pub fn from_json(json: &serde_json::Value) -> OrmResult<Self> {
        let mut conditions = Conditions::new();
        conditions.push_json(json)?;
        Ok(conditions)
    }

    fn push_json(&mut self, json: &serde_json::Value) -> OrmResult<()> {
        match json {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let (path, operator) = match key.trim().split_once(char::is_whitespace) {
                        Some((path, op)) => (path.to_string(), op.trim().to_string()),
                        None => (key.trim().to_string(), "=".to_string()),
                    };
                    self.push_entry(Entry::Compare {
                        path,
                        operator,
                        value: Value::from_json(value),
                    });
                }
                Ok(())
            }
            serde_json::Value::Array(items) if is_triple(items) => {
                self.push_triple(items);
                Ok(())
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    match item {
                        serde_json::Value::String(token) => {
                            self.pending = LogicalOp::parse(token)?;
                        }
                        serde_json::Value::Object(_) => self.push_json(item)?,
                        serde_json::Value::Array(inner) if is_triple(inner) => {
                            self.push_triple(inner);
                        }
                        serde_json::Value::Array(_) => {
                            let group = Conditions::from_json(item)?;
                            self.push_entry(Entry::Group(group));
                        }
                        other => {
                            return Err(OrmError::malformed(
                                "conditions",
                                format!("unexpected element in condition group: {other}"),
                            ));
                        }
                    }
                }
                Ok(())
            }
            other => Err(OrmError::malformed(
                "conditions",
                format!("expected an object or an array, got {other}"),
            )),
        }
    }

    fn push_triple(&mut self, items: &[serde_json::Value]) {
        let path = items[0].as_str().unwrap_or_default().to_string();
        let operator = items[1].as_str().unwrap_or_default().to_string();
        self.push_entry(Entry::Compare {
            path,
            operator,
            value: Value::from_json(&items[2]),
        });
    }
}

fn is_triple(items: &[serde_json::Value]) -> bool {
    match items {
        [serde_json::Value::String(path), serde_json::Value::String(_), _] => {
            !LogicalOp::is_token(path)
        }
        _ => false,
    }
}

impl TryFrom<&serde_json::Value> for Conditions {
    type Error = OrmError;

    fn try_from(json: &serde_json::Value) -> OrmResult<Self> {
        Conditions::from_json(json)
    }
}

impl TryFrom<serde_json::Value> for Conditions {
    type Error = OrmError;

    fn try_from(json: serde_json::Value) -> OrmResult<Self> {
        Conditions::from_json(&json)
    }
}
