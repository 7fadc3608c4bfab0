//! Condition tree.
//!
//! [`ConditionNode`] is the normalized WHERE-clause algebra the compiler renders.
//! [`Conditions`] is the raw, path-based input it is normalized from.
//!
//! Every node carries the [`LogicalOp`] joining it to its *preceding* sibling;
//! the first sibling's operator is ignored when rendering.

mod spec;


pub use spec::{AttributeHook, Conditions};
pub(crate) use spec::Entry;

use crate::builder::Components;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;

/// How a node combines with its preceding sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl LogicalOp {
    /// Parse an `AND` / `OR` token (case-insensitive).
    pub fn parse(token: &str) -> OrmResult<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("AND") {
            Ok(LogicalOp::And)
        } else if token.eq_ignore_ascii_case("OR") {
            Ok(LogicalOp::Or)
        } else {
            Err(OrmError::InvalidLogicalOperator(token.to_string()))
        }
    }

    pub fn is_token(token: &str) -> bool {
        Self::parse(token).is_ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    Is,
    IsNot,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
    LtAny,
    LeAny,
    GtAny,
    GeAny,
}

impl Operator {
    /// Parse an operator string, case- and whitespace-insensitive.
    pub fn parse(op: &str) -> OrmResult<Self> {
        let normalized = op
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let parsed = match normalized.as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "IS" => Operator::Is,
            "IS NOT" => Operator::IsNot,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            "< ANY" => Operator::LtAny,
            "<= ANY" => Operator::LeAny,
            "> ANY" => Operator::GtAny,
            ">= ANY" => Operator::GeAny,
            _ => return Err(OrmError::UnknownOperator(op.to_string())),
        };
        Ok(parsed)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::LtAny => "< ANY",
            Operator::LeAny => "<= ANY",
            Operator::GtAny => "> ANY",
            Operator::GeAny => ">= ANY",
        }
    }

    /// Form taken against a multi-valued right-hand side.
    pub fn arrayified(&self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::In),
            Operator::Ne => Some(Operator::NotIn),
            Operator::Lt => Some(Operator::LtAny),
            Operator::Le => Some(Operator::LeAny),
            Operator::Gt => Some(Operator::GtAny),
            Operator::Ge => Some(Operator::GeAny),
            _ => None,
        }
    }

    /// Operators whose right-hand side is a list to begin with.
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            Operator::In
                | Operator::NotIn
                | Operator::Between
                | Operator::NotBetween
                | Operator::LtAny
                | Operator::LeAny
                | Operator::GtAny
                | Operator::GeAny
        )
    }

    /// Operators rendered without a right-hand side.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Logical complement, where one exists as a single operator.
    pub fn negated(&self) -> Option<Operator> {
        let op = match self {
            Operator::Eq => Operator::Ne,
            Operator::Ne => Operator::Eq,
            Operator::Lt => Operator::Ge,
            Operator::Le => Operator::Gt,
            Operator::Gt => Operator::Le,
            Operator::Ge => Operator::Lt,
            Operator::Like => Operator::NotLike,
            Operator::NotLike => Operator::Like,
            Operator::In => Operator::NotIn,
            Operator::NotIn => Operator::In,
            Operator::Is => Operator::IsNot,
            Operator::IsNot => Operator::Is,
            Operator::IsNull => Operator::IsNotNull,
            Operator::IsNotNull => Operator::IsNull,
            Operator::Between => Operator::NotBetween,
            Operator::NotBetween => Operator::Between,
            Operator::LtAny | Operator::LeAny | Operator::GtAny | Operator::GeAny => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// WHERE-clause node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// `alias.column op value`; several columns render as a tuple.
    Simple {
        table_alias: String,
        columns: Vec<String>,
        operator: Operator,
        value: Value,
        logic: LogicalOp,
    },
    /// Parenthesized group. Must have at least one child when compiled.
    Nested {
        children: Vec<ConditionNode>,
        logic: LogicalOp,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists {
        subquery: Box<Components>,
        negate: bool,
        logic: LogicalOp,
    },
    /// `alias.column [NOT] IN (values)`; an empty list is constant false (true when negated).
    In {
        table_alias: String,
        column: String,
        values: Vec<Value>,
        negate: bool,
        logic: LogicalOp,
    },
    /// Column-to-column comparison.
    Attribute {
        left_alias: String,
        left_column: String,
        operator: Operator,
        right_alias: String,
        right_column: String,
        logic: LogicalOp,
    },
    /// `(subquery) op value`
    SubQuery {
        subquery: Box<Components>,
        operator: Operator,
        value: Value,
        logic: LogicalOp,
    },
}

impl ConditionNode {
    /// Single-column comparison joined with AND.
    pub fn simple(
        table_alias: impl Into<String>,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        ConditionNode::Simple {
            table_alias: table_alias.into(),
            columns: vec![column.into()],
            operator,
            value: value.into(),
            logic: LogicalOp::And,
        }
    }

    pub fn nested(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Nested {
            children,
            logic: LogicalOp::And,
        }
    }

    pub fn exists(subquery: Components, negate: bool) -> Self {
        ConditionNode::Exists {
            subquery: Box::new(subquery),
            negate,
            logic: LogicalOp::And,
        }
    }

    pub fn attribute(
        left_alias: impl Into<String>,
        left_column: impl Into<String>,
        operator: Operator,
        right_alias: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        ConditionNode::Attribute {
            left_alias: left_alias.into(),
            left_column: left_column.into(),
            operator,
            right_alias: right_alias.into(),
            right_column: right_column.into(),
            logic: LogicalOp::And,
        }
    }

    pub fn logic(&self) -> LogicalOp {
        match self {
            ConditionNode::Simple { logic, .. }
            | ConditionNode::Nested { logic, .. }
            | ConditionNode::Exists { logic, .. }
            | ConditionNode::In { logic, .. }
            | ConditionNode::Attribute { logic, .. }
            | ConditionNode::SubQuery { logic, .. } => *logic,
        }
    }

    pub fn set_logic(&mut self, op: LogicalOp) {
        match self {
            ConditionNode::Simple { logic, .. }
            | ConditionNode::Nested { logic, .. }
            | ConditionNode::Exists { logic, .. }
            | ConditionNode::In { logic, .. }
            | ConditionNode::Attribute { logic, .. }
            | ConditionNode::SubQuery { logic, .. } => *logic = op,
        }
    }

    pub fn with_logic(mut self, op: LogicalOp) -> Self {
        self.set_logic(op);
        self
    }

    /// Alias of the table a leaf filters on (left side for column comparisons).
    pub fn table_alias(&self) -> Option<&str> {
        match self {
            ConditionNode::Simple { table_alias, .. } | ConditionNode::In { table_alias, .. } => {
                Some(table_alias)
            }
            ConditionNode::Attribute { left_alias, .. } => Some(left_alias),
            _ => None,
        }
    }

    /// Whether this node (or anything nested in it) holds a subquery.
    pub fn has_subquery(&self) -> bool {
        match self {
            ConditionNode::Exists { .. } | ConditionNode::SubQuery { .. } => true,
            ConditionNode::Nested { children, .. } => children.iter().any(Self::has_subquery),
            _ => false,
        }
    }

    /// Whether this leaf only matches when its table has a row (not a NULL test).
    pub(crate) fn rejects_missing_row(&self) -> bool {
        match self {
            ConditionNode::Simple {
                operator, value, ..
            } => !(operator.is_unary()
                || (matches!(operator, Operator::Is | Operator::IsNot) && value.is_null())),
            ConditionNode::In { negate, .. } => !negate,
            _ => false,
        }
    }
}
