use crate::arborescence::ROOT_ALIAS;
use crate::condition::{ConditionNode, Operator};
use crate::value::Value;

/// Statement kind of a component set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// A FROM / USING source.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table { name: String, alias: String },
    /// `(SELECT 1 AS k UNION ALL ... SELECT count) AS alias`
    Series { alias: String, count: usize },
}

impl Source {
    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Source::Table {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            Source::Table { alias, .. } | Source::Series { alias, .. } => alias,
        }
    }
}

/// `left_alias.left_column op right_alias.right_column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnTuple {
    pub left_alias: String,
    pub left_column: String,
    pub right_alias: String,
    pub right_column: String,
    pub operator: Operator,
}

impl OnTuple {
    pub fn eq(left_alias: &str, left_column: &str, right_alias: &str, right_column: &str) -> Self {
        Self {
            left_alias: left_alias.to_string(),
            left_column: left_column.to_string(),
            right_alias: right_alias.to_string(),
            right_column: right_column.to_string(),
            operator: Operator::Eq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub table: String,
    pub alias: String,
    pub join_type: JoinType,
    pub on: Vec<OnTuple>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_alias: table_alias.into(),
            column: column.into(),
        }
    }

    /// Column of the root table.
    pub fn root(column: impl Into<String>) -> Self {
        Self::new(ROOT_ALIAS, column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

/// Resolved aggregate; `column: None` means `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub func: AggregateFunc,
    pub column: Option<ColumnRef>,
    pub distinct: bool,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Column {
        column: ColumnRef,
        result_alias: Option<String>,
    },
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub descending: bool,
}

/// Normalized clause data for one statement, produced by the builder and
/// consumed by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Components {
    pub kind: StatementKind,
    pub distinct: bool,
    /// Base source for SELECT and UPDATE, and single-table DELETE filters.
    pub from: Option<Source>,
    pub columns: Vec<SelectItem>,
    pub aggregates: Vec<Aggregate>,
    pub joins: Vec<JoinClause>,
    pub conditions: Vec<ConditionNode>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// UPDATE assignments in order.
    pub set: Vec<(ColumnRef, Value)>,
    /// INSERT target table.
    pub into: Option<String>,
    pub insert_columns: Vec<String>,
    /// INSERT rows, each as long as `insert_columns`.
    pub values: Vec<Vec<Value>>,
    /// DELETE target table.
    pub delete_from: Option<String>,
    /// Multi-table DELETE source list.
    pub using: Option<Source>,
}

impl Components {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            distinct: false,
            from: None,
            columns: Vec::new(),
            aggregates: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            set: Vec::new(),
            into: None,
            insert_columns: Vec::new(),
            values: Vec::new(),
            delete_from: None,
            using: None,
        }
    }

    /// `SELECT 1 FROM source`, the body of semi-joins.
    pub fn select_one(source: Source) -> Self {
        let mut components = Self::new(StatementKind::Select);
        components.from = Some(source);
        components.columns.push(SelectItem::Raw("1".to_string()));
        components
    }

    /// Whether the statement spans several tables.
    pub fn is_multi_table(&self) -> bool {
        !self.joins.is_empty() || self.using.is_some()
    }

    /// Whether columns must be qualified by table alias: joins, or correlated
    /// subqueries referring back to the root alias.
    pub fn needs_table_alias(&self) -> bool {
        self.is_multi_table() || self.conditions.iter().any(ConditionNode::has_subquery)
    }

    /// Whether any selected column comes from a joined table.
    pub fn selects_joined_columns(&self) -> bool {
        self.columns.iter().any(|item| {
            matches!(item, SelectItem::Column { column, .. } if column.table_alias != ROOT_ALIAS)
        })
    }
}
