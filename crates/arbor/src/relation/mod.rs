//! Relation descriptors.
//!
//! A [`Relation`] describes one named edge between two models. The closed set of
//! [`RelationKind`]s decides two things:
//!
//! - which joins reach the linked rows ([`Relation::joins`]), and
//! - how conditions on the linked model are compiled so that a to-many edge never
//!   multiplies root rows ([`Relation::condition_strategy`], [`Relation::semi_join`]).
//!
//! | kind | joins | AND | OR |
//! |---|---|---|---|
//! | belongs-to / has-one | linked table | plain predicate | plain predicate |
//! | has-many | linked table | `EXISTS` for one condition, division for more | `EXISTS` |
//! | many-many | join table, then linked table | division over join + linked table | `EXISTS`, on the join table alone for key-only conditions |
//!
//! Division is the `NOT EXISTS (... NOT EXISTS ...)` form: there is no condition
//! that no linked row satisfies.


use crate::builder::{Components, JoinClause, JoinType, OnTuple, Source};
use crate::condition::{ConditionNode, LogicalOp, Operator};
use crate::value::Value;

/// Column of the derived condition-index table used by division.
pub const SERIES_COLUMN: &str = "k";

/// One side of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEnd {
    pub model: String,
    pub table: String,
    pub attribute: String,
    /// Resolved column name, never a raw attribute name.
    pub column: String,
}

/// Join table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEnd {
    pub table: String,
    /// Column pointing at the current side.
    pub from_column: String,
    /// Column pointing at the linked side.
    pub to_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    ManyMany(JoinEnd),
}

impl RelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::HasOne => "has_one",
            RelationKind::HasMany => "has_many",
            RelationKind::ManyMany(_) => "many_many",
        }
    }
}

/// How the conditions collected on a relation are turned into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStrategy {
    /// Predicates stay in the outer WHERE over a join.
    Plain,
    /// `EXISTS`: at least one linked row matches.
    Exists,
    /// `NOT EXISTS`-of-`NOT EXISTS`: every condition is met by some linked row.
    Division,
}

/// Immutable descriptor of a named relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub current: RelationEnd,
    pub linked: RelationEnd,
}

impl Relation {
    /// Whether one current row may have several linked rows.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self.kind, RelationKind::HasMany | RelationKind::ManyMany(_))
    }

    /// The same edge seen from the linked side.
    pub fn reverse(&self) -> Relation {
        let kind = match &self.kind {
            RelationKind::BelongsTo => RelationKind::HasMany,
            RelationKind::HasOne | RelationKind::HasMany => RelationKind::BelongsTo,
            RelationKind::ManyMany(join) => RelationKind::ManyMany(JoinEnd {
                table: join.table.clone(),
                from_column: join.to_column.clone(),
                to_column: join.from_column.clone(),
            }),
        };
        Relation {
            name: self.name.clone(),
            kind,
            current: self.linked.clone(),
            linked: self.current.clone(),
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Relation {
        self.name = name.into();
        self
    }

    /// Alias of the join table for a many-many node aliased `alias`.
    pub fn join_table_alias(alias: &str) -> String {
        format!("{alias}.__join")
    }

    /// Joins reaching this relation's linked rows from `parent_alias`.
    ///
    /// For many-many the join table is always joined; the linked table only when
    /// `link` is set.
    pub fn joins(
        &self,
        parent_alias: &str,
        alias: &str,
        join_type: JoinType,
        link: bool,
    ) -> Vec<JoinClause> {
        match &self.kind {
            RelationKind::BelongsTo | RelationKind::HasOne | RelationKind::HasMany => {
                vec![JoinClause {
                    table: self.linked.table.clone(),
                    alias: alias.to_string(),
                    join_type,
                    on: vec![OnTuple::eq(
                        alias,
                        &self.linked.column,
                        parent_alias,
                        &self.current.column,
                    )],
                }]
            }
            RelationKind::ManyMany(join) => {
                let join_alias = Self::join_table_alias(alias);
                let mut joins = vec![JoinClause {
                    table: join.table.clone(),
                    alias: join_alias.clone(),
                    join_type,
                    on: vec![OnTuple::eq(
                        &join_alias,
                        &join.from_column,
                        parent_alias,
                        &self.current.column,
                    )],
                }];
                if link {
                    joins.push(self.linked_join(alias, &join_alias, join, join_type));
                }
                joins
            }
        }
    }

    fn linked_join(
        &self,
        alias: &str,
        join_alias: &str,
        join: &JoinEnd,
        join_type: JoinType,
    ) -> JoinClause {
        JoinClause {
            table: self.linked.table.clone(),
            alias: alias.to_string(),
            join_type,
            on: vec![OnTuple::eq(
                alias,
                &self.linked.column,
                join_alias,
                &join.to_column,
            )],
        }
    }

    /// Strategy for `count` conditions collected on this relation.
    pub fn condition_strategy(&self, logic: LogicalOp, count: usize) -> ConditionStrategy {
        match (&self.kind, logic) {
            (RelationKind::BelongsTo | RelationKind::HasOne, _) => ConditionStrategy::Plain,
            (RelationKind::HasMany | RelationKind::ManyMany(_), LogicalOp::Or) => {
                ConditionStrategy::Exists
            }
            (RelationKind::HasMany | RelationKind::ManyMany(_), LogicalOp::And) => {
                if count >= 2 {
                    ConditionStrategy::Division
                } else {
                    ConditionStrategy::Exists
                }
            }
        }
    }

    /// Correlated semi-join testing `conditions` against the rows linked to
    /// `parent_alias`.
    ///
    /// `joins` are extra joins inside the subquery (towards single-valued
    /// descendants of `alias`). With [`ConditionStrategy::Exists`] the conditions
    /// keep their own logical operators; with [`ConditionStrategy::Division`]
    /// each one must be met by some linked row. [`ConditionStrategy::Plain`] is
    /// treated as `Exists`, which is equivalent on single-valued relations.
    pub fn semi_join(
        &self,
        parent_alias: &str,
        alias: &str,
        joins: Vec<JoinClause>,
        conditions: Vec<ConditionNode>,
        strategy: ConditionStrategy,
        logic: LogicalOp,
    ) -> ConditionNode {
        let division = strategy == ConditionStrategy::Division && conditions.len() >= 2;

        let (source, mut source_joins, correlation, conditions) = match &self.kind {
            RelationKind::BelongsTo | RelationKind::HasOne | RelationKind::HasMany => (
                Source::table(&self.linked.table, alias),
                Vec::new(),
                ConditionNode::attribute(
                    alias,
                    &self.linked.column,
                    Operator::Eq,
                    parent_alias,
                    &self.current.column,
                ),
                conditions,
            ),
            RelationKind::ManyMany(join) => {
                let join_alias = Self::join_table_alias(alias);
                let link = division
                    || !joins.is_empty()
                    || !only_key_references(&conditions, alias, &self.linked.column);
                let (source_joins, conditions) = if link {
                    (
                        vec![self.linked_join(alias, &join_alias, join, JoinType::Inner)],
                        conditions,
                    )
                } else {
                    let conditions = conditions
                        .into_iter()
                        .map(|c| retarget(c, alias, &join_alias, &join.to_column))
                        .collect();
                    (Vec::new(), conditions)
                };
                (
                    Source::table(&join.table, &join_alias),
                    source_joins,
                    ConditionNode::attribute(
                        &join_alias,
                        &join.from_column,
                        Operator::Eq,
                        parent_alias,
                        &self.current.column,
                    ),
                    conditions,
                )
            }
        };
        source_joins.extend(joins);

        let mut inner = Components::select_one(source);
        inner.joins = source_joins;
        inner.conditions.push(correlation);

        if !division {
            if let Some(filter) = conjunction(conditions) {
                inner.conditions.push(filter);
            }
            return ConditionNode::Exists {
                subquery: Box::new(inner),
                negate: false,
                logic,
            };
        }

        let series_alias = format!("{alias}.__conds");
        let disjuncts: Vec<ConditionNode> = conditions
            .into_iter()
            .enumerate()
            .map(|(i, condition)| ConditionNode::Nested {
                children: vec![
                    ConditionNode::simple(
                        &series_alias,
                        SERIES_COLUMN,
                        Operator::Eq,
                        Value::raw((i + 1).to_string()),
                    ),
                    condition.with_logic(LogicalOp::And),
                ],
                logic: if i == 0 { LogicalOp::And } else { LogicalOp::Or },
            })
            .collect();
        let count = disjuncts.len();
        inner.conditions.push(ConditionNode::nested(disjuncts));

        let mut outer = Components::select_one(Source::Series {
            alias: series_alias,
            count,
        });
        outer.conditions.push(ConditionNode::exists(inner, true));

        ConditionNode::Exists {
            subquery: Box::new(outer),
            negate: true,
            logic,
        }
    }
}

/// AND-attach a condition list after a correlation predicate.
fn conjunction(mut conditions: Vec<ConditionNode>) -> Option<ConditionNode> {
    match conditions.len() {
        0 => None,
        1 => conditions.pop().map(|c| c.with_logic(LogicalOp::And)),
        _ => {
            if let Some(first) = conditions.first_mut() {
                first.set_logic(LogicalOp::And);
            }
            Some(ConditionNode::nested(conditions))
        }
    }
}

/// Whether every reference to `alias` is a comparison on its key column.
fn only_key_references(conditions: &[ConditionNode], alias: &str, key: &str) -> bool {
    conditions.iter().all(|c| match c {
        ConditionNode::Simple {
            table_alias,
            columns,
            ..
        } => table_alias != alias || (columns.len() == 1 && columns[0] == key),
        ConditionNode::In {
            table_alias,
            column,
            ..
        } => table_alias != alias || column == key,
        ConditionNode::Attribute {
            left_alias,
            right_alias,
            ..
        } => left_alias != alias && right_alias != alias,
        ConditionNode::Nested { children, .. } => only_key_references(children, alias, key),
        ConditionNode::Exists { .. } | ConditionNode::SubQuery { .. } => false,
    })
}

/// Point key comparisons on `alias` at the join table's linked column.
fn retarget(condition: ConditionNode, alias: &str, join_alias: &str, to_column: &str) -> ConditionNode {
    match condition {
        ConditionNode::Simple {
            table_alias,
            columns,
            operator,
            value,
            logic,
        } if table_alias == alias => ConditionNode::Simple {
            table_alias: join_alias.to_string(),
            columns: columns.iter().map(|_| to_column.to_string()).collect(),
            operator,
            value,
            logic,
        },
        ConditionNode::In {
            table_alias,
            values,
            negate,
            logic,
            ..
        } if table_alias == alias => ConditionNode::In {
            table_alias: join_alias.to_string(),
            column: to_column.to_string(),
            values,
            negate,
            logic,
        },
        ConditionNode::Nested { children, logic } => ConditionNode::Nested {
            children: children
                .into_iter()
                .map(|c| retarget(c, alias, join_alias, to_column))
                .collect(),
            logic,
        },
        other => other,
    }
}
