//! Component set → SQL text and parameters.
//!
//! Dialect: backtick-quoted identifiers and `?` placeholders. Parameters are
//! collected in placeholder order; a list or compound key is bound as one
//! entry and flattened only when the statement is executed.

mod writer;


pub use writer::Compiled;
pub(crate) use writer::SqlWriter;

use crate::builder::{
    Aggregate, ColumnRef, Components, JoinClause, OrderBy, SelectItem, Source, StatementKind,
};
use crate::condition::{ConditionNode, Operator};
use crate::error::{OrmError, OrmResult};
use crate::relation::SERIES_COLUMN;
use crate::value::Value;

/// MySQL's documented way of saying "no limit" when only an offset is given.
const NO_LIMIT: u64 = u64::MAX;

/// Renders [`Components`].
///
/// `use_table_alias` qualifies columns and aliases tables; `use_result_alias`
/// renders `AS` names for selected columns. Subqueries always use table
/// aliases since they correlate with the enclosing statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Compiler {
    pub use_table_alias: bool,
    pub use_result_alias: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags a component set needs: table aliases when it spans several tables
    /// or holds subqueries, result aliases when it selects joined columns.
    pub fn for_components(components: &Components) -> Self {
        Self {
            use_table_alias: components.needs_table_alias(),
            use_result_alias: components.selects_joined_columns(),
        }
    }

    pub fn table_alias(mut self, enabled: bool) -> Self {
        self.use_table_alias = enabled;
        self
    }

    pub fn result_alias(mut self, enabled: bool) -> Self {
        self.use_result_alias = enabled;
        self
    }

    /// Dispatch on the statement kind.
    pub fn compile(&self, components: &Components) -> OrmResult<Compiled> {
        let compiled = match components.kind {
            StatementKind::Select => self.compile_select(components),
            StatementKind::Insert => self.compile_insert(components),
            StatementKind::Update => self.compile_update(components),
            StatementKind::Delete => self.compile_delete(components),
        }?;
        tracing::trace!(sql = %compiled.sql, params = compiled.params.len(), "compiled");
        Ok(compiled)
    }

    pub fn compile_select(&self, components: &Components) -> OrmResult<Compiled> {
        let mut w = SqlWriter::new();
        self.write_select(&mut w, components)?;
        Ok(w.finish())
    }

    pub fn compile_insert(&self, components: &Components) -> OrmResult<Compiled> {
        let into = components
            .into
            .as_deref()
            .ok_or_else(|| OrmError::malformed("into", "INSERT without a target table"))?;
        if components.values.is_empty() {
            return Err(OrmError::malformed("values", "INSERT without rows"));
        }

        let mut w = SqlWriter::new();
        w.push("INSERT INTO ").push_table(into).push(" (");
        w.push_list(&components.insert_columns, |w, c| {
            w.push_ident(c);
        });
        w.push(") VALUES");
        w.push_list(&components.values, |w, row| {
            w.push("(");
            w.push_list(row, |w, v| {
                w.push_bind(v.clone());
            });
            w.push(")");
        });
        Ok(w.finish())
    }

    pub fn compile_update(&self, components: &Components) -> OrmResult<Compiled> {
        let from = components
            .from
            .as_ref()
            .ok_or_else(|| OrmError::malformed("from", "UPDATE without a table"))?;
        if components.set.is_empty() {
            return Err(OrmError::malformed("set", "UPDATE without assignments"));
        }

        let mut w = SqlWriter::new();
        w.push("UPDATE ");
        self.write_source(&mut w, from)?;
        self.write_joins(&mut w, &components.joins);
        w.push(" SET ");
        w.push_list(&components.set, |w, (column, value)| {
            self.write_column(w, column);
            w.push(" = ").push_bind(value.clone());
        });
        self.write_where(&mut w, &components.conditions)?;
        Ok(w.finish())
    }

    pub fn compile_delete(&self, components: &Components) -> OrmResult<Compiled> {
        let mut w = SqlWriter::new();
        match &components.using {
            Some(using) => {
                let aliased = self.table_alias(true);
                w.push("DELETE FROM ").push_ident(using.alias()).push(" USING ");
                aliased.write_source(&mut w, using)?;
                aliased.write_joins(&mut w, &components.joins);
                aliased.write_where(&mut w, &components.conditions)?;
            }
            None => {
                let table = components
                    .delete_from
                    .as_deref()
                    .or_else(|| match &components.from {
                        Some(Source::Table { name, .. }) => Some(name.as_str()),
                        _ => None,
                    })
                    .ok_or_else(|| OrmError::malformed("from", "DELETE without a table"))?;
                w.push("DELETE FROM ").push_table(table);
                self.write_where(&mut w, &components.conditions)?;
            }
        }
        Ok(w.finish())
    }

    fn write_select(&self, w: &mut SqlWriter, components: &Components) -> OrmResult<()> {
        w.push("SELECT ");
        if components.distinct {
            w.push("DISTINCT ");
        }
        if components.columns.is_empty() && components.aggregates.is_empty() {
            w.push("*");
        } else {
            w.push_list(&components.columns, |w, item| self.write_select_item(w, item));
            if !components.columns.is_empty() && !components.aggregates.is_empty() {
                w.push(",");
            }
            w.push_list(&components.aggregates, |w, aggregate| {
                self.write_aggregate(w, aggregate)
            });
        }

        if let Some(from) = &components.from {
            w.push(" FROM ");
            self.write_source(w, from)?;
        }
        self.write_joins(w, &components.joins);
        self.write_where(w, &components.conditions)?;

        if !components.group_by.is_empty() {
            w.push(" GROUP BY ");
            w.push_list(&components.group_by, |w, column| self.write_column(w, column));
        }
        if !components.order_by.is_empty() {
            w.push(" ORDER BY ");
            w.push_list(&components.order_by, |w, OrderBy { column, descending }| {
                self.write_column(w, column);
                if *descending {
                    w.push(" DESC");
                }
            });
        }
        match (components.limit, components.offset) {
            (Some(limit), offset) => {
                w.push(&format!(" LIMIT {limit}"));
                if let Some(offset) = offset {
                    w.push(&format!(" OFFSET {offset}"));
                }
            }
            (None, Some(offset)) => {
                w.push(&format!(" LIMIT {NO_LIMIT} OFFSET {offset}"));
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn write_select_item(&self, w: &mut SqlWriter, item: &SelectItem) {
        match item {
            SelectItem::Column {
                column,
                result_alias,
            } => {
                self.write_column(w, column);
                if let (true, Some(alias)) = (self.use_result_alias, result_alias) {
                    w.push(" AS ").push_ident(alias);
                }
            }
            SelectItem::Raw(sql) => {
                w.push(sql);
            }
        }
    }

    fn write_aggregate(&self, w: &mut SqlWriter, aggregate: &Aggregate) {
        w.push(aggregate.func.as_sql()).push("(");
        if aggregate.distinct {
            w.push("DISTINCT ");
        }
        match &aggregate.column {
            Some(column) => self.write_column(w, column),
            None => {
                w.push("*");
            }
        }
        w.push(")");
        if let Some(alias) = &aggregate.alias {
            w.push(" AS ").push_ident(alias);
        }
    }

    fn write_column(&self, w: &mut SqlWriter, column: &ColumnRef) {
        w.push_column(&column.table_alias, &column.column, self.use_table_alias);
    }

    fn write_source(&self, w: &mut SqlWriter, source: &Source) -> OrmResult<()> {
        match source {
            Source::Table { name, alias } => {
                w.push_table(name);
                if self.use_table_alias {
                    w.push(" AS ").push_ident(alias);
                }
            }
            Source::Series { alias, count } => {
                if *count == 0 {
                    return Err(OrmError::EmptyConditionGroup);
                }
                w.push("(");
                for k in 1..=*count {
                    if k == 1 {
                        w.push("SELECT 1 AS ").push_ident(SERIES_COLUMN);
                    } else {
                        w.push(&format!(" UNION ALL SELECT {k}"));
                    }
                }
                w.push(") AS ").push_ident(alias);
            }
        }
        Ok(())
    }

    fn write_joins(&self, w: &mut SqlWriter, joins: &[JoinClause]) {
        for join in joins {
            w.push(" ").push(join.join_type.sql_keyword()).push(" ");
            w.push_table(&join.table);
            if self.use_table_alias {
                w.push(" AS ").push_ident(&join.alias);
            }
            w.push(" ON ");
            for (i, on) in join.on.iter().enumerate() {
                if i > 0 {
                    w.push(" AND ");
                }
                w.push_column(&on.left_alias, &on.left_column, self.use_table_alias);
                w.push(" ").push(on.operator.as_sql()).push(" ");
                w.push_column(&on.right_alias, &on.right_column, self.use_table_alias);
            }
        }
    }

    fn write_where(&self, w: &mut SqlWriter, conditions: &[ConditionNode]) -> OrmResult<()> {
        if conditions.is_empty() {
            return Ok(());
        }
        w.push(" WHERE ");
        self.write_conditions(w, conditions)
    }

    fn write_conditions(&self, w: &mut SqlWriter, conditions: &[ConditionNode]) -> OrmResult<()> {
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                w.push(" ").push(condition.logic().as_str()).push(" ");
            }
            self.write_condition(w, condition)?;
        }
        Ok(())
    }

    fn write_condition(&self, w: &mut SqlWriter, condition: &ConditionNode) -> OrmResult<()> {
        match condition {
            ConditionNode::Simple {
                table_alias,
                columns,
                operator,
                value,
                ..
            } => self.write_simple(w, table_alias, columns, *operator, value),
            ConditionNode::Nested { children, .. } => {
                if children.is_empty() {
                    return Err(OrmError::EmptyConditionGroup);
                }
                w.push("(");
                self.write_conditions(w, children)?;
                w.push(")");
                Ok(())
            }
            ConditionNode::Exists {
                subquery, negate, ..
            } => {
                w.push(if *negate { "NOT EXISTS (" } else { "EXISTS (" });
                Self::subquery().write_select(w, subquery)?;
                w.push(")");
                Ok(())
            }
            ConditionNode::In {
                table_alias,
                column,
                values,
                negate,
                ..
            } => {
                if values.is_empty() {
                    w.push(if *negate { "1=1" } else { "1=0" });
                    return Ok(());
                }
                w.push_column(table_alias, column, self.use_table_alias);
                w.push(if *negate { " NOT IN " } else { " IN " });
                w.push_bind(Value::List(values.clone()));
                Ok(())
            }
            ConditionNode::Attribute {
                left_alias,
                left_column,
                operator,
                right_alias,
                right_column,
                ..
            } => {
                w.push_column(left_alias, left_column, self.use_table_alias);
                w.push(" ").push(operator.as_sql()).push(" ");
                w.push_column(right_alias, right_column, self.use_table_alias);
                Ok(())
            }
            ConditionNode::SubQuery {
                subquery,
                operator,
                value,
                ..
            } => {
                w.push("(");
                Self::subquery().write_select(w, subquery)?;
                w.push(") ").push(operator.as_sql());
                if !operator.is_unary() {
                    w.push(" ").push_bind(value.clone());
                }
                Ok(())
            }
        }
    }

    fn write_simple(
        &self,
        w: &mut SqlWriter,
        alias: &str,
        columns: &[String],
        operator: Operator,
        value: &Value,
    ) -> OrmResult<()> {
        if let (Operator::In | Operator::NotIn, Value::List(items)) = (operator, value) {
            if items.is_empty() {
                w.push(if operator == Operator::In { "1=0" } else { "1=1" });
                return Ok(());
            }
        }

        match columns {
            [] => {
                return Err(OrmError::malformed(
                    "conditions",
                    format!("comparison on '{alias}' names no column"),
                ));
            }
            [column] => {
                w.push_column(alias, column, self.use_table_alias);
            }
            _ => {
                w.push("(");
                w.push_list(columns, |w, column| {
                    w.push_column(alias, column, self.use_table_alias);
                });
                w.push(")");
            }
        }

        w.push(" ").push(operator.as_sql());
        if operator.is_unary() {
            return Ok(());
        }
        match (operator, value) {
            (Operator::Between | Operator::NotBetween, Value::List(bounds)) => match bounds.as_slice()
            {
                [low, high] => {
                    w.push(" ").push_bind(low.clone());
                    w.push(" AND ").push_bind(high.clone());
                }
                _ => {
                    return Err(OrmError::malformed(
                        "conditions",
                        format!("{operator} needs exactly two values"),
                    ));
                }
            },
            _ => {
                w.push(" ").push_bind(value.clone());
            }
        }
        Ok(())
    }

    fn subquery() -> Self {
        Self {
            use_table_alias: true,
            use_result_alias: false,
        }
    }
}
