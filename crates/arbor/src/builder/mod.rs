//! Component builder.
//!
//! A [`Builder`] turns a statement kind, a target (registered model or bare
//! table) and [`QueryOptions`] into [`Components`], the normalized clause set
//! the compiler renders. Relation paths in conditions, fields, eager loads,
//! ordering and grouping all go through one [`Arborescence`], so each relation
//! is joined at most once per statement.
//!
//! ## Example
//!
//! ```
//! use arbor::builder::{Builder, QueryOptions, StatementKind};
//! use arbor::{Conditions, ModelDef, Registry};
//!
//! # fn main() -> arbor::OrmResult<()> {
//! let registry = Registry::builder()
//!     .model(ModelDef::new("Article", "articles").attributes(["authorId", "title"]))
//!     .build()?;
//!
//! let mut options = QueryOptions::default();
//! options.conditions = Conditions::new().eq("authorId", 12);
//! let components =
//!     Builder::for_model(&registry, "Article", StatementKind::Select)?.options(options).build()?;
//! assert_eq!(components.conditions.len(), 1);
//! # Ok(())
//! # }
//! ```

mod components;
mod finalize;
mod normalize;

#[cfg(test)]
mod tests;

pub use components::{
    Aggregate, AggregateFunc, ColumnRef, Components, JoinClause, JoinType, OnTuple, OrderBy,
    SelectItem, Source, StatementKind,
};

use crate::arborescence::{Arborescence, NodeId, ROOT_ALIAS};
use crate::condition::{ConditionNode, Conditions};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::schema::{Registry, Table};
use crate::value::Value;

/// What a statement is built against.
#[derive(Debug, Clone)]
pub enum Target<'r> {
    /// A registered model; relation paths resolve through the registry.
    Model {
        registry: &'r Registry,
        model: String,
    },
    /// A bare table; every relation segment is unknown.
    Table(&'r Table),
}

/// Aggregate request over a path (`None` for `COUNT(*)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub func: AggregateFunc,
    pub path: Option<String>,
    pub distinct: bool,
    pub alias: Option<String>,
}

impl AggregateSpec {
    fn new(func: AggregateFunc, path: Option<String>) -> Self {
        Self {
            func,
            path,
            distinct: false,
            alias: None,
        }
    }

    pub fn count_all() -> Self {
        Self::new(AggregateFunc::Count, None)
    }

    pub fn count(path: impl Into<String>) -> Self {
        Self::new(AggregateFunc::Count, Some(path.into()))
    }

    pub fn sum(path: impl Into<String>) -> Self {
        Self::new(AggregateFunc::Sum, Some(path.into()))
    }

    pub fn avg(path: impl Into<String>) -> Self {
        Self::new(AggregateFunc::Avg, Some(path.into()))
    }

    pub fn min(path: impl Into<String>) -> Self {
        Self::new(AggregateFunc::Min, Some(path.into()))
    }

    pub fn max(path: impl Into<String>) -> Self {
        Self::new(AggregateFunc::Max, Some(path.into()))
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Statement options. Paths are relative to the target model.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub conditions: Conditions,
    /// Selected attributes (SELECT) or inserted attributes (INSERT).
    pub fields: Vec<String>,
    /// Relation paths to eager-load.
    pub with: Vec<String>,
    /// `attr`, `-attr`, `attr ASC` or `attr DESC`.
    pub order_by: Vec<String>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<AggregateSpec>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub distinct: bool,
    /// UPDATE assignments, or a single INSERT row when `rows` is empty.
    pub set: Vec<(String, Value)>,
    /// INSERT rows, each matching `fields`.
    pub rows: Vec<Vec<Value>>,
}

/// Builds [`Components`] for one statement.
#[derive(Debug, Clone)]
pub struct Builder<'r> {
    target: Target<'r>,
    kind: StatementKind,
    options: QueryOptions,
}

impl<'r> Builder<'r> {
    pub fn new(target: Target<'r>, kind: StatementKind) -> Self {
        Self {
            target,
            kind,
            options: QueryOptions::default(),
        }
    }

    /// Builder over a registered model. Fails with `UnknownModel`.
    pub fn for_model(registry: &'r Registry, model: &str, kind: StatementKind) -> OrmResult<Self> {
        registry.model(model)?;
        Ok(Self::new(
            Target::Model {
                registry,
                model: model.to_string(),
            },
            kind,
        ))
    }

    pub fn for_table(table: &'r Table, kind: StatementKind) -> Self {
        Self::new(Target::Table(table), kind)
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options_ref(&self) -> &QueryOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut QueryOptions {
        &mut self.options
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn target(&self) -> &Target<'r> {
        &self.target
    }

    /// Resolve every path and produce the component set.
    pub fn build(&self) -> OrmResult<Components> {
        let mut arb = match &self.target {
            Target::Model { registry, model } => Arborescence::new(registry, model)?,
            Target::Table(table) => Arborescence::for_table(table),
        };
        let components = match self.kind {
            StatementKind::Select => self.build_select(&mut arb)?,
            StatementKind::Insert => self.build_insert(&arb)?,
            StatementKind::Update => self.build_update(&mut arb)?,
            StatementKind::Delete => self.build_delete(&mut arb)?,
        };
        tracing::debug!(
            kind = ?self.kind,
            nodes = arb.len(),
            joins = components.joins.len(),
            "built components"
        );
        Ok(components)
    }

    fn build_select(&self, arb: &mut Arborescence<'_>) -> OrmResult<Components> {
        let opts = &self.options;
        let table = arb.table(NodeId::ROOT);
        let mut components = Components::new(StatementKind::Select);
        components.from = Some(Source::table(table.name(), ROOT_ALIAS));
        components.distinct = opts.distinct;

        if !opts.fields.is_empty() {
            for field in &opts.fields {
                let (node, column, attribute) = column_ref(arb, field, "fields")?;
                components.columns.push(SelectItem::Column {
                    result_alias: Some(result_alias(arb, node, &attribute)),
                    column,
                });
            }
        } else if opts.aggregates.is_empty() {
            for (attribute, column) in table.columns() {
                components.columns.push(SelectItem::Column {
                    column: ColumnRef::root(column.as_str()),
                    result_alias: Some(attribute.clone()),
                });
            }
        }

        if !opts.with.is_empty() && !arb.has_model() {
            return Err(OrmError::malformed(
                "with",
                format!("eager loading needs a model, '{}' is a bare table", table.name()),
            ));
        }
        for path in &opts.with {
            let terminal = arb.resolve_relations(NodeId::ROOT, path)?;
            let nodes = arb.path_between(NodeId::ROOT, terminal).unwrap_or_default();
            for id in nodes {
                if arb.node(id).selected {
                    continue;
                }
                arb.select(id);
                let alias = arb.node(id).alias.clone();
                for (attribute, column) in arb.table(id).columns() {
                    components.columns.push(SelectItem::Column {
                        column: ColumnRef::new(alias.as_str(), column.as_str()),
                        result_alias: Some(format!("{alias}.{attribute}")),
                    });
                }
            }
        }

        for path in &opts.group_by {
            let (node, column, attribute) = column_ref(arb, path, "group_by")?;
            if opts.fields.is_empty() && !opts.aggregates.is_empty() {
                components.columns.push(SelectItem::Column {
                    column: column.clone(),
                    result_alias: Some(result_alias(arb, node, &attribute)),
                });
            }
            components.group_by.push(column);
        }

        for spec in &opts.aggregates {
            let column = match &spec.path {
                Some(path) => Some(column_ref(arb, path, "aggregates")?.1),
                None => None,
            };
            components.aggregates.push(Aggregate {
                func: spec.func,
                column,
                distinct: spec.distinct,
                alias: spec.alias.clone(),
            });
        }

        for spec in &opts.order_by {
            let (path, descending) = parse_order(spec)?;
            let (_, column, _) = column_ref(arb, path, "order_by")?;
            components.order_by.push(OrderBy { column, descending });
        }

        components.limit = non_negative("limit", opts.limit)?;
        components.offset = non_negative("offset", opts.offset)?;

        components.conditions = self.conditions(arb)?;
        components.joins = arb.main_joins();
        Ok(components)
    }

    fn build_insert(&self, arb: &Arborescence<'_>) -> OrmResult<Components> {
        let opts = &self.options;
        if !opts.conditions.is_empty() {
            return Err(OrmError::malformed("conditions", "INSERT takes no conditions"));
        }
        let table = arb.table(NodeId::ROOT);

        let (attributes, rows): (Vec<&str>, Vec<Vec<Value>>) = if opts.rows.is_empty() {
            (
                opts.set.iter().map(|(a, _)| a.as_str()).collect(),
                vec![opts.set.iter().map(|(_, v)| v.clone()).collect()],
            )
        } else {
            (
                opts.fields.iter().map(String::as_str).collect(),
                opts.rows.clone(),
            )
        };
        if attributes.is_empty() {
            return Err(OrmError::malformed("values", "INSERT needs at least one column"));
        }

        let mut components = Components::new(StatementKind::Insert);
        components.into = Some(table.name().to_string());
        for attribute in &attributes {
            components.insert_columns.push(root_column(table, attribute, "fields")?);
        }
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != attributes.len() {
                return Err(OrmError::malformed(
                    "values",
                    format!(
                        "row {i} has {} values, expected {}",
                        row.len(),
                        attributes.len()
                    ),
                ));
            }
            components.values.push(row);
        }
        Ok(components)
    }

    fn build_update(&self, arb: &mut Arborescence<'_>) -> OrmResult<Components> {
        let opts = &self.options;
        if opts.set.is_empty() {
            return Err(OrmError::malformed("set", "UPDATE needs at least one assignment"));
        }
        let table = arb.table(NodeId::ROOT);
        let mut components = Components::new(StatementKind::Update);
        components.from = Some(Source::table(table.name(), ROOT_ALIAS));
        for (attribute, value) in &opts.set {
            let column = root_column(table, attribute, "set")?;
            components.set.push((ColumnRef::root(column), value.clone()));
        }
        components.conditions = self.conditions(arb)?;
        components.joins = arb.main_joins();
        Ok(components)
    }

    fn build_delete(&self, arb: &mut Arborescence<'_>) -> OrmResult<Components> {
        let table = arb.table(NodeId::ROOT);
        let mut components = Components::new(StatementKind::Delete);
        components.delete_from = Some(table.name().to_string());
        components.from = Some(Source::table(table.name(), ROOT_ALIAS));
        components.conditions = self.conditions(arb)?;
        components.joins = arb.main_joins();
        if components.needs_table_alias() {
            components.using = components.from.take();
        }
        Ok(components)
    }

    fn conditions(&self, arb: &mut Arborescence<'_>) -> OrmResult<Vec<ConditionNode>> {
        let nodes = normalize::normalize(arb, NodeId::ROOT, &self.options.conditions)?;
        finalize::finalize(arb, nodes)
    }
}

/// Resolve a path to a qualified column and join the nodes on the way.
fn column_ref(
    arb: &mut Arborescence<'_>,
    path: &str,
    option: &str,
) -> OrmResult<(NodeId, ColumnRef, String)> {
    let (node, attribute) = arb
        .resolve(path)
        .map_err(|e| match e {
            OrmError::MalformedOption { message, .. } => OrmError::malformed(option, message),
            other => other,
        })?;
    let column = arb.table(node).column_real_name(&attribute).to_string();
    Ident::parse(&column)?;
    arb.join_path(node);
    Ok((
        node,
        ColumnRef::new(arb.node(node).alias.as_str(), column),
        attribute,
    ))
}

fn root_column(table: &Table, attribute: &str, option: &str) -> OrmResult<String> {
    if attribute.contains('/') {
        return Err(OrmError::malformed(
            option,
            format!("'{attribute}' is not an attribute of '{}'", table.name()),
        ));
    }
    let column = table.column_real_name(attribute.trim()).to_string();
    Ident::parse(&column)?;
    Ok(column)
}

fn result_alias(arb: &Arborescence<'_>, node: NodeId, attribute: &str) -> String {
    if node == NodeId::ROOT {
        attribute.to_string()
    } else {
        format!("{}.{attribute}", arb.node(node).alias)
    }
}

/// `-path`, `path`, `path ASC`, `path DESC`.
fn parse_order(spec: &str) -> OrmResult<(&str, bool)> {
    let spec = spec.trim();
    if let Some(path) = spec.strip_prefix('-') {
        return Ok((path.trim(), true));
    }
    match spec.split_whitespace().collect::<Vec<_>>().as_slice() {
        [path] => Ok((*path, false)),
        [path, dir] if dir.eq_ignore_ascii_case("ASC") => Ok((*path, false)),
        [path, dir] if dir.eq_ignore_ascii_case("DESC") => Ok((*path, true)),
        _ => Err(OrmError::malformed("order_by", format!("cannot parse '{spec}'"))),
    }
}

fn non_negative(option: &str, value: Option<i64>) -> OrmResult<Option<u64>> {
    match value {
        None => Ok(None),
        Some(n) => u64::try_from(n)
            .map(Some)
            .map_err(|_| OrmError::malformed(option, format!("must not be negative, got {n}"))),
    }
}
