//! Query orchestration.
//!
//! A [`Query`] owns its options and moves through [`QueryState`]s one way:
//! `Pending → Assembled → Compiled → Executed`. Changing an option sends it
//! back to `Pending`; running an executed query rebuilds it from scratch.
//!
//! ```
//! use arbor::{Conditions, ModelDef, Query, Registry};
//!
//! # fn main() -> arbor::OrmResult<()> {
//! let registry = Registry::builder()
//!     .model(ModelDef::new("Author", "authors").attributes(["firstName", "lastName"]))
//!     .build()?;
//!
//! let mut query = Query::update(&registry, "Author")?
//!     .set("firstName", "Foo")
//!     .filter(Conditions::new().ne("id", 12).eq("lastName", "Bar"));
//! let compiled = query.compile()?;
//! assert_eq!(
//!     compiled.sql,
//!     "UPDATE `authors` SET `first_name` = ? WHERE `id` != ? AND `last_name` = ?"
//! );
//! # Ok(())
//! # }
//! ```

mod safety;


pub use safety::{prepare_values_for_execution, query_is_safe};

use crate::builder::{AggregateSpec, Builder, Components, QueryOptions, StatementKind};
use crate::client::{Connection, Outcome, Row};
use crate::compiler::{Compiled, Compiler};
use crate::condition::Conditions;
use crate::error::{OrmError, OrmResult};
use crate::log::SqlLogger;
use crate::schema::{Registry, Table};
use crate::value::Value;

/// Where a [`Query`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Options may still change; nothing is built.
    Pending,
    /// Components are built.
    Assembled,
    /// SQL and parameters are ready.
    Compiled,
    /// The statement ran; the next run rebuilds.
    Executed,
}

/// One statement against a model or table.
#[derive(Debug, Clone)]
pub struct Query<'r> {
    builder: Builder<'r>,
    logger: SqlLogger,
    state: QueryState,
    components: Option<Components>,
    compiled: Option<Compiled>,
}

impl<'r> Query<'r> {
    fn for_model(registry: &'r Registry, model: &str, kind: StatementKind) -> OrmResult<Self> {
        let builder = Builder::for_model(registry, model, kind)?;
        let logger = SqlLogger::from_config(&registry.config().log)?;
        Ok(Self::from_builder(builder).logger(logger))
    }

    pub fn from_builder(builder: Builder<'r>) -> Self {
        Self {
            builder,
            logger: SqlLogger::default(),
            state: QueryState::Pending,
            components: None,
            compiled: None,
        }
    }

    pub fn select(registry: &'r Registry, model: &str) -> OrmResult<Self> {
        Self::for_model(registry, model, StatementKind::Select)
    }

    pub fn insert(registry: &'r Registry, model: &str) -> OrmResult<Self> {
        Self::for_model(registry, model, StatementKind::Insert)
    }

    pub fn update(registry: &'r Registry, model: &str) -> OrmResult<Self> {
        Self::for_model(registry, model, StatementKind::Update)
    }

    pub fn delete(registry: &'r Registry, model: &str) -> OrmResult<Self> {
        Self::for_model(registry, model, StatementKind::Delete)
    }

    pub fn select_table(table: &'r Table) -> Self {
        Self::from_builder(Builder::for_table(table, StatementKind::Select))
    }

    pub fn insert_table(table: &'r Table) -> Self {
        Self::from_builder(Builder::for_table(table, StatementKind::Insert))
    }

    pub fn update_table(table: &'r Table) -> Self {
        Self::from_builder(Builder::for_table(table, StatementKind::Update))
    }

    pub fn delete_table(table: &'r Table) -> Self {
        Self::from_builder(Builder::for_table(table, StatementKind::Delete))
    }

    pub fn logger(mut self, logger: SqlLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn kind(&self) -> StatementKind {
        self.builder.kind()
    }

    pub fn components(&self) -> Option<&Components> {
        self.components.as_ref()
    }

    pub fn compiled(&self) -> Option<&Compiled> {
        self.compiled.as_ref()
    }

    /// Mutable access to every option; resets the query to `Pending`.
    pub fn options_mut(&mut self) -> &mut QueryOptions {
        self.reset();
        self.builder.options_mut()
    }

    fn reset(&mut self) {
        self.state = QueryState::Pending;
        self.components = None;
        self.compiled = None;
    }

    fn with_options(mut self, f: impl FnOnce(&mut QueryOptions)) -> Self {
        f(self.options_mut());
        self
    }

    /// AND-append conditions to those already set.
    pub fn filter(self, conditions: Conditions) -> Self {
        self.with_options(|o| o.conditions.extend(conditions))
    }

    pub fn fields<S: Into<String>>(self, fields: impl IntoIterator<Item = S>) -> Self {
        self.with_options(|o| o.fields.extend(fields.into_iter().map(Into::into)))
    }

    /// Eager-load a relation path.
    pub fn with(self, path: impl Into<String>) -> Self {
        self.with_options(|o| o.with.push(path.into()))
    }

    pub fn order_by(self, spec: impl Into<String>) -> Self {
        self.with_options(|o| o.order_by.push(spec.into()))
    }

    pub fn group_by(self, path: impl Into<String>) -> Self {
        self.with_options(|o| o.group_by.push(path.into()))
    }

    pub fn aggregate(self, aggregate: AggregateSpec) -> Self {
        self.with_options(|o| o.aggregates.push(aggregate))
    }

    pub fn limit(self, limit: i64) -> Self {
        self.with_options(|o| o.limit = Some(limit))
    }

    pub fn offset(self, offset: i64) -> Self {
        self.with_options(|o| o.offset = Some(offset))
    }

    pub fn distinct(self) -> Self {
        self.with_options(|o| o.distinct = true)
    }

    pub fn set(self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_options(|o| o.set.push((attribute.into(), value.into())))
    }

    /// Add an INSERT row matching [`fields`](Self::fields).
    pub fn values<T: Into<Value>>(self, row: impl IntoIterator<Item = T>) -> Self {
        self.with_options(|o| o.rows.push(row.into_iter().map(Into::into).collect()))
    }

    /// Build components. A no-op once assembled.
    pub fn assemble(&mut self) -> OrmResult<&Components> {
        if self.state == QueryState::Executed {
            self.reset();
        }
        if self.components.is_none() {
            self.components = Some(self.builder.build()?);
            self.state = QueryState::Assembled;
        }
        self.components
            .as_ref()
            .ok_or_else(|| OrmError::validation("query has no components"))
    }

    /// Compile to SQL and parameters. A no-op once compiled.
    pub fn compile(&mut self) -> OrmResult<&Compiled> {
        if self.state == QueryState::Executed {
            self.reset();
        }
        if self.compiled.is_none() {
            let components = self.assemble()?;
            let compiled = Compiler::for_components(components).compile(components)?;
            self.compiled = Some(compiled);
            self.state = QueryState::Compiled;
        }
        self.compiled
            .as_ref()
            .ok_or_else(|| OrmError::validation("query is not compiled"))
    }

    /// Execute on `conn`.
    ///
    /// Unconditioned DELETE and UPDATE statements are refused with
    /// [`OrmError::UnsafeStatement`] before reaching the connection.
    pub async fn run<C: Connection>(&mut self, conn: &C) -> OrmResult<Outcome> {
        if self.state == QueryState::Executed {
            self.reset();
        }
        let compiled = self.compile()?;
        if !query_is_safe(&compiled.sql) {
            return Err(OrmError::UnsafeStatement {
                sql: compiled.sql.clone(),
            });
        }
        let sql = compiled.sql.clone();
        let params = prepare_values_for_execution(&compiled.params);

        self.logger.emit(self.kind(), &sql, params.len());
        let outcome = conn
            .execute(&sql, &params)
            .await
            .map_err(|e| OrmError::from_driver(e, sql))?;
        self.state = QueryState::Executed;
        Ok(outcome)
    }

    pub async fn fetch_all<C: Connection>(&mut self, conn: &C) -> OrmResult<Vec<Row>> {
        Ok(self.run(conn).await?.rows)
    }

    pub async fn fetch_optional<C: Connection>(&mut self, conn: &C) -> OrmResult<Option<Row>> {
        Ok(self.run(conn).await?.rows.into_iter().next())
    }

    /// `COUNT(*)` over this query's conditions, ignoring its columns, ordering
    /// and paging.
    pub async fn count<C: Connection>(&self, conn: &C) -> OrmResult<i64> {
        if self.kind() != StatementKind::Select {
            return Err(OrmError::malformed("count", "only SELECT queries can be counted"));
        }
        let mut counting = Query::from_builder(self.builder.clone()).logger(self.logger.clone());
        {
            let options = counting.options_mut();
            options.fields.clear();
            options.with.clear();
            options.order_by.clear();
            options.group_by.clear();
            options.limit = None;
            options.offset = None;
            options.aggregates = vec![AggregateSpec::count_all().alias("count")];
        }
        let row = counting.fetch_optional(conn).await?;
        match row.as_ref().and_then(|r| r.get("count").or_else(|| r.get_index(0))) {
            Some(Value::Int(n)) => Ok(*n),
            None => Ok(0),
            Some(other) => Err(OrmError::Database {
                message: format!("unexpected COUNT result {other}"),
                sql: counting.compiled.map(|c| c.sql).unwrap_or_default(),
            }),
        }
    }

    /// Run an INSERT and return the generated key, if the connection reports one.
    pub async fn insert_one<C: Connection>(&mut self, conn: &C) -> OrmResult<Option<Value>> {
        if self.kind() != StatementKind::Insert {
            return Err(OrmError::malformed("insert_one", "not an INSERT query"));
        }
        self.run(conn).await?;
        Ok(conn.last_insert_id())
    }
}

/// Load one row of `model` by primary key.
///
/// A compound key is given as a list in key order. Fails with
/// [`OrmError::RecordNotFound`] when no row matches.
pub async fn find_by_pk<C: Connection>(
    registry: &Registry,
    model: &str,
    key: impl Into<Value>,
    conn: &C,
) -> OrmResult<Row> {
    let key = key.into();
    let table = registry.table(model)?;
    let attributes = table.primary_key();
    let parts = match (&key, attributes.len()) {
        (Value::List(parts) | Value::Entity(parts), n) if n > 1 => parts.clone(),
        (Value::Entity(parts), 1) => parts.clone(),
        (_, _) => vec![key.clone()],
    };
    if parts.len() != attributes.len() {
        return Err(OrmError::malformed(
            "key",
            format!(
                "'{}' has a {}-part primary key, got {} values",
                table.name(),
                attributes.len(),
                parts.len()
            ),
        ));
    }

    let mut conditions = Conditions::new();
    for (attribute, value) in attributes.iter().zip(parts) {
        conditions = conditions.eq(attribute.as_str(), value);
    }
    Query::select(registry, model)?
        .filter(conditions)
        .limit(1)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| OrmError::not_found(table.name(), key.to_string()))
}
