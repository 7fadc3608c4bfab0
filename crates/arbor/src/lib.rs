//! # arbor
//!
//! Relation-path query builder and SQL compiler.
//!
//! ## Features
//!
//! - **Relation paths**: filter, select, order and group through relations with
//!   `articles/author/age`-style paths; shared prefixes are joined once
//! - **Cardinality safe**: conditions through to-many relations compile to
//!   correlated `EXISTS` or relational division, never to row-multiplying joins
//! - **Value normalization**: lists arrayify operators (`=` → `IN`), empty lists
//!   and NULL become `IS [NOT] NULL`, entity references become their key
//! - **Safe defaults**: DELETE and UPDATE without WHERE are refused
//! - **Driver agnostic**: statements run through the [`Connection`] trait
//!
//! ## Example
//!
//! ```
//! use arbor::{Conditions, ModelDef, Query, Registry};
//!
//! # fn main() -> arbor::OrmResult<()> {
//! let registry = Registry::builder()
//!     .model(ModelDef::new("Author", "authors").attributes(["name"]).has_many("articles", "Article"))
//!     .model(
//!         ModelDef::new("Article", "articles")
//!             .attributes(["authorId", "title"])
//!             .belongs_to("author", "Author"),
//!     )
//!     .build()?;
//!
//! let mut query = Query::select(&registry, "Author")?
//!     .fields(["name"])
//!     .filter(Conditions::new().like("articles/title", "%rust%"));
//! let compiled = query.compile()?;
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT `_`.`name` FROM `authors` AS `_` WHERE EXISTS (SELECT 1 FROM `articles` AS `articles` \
//!      WHERE `articles`.`author_id` = `_`.`id` AND `articles`.`title` LIKE ?)"
//! );
//! # Ok(())
//! # }
//! ```

pub mod arborescence;
pub mod builder;
pub mod client;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod error;
pub mod ident;
pub mod log;
pub mod query;
pub mod relation;
pub mod schema;
pub mod value;

#[cfg(test)]
mod testing;

pub use arborescence::{Arborescence, NodeId, ROOT_ALIAS};
pub use builder::{AggregateSpec, Builder, Components, QueryOptions, StatementKind};
pub use client::{Connection, DriverError, Outcome, Row};
pub use compiler::{Compiled, Compiler};
pub use condition::{ConditionNode, Conditions, LogicalOp, Operator};
pub use config::{ColumnCase, Config, LogConfig, NamingConfig};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, quote};
pub use log::SqlLogger;
pub use query::{Query, QueryState, find_by_pk, prepare_values_for_execution, query_is_safe};
pub use relation::{ConditionStrategy, Relation, RelationKind};
pub use schema::{Model, ModelDef, Registry, RelationDef, Table};
pub use value::{Entity, Value};
