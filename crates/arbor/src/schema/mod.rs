//! Model metadata: tables, relation declarations and the registry.
//!
//! ```
//! use arbor::{ModelDef, Registry};
//!
//! let registry = Registry::builder()
//!     .model(ModelDef::new("Author", "authors").attributes(["firstName", "lastName"]))
//!     .model(
//!         ModelDef::new("Article", "articles")
//!             .attributes(["authorId", "title"])
//!             .belongs_to("author", "Author"),
//!     )
//!     .build()?;
//!
//! let author = registry.relation("Article", "author")?;
//! assert_eq!(author.current.column, "author_id");
//! # Ok::<(), arbor::OrmError>(())
//! ```

mod registry;
mod table;


pub use registry::{Model, ModelDef, Registry, RegistryBuilder, RelationDef};
pub use table::Table;
