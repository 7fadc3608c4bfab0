use super::table::Table;
use crate::condition::{AttributeHook, Conditions, Operator};
use crate::config::{Config, NamingConfig};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::relation::{JoinEnd, Relation, RelationEnd, RelationKind};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KindDef {
    BelongsTo,
    HasOne,
    HasMany,
    ManyMany,
}

/// Declaration of one relation, resolved into a [`Relation`] when the
/// registry is built. Unset keys fall back to the naming conventions.
#[derive(Debug, Clone)]
pub struct RelationDef {
    name: String,
    kind: KindDef,
    target: String,
    foreign_key: Option<String>,
    references: Option<String>,
    join_table: Option<String>,
    join_from: Option<String>,
    join_to: Option<String>,
    inverse: Option<String>,
}

impl RelationDef {
    fn new(name: impl Into<String>, kind: KindDef, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: None,
            references: None,
            join_table: None,
            join_from: None,
            join_to: None,
            inverse: None,
        }
    }

    /// Foreign key lives on this model and points at `target`.
    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, KindDef::BelongsTo, target)
    }

    /// At most one `target` row points at this model.
    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, KindDef::HasOne, target)
    }

    /// Any number of `target` rows point at this model.
    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, KindDef::HasMany, target)
    }

    /// Linked through a join table.
    pub fn many_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, KindDef::ManyMany, target)
    }

    /// Foreign-key attribute (on this model for belongs-to, on the target otherwise).
    pub fn foreign_key(mut self, attribute: impl Into<String>) -> Self {
        self.foreign_key = Some(attribute.into());
        self
    }

    /// Referenced key attribute (on the target for belongs-to, on this model otherwise).
    pub fn references(mut self, attribute: impl Into<String>) -> Self {
        self.references = Some(attribute.into());
        self
    }

    /// Join table and its columns pointing at this model and at the target.
    pub fn through(
        mut self,
        table: impl Into<String>,
        from_column: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        self.join_table = Some(table.into());
        self.join_from = Some(from_column.into());
        self.join_to = Some(to_column.into());
        self
    }

    /// Also register the reversed relation on the target under `name`.
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }
}

/// Declaration of one model.
#[derive(Clone)]
pub struct ModelDef {
    name: String,
    table: String,
    alias: Option<String>,
    attributes: Vec<String>,
    columns: Vec<(String, String)>,
    primary_key: Option<Vec<String>>,
    relations: Vec<RelationDef>,
    hooks: Vec<(String, AttributeHook)>,
}

impl fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("attributes", &self.attributes)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

impl ModelDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            alias: None,
            attributes: Vec::new(),
            columns: Vec::new(),
            primary_key: None,
            relations: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Attributes whose columns follow the naming conventions.
    pub fn attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Attribute with an explicit column name.
    pub fn column(mut self, attribute: impl Into<String>, column: impl Into<String>) -> Self {
        let attribute = attribute.into();
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute.clone());
        }
        self.columns.push((attribute, column.into()));
        self
    }

    pub fn primary_key<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn belongs_to(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(RelationDef::belongs_to(name, target))
    }

    pub fn has_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(RelationDef::has_one(name, target))
    }

    pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(RelationDef::has_many(name, target))
    }

    pub fn many_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(RelationDef::many_many(name, target))
    }

    /// Register a derived attribute: conditions on `attribute` are replaced by
    /// the conditions `hook` returns.
    pub fn hook<F>(mut self, attribute: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Operator, &Value) -> OrmResult<Conditions> + Send + Sync + 'static,
    {
        self.hooks.push((attribute.into(), Arc::new(hook)));
        self
    }

    fn build_table(&self, naming: &NamingConfig) -> OrmResult<Table> {
        let primary_key = self
            .primary_key
            .clone()
            .unwrap_or_else(|| vec![naming.primary_key.clone()]);

        let mut table = Table::new(&self.table).with_primary_key(primary_key.iter().cloned());
        if let Some(alias) = &self.alias {
            table = table.with_alias(alias);
        }

        let mut attributes: Vec<&String> = primary_key
            .iter()
            .filter(|pk| !self.attributes.contains(pk))
            .collect();
        attributes.extend(self.attributes.iter());

        for attribute in attributes {
            let column = self
                .columns
                .iter()
                .rev()
                .find(|(a, _)| a == attribute)
                .map(|(_, c)| c.clone())
                .unwrap_or_else(|| naming.column_for(attribute));
            table = table.with_column(attribute.clone(), column);
        }
        table.validate()?;
        Ok(table)
    }
}

/// A registered model: its table, relations and attribute hooks.
pub struct Model {
    name: String,
    table: Table,
    relations: HashMap<String, Arc<Relation>>,
    hooks: HashMap<String, AttributeHook>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<&String> = self.hooks.keys().collect();
        hooks.sort();
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("relations", &self.relations)
            .field("hooks", &hooks)
            .finish()
    }
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn relation(&self, name: &str) -> Option<&Arc<Relation>> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Arc<Relation>> {
        self.relations.values()
    }

    pub fn hook(&self, attribute: &str) -> Option<&AttributeHook> {
        self.hooks.get(attribute)
    }
}

/// Immutable set of models with their resolved relation descriptors.
///
/// Built once by [`RegistryBuilder::build`]; afterwards it is read-only and can
/// be shared across threads.
#[derive(Debug)]
pub struct Registry {
    models: HashMap<String, Model>,
    config: Config,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(Config::default())
    }

    pub fn with_config(config: Config) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self, name: &str) -> OrmResult<&Model> {
        self.models
            .get(name)
            .ok_or_else(|| OrmError::UnknownModel(name.to_string()))
    }

    pub fn table(&self, model: &str) -> OrmResult<&Table> {
        Ok(self.model(model)?.table())
    }

    pub fn relation(&self, model: &str, name: &str) -> OrmResult<&Arc<Relation>> {
        self.model(model)?
            .relation(name)
            .ok_or_else(|| OrmError::unknown_relation(model, name))
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }
}

/// Collects model declarations and resolves them into a [`Registry`].
#[derive(Debug)]
pub struct RegistryBuilder {
    config: Config,
    models: Vec<ModelDef>,
}

impl RegistryBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            models: Vec::new(),
        }
    }

    pub fn model(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    /// Resolve every declaration. Relation descriptors are created here, once.
    pub fn build(self) -> OrmResult<Registry> {
        let naming = &self.config.naming;

        let mut tables: HashMap<String, Table> = HashMap::new();
        for def in &self.models {
            if tables.contains_key(&def.name) {
                return Err(OrmError::validation(format!(
                    "model '{}' is registered twice",
                    def.name
                )));
            }
            tables.insert(def.name.clone(), def.build_table(naming)?);
        }

        let mut relations: HashMap<String, HashMap<String, Arc<Relation>>> = HashMap::new();
        let mut inverses: Vec<(String, Relation)> = Vec::new();
        for def in &self.models {
            let owned = relations.entry(def.name.clone()).or_default();
            for rel in &def.relations {
                if owned.contains_key(&rel.name) {
                    return Err(OrmError::validation(format!(
                        "relation '{}' is declared twice on '{}'",
                        rel.name, def.name
                    )));
                }
                let relation = resolve_relation(&def.name, rel, &tables, naming)?;
                if let Some(inverse) = &rel.inverse {
                    inverses.push((
                        rel.target.clone(),
                        relation.reverse().renamed(inverse.clone()),
                    ));
                }
                owned.insert(rel.name.clone(), Arc::new(relation));
            }
        }

        // Declared relations take precedence over generated inverses.
        for (model, relation) in inverses {
            let owned = relations.entry(model).or_default();
            if !owned.contains_key(&relation.name) {
                owned.insert(relation.name.clone(), Arc::new(relation));
            }
        }

        let mut models = HashMap::new();
        for def in self.models {
            let table = tables.remove(&def.name).unwrap_or_else(|| Table::new(&def.table));
            let relations = relations.remove(&def.name).unwrap_or_default();
            tracing::debug!(
                model = %def.name,
                table = table.name(),
                relations = relations.len(),
                hooks = def.hooks.len(),
                "registered model"
            );
            models.insert(
                def.name.clone(),
                Model {
                    name: def.name,
                    table,
                    relations,
                    hooks: def.hooks.into_iter().collect(),
                },
            );
        }

        Ok(Registry {
            models,
            config: self.config,
        })
    }
}

fn end(model: &str, table: &Table, attribute: &str, naming: &NamingConfig) -> RelationEnd {
    let column = table
        .column(attribute)
        .map(str::to_string)
        .unwrap_or_else(|| naming.column_for(attribute));
    RelationEnd {
        model: model.to_string(),
        table: table.name().to_string(),
        attribute: attribute.to_string(),
        column,
    }
}

fn first_key(table: &Table, naming: &NamingConfig) -> String {
    table
        .primary_key()
        .first()
        .cloned()
        .unwrap_or_else(|| naming.primary_key.clone())
}

fn resolve_relation(
    model: &str,
    def: &RelationDef,
    tables: &HashMap<String, Table>,
    naming: &NamingConfig,
) -> OrmResult<Relation> {
    let current = tables
        .get(model)
        .ok_or_else(|| OrmError::UnknownModel(model.to_string()))?;
    let linked = tables
        .get(&def.target)
        .ok_or_else(|| OrmError::UnknownModel(def.target.clone()))?;

    let relation = match def.kind {
        KindDef::BelongsTo => {
            let fk = def
                .foreign_key
                .clone()
                .unwrap_or_else(|| naming.foreign_key_attribute(&def.target));
            let key = def.references.clone().unwrap_or_else(|| first_key(linked, naming));
            Relation {
                name: def.name.clone(),
                kind: RelationKind::BelongsTo,
                current: end(model, current, &fk, naming),
                linked: end(&def.target, linked, &key, naming),
            }
        }
        KindDef::HasOne | KindDef::HasMany => {
            let key = def.references.clone().unwrap_or_else(|| first_key(current, naming));
            let fk = def
                .foreign_key
                .clone()
                .unwrap_or_else(|| naming.foreign_key_attribute(model));
            Relation {
                name: def.name.clone(),
                kind: if def.kind == KindDef::HasOne {
                    RelationKind::HasOne
                } else {
                    RelationKind::HasMany
                },
                current: end(model, current, &key, naming),
                linked: end(&def.target, linked, &fk, naming),
            }
        }
        KindDef::ManyMany => {
            let key = def.references.clone().unwrap_or_else(|| first_key(current, naming));
            let linked_key = first_key(linked, naming);
            let join = JoinEnd {
                table: def
                    .join_table
                    .clone()
                    .unwrap_or_else(|| naming.join_table_for(current.name(), linked.name())),
                from_column: def
                    .join_from
                    .clone()
                    .unwrap_or_else(|| naming.foreign_key_column(model)),
                to_column: def
                    .join_to
                    .clone()
                    .unwrap_or_else(|| naming.foreign_key_column(&def.target)),
            };
            Ident::parse(&join.table)?;
            Ident::parse(&join.from_column)?;
            Ident::parse(&join.to_column)?;
            Relation {
                name: def.name.clone(),
                kind: RelationKind::ManyMany(join),
                current: end(model, current, &key, naming),
                linked: end(&def.target, linked, &linked_key, naming),
            }
        }
    };

    Ident::parse(&relation.current.column)?;
    Ident::parse(&relation.linked.column)?;
    tracing::trace!(
        model,
        relation = %relation.name,
        kind = relation.kind.name(),
        target = %def.target,
        "resolved relation"
    );
    Ok(relation)
}
