use crate::error::OrmResult;
use crate::ident::Ident;

/// Table metadata: name, alias, attribute → column mapping and primary key.
///
/// Attributes keep their declaration order, which is also the default
/// select order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    alias: String,
    columns: Vec<(String, String)>,
    primary_key: Vec<String>,
}

impl Table {
    /// A table whose alias is its name and whose primary key is `id`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            columns: Vec::new(),
            primary_key: vec!["id".to_string()],
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Map an attribute to a column. Re-mapping an attribute replaces its column.
    pub fn with_column(mut self, attribute: impl Into<String>, column: impl Into<String>) -> Self {
        let attribute = attribute.into();
        let column = column.into();
        match self.columns.iter_mut().find(|(a, _)| *a == attribute) {
            Some(entry) => entry.1 = column,
            None => self.columns.push((attribute, column)),
        }
        self
    }

    /// Attributes whose column name equals the attribute name.
    pub fn with_columns<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        for attribute in attributes {
            let attribute = attribute.into();
            self = self.with_column(attribute.clone(), attribute);
        }
        self
    }

    pub fn with_primary_key<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Primary-key attributes in key order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn primary_key_columns(&self) -> Vec<String> {
        self.column_real_names(&self.primary_key)
    }

    /// `(attribute, column)` pairs in declaration order.
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Mapped column of an attribute, if declared.
    pub fn column(&self, attribute: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, c)| c.as_str())
    }

    /// Column for an attribute, or the attribute itself when unmapped.
    pub fn column_real_name<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.column(attribute).unwrap_or(attribute)
    }

    pub fn column_real_names<S: AsRef<str>>(&self, attributes: &[S]) -> Vec<String> {
        attributes
            .iter()
            .map(|a| self.column_real_name(a.as_ref()).to_string())
            .collect()
    }

    /// Reject names that are not plain SQL identifiers.
    pub fn validate(&self) -> OrmResult<()> {
        Ident::parse(&self.name)?;
        for (_, column) in &self.columns {
            Ident::parse(column)?;
        }
        for column in self.primary_key_columns() {
            Ident::parse(&column)?;
        }
        Ok(())
    }
}
