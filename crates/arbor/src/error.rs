//! Error types for arbor

use crate::client::DriverError;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Result type alias for arbor operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query building, compilation and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// A path segment does not name a registered relation on the current model
    #[error("Unknown relation '{relation}' on '{model}'")]
    UnknownRelation { model: String, relation: String },

    /// A model name is not registered
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// A comparison operator is not in the supported set
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// A group combinator is neither AND nor OR
    #[error("Invalid logical operator: {0}")]
    InvalidLogicalOperator(String),

    /// A condition group has no children at compile time
    #[error("Empty condition group")]
    EmptyConditionGroup,

    /// A clause option failed its shape or range validation
    #[error("Malformed option '{option}': {message}")]
    MalformedOption { option: String, message: String },

    /// DELETE/UPDATE without a WHERE clause
    #[error("Refusing to run unconditioned statement: {sql}")]
    UnsafeStatement { sql: String },

    /// The connection reported a failure
    #[error("Database error: {message} [SQL: {sql}]")]
    Database { message: String, sql: String },

    /// Unique constraint violation reported by the connection
    #[error("Duplicate key: {message} [SQL: {sql}]")]
    DuplicateKey { message: String, sql: String },

    /// A lookup by primary key returned no row
    #[error("Record not found in '{table}' for key {key}")]
    RecordNotFound { table: String, key: String },

    /// Identifier or registration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrmError {
    /// Create an unknown relation error
    pub fn unknown_relation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            model: model.into(),
            relation: relation.into(),
        }
    }

    /// Create a malformed option error
    pub fn malformed(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOption {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a record not found error
    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::RecordNotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Check if this is a duplicate key error
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Translate a driver error into a more specific OrmError.
    ///
    /// SQLSTATE `23505` and MySQL error `1062` are unique violations.
    /// SQLSTATE `23000` is the whole integrity-constraint class, so it only
    /// counts when the message names a duplicate. Drivers that report no code
    /// are matched on their message.
    pub fn from_driver(err: DriverError, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let duplicate = match err.code.as_deref() {
            Some("23505" | "1062") => true,
            Some("23000") => duplicate_key_pattern().is_match(&err.message),
            Some(_) => false,
            None => duplicate_key_pattern().is_match(&err.message),
        };
        if duplicate {
            Self::DuplicateKey {
                message: err.message,
                sql,
            }
        } else {
            Self::Database {
                message: err.message,
                sql,
            }
        }
    }
}

fn duplicate_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(duplicate (entry|key)|unique constraint)").expect("valid regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sqlstate_unique_violation() {
        let err = OrmError::from_driver(
            DriverError::new("constraint failed").with_code("23505"),
            "INSERT INTO `tags` (`name`) VALUES(?)",
        );
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn classifies_mysql_duplicate_entry() {
        let err = OrmError::from_driver(DriverError::new("boom").with_code("1062"), "INSERT");
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn classifies_uncoded_message() {
        let err = OrmError::from_driver(
            DriverError::new("Duplicate entry 'a' for key 'name'"),
            "INSERT",
        );
        assert!(err.is_duplicate_key());

        let err = OrmError::from_driver(DriverError::new("UNIQUE constraint failed"), "INSERT");
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn integrity_class_needs_duplicate_message() {
        let err = OrmError::from_driver(
            DriverError::new("Duplicate entry 'rust' for key 'name'").with_code("23000"),
            "INSERT",
        );
        assert!(err.is_duplicate_key());

        let err = OrmError::from_driver(
            DriverError::new(
                "Cannot add or update a child row: a foreign key constraint fails",
            )
            .with_code("23000"),
            "INSERT INTO `articles` (`author_id`) VALUES(?)",
        );
        assert!(matches!(err, OrmError::Database { .. }));

        let err = OrmError::from_driver(
            DriverError::new("Column 'title' cannot be null").with_code("23000"),
            "INSERT",
        );
        assert!(!err.is_duplicate_key());
    }

    #[test]
    fn other_codes_are_database_errors() {
        let err = OrmError::from_driver(
            DriverError::new("Duplicate entry").with_code("42000"),
            "SELECT 1",
        );
        match err {
            OrmError::Database { message, sql } => {
                assert_eq!(message, "Duplicate entry");
                assert_eq!(sql, "SELECT 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
