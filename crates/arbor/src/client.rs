//! Connection seam.
//!
//! arbor never talks to a database itself. It produces statements and hands them
//! to a [`Connection`], which may wrap any driver. Rows come back as plain
//! [`Row`] values; decoding them into models is the caller's business.

use crate::value::Value;
use std::future::Future;
use thiserror::Error;

/// Error reported by a connection.
///
/// `code` is the driver's error code (SQLSTATE or vendor code) when known; it is
/// used to classify unique violations, see [`OrmError::from_driver`](crate::OrmError::from_driver).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// A result row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value by column (or result alias) name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Value by position.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What a statement produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl Outcome {
    pub fn rows(rows: Vec<Row>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            rows,
            rows_affected,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
        }
    }
}

/// A database connection able to run `?`-parameterized statements.
///
/// Parameters are already flattened: one [`Value`] per placeholder, in order,
/// with no lists, entity references or raw expressions left.
pub trait Connection: Send + Sync {
    /// Execute a statement.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Outcome, DriverError>> + Send;

    /// Key generated by the last INSERT on this connection, if any.
    fn last_insert_id(&self) -> Option<Value>;
}

impl<C: Connection> Connection for &C {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Outcome, DriverError>> + Send {
        (**self).execute(sql, params)
    }

    fn last_insert_id(&self) -> Option<Value> {
        (**self).last_insert_id()
    }
}
