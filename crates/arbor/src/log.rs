//! `tracing`-based SQL logging.
//!
//! Every statement a [`Query`](crate::Query) hands to its connection is emitted
//! on target `arbor.sql` before execution.

use crate::builder::StatementKind;
use crate::config::LogConfig;
use crate::error::{OrmError, OrmResult};
use tracing::Level;

/// Emits executed SQL as `tracing` events.
#[derive(Debug, Clone)]
pub struct SqlLogger {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[log]` section of a [`Config`](crate::Config).
    pub fn from_config(config: &LogConfig) -> OrmResult<Self> {
        let level = config
            .level
            .parse::<Level>()
            .map_err(|e| OrmError::Config(format!("invalid log level '{}': {e}", config.level)))?;
        Ok(Self {
            level,
            max_sql_length: config.max_sql_length,
        })
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn emit(&self, kind: StatementKind, sql: &str, param_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "arbor.sql",
            statement = ?kind,
            param_count,
            sql = %sql,
        );
    }
}

/// Cut at `max` bytes without splitting a UTF-8 character.
fn truncate_bytes(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
