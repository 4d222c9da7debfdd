use crate::runner::Phase;
use sparkify_config::{ConfigError, Dialect};
use thiserror::Error;

/// A driver error, kept opaque so any [`Connection`](crate::Connection) can report one.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error(
        "{phase} statement `{name}` on table {table} failed after {completed} statement(s) succeeded: {source}"
    )]
    Statement {
        phase: Phase,
        name: String,
        table: &'static str,
        /// Statements of this phase that ran (and committed) before the failure.
        completed: usize,
        #[source]
        source: BoxError,
    },

    #[error("{operation} is not supported by the {dialect} dialect")]
    UnsupportedDialect {
        dialect: Dialect,
        operation: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
