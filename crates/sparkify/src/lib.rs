//! Star-schema provisioning and bulk-load ETL for the sparkify warehouse.
//!
//! This crate provides:
//! - The seven-table star schema as data, rendered to DDL per dialect
//! - Named, ordered statement lists for drop, create, load and transform
//! - A sequential runner with per-statement commit and fail-fast semantics
//!
//! # Stages
//!
//! The [`SchemaManager`] drops and recreates every table. The
//! [`LoadRunner`] then bulk-loads the two staging tables from S3 with
//! Redshift `COPY` and derives `songplays`, `users`, `songs`, `artists`
//! and `time` with `INSERT ... SELECT`.
//!
//! ```ignore
//! let (config, _) = sparkify_config::load(None)?;
//! let client = sparkify::connect(&config.cluster).await?;
//!
//! let catalog = Catalog::new(config.pipeline);
//! SchemaManager::new(&client, catalog).reset().await?;
//! LoadRunner::new(&client, &config).run().await?;
//! ```
//!
//! There is no retry and no transaction around a stage: if statement N
//! fails, statements 1..N-1 stay committed and the error says which
//! statement broke.

mod catalog;
mod copy;
mod error;
pub mod runner;
pub mod schema;
mod sql;
mod traced;
mod warehouse;

pub use catalog::{Catalog, Statement, StatementKind};
pub use copy::{CopyStmt, JsonFormat};
pub use error::{BoxError, Error};
pub use runner::{
    LoadRunner, Phase, PhaseReport, RanStatement, SchemaManager, run_pipeline, run_statements,
};
pub use sql::{Ident, Lit, quote_ident};
pub use traced::{Connection, ConnectionExt, TracedConn};
pub use warehouse::connect;

pub use sparkify_config as config;

/// Result type for sparkify operations.
pub type Result<T> = std::result::Result<T, Error>;
