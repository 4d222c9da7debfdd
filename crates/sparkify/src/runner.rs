//! Sequential statement execution for the two pipeline stages.
//!
//! Both stages share one shape: walk an ordered list of statements, run
//! each to completion (it commits by itself), stop at the first failure.
//! Nothing is rolled back; statements before the failing one stay applied.

use crate::catalog::{Catalog, Statement, StatementKind};
use crate::traced::{Connection, ConnectionExt};
use crate::{Error, Result};
use sparkify_config::Config;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Which part of the pipeline a statement list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    DropTables,
    CreateTables,
    LoadStaging,
    InsertTables,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::DropTables => write!(f, "drop"),
            Phase::CreateTables => write!(f, "create"),
            Phase::LoadStaging => write!(f, "load"),
            Phase::InsertTables => write!(f, "insert"),
        }
    }
}

/// A statement that ran successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RanStatement {
    pub name: String,
    pub table: &'static str,
    pub kind: StatementKind,
    pub affected: u64,
    pub elapsed: Duration,
}

/// Outcome of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub statements: Vec<RanStatement>,
}

impl PhaseReport {
    pub fn affected(&self) -> u64 {
        self.statements.iter().map(|s| s.affected).sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.statements.iter().map(|s| s.elapsed).sum()
    }
}

/// Run `statements` in order, stopping at the first failure.
pub async fn run_statements<C: Connection>(
    conn: &C,
    phase: Phase,
    statements: &[Statement],
) -> Result<PhaseReport> {
    let traced = conn.traced();
    let mut ran = Vec::with_capacity(statements.len());

    for stmt in statements {
        let start = Instant::now();
        let affected = match traced.execute(&stmt.sql).await {
            Ok(affected) => affected,
            Err(e) => {
                error!(
                    %phase,
                    statement = %stmt.name,
                    table = stmt.table,
                    completed = ran.len(),
                    error = %e,
                    "statement failed"
                );
                return Err(Error::Statement {
                    phase,
                    name: stmt.name.clone(),
                    table: stmt.table,
                    completed: ran.len(),
                    source: Box::new(e),
                });
            }
        };
        let elapsed = start.elapsed();

        info!(
            %phase,
            statement = %stmt.name,
            table = stmt.table,
            affected,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "statement done"
        );

        ran.push(RanStatement {
            name: stmt.name.clone(),
            table: stmt.table,
            kind: stmt.kind,
            affected,
            elapsed,
        });
    }

    Ok(PhaseReport {
        phase,
        statements: ran,
    })
}

/// Drops and recreates the seven warehouse tables.
///
/// Destroys all data in them.
pub struct SchemaManager<'a, C: Connection> {
    conn: &'a C,
    catalog: Catalog,
}

impl<'a, C: Connection> SchemaManager<'a, C> {
    pub fn new(conn: &'a C, catalog: Catalog) -> Self {
        Self { conn, catalog }
    }

    pub async fn drop_tables(&self) -> Result<PhaseReport> {
        run_statements(self.conn, Phase::DropTables, &self.catalog.drop_tables()).await
    }

    pub async fn create_tables(&self) -> Result<PhaseReport> {
        run_statements(self.conn, Phase::CreateTables, &self.catalog.create_tables()).await
    }

    /// Drop everything, then create everything.
    pub async fn reset(&self) -> Result<Vec<PhaseReport>> {
        info!(dialect = %self.catalog.dialect(), "resetting warehouse schema");
        let dropped = self.drop_tables().await?;
        let created = self.create_tables().await?;
        Ok(vec![dropped, created])
    }
}

/// Loads the staging tables and derives the fact and dimension tables.
///
/// Assumes the schema exists. Running it twice without a reset appends to
/// staging and duplicates `songplays` rows.
pub struct LoadRunner<'a, C: Connection> {
    conn: &'a C,
    catalog: Catalog,
    config: &'a Config,
}

impl<'a, C: Connection> LoadRunner<'a, C> {
    pub fn new(conn: &'a C, config: &'a Config) -> Self {
        Self {
            conn,
            catalog: Catalog::new(config.pipeline),
            config,
        }
    }

    pub async fn load_staging(&self) -> Result<PhaseReport> {
        let statements = self
            .catalog
            .copy_staging(&self.config.s3, &self.config.iam_role)?;
        run_statements(self.conn, Phase::LoadStaging, &statements).await
    }

    pub async fn insert_tables(&self) -> Result<PhaseReport> {
        run_statements(self.conn, Phase::InsertTables, &self.catalog.insert_tables()).await
    }

    /// Bulk load, then transform.
    pub async fn run(&self) -> Result<Vec<PhaseReport>> {
        let loaded = self.load_staging().await?;
        let inserted = self.insert_tables().await?;
        Ok(vec![loaded, inserted])
    }
}

/// Both stages in order: schema reset, then load and transform.
///
/// A dialect that cannot bulk-load fails here, before the reset drops anything.
pub async fn run_pipeline<C: Connection>(conn: &C, config: &Config) -> Result<Vec<PhaseReport>> {
    let catalog = Catalog::new(config.pipeline);
    catalog.ensure_bulk_load()?;

    let mut reports = SchemaManager::new(conn, catalog).reset().await?;
    reports.extend(LoadRunner::new(conn, config).run().await?);
    Ok(reports)
}
