//! CLI for the sparkify warehouse pipeline.
//!
//! ```text
//! sparkify create-tables      drop and recreate all seven tables
//! sparkify etl                bulk-load staging, then derive fact/dimension tables
//! sparkify run                both, in order
//! sparkify sql --phase copy   print rendered statements without connecting
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use sparkify::{Catalog, LoadRunner, PhaseReport, SchemaManager, Statement};
use sparkify_config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Provision the sparkify star schema on Redshift and load it from S3.
#[derive(Parser, Debug)]
#[command(name = "sparkify", version)]
struct Cli {
    /// Configuration file (default: search for dwh.toml upwards from the current directory)
    #[arg(long, global = true, env = "SPARKIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Log each statement's SQL and timing
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drop and recreate all warehouse tables (destroys their data)
    CreateTables,
    /// Bulk-load the staging tables, then derive the fact and dimension tables
    Etl,
    /// Create tables, then run the ETL
    Run,
    /// Print the rendered statements without connecting
    Sql {
        /// Only print this phase
        #[arg(long, value_enum)]
        phase: Option<SqlPhase>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SqlPhase {
    Drop,
    Create,
    Copy,
    Insert,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let (directive, span_events) = if verbose {
        ("sparkify=debug", FmtSpan::CLOSE)
    } else {
        ("sparkify=info", FmtSpan::NONE)
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .init();
}

async fn run(cli: Cli) -> sparkify::Result<()> {
    let (config, path) = sparkify_config::load(cli.config.as_deref())?;
    info!(config = %path.display(), dialect = %config.pipeline.dialect, "loaded configuration");

    let catalog = Catalog::new(config.pipeline);

    let reports = match cli.command {
        Commands::Sql { phase } => {
            print!("{}", render_sql(&catalog, &config, phase)?);
            return Ok(());
        }
        Commands::CreateTables => {
            let client = sparkify::connect(&config.cluster).await?;
            SchemaManager::new(&client, catalog).reset().await?
        }
        Commands::Etl => {
            catalog.ensure_bulk_load()?;
            let client = sparkify::connect(&config.cluster).await?;
            LoadRunner::new(&client, &config).run().await?
        }
        Commands::Run => {
            catalog.ensure_bulk_load()?;
            let client = sparkify::connect(&config.cluster).await?;
            sparkify::run_pipeline(&client, &config).await?
        }
    };

    print_reports(&reports);
    Ok(())
}

/// Render the selected phases as a SQL script.
///
/// Without `--phase`, a dialect that cannot bulk-load gets a comment in place
/// of the copy statements. Asking for `--phase copy` on it is an error.
fn render_sql(
    catalog: &Catalog,
    config: &Config,
    only: Option<SqlPhase>,
) -> sparkify::Result<String> {
    let wanted = |phase: SqlPhase| only.is_none_or(|o| o == phase);
    let mut out = String::new();

    if wanted(SqlPhase::Drop) {
        push_statements(&mut out, &catalog.drop_tables());
    }
    if wanted(SqlPhase::Create) {
        push_statements(&mut out, &catalog.create_tables());
    }
    if wanted(SqlPhase::Copy) {
        match catalog.copy_staging(&config.s3, &config.iam_role) {
            Ok(copies) => push_statements(&mut out, &copies),
            Err(e @ sparkify::Error::UnsupportedDialect { .. }) if only.is_none() => {
                out.push_str(&format!("-- copy phase skipped: {e}\n\n"));
            }
            Err(e) => return Err(e),
        }
    }
    if wanted(SqlPhase::Insert) {
        push_statements(&mut out, &catalog.insert_tables());
    }

    Ok(out)
}

fn push_statements(out: &mut String, statements: &[Statement]) {
    for stmt in statements {
        out.push_str(&format!(
            "-- {} ({} {})\n{};\n\n",
            stmt.name, stmt.kind, stmt.table, stmt.sql
        ));
    }
}

fn print_reports(reports: &[PhaseReport]) {
    for report in reports {
        println!(
            "{} {} statement(s), {} row(s), {}ms",
            format!("{}:", report.phase).bold(),
            report.statements.len(),
            report.affected(),
            report.elapsed().as_millis()
        );
        for stmt in &report.statements {
            println!(
                "  {} {:<28} {:<16} {:>8} {:>6}ms",
                "✓".green(),
                stmt.name,
                stmt.table.dimmed(),
                stmt.affected,
                stmt.elapsed.as_millis()
            );
        }
    }
}
