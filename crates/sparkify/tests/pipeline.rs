//! Runner behaviour against a recording connection.
//!
//! These tests check ordering and fail-fast semantics without a warehouse.

use sparkify::config::{
    ClusterConfig, Config, Dialect, IamRole, PipelineSettings, StorageConfig,
};
use sparkify::{
    Catalog, Connection, Error, LoadRunner, Phase, SchemaManager, StatementKind, run_pipeline,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

#[derive(Debug)]
struct FakeError(String);

impl std::fmt::Display for FakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeError {}

/// Records every statement and fails the one containing `fail_on`.
#[derive(Default)]
struct RecordingConn {
    executed: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl RecordingConn {
    fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_on: Some(needle),
            ..Default::default()
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Connection for RecordingConn {
    type Error = FakeError;

    fn execute<'a>(
        &'a self,
        sql: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, Self::Error>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(needle) = self.fail_on {
                if sql.contains(needle) {
                    return Err(FakeError(format!("relation error near {needle}")));
                }
            }
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(if sql.starts_with("INSERT") { 3 } else { 0 })
        })
    }
}

fn config() -> Config {
    Config {
        cluster: ClusterConfig {
            host: "localhost".to_string(),
            db_name: "dwh".to_string(),
            db_user: "dwhuser".to_string(),
            db_password: "secret".to_string(),
            db_port: 5439,
        },
        iam_role: IamRole {
            arn: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
        },
        s3: StorageConfig {
            log_data: "s3://udacity-dend/log_data".to_string(),
            log_jsonpath: "s3://udacity-dend/log_json_path.json".to_string(),
            song_data: "s3://udacity-dend/song_data".to_string(),
            region: "us-west-2".to_string(),
        },
        pipeline: PipelineSettings::default(),
    }
}

#[tokio::test]
async fn test_reset_drops_then_creates() {
    let conn = RecordingConn::default();
    let reports = SchemaManager::new(&conn, Catalog::new(PipelineSettings::default()))
        .reset()
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].phase, Phase::DropTables);
    assert_eq!(reports[1].phase, Phase::CreateTables);

    let executed = conn.executed();
    assert_eq!(executed.len(), 14);
    assert!(executed[..7].iter().all(|s| s.starts_with("DROP TABLE IF EXISTS")));
    assert!(executed[7..].iter().all(|s| s.starts_with("CREATE TABLE IF NOT EXISTS")));
}

#[tokio::test]
async fn test_reset_twice_issues_identical_statements() {
    let conn = RecordingConn::default();
    let manager = SchemaManager::new(&conn, Catalog::new(PipelineSettings::default()));

    manager.reset().await.unwrap();
    let first = conn.executed();
    manager.reset().await.unwrap();
    let all = conn.executed();

    assert_eq!(all.len(), first.len() * 2);
    assert_eq!(&all[first.len()..], first.as_slice());
}

#[tokio::test]
async fn test_create_failure_stops_sequence() {
    // The fourth CREATE (users) fails: three creates stay applied, three never run.
    let conn = RecordingConn::failing_on("CREATE TABLE IF NOT EXISTS \"users\"");
    let manager = SchemaManager::new(&conn, Catalog::new(PipelineSettings::default()));

    let err = manager.reset().await.unwrap_err();
    match err {
        Error::Statement {
            phase,
            name,
            table,
            completed,
            ..
        } => {
            assert_eq!(phase, Phase::CreateTables);
            assert_eq!(name, "user_table_create");
            assert_eq!(table, "users");
            assert_eq!(completed, 3);
        }
        other => panic!("unexpected error: {other}"),
    }

    let executed = conn.executed();
    assert_eq!(executed.len(), 7 + 3);
    assert!(!executed.iter().any(|s| s.contains("\"time\" (")));
}

#[tokio::test]
async fn test_load_runner_order() {
    let conn = RecordingConn::default();
    let config = config();
    let reports = LoadRunner::new(&conn, &config).run().await.unwrap();

    assert_eq!(reports[0].phase, Phase::LoadStaging);
    assert_eq!(reports[1].phase, Phase::InsertTables);

    let names: Vec<_> = reports
        .iter()
        .flat_map(|r| r.statements.iter().map(|s| s.name.as_str()))
        .collect();
    assert_eq!(
        names,
        [
            "staging_events_copy",
            "staging_songs_copy",
            "songplay_table_insert",
            "user_table_insert",
            "song_table_insert",
            "artist_table_insert",
            "time_table_insert",
        ]
    );

    assert!(reports[0].statements.iter().all(|s| s.kind == StatementKind::Copy));
    assert_eq!(reports[1].affected(), 15);
}

#[tokio::test]
async fn test_transform_failure_leaves_earlier_tables() {
    let conn = RecordingConn::failing_on("INSERT INTO \"songs\"");
    let config = config();
    let runner = LoadRunner::new(&conn, &config);

    let err = runner.insert_tables().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Statement {
            phase: Phase::InsertTables,
            completed: 2,
            ..
        }
    ));
    assert!(err.to_string().contains("song_table_insert"));

    let executed = conn.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[0].starts_with("INSERT INTO \"songplays\""));
    assert!(executed[1].starts_with("INSERT INTO \"users\""));
}

#[tokio::test]
async fn test_postgres_dialect_refuses_bulk_load_before_executing() {
    let conn = RecordingConn::default();
    let mut config = config();
    config.pipeline.dialect = Dialect::Postgres;

    let err = LoadRunner::new(&conn, &config).run().await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedDialect { .. }));
    assert!(conn.executed().is_empty());
}

#[tokio::test]
async fn test_full_pipeline() {
    let conn = RecordingConn::default();
    let reports = run_pipeline(&conn, &config()).await.unwrap();

    let phases: Vec<_> = reports.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        [
            Phase::DropTables,
            Phase::CreateTables,
            Phase::LoadStaging,
            Phase::InsertTables
        ]
    );
    assert_eq!(conn.executed().len(), 7 + 7 + 2 + 5);
}

#[tokio::test]
async fn test_full_pipeline_on_postgres_leaves_tables_untouched() {
    let conn = RecordingConn::default();
    let mut config = config();
    config.pipeline.dialect = Dialect::Postgres;

    let err = run_pipeline(&conn, &config).await.unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedDialect {
            dialect: Dialect::Postgres,
            ..
        }
    ));
    assert!(conn.executed().is_empty());
}

#[tokio::test]
async fn test_drop_failure_stops_before_create() {
    let conn = RecordingConn::failing_on("DROP TABLE IF EXISTS \"songs\"");
    let manager = SchemaManager::new(&conn, Catalog::new(PipelineSettings::default()));

    let err = manager.reset().await.unwrap_err();
    match err {
        Error::Statement {
            phase,
            name,
            table,
            completed,
            ..
        } => {
            assert_eq!(phase, Phase::DropTables);
            assert_eq!(name, "song_table_drop");
            assert_eq!(table, "songs");
            assert_eq!(completed, 4);
        }
        other => panic!("unexpected error: {other}"),
    }

    let executed = conn.executed();
    assert_eq!(executed.len(), 4);
    assert!(executed.iter().all(|s| s.starts_with("DROP TABLE IF EXISTS")));
}

#[tokio::test]
async fn test_failed_reset_never_starts_load() {
    let conn = RecordingConn::failing_on("CREATE TABLE IF NOT EXISTS \"artists\"");

    let err = run_pipeline(&conn, &config()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Statement {
            phase: Phase::CreateTables,
            completed: 5,
            ..
        }
    ));

    let executed = conn.executed();
    assert_eq!(executed.len(), 7 + 5);
    assert!(!executed.iter().any(|s| s.starts_with("COPY") || s.starts_with("INSERT")));
}
