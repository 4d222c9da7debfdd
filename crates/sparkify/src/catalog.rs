//! The ordered statement lists the pipeline executes.
//!
//! Every statement is a named record so a run can report (and a test can
//! assert) exactly which statement ran, against which table, and which one
//! failed.

use crate::copy::CopyStmt;
use crate::schema::{self, ARTISTS, SONGPLAYS, SONGS, STAGING_EVENTS, STAGING_SONGS, TIME, USERS};
use crate::sql::quote_ident;
use crate::{Error, Result};
use sparkify_config::{Dialect, IamRole, PipelineSettings, StorageConfig, UserLevelPolicy};
use std::fmt;

/// What a statement does to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Drop,
    Create,
    Copy,
    Insert,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Drop => write!(f, "drop"),
            StatementKind::Create => write!(f, "create"),
            StatementKind::Copy => write!(f, "copy"),
            StatementKind::Insert => write!(f, "insert"),
        }
    }
}

/// A single named SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Stable name, e.g. `songplay_table_insert`.
    pub name: String,
    /// Table the statement writes to.
    pub table: &'static str,
    pub kind: StatementKind,
    pub sql: String,
}

/// Name prefix for a table's statements: `staging_events` stays as is,
/// dimension and fact tables use their singular form.
fn statement_prefix(table: &str) -> &str {
    match table {
        SONGPLAYS => "songplay",
        USERS => "user",
        SONGS => "song",
        ARTISTS => "artist",
        other => other,
    }
}

fn named(table: &'static str, kind: StatementKind, sql: String) -> Statement {
    let prefix = statement_prefix(table);
    let name = match kind {
        StatementKind::Drop => format!("{prefix}_table_drop"),
        StatementKind::Create => format!("{prefix}_table_create"),
        StatementKind::Copy => format!("{prefix}_copy"),
        StatementKind::Insert => format!("{prefix}_table_insert"),
    };
    Statement {
        name,
        table,
        kind,
        sql,
    }
}

/// Builds the statement lists for one set of pipeline settings.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    settings: PipelineSettings,
}

impl Catalog {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn dialect(&self) -> Dialect {
        self.settings.dialect
    }

    /// `DROP TABLE IF EXISTS` for all seven tables.
    pub fn drop_tables(&self) -> Vec<Statement> {
        schema::star_schema()
            .iter()
            .map(|t| named(t.name, StatementKind::Drop, t.drop_sql()))
            .collect()
    }

    /// `CREATE TABLE IF NOT EXISTS` for all seven tables.
    pub fn create_tables(&self) -> Vec<Statement> {
        schema::star_schema()
            .iter()
            .map(|t| {
                named(
                    t.name,
                    StatementKind::Create,
                    t.create_sql(self.settings.dialect),
                )
            })
            .collect()
    }

    /// Fails unless the dialect can bulk-load from object storage.
    pub fn ensure_bulk_load(&self) -> Result<()> {
        if self.settings.dialect != Dialect::Redshift {
            return Err(Error::UnsupportedDialect {
                dialect: self.settings.dialect,
                operation: "bulk load from object storage",
            });
        }
        Ok(())
    }

    /// Bulk loads of the two staging tables from object storage.
    pub fn copy_staging(&self, storage: &StorageConfig, role: &IamRole) -> Result<Vec<Statement>> {
        self.ensure_bulk_load()?;

        let events = CopyStmt::new(STAGING_EVENTS, &storage.log_data)
            .iam_role(&role.arn)
            .region(&storage.region)
            .epoch_millis()
            .json_paths(&storage.log_jsonpath);

        let songs = CopyStmt::new(STAGING_SONGS, &storage.song_data)
            .iam_role(&role.arn)
            .region(&storage.region);

        Ok(vec![
            named(STAGING_EVENTS, StatementKind::Copy, events.to_string()),
            named(STAGING_SONGS, StatementKind::Copy, songs.to_string()),
        ])
    }

    /// The five transforms, in the only order that works: `time` reads
    /// from the already-populated `songplays`.
    pub fn insert_tables(&self) -> Vec<Statement> {
        vec![
            named(SONGPLAYS, StatementKind::Insert, songplay_insert()),
            named(
                USERS,
                StatementKind::Insert,
                user_insert(self.settings.user_level),
            ),
            named(SONGS, StatementKind::Insert, song_insert()),
            named(ARTISTS, StatementKind::Insert, artist_insert()),
            named(TIME, StatementKind::Insert, time_insert()),
        ]
    }
}

// Staging data is joined on title and artist name to recover song and
// artist ids; only NextSong events are plays.
fn songplay_insert() -> String {
    format!(
        "INSERT INTO {songplays} (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT DISTINCT CAST(e.ts AS TIMESTAMP) AS start_time,
       e.userId AS user_id,
       e.level AS level,
       s.song_id AS song_id,
       s.artist_id AS artist_id,
       e.sessionId AS session_id,
       e.location AS location,
       e.userAgent AS user_agent
FROM {events} e
JOIN {songs} s ON e.song = s.title AND e.artist = s.artist_name
WHERE e.page = 'NextSong'",
        songplays = quote_ident(SONGPLAYS),
        events = quote_ident(STAGING_EVENTS),
        songs = quote_ident(STAGING_SONGS),
    )
}

fn user_insert(policy: UserLevelPolicy) -> String {
    let users = quote_ident(USERS);
    let events = quote_ident(STAGING_EVENTS);
    match policy {
        UserLevelPolicy::Latest => format!(
            "INSERT INTO {users} (user_id, first_name, last_name, gender, level)
SELECT user_id, first_name, last_name, gender, level
FROM (
    SELECT userId AS user_id,
           firstName AS first_name,
           lastName AS last_name,
           gender AS gender,
           level AS level,
           ROW_NUMBER() OVER (PARTITION BY userId ORDER BY ts DESC) AS recency
    FROM {events}
    WHERE userId IS NOT NULL
    AND page = 'NextSong'
) latest
WHERE recency = 1"
        ),
        UserLevelPolicy::Distinct => format!(
            "INSERT INTO {users} (user_id, first_name, last_name, gender, level)
SELECT DISTINCT userId AS user_id,
       firstName AS first_name,
       lastName AS last_name,
       gender AS gender,
       level AS level
FROM {events}
WHERE userId IS NOT NULL
AND page = 'NextSong'"
        ),
    }
}

fn song_insert() -> String {
    format!(
        "INSERT INTO {} (song_id, title, artist_id, year, duration)
SELECT DISTINCT song_id, title, artist_id, year, duration
FROM {}
WHERE song_id IS NOT NULL",
        quote_ident(SONGS),
        quote_ident(STAGING_SONGS),
    )
}

fn artist_insert() -> String {
    format!(
        "INSERT INTO {} (artist_id, name, location, latitude, longitude)
SELECT DISTINCT artist_id AS artist_id,
       artist_name AS name,
       artist_location AS location,
       artist_latitude AS latitude,
       artist_longitude AS longitude
FROM {}
WHERE artist_id IS NOT NULL",
        quote_ident(ARTISTS),
        quote_ident(STAGING_SONGS),
    )
}

// `dow` counts from Sunday = 0 in both Redshift and Postgres.
fn time_insert() -> String {
    format!(
        "INSERT INTO {} (start_time, hour, day, week, month, year, weekday)
SELECT DISTINCT start_time,
       EXTRACT(hour FROM start_time),
       EXTRACT(day FROM start_time),
       EXTRACT(week FROM start_time),
       EXTRACT(month FROM start_time),
       EXTRACT(year FROM start_time),
       EXTRACT(dow FROM start_time)
FROM {}
WHERE start_time IS NOT NULL",
        quote_ident(TIME),
        quote_ident(SONGPLAYS),
    )
}
