//! Star-schema table definitions and DDL rendering.
//!
//! The warehouse holds seven tables:
//!
//! - `staging_events`, `staging_songs`: raw landing zones for the bulk loads
//! - `songplays`: the fact table, one row per NextSong event
//! - `users`, `songs`, `artists`, `time`: dimension tables
//!
//! No foreign keys are declared. Referential integrity between `songplays`
//! and the dimensions is only implied by the join that derives it.

use crate::sql::quote_ident;
use sparkify_config::Dialect;
use std::fmt;

/// Column types used by the warehouse schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// VARCHAR (Redshift defaults the length to 256)
    Varchar,
    /// INTEGER (4 bytes)
    Integer,
    /// BIGINT (8 bytes)
    BigInt,
    /// FLOAT (8 bytes floating point)
    Float,
    /// TIMESTAMP without time zone
    Timestamp,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Varchar => write!(f, "VARCHAR"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Float => write!(f, "FLOAT"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// A table column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: &'static str,
    /// Column type
    pub sql_type: SqlType,
    /// Whether the column allows NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether the warehouse generates values (surrogate key starting at 0)
    pub identity: bool,
}

impl Column {
    /// A nullable column with no constraints.
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
            primary_key: false,
            identity: false,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        let mut def = format!("    {} {}", self.name, self.sql_type);

        if self.identity {
            match dialect {
                Dialect::Redshift => def.push_str(" IDENTITY(0,1)"),
                Dialect::Postgres => {
                    def.push_str(" GENERATED BY DEFAULT AS IDENTITY (START WITH 0 MINVALUE 0)")
                }
            }
        }

        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            def.push_str(" NOT NULL");
        }

        def
    }
}

/// What a table is for in the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Staging,
    Fact,
    Dimension,
}

/// A warehouse table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: &'static str,
    pub role: TableRole,
    pub columns: Vec<Column>,
}

impl Table {
    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Generate `CREATE TABLE IF NOT EXISTS` for this table.
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_sql(dialect)).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            quote_ident(self.name),
            columns.join(",\n")
        )
    }

    /// Generate `DROP TABLE IF EXISTS` for this table.
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_ident(self.name))
    }
}

pub const STAGING_EVENTS: &str = "staging_events";
pub const STAGING_SONGS: &str = "staging_songs";
pub const SONGPLAYS: &str = "songplays";
pub const USERS: &str = "users";
pub const SONGS: &str = "songs";
pub const ARTISTS: &str = "artists";
pub const TIME: &str = "time";

/// The seven warehouse tables, in creation (and drop) order.
///
/// No foreign keys are declared, so creating `songplays` before the
/// dimensions it logically references cannot fail.
pub fn star_schema() -> Vec<Table> {
    use SqlType::*;

    vec![
        Table {
            name: STAGING_EVENTS,
            role: TableRole::Staging,
            columns: vec![
                Column::new("artist", Varchar),
                Column::new("auth", Varchar),
                Column::new("firstName", Varchar),
                Column::new("gender", Varchar),
                Column::new("itemInSession", Integer),
                Column::new("lastName", Varchar),
                Column::new("length", Float),
                Column::new("level", Varchar),
                Column::new("location", Varchar),
                Column::new("method", Varchar),
                Column::new("page", Varchar),
                Column::new("registration", BigInt),
                Column::new("sessionId", Integer),
                Column::new("song", Varchar),
                Column::new("status", Integer),
                Column::new("ts", Timestamp),
                Column::new("userAgent", Varchar),
                Column::new("userId", Integer),
            ],
        },
        Table {
            name: STAGING_SONGS,
            role: TableRole::Staging,
            columns: vec![
                Column::new("song_id", Varchar),
                Column::new("num_songs", Integer),
                Column::new("title", Varchar),
                Column::new("artist_name", Varchar),
                Column::new("artist_latitude", Float),
                Column::new("year", Integer),
                Column::new("duration", Float),
                Column::new("artist_id", Varchar),
                Column::new("artist_longitude", Float),
                Column::new("artist_location", Varchar),
            ],
        },
        Table {
            name: SONGPLAYS,
            role: TableRole::Fact,
            columns: vec![
                Column::new("songplay_id", Integer).identity().primary_key(),
                Column::new("start_time", Timestamp).not_null(),
                Column::new("user_id", Integer).not_null(),
                Column::new("level", Varchar),
                Column::new("song_id", Varchar).not_null(),
                Column::new("artist_id", Varchar).not_null(),
                Column::new("session_id", Integer),
                Column::new("location", Varchar),
                Column::new("user_agent", Varchar),
            ],
        },
        Table {
            name: USERS,
            role: TableRole::Dimension,
            columns: vec![
                Column::new("user_id", Integer).primary_key(),
                Column::new("first_name", Varchar),
                Column::new("last_name", Varchar),
                Column::new("gender", Varchar),
                Column::new("level", Varchar),
            ],
        },
        Table {
            name: SONGS,
            role: TableRole::Dimension,
            columns: vec![
                Column::new("song_id", Varchar).primary_key(),
                Column::new("title", Varchar),
                Column::new("artist_id", Varchar).not_null(),
                Column::new("year", Integer),
                Column::new("duration", Float),
            ],
        },
        Table {
            name: ARTISTS,
            role: TableRole::Dimension,
            columns: vec![
                Column::new("artist_id", Varchar).primary_key(),
                Column::new("name", Varchar),
                Column::new("location", Varchar),
                Column::new("latitude", Float),
                Column::new("longitude", Float),
            ],
        },
        Table {
            name: TIME,
            role: TableRole::Dimension,
            columns: vec![
                Column::new("start_time", Timestamp).primary_key(),
                Column::new("hour", Integer),
                Column::new("day", Integer),
                Column::new("week", Integer),
                Column::new("month", Integer),
                Column::new("year", Integer),
                Column::new("weekday", Integer),
            ],
        },
    ]
}
