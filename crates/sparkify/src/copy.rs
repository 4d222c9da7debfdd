//! Redshift `COPY` rendering for the staging loads.
//!
//! Malformed input is the warehouse's problem: `TRUNCATECOLUMNS
//! BLANKSASNULL EMPTYASNULL` coerces bad values instead of rejecting rows.

use crate::sql::{Lit, quote_ident};
use std::fmt;

/// How JSON fields map onto staging columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
    /// Match JSON keys to column names.
    Auto,
    /// Use an explicit JSONPaths manifest at this location.
    Paths(String),
}

/// A bulk load of JSON files from object storage into one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyStmt {
    pub table: String,
    pub source: String,
    pub iam_role: String,
    pub region: String,
    pub format: JsonFormat,
    /// Parse `TIMESTAMP` columns from epoch milliseconds.
    pub epoch_millis: bool,
}

impl CopyStmt {
    pub fn new(table: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            source: source.into(),
            iam_role: String::new(),
            region: String::new(),
            format: JsonFormat::Auto,
            epoch_millis: false,
        }
    }

    pub fn iam_role(mut self, arn: impl Into<String>) -> Self {
        self.iam_role = arn.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn json_paths(mut self, manifest: impl Into<String>) -> Self {
        self.format = JsonFormat::Paths(manifest.into());
        self
    }

    pub fn epoch_millis(mut self) -> Self {
        self.epoch_millis = true;
        self
    }
}

impl fmt::Display for CopyStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "COPY {} FROM {}", quote_ident(&self.table), Lit(&self.source))?;
        writeln!(f, "CREDENTIALS {}", Lit(format!("aws_iam_role={}", self.iam_role)))?;
        writeln!(f, "COMPUPDATE OFF REGION {}", Lit(&self.region))?;
        if self.epoch_millis {
            writeln!(f, "TIMEFORMAT AS 'epochmillisecs'")?;
        }
        writeln!(f, "TRUNCATECOLUMNS BLANKSASNULL EMPTYASNULL")?;
        match &self.format {
            JsonFormat::Auto => write!(f, "FORMAT AS JSON 'auto'"),
            JsonFormat::Paths(manifest) => write!(f, "FORMAT AS JSON {}", Lit(manifest)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_copy() {
        let stmt = CopyStmt::new("staging_events", "s3://udacity-dend/log_data")
            .iam_role("arn:aws:iam::123456789012:role/dwhRole")
            .region("us-west-2")
            .json_paths("s3://udacity-dend/log_json_path.json")
            .epoch_millis();

        insta::assert_snapshot!(stmt.to_string(), @r#"
        COPY "staging_events" FROM 's3://udacity-dend/log_data'
        CREDENTIALS 'aws_iam_role=arn:aws:iam::123456789012:role/dwhRole'
        COMPUPDATE OFF REGION 'us-west-2'
        TIMEFORMAT AS 'epochmillisecs'
        TRUNCATECOLUMNS BLANKSASNULL EMPTYASNULL
        FORMAT AS JSON 's3://udacity-dend/log_json_path.json'
        "#);
    }

    #[test]
    fn test_songs_copy_uses_auto() {
        let sql = CopyStmt::new("staging_songs", "s3://udacity-dend/song_data")
            .iam_role("arn:aws:iam::1:role/r")
            .region("us-west-2")
            .to_string();

        assert!(sql.ends_with("FORMAT AS JSON 'auto'"));
        assert!(!sql.contains("TIMEFORMAT"));
    }

    #[test]
    fn test_quotes_in_locations_are_escaped() {
        let sql = CopyStmt::new("staging_songs", "s3://bucket/it's")
            .iam_role("arn:aws:iam::1:role/o'brien")
            .region("us-west-2")
            .to_string();

        assert!(sql.contains("FROM 's3://bucket/it''s'"));
        assert!(sql.contains("'aws_iam_role=arn:aws:iam::1:role/o''brien'"));
    }
}
