//! Warehouse connection seam and its traced wrapper.
//!
//! Statements go through the simple-query protocol: Redshift won't prepare
//! `COPY`, and nothing here takes parameters anyway.

use std::future::Future;
use std::pin::Pin;
use tokio_postgres::SimpleQueryMessage;
use tracing::Instrument;

/// Trait for connections that can run a statement to completion.
///
/// This is implemented for `tokio_postgres::Client`. Tests substitute a
/// recording fake.
pub trait Connection: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run one statement, returning the number of rows affected.
    ///
    /// The statement commits on its own; there is no surrounding transaction.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, Self::Error>> + Send + 'a>>;
}

impl Connection for tokio_postgres::Client {
    type Error = tokio_postgres::Error;

    fn execute<'a>(
        &'a self,
        sql: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, Self::Error>> + Send + 'a>> {
        Box::pin(async move {
            let messages = self.simple_query(sql).await?;
            Ok(messages
                .iter()
                .map(|m| match m {
                    SimpleQueryMessage::CommandComplete(n) => *n,
                    _ => 0,
                })
                .sum())
        })
    }
}

/// A wrapper around a connection that logs every statement via tracing.
///
/// # Example
///
/// ```ignore
/// use sparkify::ConnectionExt;
///
/// let affected = client.traced().execute("DROP TABLE IF EXISTS \"users\"").await?;
/// ```
pub struct TracedConn<'a, C: Connection> {
    conn: &'a C,
}

impl<'a, C: Connection> TracedConn<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Run a statement, returning the number of rows affected.
    pub async fn execute(&self, sql: &str) -> Result<u64, C::Error> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            affected = tracing::field::Empty,
        );
        let affected = self.conn.execute(sql).instrument(span.clone()).await?;
        span.record("affected", affected);
        Ok(affected)
    }
}

/// Extension trait to get a traced wrapper from a connection.
pub trait ConnectionExt: Connection + Sized {
    /// Wrap this connection in a `TracedConn` for statement logging.
    fn traced(&self) -> TracedConn<'_, Self> {
        TracedConn::new(self)
    }
}

impl<C: Connection> ConnectionExt for C {}
