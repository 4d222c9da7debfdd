//! Opening the single warehouse connection.

use crate::{Error, Result};
use sparkify_config::ClusterConfig;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

/// Connect to the warehouse and spawn the connection driver.
///
/// Must be called from within a tokio runtime.
pub async fn connect(cluster: &ClusterConfig) -> Result<Client> {
    let target = cluster.display_target();
    info!(%target, "connecting to warehouse");

    let mut pg = tokio_postgres::Config::new();
    pg.host(&cluster.host)
        .dbname(&cluster.db_name)
        .user(&cluster.db_user)
        .password(&cluster.db_password)
        .port(cluster.db_port);

    let (client, connection) = pg
        .connect(NoTls)
        .await
        .map_err(|source| Error::Connect { target, source })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!(error = %e, "warehouse connection error");
        }
    });

    Ok(client)
}
