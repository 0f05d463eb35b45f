use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection as _};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::DeskError;

/// Raw connection primitive underneath [`ConnectionScope`](super::ConnectionScope).
///
/// `open(false)` must hand back a connection with an open transaction, so every
/// statement until COMMIT/ROLLBACK belongs to one unit of work.
pub trait Connector: Send + Sync + 'static {
    fn open(
        &self,
        auto_commit: bool,
    ) -> impl Future<Output = Result<SqliteConnection, DeskError>> + Send;

    fn close(&self, conn: SqliteConnection) -> impl Future<Output = Result<(), DeskError>> + Send;
}

#[derive(Debug, Clone)]
pub struct SqliteConnector {
    options: SqliteConnectOptions,
    begin_immediate: bool,
}

impl SqliteConnector {
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self {
            options: options.foreign_keys(true),
            begin_immediate: true,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, DeskError> {
        let options = SqliteConnectOptions::from_str(&cfg.database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(cfg.busy_timeout_secs));
        Ok(Self::new(options).begin_immediate(cfg.begin_immediate))
    }

    /// Take the write lock at BEGIN rather than at the first write.
    pub fn begin_immediate(mut self, enabled: bool) -> Self {
        self.begin_immediate = enabled;
        self
    }

    fn begin_statement(&self) -> &'static str {
        if self.begin_immediate {
            "BEGIN IMMEDIATE"
        } else {
            "BEGIN"
        }
    }
}

impl Connector for SqliteConnector {
    async fn open(&self, auto_commit: bool) -> Result<SqliteConnection, DeskError> {
        let mut conn = self.options.connect().await.map_err(DeskError::Connectivity)?;
        if !auto_commit {
            let stmt = self.begin_statement();
            if let Err(e) = sqlx::query(stmt).execute(&mut conn).await {
                let _ = conn.close().await;
                return Err(e.into());
            }
            debug!(statement = stmt, "opened transactional connection");
        }
        Ok(conn)
    }

    async fn close(&self, conn: SqliteConnection) -> Result<(), DeskError> {
        conn.close().await.map_err(DeskError::Connectivity)
    }
}
