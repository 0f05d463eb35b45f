#![allow(dead_code)]

use schooldesk::db::{Connector, SqliteConnector, init_schema};
use schooldesk::{ConnectionScope, DeskError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Wraps the SQLite connector and counts physical opens and closes.
#[derive(Clone)]
pub struct CountingConnector {
    inner: SqliteConnector,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl CountingConnector {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connector for CountingConnector {
    async fn open(&self, auto_commit: bool) -> Result<SqliteConnection, DeskError> {
        let conn = self.inner.open(auto_commit).await?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(conn)
    }

    async fn close(&self, conn: SqliteConnection) -> Result<(), DeskError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close(conn).await
    }
}

/// A scratch database with the schema applied. Keep the `TempDir` alive for the test's duration.
pub struct TestDb {
    pub dir: TempDir,
    pub scope: ConnectionScope<CountingConnector>,
}

impl TestDb {
    pub fn connector(&self) -> &CountingConnector {
        self.scope.connector()
    }

    /// A connection outside of any scope, for checking what other sessions can see.
    pub async fn fresh_connection(&self) -> SqliteConnection {
        SqliteConnector::new(options(&self.dir))
            .open(true)
            .await
            .expect("open fresh connection")
    }
}

fn options(dir: &TempDir) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(dir.path().join("schooldesk.sqlite"))
        .create_if_missing(true)
}

/// Deferred BEGIN so concurrent transactions in one test don't queue on the write lock.
pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let connector = CountingConnector {
        inner: SqliteConnector::new(options(&dir)).begin_immediate(false),
        opened: Arc::new(AtomicUsize::new(0)),
        closed: Arc::new(AtomicUsize::new(0)),
    };
    let scope = ConnectionScope::new(connector);
    init_schema(&scope).await.expect("init schema");
    TestDb { dir, scope }
}

pub async fn count_rows(conn: &mut SqliteConnection, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(conn)
        .await
        .expect("count rows");
    n
}
