//! Thread-of-control bound transactions.
//!
//! [`ConnectionScope`] answers "which connection backs the next statement":
//! the transactional connection bound to the caller's thread of control if one
//! exists, otherwise a fresh auto-commit connection. Stores only ever call
//! [`ConnectionScope::acquire`] / [`ConnectionScope::release`]; transaction
//! boundaries belong to composite operations.

use parking_lot::Mutex;
use sqlx::sqlite::SqliteConnection;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, warn};

use super::connector::{Connector, SqliteConnector};
use super::control::ControlId;
use crate::error::DeskError;

/// A bound transactional connection. The slot is emptied exactly once, when
/// the owning unit of work commits or rolls back.
type SharedSlot = Arc<AsyncMutex<Option<SqliteConnection>>>;

/// Handle returned by [`ConnectionScope::acquire`].
pub struct Connection {
    kind: ConnectionKind,
}

enum ConnectionKind {
    Bound(SharedSlot),
    Autonomous(SqliteConnection),
}

impl Connection {
    /// Borrow the underlying connection for one or more statements.
    pub async fn lease(&mut self) -> Result<Lease<'_>, DeskError> {
        match &mut self.kind {
            ConnectionKind::Bound(slot) => {
                let guard = slot.lock().await;
                MutexGuard::try_map(guard, Option::as_mut)
                    .map(Lease::Bound)
                    .map_err(|_| DeskError::ConnectionReleased)
            }
            ConnectionKind::Autonomous(conn) => Ok(Lease::Autonomous(conn)),
        }
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self.kind, ConnectionKind::Bound(_))
    }

    /// Identity comparison: true when both handles refer to the same physical connection.
    pub fn same_as(&self, other: &Connection) -> bool {
        match (&self.kind, &other.kind) {
            (ConnectionKind::Bound(a), ConnectionKind::Bound(b)) => Arc::ptr_eq(a, b),
            (ConnectionKind::Autonomous(a), ConnectionKind::Autonomous(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

pub enum Lease<'a> {
    Bound(MappedMutexGuard<'a, SqliteConnection>),
    Autonomous(&'a mut SqliteConnection),
}

impl Deref for Lease<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            Lease::Bound(guard) => &**guard,
            Lease::Autonomous(conn) => &**conn,
        }
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            Lease::Bound(guard) => &mut **guard,
            Lease::Autonomous(conn) => &mut **conn,
        }
    }
}

struct ScopeInner<C> {
    connector: C,
    bindings: Mutex<HashMap<ControlId, SharedSlot>>,
}

/// Process-wide registry of transactional connections, one per thread of control.
///
/// Cheap to clone; clones share the same bindings.
pub struct ConnectionScope<C: Connector = SqliteConnector> {
    inner: Arc<ScopeInner<C>>,
}

impl<C: Connector> Clone for ConnectionScope<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> ConnectionScope<C> {
    pub fn new(connector: C) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                connector,
                bindings: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// The connection to use right now.
    ///
    /// Inside a unit of work this is the bound connection (shared, never
    /// re-opened); otherwise a new auto-commit connection that the caller must
    /// hand back through [`release`](Self::release).
    pub async fn acquire(&self) -> Result<Connection, DeskError> {
        if let Some(slot) = self.bound() {
            return Ok(Connection {
                kind: ConnectionKind::Bound(slot),
            });
        }
        let conn = self.inner.connector.open(true).await?;
        Ok(Connection {
            kind: ConnectionKind::Autonomous(conn),
        })
    }

    /// Give back a connection from [`acquire`](Self::acquire) and pass `outcome` through.
    ///
    /// Autonomous connections are closed; bound ones stay open for the rest of
    /// the unit of work. A close failure is only reported when `outcome` succeeded.
    pub async fn release<T>(
        &self,
        conn: Connection,
        outcome: Result<T, DeskError>,
    ) -> Result<T, DeskError> {
        let closed = match conn.kind {
            ConnectionKind::Bound(_) => Ok(()),
            ConnectionKind::Autonomous(conn) => self.inner.connector.close(conn).await,
        };
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "closing autonomous connection failed");
                }
                Err(e)
            }
        }
    }

    /// Open a transactional connection and bind it to the caller's thread of control.
    pub async fn begin(&self) -> Result<(), DeskError> {
        let id = ControlId::current();
        if self.inner.bindings.lock().contains_key(&id) {
            return Err(DeskError::TransactionAlreadyActive);
        }

        let conn = self.inner.connector.open(false).await?;
        self.inner
            .bindings
            .lock()
            .insert(id, Arc::new(AsyncMutex::new(Some(conn))));
        debug!(control = ?id, "transaction bound");
        Ok(())
    }

    /// Commit and unbind. The connection is closed whether or not COMMIT succeeds.
    pub async fn commit(&self) -> Result<(), DeskError> {
        let id = ControlId::current();
        let slot = self.unbind(id).ok_or(DeskError::NoActiveTransaction)?;
        let Some(mut conn) = slot.lock().await.take() else {
            return Err(DeskError::ConnectionReleased);
        };

        let committed = sqlx::query("COMMIT").execute(&mut conn).await;
        let closed = self.inner.connector.close(conn).await;
        debug!(control = ?id, ok = committed.is_ok(), "transaction committed");

        committed?;
        closed
    }

    /// Roll back and unbind; a no-op without an active transaction.
    ///
    /// Failures are logged and never returned: rollback usually runs while
    /// another error is already propagating.
    pub async fn rollback(&self) {
        let id = ControlId::current();
        let Some(slot) = self.unbind(id) else {
            debug!(control = ?id, "rollback without active transaction; ignoring");
            return;
        };
        let Some(mut conn) = slot.lock().await.take() else {
            return;
        };

        if let Err(e) = sqlx::query("ROLLBACK").execute(&mut conn).await {
            warn!(control = ?id, error = %e, "rollback failed");
        }
        if let Err(e) = self.inner.connector.close(conn).await {
            warn!(control = ?id, error = %e, "closing rolled back connection failed");
        }
        debug!(control = ?id, "transaction rolled back");
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .bindings
            .lock()
            .contains_key(&ControlId::current())
    }

    /// Number of threads of control currently holding a transaction.
    pub fn active_count(&self) -> usize {
        self.inner.bindings.lock().len()
    }

    fn bound(&self) -> Option<SharedSlot> {
        self.inner
            .bindings
            .lock()
            .get(&ControlId::current())
            .cloned()
    }

    fn unbind(&self, id: ControlId) -> Option<SharedSlot> {
        self.inner.bindings.lock().remove(&id)
    }

    /// Drops whatever is still bound to `id` when the guard goes out of scope.
    pub(crate) fn abandon_on_drop(&self, id: ControlId) -> AbandonGuard<'_> {
        AbandonGuard {
            bindings: &self.inner.bindings,
            id,
        }
    }
}

/// Unbinds a unit of work whose future was dropped between begin and
/// commit/rollback. Dropping the last handle closes the connection, and SQLite
/// rolls back the open transaction on close.
pub(crate) struct AbandonGuard<'a> {
    bindings: &'a Mutex<HashMap<ControlId, SharedSlot>>,
    id: ControlId,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.bindings.lock().remove(&self.id).is_some() {
            warn!(control = ?self.id, "unit of work dropped mid-flight; abandoning its transaction");
        }
    }
}
