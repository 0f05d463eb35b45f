use chrono::Utc;

use crate::db::connector::{Connector, SqliteConnector};
use crate::db::models::{DbUser, NewUser};
use crate::db::scope::ConnectionScope;
use crate::error::DeskError;

const SELECT_USER: &str = "SELECT id, username, password, role, created_at FROM users";

pub struct UserStore<C: Connector = SqliteConnector> {
    scope: ConnectionScope<C>,
}

impl<C: Connector> Clone for UserStore<C> {
    fn clone(&self) -> Self {
        Self::new(self.scope.clone())
    }
}

impl<C: Connector> UserStore<C> {
    pub fn new(scope: ConnectionScope<C>) -> Self {
        Self { scope }
    }

    /// Insert a user. `new.password` must already be a credential record. Returns the row id.
    pub async fn insert(&self, new: &NewUser) -> Result<i64, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query(
                "INSERT INTO users (username, password, role, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&new.username)
            .bind(&new.password)
            .bind(new.role)
            .bind(Utc::now())
            .execute(&mut *db)
            .await?;
            Ok::<_, DeskError>(done.last_insert_rowid())
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<DbUser>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let row = sqlx::query_as::<_, DbUser>(&format!("{SELECT_USER} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *db)
                .await?;
            Ok::<_, DeskError>(row)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<DbUser>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let row = sqlx::query_as::<_, DbUser>(&format!("{SELECT_USER} WHERE username = ?"))
                .bind(username)
                .fetch_optional(&mut *db)
                .await?;
            Ok::<_, DeskError>(row)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn find_all(&self) -> Result<Vec<DbUser>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let rows = sqlx::query_as::<_, DbUser>(&format!("{SELECT_USER} ORDER BY id"))
                .fetch_all(&mut *db)
                .await?;
            Ok::<_, DeskError>(rows)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    /// Replace the stored credential record. Fails with `NotFound` for an unknown id.
    pub async fn update_password(&self, id: i64, record: &str) -> Result<(), DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
                .bind(record)
                .bind(id)
                .execute(&mut *db)
                .await?;
            if done.rows_affected() == 0 {
                return Err(DeskError::NotFound { entity: "user", id });
            }
            Ok::<_, DeskError>(())
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    /// Returns whether a row was deleted.
    pub async fn delete(&self, id: i64) -> Result<bool, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(&mut *db)
                .await?;
            Ok::<_, DeskError>(done.rows_affected() > 0)
        }
        .await;
        self.scope.release(conn, outcome).await
    }
}
