use crate::db::connector::{Connector, SqliteConnector};
use crate::db::models::{DbClass, NewClass};
use crate::db::scope::ConnectionScope;
use crate::error::DeskError;

pub struct ClassStore<C: Connector = SqliteConnector> {
    scope: ConnectionScope<C>,
}

impl<C: Connector> Clone for ClassStore<C> {
    fn clone(&self) -> Self {
        Self::new(self.scope.clone())
    }
}

impl<C: Connector> ClassStore<C> {
    pub fn new(scope: ConnectionScope<C>) -> Self {
        Self { scope }
    }

    pub async fn insert(&self, new: &NewClass) -> Result<i64, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query("INSERT INTO classes (name, grade) VALUES (?, ?)")
                .bind(&new.name)
                .bind(new.grade)
                .execute(&mut *db)
                .await?;
            Ok::<_, DeskError>(done.last_insert_rowid())
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<DbClass>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let row = sqlx::query_as::<_, DbClass>("SELECT id, name, grade FROM classes WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *db)
                .await?;
            Ok::<_, DeskError>(row)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn exists(&self, id: i64) -> Result<bool, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM classes WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *db)
                .await?;
            Ok::<_, DeskError>(found.is_some())
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn find_all(&self) -> Result<Vec<DbClass>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let rows = sqlx::query_as::<_, DbClass>(
                "SELECT id, name, grade FROM classes ORDER BY grade, name",
            )
            .fetch_all(&mut *db)
            .await?;
            Ok::<_, DeskError>(rows)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    /// Update name and grade by id.
    pub async fn update(&self, class: &DbClass) -> Result<(), DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query("UPDATE classes SET name = ?, grade = ? WHERE id = ?")
                .bind(&class.name)
                .bind(class.grade)
                .bind(class.id)
                .execute(&mut *db)
                .await?;
            if done.rows_affected() == 0 {
                return Err(DeskError::NotFound {
                    entity: "class",
                    id: class.id,
                });
            }
            Ok::<_, DeskError>(())
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query("DELETE FROM classes WHERE id = ?")
                .bind(id)
                .execute(&mut *db)
                .await?;
            Ok::<_, DeskError>(done.rows_affected() > 0)
        }
        .await;
        self.scope.release(conn, outcome).await
    }
}
