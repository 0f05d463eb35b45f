use crate::db::connector::{Connector, SqliteConnector};
use crate::db::models::{DbTeacher, NewTeacher};
use crate::db::scope::ConnectionScope;
use crate::error::DeskError;

const SELECT_TEACHER: &str = "SELECT id, user_id, class_id, full_name, employee_no FROM teachers";

pub struct TeacherStore<C: Connector = SqliteConnector> {
    scope: ConnectionScope<C>,
}

impl<C: Connector> Clone for TeacherStore<C> {
    fn clone(&self) -> Self {
        Self::new(self.scope.clone())
    }
}

impl<C: Connector> TeacherStore<C> {
    pub fn new(scope: ConnectionScope<C>) -> Self {
        Self { scope }
    }

    pub async fn insert(&self, new: &NewTeacher) -> Result<i64, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query(
                "INSERT INTO teachers (user_id, class_id, full_name, employee_no) VALUES (?, ?, ?, ?)",
            )
            .bind(new.user_id)
            .bind(new.class_id)
            .bind(&new.full_name)
            .bind(&new.employee_no)
            .execute(&mut *db)
            .await?;
            Ok::<_, DeskError>(done.last_insert_rowid())
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<DbTeacher>, DeskError> {
        self.find_one("id", id).await
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> Result<Option<DbTeacher>, DeskError> {
        self.find_one("user_id", user_id).await
    }

    pub async fn find_by_class(&self, class_id: i64) -> Result<Vec<DbTeacher>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let rows = sqlx::query_as::<_, DbTeacher>(&format!(
                "{SELECT_TEACHER} WHERE class_id = ? ORDER BY full_name"
            ))
            .bind(class_id)
            .fetch_all(&mut *db)
            .await?;
            Ok::<_, DeskError>(rows)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    pub async fn delete_by_user_id(&self, user_id: i64) -> Result<bool, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let done = sqlx::query("DELETE FROM teachers WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *db)
                .await?;
            Ok::<_, DeskError>(done.rows_affected() > 0)
        }
        .await;
        self.scope.release(conn, outcome).await
    }

    // `column` is always one of our own literals, never caller input.
    async fn find_one(&self, column: &'static str, value: i64) -> Result<Option<DbTeacher>, DeskError> {
        let mut conn = self.scope.acquire().await?;
        let outcome = async {
            let mut db = conn.lease().await?;
            let row = sqlx::query_as::<_, DbTeacher>(&format!("{SELECT_TEACHER} WHERE {column} = ?"))
                .bind(value)
                .fetch_optional(&mut *db)
                .await?;
            Ok::<_, DeskError>(row)
        }
        .await;
        self.scope.release(conn, outcome).await
    }
}
