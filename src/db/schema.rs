//! SQL DDL for the school records database.

use super::connector::Connector;
use super::scope::ConnectionScope;
use crate::error::DeskError;

/// SQLite schema with:
/// - `users.password` holding a credential record (`iterations:salt:key`) or a legacy plaintext value
/// - `teachers.user_id` unique, so one account maps to at most one teacher profile
/// - `teachers.employee_no` unique across all teachers
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE TABLE IF NOT EXISTS classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    grade INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS teachers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
    class_id INTEGER NOT NULL REFERENCES classes(id),
    full_name TEXT NOT NULL,
    employee_no TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_teachers_class_id ON teachers(class_id);
"#;

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema<C: Connector>(scope: &ConnectionScope<C>) -> Result<(), DeskError> {
    let mut conn = scope.acquire().await?;
    let outcome = async {
        let mut db = conn.lease().await?;
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&mut *db).await?;
        }
        Ok::<_, DeskError>(())
    }
    .await;
    scope.release(conn, outcome).await
}
