use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    /// Stored credential record; never expose outside the crate's services.
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct DbClass {
    pub id: i64,
    pub name: String,
    pub grade: i64,
}

#[derive(Debug, Clone)]
pub struct NewClass {
    pub name: String,
    pub grade: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct DbTeacher {
    pub id: i64,
    pub user_id: i64,
    pub class_id: i64,
    pub full_name: String,
    pub employee_no: String,
}

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub user_id: i64,
    pub class_id: i64,
    pub full_name: String,
    pub employee_no: String,
}
