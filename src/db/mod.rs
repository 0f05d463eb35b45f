//! Database module: connection scoping, schema, models and record stores.
//!
//! Layout:
//! - `connector.rs`: raw SQLite connection primitive (`open(auto_commit)` / `close`)
//! - `control.rs`: thread-of-control identity used to key transaction bindings
//! - `scope.rs`: `ConnectionScope`, the per-thread-of-control transaction registry
//! - `unit_of_work.rs`: begin/commit/rollback driver for composite operations
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database
//! - `stores/`: per-table CRUD

pub mod connector;
pub mod control;
pub mod models;
pub mod schema;
pub mod scope;
pub mod stores;
pub mod unit_of_work;

pub use connector::{Connector, SqliteConnector};
pub use control::ControlId;
pub use models::{DbClass, DbTeacher, DbUser, NewClass, NewTeacher, NewUser, Role};
pub use schema::{SQLITE_INIT, init_schema};
pub use scope::{Connection, ConnectionScope, Lease};
pub use stores::{ClassStore, TeacherStore, UserStore};
