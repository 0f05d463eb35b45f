//! Per-table record stores.
//!
//! Each operation acquires a connection from the [`ConnectionScope`](super::ConnectionScope)
//! exactly once and releases it before returning. Stores never open, commit or
//! roll back transactions themselves.

pub mod classes;
pub mod teachers;
pub mod users;

pub use classes::ClassStore;
pub use teachers::TeacherStore;
pub use users::UserStore;
