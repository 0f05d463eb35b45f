pub mod accounts;

pub use accounts::{AccountService, NewTeacherAccount, TeacherAccount};
