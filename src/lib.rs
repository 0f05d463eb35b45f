pub mod config;
pub mod credential;
pub mod db;
pub mod error;
pub mod service;

pub use credential::{CredentialHasher, CredentialRecord};
pub use db::{ConnectionScope, SqliteConnector};
pub use error::{DeskError, StepContext};
pub use service::AccountService;
