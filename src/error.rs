use sqlx::Error as SqlxError;
use sqlx::error::ErrorKind;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DeskError {
    #[error("Database connectivity failure: {0}")]
    Connectivity(#[source] SqlxError),

    #[error("A transaction is already active for this thread of control")]
    TransactionAlreadyActive,

    #[error("No active transaction for this thread of control")]
    NoActiveTransaction,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(#[source] SqlxError),

    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Malformed credential record: {0}")]
    MalformedCredentialRecord(String),

    #[error("Connection was already released by its owning scope")]
    ConnectionReleased,

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<DeskError>,
    },

    #[error("Background hashing task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl DeskError {
    /// Strip any `Step` context and return the underlying failure.
    pub fn root(&self) -> &DeskError {
        match self {
            DeskError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the outermost failed step, if the error was raised inside a unit of work.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            DeskError::Step { step, .. } => Some(step),
            _ => None,
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.root(), DeskError::ConstraintViolation(_))
    }
}

impl From<SqlxError> for DeskError {
    fn from(e: SqlxError) -> Self {
        match e {
            SqlxError::Database(ref db_err) => match db_err.kind() {
                ErrorKind::Other => DeskError::Database(e),
                _ => DeskError::ConstraintViolation(e),
            },
            SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::Protocol(_)
            | SqlxError::Configuration(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed => DeskError::Connectivity(e),
            other => DeskError::Database(other),
        }
    }
}

impl From<figment::Error> for DeskError {
    fn from(e: figment::Error) -> Self {
        DeskError::Config(Box::new(e))
    }
}

/// Attach the name of a unit-of-work step to a failure.
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, DeskError>;
}

impl<T> StepContext<T> for Result<T, DeskError> {
    fn step(self, step: &'static str) -> Result<T, DeskError> {
        self.map_err(|source| DeskError::Step {
            step,
            source: Box::new(source),
        })
    }
}
