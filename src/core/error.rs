use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Entity '{0}' is not defined")]
    UnknownEntity(String),

    #[error("Entity '{0}' is already defined")]
    DuplicateEntity(String),

    #[error("Field '{0}' not found in entity '{1}'")]
    UnknownField(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("No row was found when one was required")]
    NoResultFound,

    #[error("Multiple rows were found when exactly one was required")]
    MultipleResultsFound,

    #[error("Detached record: {0}")]
    DetachedRecord(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<rmp_serde::encode::Error> for DbError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for DbError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tempfile::PersistError> for DbError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}
