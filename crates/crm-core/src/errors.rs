/// Core error type.
///
/// Validation and storage failures bubble to the caller; transport faults at
/// the importer/fan-out boundaries are absorbed there and never reach this
/// type (see `importer` and `fanout`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] crm_db::DbError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
