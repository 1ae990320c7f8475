/// Storage-layer error. Callers in `crm-core` wrap this into their own
/// error taxonomy; nothing here is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("contact {0} not found")]
    ContactNotFound(i64),
}
