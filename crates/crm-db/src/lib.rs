//! SQLite persistence for the CRM: contacts, message log, admin registry.
//!
//! All stores hang off a single cloneable [`CrmDb`] handle; no component
//! caches rows across calls, every read hits the pool.

mod admins;
mod contacts;
mod error;
mod messages;
mod models;
mod schema;

pub use error::DbError;
pub use models::{Admin, Contact, Direction, MediaType, Message};

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Clone)]
pub struct CrmDb {
    pool: Pool<Sqlite>,
}

impl CrmDb {
    /// Open (creating if necessary) the database file and apply the schema.
    pub async fn open(path: &str) -> Result<Self> {
        let url = format!("sqlite:{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().connect(&url).await?;
        sqlx::raw_sql(schema::SCHEMA).execute(&pool).await?;
        tracing::info!("database ready at {path}");
        Ok(Self { pool })
    }

    /// In-memory database for tests. A single connection keeps every query
    /// on the same memory instance.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(schema::SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

/// Wall-clock timestamp stored in the tables (unix seconds).
pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
