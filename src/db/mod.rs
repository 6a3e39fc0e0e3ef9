use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{Dataset, User};

pub mod datasets;
pub mod memory;
pub mod users;

pub use datasets::PgDatasetRepository;
pub use memory::{MemoryDatasetRepository, MemoryUserRepository};
pub use users::PgUserRepository;

/// Persistence for datasets.
///
/// Listing and search are always ordered newest first. `create` must reject a
/// dataset whose `doi` is already taken with
/// [`CatalogError::DuplicateIdentifier`](crate::error::CatalogError::DuplicateIdentifier).
#[async_trait]
pub trait DatasetRepository: Send + Sync + 'static {
    async fn create(&self, dataset: &Dataset) -> CatalogResult<()>;

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Dataset>>;

    async fn list_ordered(&self, offset: i64, limit: i64) -> CatalogResult<Vec<Dataset>>;

    /// Case-insensitive substring match on title OR author.
    async fn search(&self, query: &str, offset: i64, limit: i64) -> CatalogResult<Vec<Dataset>>;

    /// Number of datasets, or of search matches when `query` is given.
    async fn count(&self, query: Option<&str>) -> CatalogResult<i64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Fails with a registration error when the username or email is taken.
    async fn create(&self, user: &User) -> CatalogResult<()>;

    async fn get_by_username(&self, username: &str) -> CatalogResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> CatalogResult<Option<User>>;
}

pub async fn init_pool(database_url: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    let pool = Pool::<Postgres>::connect(database_url).await?;
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id UUID PRIMARY KEY,
        username VARCHAR(150) NOT NULL UNIQUE,
        email VARCHAR(254) NOT NULL UNIQUE,
        password TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS datasets (
        id UUID PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        author VARCHAR(100) NOT NULL,
        description TEXT NOT NULL,
        file_path TEXT NOT NULL,
        file_size BIGINT NOT NULL CHECK (file_size >= 0),
        file_type VARCHAR(10) NOT NULL,
        doi VARCHAR(100) NOT NULL UNIQUE,
        checksum CHAR(64) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        modified_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS datasets_created_at_idx ON datasets (created_at DESC)",
];

/// Creates the tables if they do not exist yet.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
