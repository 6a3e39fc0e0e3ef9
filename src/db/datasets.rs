use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, DatasetRepository};
use crate::error::{CatalogError, CatalogResult};
use crate::models::Dataset;

const COLUMNS: &str = "id, title, author, description, file_path, file_size, file_type, doi, \
                       checksum, created_at, modified_at";

#[derive(Clone)]
pub struct PgDatasetRepository {
    pool: Pool<Postgres>,
}

impl PgDatasetRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Wraps a search term for `ILIKE`, escaping the pattern metacharacters.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl DatasetRepository for PgDatasetRepository {
    async fn create(&self, dataset: &Dataset) -> CatalogResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO datasets (id, title, author, description, file_path, file_size,
                                  file_type, doi, checksum, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(dataset.id)
        .bind(&dataset.title)
        .bind(&dataset.author)
        .bind(&dataset.description)
        .bind(&dataset.file_path)
        .bind(dataset.file_size)
        .bind(&dataset.file_type)
        .bind(&dataset.doi)
        .bind(&dataset.checksum)
        .bind(dataset.created_at)
        .bind(dataset.modified_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(CatalogError::DuplicateIdentifier(dataset.doi.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Dataset>> {
        let sql = format!("SELECT {COLUMNS} FROM datasets WHERE id = $1");
        let res = sqlx::query_as::<_, Dataset>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(res)
    }

    async fn list_ordered(&self, offset: i64, limit: i64) -> CatalogResult<Vec<Dataset>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM datasets ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        );
        let records = sqlx::query_as::<_, Dataset>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn search(&self, query: &str, offset: i64, limit: i64) -> CatalogResult<Vec<Dataset>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM datasets \
             WHERE title ILIKE $1 OR author ILIKE $1 \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        );
        let records = sqlx::query_as::<_, Dataset>(&sql)
            .bind(like_pattern(query))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn count(&self, query: Option<&str>) -> CatalogResult<i64> {
        let count: i64 = match query {
            Some(q) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM datasets WHERE title ILIKE $1 OR author ILIKE $1")
                    .bind(like_pattern(q))
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM datasets")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}
