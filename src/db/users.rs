use async_trait::async_trait;
use sqlx::PgPool;

use super::{is_unique_violation, UserRepository};
use crate::error::{CatalogError, CatalogResult};
use crate::models::User;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> CatalogResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, password, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(CatalogError::Registration(
                "Username or email already in use.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_username(&self, username: &str) -> CatalogResult<Option<User>> {
        let res = sqlx::query_as::<_, User>(
            r#"SELECT user_id, username, email, password, created_at
               FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(res)
    }

    async fn get_by_email(&self, email: &str) -> CatalogResult<Option<User>> {
        let res = sqlx::query_as::<_, User>(
            r#"SELECT user_id, username, email, password, created_at
               FROM users WHERE lower(email) = lower($1)"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(res)
    }
}
