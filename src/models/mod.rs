use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod dataset;

pub use dataset::{Dataset, FileType};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the plain password.
    pub password: String,
    pub created_at: DateTime<Utc>,
}
