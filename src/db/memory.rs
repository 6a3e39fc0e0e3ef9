//! In-memory repositories.
//!
//! Used by `serve --in-memory` and by the test suite. Data lives as long as
//! the process.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DatasetRepository, UserRepository};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Dataset, User};

#[derive(Clone, Default)]
pub struct MemoryDatasetRepository {
    // Insertion order; used to break created_at ties.
    datasets: Arc<RwLock<Vec<Dataset>>>,
}

impl MemoryDatasetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ordered(&self, query: Option<&str>) -> Vec<Dataset> {
        let needle = query.map(str::to_lowercase);
        let datasets = self.datasets.read().await;
        let mut matched: Vec<(usize, &Dataset)> = datasets
            .iter()
            .enumerate()
            .filter(|(_, d)| match &needle {
                Some(n) => d.title.to_lowercase().contains(n) || d.author.to_lowercase().contains(n),
                None => true,
            })
            .collect();
        matched.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        matched.into_iter().map(|(_, d)| d.clone()).collect()
    }
}

fn window(items: Vec<Dataset>, offset: i64, limit: i64) -> Vec<Dataset> {
    let offset = offset.max(0) as usize;
    let limit = limit.max(0) as usize;
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl DatasetRepository for MemoryDatasetRepository {
    async fn create(&self, dataset: &Dataset) -> CatalogResult<()> {
        let mut datasets = self.datasets.write().await;
        if datasets.iter().any(|d| d.doi == dataset.doi) {
            return Err(CatalogError::DuplicateIdentifier(dataset.doi.clone()));
        }
        if datasets.iter().any(|d| d.id == dataset.id) {
            return Err(CatalogError::Internal(anyhow::anyhow!(
                "dataset {} already exists",
                dataset.id
            )));
        }
        datasets.push(dataset.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Dataset>> {
        let datasets = self.datasets.read().await;
        Ok(datasets.iter().find(|d| d.id == id).cloned())
    }

    async fn list_ordered(&self, offset: i64, limit: i64) -> CatalogResult<Vec<Dataset>> {
        Ok(window(self.ordered(None).await, offset, limit))
    }

    async fn search(&self, query: &str, offset: i64, limit: i64) -> CatalogResult<Vec<Dataset>> {
        Ok(window(self.ordered(Some(query)).await, offset, limit))
    }

    async fn count(&self, query: Option<&str>) -> CatalogResult<i64> {
        Ok(self.ordered(query).await.len() as i64)
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> CatalogResult<()> {
        let mut users = self.users.write().await;
        let taken = users.iter().any(|u| {
            u.username == user.username || u.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            return Err(CatalogError::Registration(
                "Username or email already in use.".to_string(),
            ));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> CatalogResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_by_email(&self, email: &str) -> CatalogResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }
}
