//! Department catalog implementations
//!
//! The in-memory catalog is the configuration source of record; the caching
//! decorator sits in front of any catalog to keep the routing hot path off
//! the backing store. Entries expire after a TTL and can be invalidated
//! eagerly when a tenant's configuration changes.

use crate::domain::department::{Department, DepartmentCatalog};
use crate::domain::shared::value_objects::TenantId;
use crate::domain::shared::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Configuration-backed catalog
///
/// Departments are returned sorted by `priority` ascending (stable), which
/// is the tie-break order the routing engine relies on.
#[derive(Default)]
pub struct InMemoryDepartmentCatalog {
    departments: RwLock<HashMap<TenantId, Vec<Department>>>,
}

impl InMemoryDepartmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, department: Department) {
        let mut departments = self.departments.write().await;
        let list = departments.entry(department.tenant_id).or_default();
        list.push(department);
        list.sort_by_key(|d| d.priority);
    }
}

#[async_trait]
impl DepartmentCatalog for InMemoryDepartmentCatalog {
    async fn get_departments(&self, tenant_id: TenantId) -> Result<Vec<Department>> {
        let departments = self.departments.read().await;
        Ok(departments.get(&tenant_id).cloned().unwrap_or_default())
    }
}

struct CachedCatalog {
    departments: Vec<Department>,
    fetched_at: DateTime<Utc>,
}

/// TTL cache in front of a department catalog
pub struct CachingDepartmentCatalog {
    inner: Arc<dyn DepartmentCatalog>,
    cache: RwLock<HashMap<TenantId, CachedCatalog>>,
    ttl: Duration,
}

impl CachingDepartmentCatalog {
    pub fn new(inner: Arc<dyn DepartmentCatalog>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Drop one tenant's cached catalog after a configuration change.
    pub async fn invalidate(&self, tenant_id: TenantId) {
        self.cache.write().await.remove(&tenant_id);
        debug!(tenant_id = %tenant_id, "Department catalog cache invalidated");
    }
}

#[async_trait]
impl DepartmentCatalog for CachingDepartmentCatalog {
    async fn get_departments(&self, tenant_id: TenantId) -> Result<Vec<Department>> {
        let now = Utc::now();
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&tenant_id) {
                let age = (now - cached.fetched_at).to_std().unwrap_or(Duration::ZERO);
                if age <= self.ttl {
                    return Ok(cached.departments.clone());
                }
            }
        }

        let departments = self.inner.get_departments(tenant_id).await?;
        let mut cache = self.cache.write().await;
        cache.insert(
            tenant_id,
            CachedCatalog {
                departments: departments.clone(),
                fetched_at: now,
            },
        );
        Ok(departments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Intent;
    use crate::domain::shared::value_objects::PhoneNumber;

    fn department(tenant_id: TenantId, name: &str, priority: u32) -> Department {
        Department::new(tenant_id, name, Intent::Support, PhoneNumber::new("+15550001"))
            .with_priority(priority)
    }

    #[tokio::test]
    async fn test_catalog_sorted_by_priority() {
        let catalog = InMemoryDepartmentCatalog::new();
        let tenant_id = TenantId::new();
        catalog.insert(department(tenant_id, "Second", 2)).await;
        catalog.insert(department(tenant_id, "First", 1)).await;

        let departments = catalog.get_departments(tenant_id).await.unwrap();
        let names: Vec<_> = departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_cache_serves_stale_until_invalidated() {
        let inner = Arc::new(InMemoryDepartmentCatalog::new());
        let tenant_id = TenantId::new();
        inner.insert(department(tenant_id, "Support", 1)).await;

        let caching = CachingDepartmentCatalog::new(inner.clone(), Duration::from_secs(300));
        assert_eq!(caching.get_departments(tenant_id).await.unwrap().len(), 1);

        // a write behind the cache is invisible until invalidation
        inner.insert(department(tenant_id, "Billing", 2)).await;
        assert_eq!(caching.get_departments(tenant_id).await.unwrap().len(), 1);

        caching.invalidate(tenant_id).await;
        assert_eq!(caching.get_departments(tenant_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tenant_yields_empty_catalog() {
        let catalog = InMemoryDepartmentCatalog::new();
        assert!(catalog
            .get_departments(TenantId::new())
            .await
            .unwrap()
            .is_empty());
    }
}
