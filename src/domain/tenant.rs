//! Multi-tenancy support for isolating customer organizations
//!
//! A tenant owns a pool of inbound numbers, a department catalog, and the
//! escalation configuration applied to its calls. Provisioning and billing
//! live outside this crate; the engine only resolves tenants from dialed
//! numbers and reads their routing configuration.

use crate::domain::shared::value_objects::{PhoneNumber, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantStatus {
    /// Tenant is active and operational
    Active,
    /// Tenant is suspended (billing issues, etc.)
    Suspended,
}

/// Tenant (customer organization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub status: TenantStatus,

    /// Inbound numbers attributed to this tenant
    pub numbers: Vec<PhoneNumber>,

    /// Offset from UTC in minutes; callback times are computed tenant-local
    pub utc_offset_minutes: i32,
    pub language: String,

    /// Ceiling for per-call escalation level
    pub max_escalation_level: u32,
    /// Overflow target used when escalation is already at its ceiling
    pub overflow_number: PhoneNumber,

    /// Root IVR menu id served to callers of this tenant's numbers
    pub root_menu_id: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, numbers: Vec<PhoneNumber>, overflow_number: PhoneNumber) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name,
            status: TenantStatus::Active,
            numbers,
            utc_offset_minutes: 0,
            language: "en-US".to_string(),
            max_escalation_level: 3,
            overflow_number,
            root_menu_id: "main".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    pub fn owns_number(&self, number: &PhoneNumber) -> bool {
        self.numbers.iter().any(|n| n == number)
    }
}

/// Port for resolving tenants from dialed numbers
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Resolve the tenant that owns a dialed number. `None` means the number
    /// is not attributed to any tenant (a configuration error upstream).
    async fn lookup_by_number(
        &self,
        dialed: &PhoneNumber,
    ) -> crate::domain::shared::Result<Option<Tenant>>;

    /// Fetch a tenant by id.
    async fn get_tenant(
        &self,
        tenant_id: TenantId,
    ) -> crate::domain::shared::Result<Option<Tenant>>;
}
