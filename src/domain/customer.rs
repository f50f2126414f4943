//! Customer context looked up from the tenant's CRM
//!
//! The CRM owns this data; the engine only consumes an immutable snapshot
//! per call. An anonymous caller (no CRM record, or CRM failure) degrades to
//! the basic-tier default.

use crate::domain::shared::value_objects::{PhoneNumber, TenantId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Customer service tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    #[default]
    Basic,
    Premium,
    Enterprise,
}

impl CustomerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }

    /// Multiplier applied to the urgency score during call analysis.
    pub fn urgency_multiplier(&self) -> f64 {
        match self {
            Self::Enterprise => 1.3,
            Self::Premium => 1.1,
            Self::Basic => 1.0,
        }
    }

    /// Contribution to analysis confidence when a CRM profile exists.
    pub fn confidence_weight(&self) -> f64 {
        match self {
            Self::Enterprise => 0.9,
            Self::Premium => 0.7,
            Self::Basic => 0.5,
        }
    }
}

/// Immutable per-call snapshot of a CRM contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContext {
    /// CRM contact id, absent for anonymous callers
    pub customer_id: Option<String>,
    pub name: Option<String>,
    pub tier: CustomerTier,
    pub is_vip: bool,
    pub preferred_language: String,
    pub do_not_call: bool,
    pub do_not_email: bool,
    pub tags: Vec<String>,
}

impl CustomerContext {
    /// Anonymous caller default
    pub fn anonymous() -> Self {
        Self {
            customer_id: None,
            name: None,
            tier: CustomerTier::Basic,
            is_vip: false,
            preferred_language: "en-US".to_string(),
            do_not_call: false,
            do_not_email: false,
            tags: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.customer_id.is_none()
    }
}

impl Default for CustomerContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Port to the external CRM collaborator
///
/// Lookups that fail degrade to the anonymous default at the call site;
/// interaction logging is fire-and-forget and must never fail a call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmConnector: Send + Sync {
    /// Look up a contact by caller number. `None` is a valid answer.
    async fn get_contact_by_phone(
        &self,
        tenant_id: TenantId,
        caller_number: &PhoneNumber,
    ) -> crate::domain::shared::Result<Option<CustomerContext>>;

    /// Record an interaction summary against a contact.
    async fn log_interaction(
        &self,
        tenant_id: TenantId,
        contact_id: &str,
        summary: &str,
    ) -> crate::domain::shared::Result<()>;
}
