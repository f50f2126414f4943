//! Collaborator adapters
//!
//! In-process implementations of the external-facing ports. Production
//! deployments swap these for real CRM, speech, and roster integrations;
//! the engine only sees the traits.

use crate::domain::customer::{CrmConnector, CustomerContext};
use crate::domain::department::{AgentAvailability, Availability};
use crate::domain::escalation::{EscalationReason, EscalationTarget, HumanHandoff};
use crate::domain::ivr::Transcriber;
use crate::domain::routing::DEFAULT_CALLBACK_WAIT;
use crate::domain::shared::value_objects::{CallId, PhoneNumber, TenantId};
use crate::domain::shared::Result;
use crate::domain::tenant::{Tenant, TenantDirectory};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Tenant directory backed by a static provisioning table
#[derive(Default)]
pub struct StaticTenantDirectory {
    tenants: RwLock<Vec<Tenant>>,
}

impl StaticTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, tenant: Tenant) {
        self.tenants.write().await.push(tenant);
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn lookup_by_number(&self, dialed: &PhoneNumber) -> Result<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.iter().find(|t| t.owns_number(dialed)).cloned())
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.iter().find(|t| t.id == tenant_id).cloned())
    }
}

/// CRM adapter over an in-memory contact table
#[derive(Default)]
pub struct InMemoryCrm {
    contacts: RwLock<HashMap<(TenantId, String), CustomerContext>>,
    interactions: RwLock<Vec<(TenantId, String, String)>>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_contact(
        &self,
        tenant_id: TenantId,
        number: PhoneNumber,
        contact: CustomerContext,
    ) {
        let mut contacts = self.contacts.write().await;
        contacts.insert((tenant_id, number.as_str().to_string()), contact);
    }

    /// Logged interaction summaries, oldest first.
    pub async fn interactions(&self) -> Vec<(TenantId, String, String)> {
        self.interactions.read().await.clone()
    }
}

#[async_trait]
impl CrmConnector for InMemoryCrm {
    async fn get_contact_by_phone(
        &self,
        tenant_id: TenantId,
        caller_number: &PhoneNumber,
    ) -> Result<Option<CustomerContext>> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .get(&(tenant_id, caller_number.as_str().to_string()))
            .cloned())
    }

    async fn log_interaction(
        &self,
        tenant_id: TenantId,
        contact_id: &str,
        summary: &str,
    ) -> Result<()> {
        debug!(tenant_id = %tenant_id, contact_id, summary, "CRM interaction logged");
        self.interactions
            .write()
            .await
            .push((tenant_id, contact_id.to_string(), summary.to_string()));
        Ok(())
    }
}

/// Transcriber that treats the audio reference as already-recognized text
///
/// Stands in for a speech service when the provider front-loads recognition
/// and sends text in the audio slot.
#[derive(Default)]
pub struct PassthroughTranscriber;

#[async_trait]
impl Transcriber for PassthroughTranscriber {
    async fn speech_to_text(&self, audio_ref: &str, _language: &str) -> Result<String> {
        Ok(audio_ref.to_string())
    }
}

/// Handoff adapter that resolves every escalation to one on-call number per
/// tenant, with a global default
pub struct StaticHandoff {
    default_target: PhoneNumber,
    per_tenant: RwLock<HashMap<TenantId, PhoneNumber>>,
}

impl StaticHandoff {
    pub fn new(default_target: PhoneNumber) -> Self {
        Self {
            default_target,
            per_tenant: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set_target(&self, tenant_id: TenantId, target: PhoneNumber) {
        self.per_tenant.write().await.insert(tenant_id, target);
    }
}

#[async_trait]
impl HumanHandoff for StaticHandoff {
    async fn escalate(
        &self,
        call_id: CallId,
        tenant_id: TenantId,
        reason: EscalationReason,
        _transcript: &str,
    ) -> Result<EscalationTarget> {
        let per_tenant = self.per_tenant.read().await;
        let target = per_tenant
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| self.default_target.clone());
        info!(
            call_id = %call_id,
            tenant_id = %tenant_id,
            reason = reason.as_str(),
            target = %target,
            "Escalation target resolved"
        );
        Ok(EscalationTarget {
            target_number: target,
        })
    }
}

/// Availability adapter with a fixed answer
///
/// `staffed` reports an agent free immediately; `unstaffed` reports the
/// default callback wait.
pub struct FixedAvailability {
    availability: Availability,
}

impl FixedAvailability {
    pub fn staffed() -> Self {
        Self {
            availability: Availability::default(),
        }
    }

    pub fn unstaffed() -> Self {
        Self {
            availability: Availability {
                agent_available: false,
                estimated_wait: DEFAULT_CALLBACK_WAIT,
            },
        }
    }
}

#[async_trait]
impl AgentAvailability for FixedAvailability {
    async fn check(&self, _tenant_id: TenantId, _department_id: Uuid) -> Result<Availability> {
        Ok(self.availability.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::CustomerTier;

    #[tokio::test]
    async fn test_directory_resolves_normalized_numbers() {
        let directory = StaticTenantDirectory::new();
        let tenant = Tenant::new(
            "Acme".to_string(),
            vec![PhoneNumber::new("+18005550100")],
            PhoneNumber::new("+18005550199"),
        );
        let tenant_id = tenant.id;
        directory.register(tenant).await;

        let found = directory
            .lookup_by_number(&PhoneNumber::new("+1 (800) 555-0100"))
            .await
            .unwrap();
        assert_eq!(found.map(|t| t.id), Some(tenant_id));

        assert!(directory
            .lookup_by_number(&PhoneNumber::new("+18005550101"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_crm_contact_lookup_and_interactions() {
        let crm = InMemoryCrm::new();
        let tenant_id = TenantId::new();
        let number = PhoneNumber::new("+12125550123");
        let contact = CustomerContext {
            customer_id: Some("c-42".to_string()),
            tier: CustomerTier::Premium,
            ..CustomerContext::anonymous()
        };
        crm.add_contact(tenant_id, number.clone(), contact).await;

        let found = crm
            .get_contact_by_phone(tenant_id, &number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tier, CustomerTier::Premium);

        crm.log_interaction(tenant_id, "c-42", "Routed to Billing")
            .await
            .unwrap();
        let interactions = crm.interactions().await;
        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].1, "c-42");
    }

    #[tokio::test]
    async fn test_handoff_prefers_tenant_target() {
        let handoff = StaticHandoff::new(PhoneNumber::new("+19990000000"));
        let tenant_id = TenantId::new();
        handoff
            .set_target(tenant_id, PhoneNumber::new("+19995550001"))
            .await;

        let target = handoff
            .escalate(
                CallId::new(),
                tenant_id,
                EscalationReason::UserRequestedTransfer,
                "",
            )
            .await
            .unwrap();
        assert_eq!(target.target_number.as_str(), "+19995550001");

        let other = handoff
            .escalate(
                CallId::new(),
                TenantId::new(),
                EscalationReason::MaxRetriesReached,
                "",
            )
            .await
            .unwrap();
        assert_eq!(other.target_number.as_str(), "+19990000000");
    }
}
