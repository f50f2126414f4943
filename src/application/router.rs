//! Inbound call routing use case
//!
//! Orchestrates one routing pass: tenant attribution, CRM enrichment,
//! utterance analysis, department scoring, availability checks, and the
//! escalation gate before a transfer. Collaborator failures degrade to
//! defaults; the webhook boundary never sees an error.

use crate::application::{tenant_local_hour, tenant_local_now, CallLocks};
use crate::domain::analysis::CallAnalyzer;
use crate::domain::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::domain::call_context::{CallContext, ContextStore};
use crate::domain::customer::CrmConnector;
use crate::domain::department::{AgentAvailability, Availability, Department, DepartmentCatalog};
use crate::domain::escalation::{EscalationPolicy, EscalationReason, EscalationSignals, HumanHandoff};
use crate::domain::routing::{RoutingEngine, RoutingOutcome};
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use crate::domain::shared::{DomainError, Result};
use crate::domain::tenant::{Tenant, TenantDirectory};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One inbound call event, as delivered by the telephony provider
#[derive(Debug, Clone)]
pub struct InboundCall {
    pub call_id: CallId,
    pub dialed_number: PhoneNumber,
    pub caller_number: PhoneNumber,
    /// First utterance, when the provider front-loads speech recognition
    pub utterance: Option<String>,
}

/// Application service for the routing pass
pub struct InboundRouter {
    tenants: Arc<dyn TenantDirectory>,
    crm: Arc<dyn CrmConnector>,
    catalog: Arc<dyn DepartmentCatalog>,
    availability: Arc<dyn AgentAvailability>,
    contexts: Arc<dyn ContextStore>,
    handoff: Arc<dyn HumanHandoff>,
    audit: Arc<dyn AuditSink>,
    locks: Arc<CallLocks>,
    analyzer: CallAnalyzer,
    engine: RoutingEngine,
    policy: EscalationPolicy,
}

impl InboundRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        crm: Arc<dyn CrmConnector>,
        catalog: Arc<dyn DepartmentCatalog>,
        availability: Arc<dyn AgentAvailability>,
        contexts: Arc<dyn ContextStore>,
        handoff: Arc<dyn HumanHandoff>,
        audit: Arc<dyn AuditSink>,
        locks: Arc<CallLocks>,
    ) -> Self {
        Self {
            tenants,
            crm,
            catalog,
            availability,
            contexts,
            handoff,
            audit,
            locks,
            analyzer: CallAnalyzer::default(),
            engine: RoutingEngine::new(),
            policy: EscalationPolicy::default(),
        }
    }

    /// Route one inbound call. Total: any internal failure is logged and
    /// degraded to the technical-difficulties announcement.
    pub async fn route_call(&self, event: InboundCall) -> RoutingOutcome {
        let _guard = self.locks.acquire(event.call_id).await;

        match self.route_inner(&event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(call_id = %event.call_id, error = %e, "Routing degraded to safe default");
                RoutingOutcome::technical_difficulties()
            }
        }
    }

    async fn route_inner(&self, event: &InboundCall) -> Result<RoutingOutcome> {
        let tenant = self
            .tenants
            .lookup_by_number(&event.dialed_number)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "No tenant owns dialed number {}",
                    event.dialed_number
                ))
            })?;
        if !tenant.is_active() {
            return Err(DomainError::InvalidOperation(format!(
                "Tenant {} is suspended",
                tenant.id
            )));
        }

        let mut context = match self.contexts.get(event.call_id).await? {
            Some(existing) => existing,
            None => CallContext::new(
                event.call_id,
                tenant.id,
                event.dialed_number.clone(),
                event.caller_number.clone(),
                tenant.max_escalation_level,
            ),
        };

        // CRM enrichment: a dead CRM means an anonymous caller, not a failure.
        if context.customer.is_none() {
            context.customer = match self
                .crm
                .get_contact_by_phone(tenant.id, &event.caller_number)
                .await
            {
                Ok(contact) => contact,
                Err(e) => {
                    warn!(call_id = %event.call_id, error = %e, "CRM lookup failed, treating caller as anonymous");
                    self.audit_degraded(&context, "crm", &e.to_string()).await;
                    None
                }
            };
        }

        let utterance = event.utterance.as_deref().unwrap_or("");
        let analysis = self.analyzer.analyze(utterance, context.customer.as_ref());
        if !utterance.is_empty() {
            context.set_utterance(utterance);
        }
        debug!(
            call_id = %event.call_id,
            intent = analysis.intent.as_str(),
            sentiment = analysis.sentiment,
            "Utterance analyzed"
        );

        // A broken catalog degrades to the empty-catalog fallback path.
        let departments = match self.catalog.get_departments(tenant.id).await {
            Ok(departments) => departments,
            Err(e) => {
                warn!(call_id = %event.call_id, error = %e, "Department catalog unavailable");
                self.audit_degraded(&context, "department_catalog", &e.to_string())
                    .await;
                Vec::new()
            }
        };

        let now = Utc::now();
        let local_hour = tenant_local_hour(&tenant, now);
        let decision = self.engine.route(&context, &analysis, &departments, local_hour);
        info!(
            call_id = %event.call_id,
            tenant_id = %tenant.id,
            department = %decision.department,
            confidence = decision.confidence,
            "Routing decision made"
        );

        let department = departments
            .iter()
            .find(|d| Some(d.id) == decision.department_id);
        let availability = self.check_availability(&context, department).await;
        let local_now = tenant_local_now(&tenant, now);
        let mut outcome = self
            .engine
            .outcome(&decision, department, &availability, local_now);

        // Escalation gate: an angry or explicitly human-seeking caller skips
        // the department line and lands on an agent directly.
        if outcome.enters_ivr() {
            let signals = EscalationSignals {
                sentiment: Some(analysis.sentiment),
                transcript: utterance,
                started_at: context.created_at,
            };
            if self.policy.needs_escalation(&signals, now) {
                if let Some(escalated) = self
                    .escalate(&mut context, &tenant, &decision.department)
                    .await
                {
                    outcome = escalated;
                }
            }
        }

        context.record_decision(decision.clone());
        self.contexts.put(context.clone()).await?;

        let record = AuditRecord::new(
            event.call_id,
            tenant.id,
            AuditEventType::RoutingDecided { decision },
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(call_id = %event.call_id, error = %e, "Audit append failed");
        }

        self.log_interaction(&context, &outcome);

        Ok(outcome)
    }

    async fn check_availability(
        &self,
        context: &CallContext,
        department: Option<&Department>,
    ) -> Availability {
        let Some(department) = department else {
            return Availability::default();
        };
        match self.availability.check(context.tenant_id, department.id).await {
            Ok(availability) => availability,
            Err(e) => {
                warn!(call_id = %context.call_id, error = %e, "Availability check failed, assuming staffed");
                self.audit_degraded(context, "agent_availability", &e.to_string())
                    .await;
                Availability::default()
            }
        }
    }

    /// Resolve an escalation target. At the tenant's ceiling the overflow
    /// number is used without consulting the handoff collaborator; a handoff
    /// failure also falls back to the overflow number.
    async fn escalate(
        &self,
        context: &mut CallContext,
        tenant: &Tenant,
        department: &str,
    ) -> Option<RoutingOutcome> {
        let transcript = context.last_utterance.clone().unwrap_or_default();
        let target = if context.at_escalation_ceiling() {
            tenant.overflow_number.clone()
        } else {
            match self
                .handoff
                .escalate(
                    context.call_id,
                    tenant.id,
                    EscalationReason::UserRequestedTransfer,
                    &transcript,
                )
                .await
            {
                Ok(target) => target.target_number,
                Err(e) => {
                    warn!(call_id = %context.call_id, error = %e, "Handoff failed, using overflow target");
                    self.audit_degraded(context, "human_handoff", &e.to_string())
                        .await;
                    tenant.overflow_number.clone()
                }
            }
        };

        let level = context.escalate();
        info!(
            call_id = %context.call_id,
            level,
            target = %target,
            "Call escalated before transfer"
        );

        let record = AuditRecord::new(
            context.call_id,
            tenant.id,
            AuditEventType::Escalated {
                reason: EscalationReason::UserRequestedTransfer.as_str().to_string(),
                target: target.to_string(),
            },
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(call_id = %context.call_id, error = %e, "Audit append failed");
        }

        Some(RoutingOutcome::Route {
            department: department.to_string(),
            message: "Please hold while we connect you to an agent.".to_string(),
            target,
        })
    }

    async fn audit_degraded(&self, context: &CallContext, collaborator: &str, message: &str) {
        let record = AuditRecord::new(
            context.call_id,
            context.tenant_id,
            AuditEventType::CollaboratorDegraded {
                collaborator: collaborator.to_string(),
                message: message.to_string(),
            },
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(call_id = %context.call_id, error = %e, "Audit append failed");
        }
    }

    /// Fire-and-forget CRM interaction log for identified callers.
    fn log_interaction(&self, context: &CallContext, outcome: &RoutingOutcome) {
        let Some(customer) = context.customer.as_ref() else {
            return;
        };
        let Some(contact_id) = customer.customer_id.clone() else {
            return;
        };

        let summary = match outcome {
            RoutingOutcome::Route { department, .. } => {
                format!("Inbound call routed to {}", department)
            }
            RoutingOutcome::Announcement { department, .. } => {
                format!("Inbound call to {} outside business hours", department)
            }
            RoutingOutcome::Callback { department, .. } => {
                format!("Inbound call to {} queued for callback", department)
            }
        };

        let crm = self.crm.clone();
        let tenant_id = context.tenant_id;
        let call_id = context.call_id;
        tokio::spawn(async move {
            if let Err(e) = crm.log_interaction(tenant_id, &contact_id, &summary).await {
                warn!(call_id = %call_id, error = %e, "CRM interaction log failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Intent;
    use crate::domain::customer::MockCrmConnector;
    use crate::domain::department::{BusinessHours, MockDepartmentCatalog};
    use crate::domain::shared::value_objects::TenantId;
    use crate::infrastructure::audit::InMemoryAuditSink;
    use crate::infrastructure::collaborators::{FixedAvailability, StaticHandoff, StaticTenantDirectory};
    use crate::infrastructure::persistence::InMemoryContextStore;
    use std::time::Duration;

    const TENANT_NUMBER: &str = "+18005550100";
    const CALLER: &str = "+12125550123";

    struct Harness {
        router: InboundRouter,
        contexts: Arc<InMemoryContextStore>,
        audit: Arc<InMemoryAuditSink>,
    }

    async fn harness(
        crm: Arc<dyn CrmConnector>,
        catalog: Arc<dyn DepartmentCatalog>,
    ) -> Harness {
        let tenants = Arc::new(StaticTenantDirectory::new());
        let tenant = Tenant::new(
            "Acme Corp".to_string(),
            vec![PhoneNumber::new(TENANT_NUMBER)],
            PhoneNumber::new("+18005550199"),
        );
        tenants.register(tenant).await;

        let contexts = Arc::new(InMemoryContextStore::new(Duration::from_secs(60)));
        let audit = Arc::new(InMemoryAuditSink::new(100));
        let router = InboundRouter::new(
            tenants,
            crm,
            catalog,
            Arc::new(FixedAvailability::staffed()),
            contexts.clone(),
            Arc::new(StaticHandoff::new(PhoneNumber::new("+19995550000"))),
            audit.clone(),
            Arc::new(CallLocks::new()),
        );
        Harness {
            router,
            contexts,
            audit,
        }
    }

    fn open_billing_department() -> Department {
        let mut department = Department::new(
            TenantId::new(),
            "Billing",
            Intent::Billing,
            PhoneNumber::new("+18005550102"),
        );
        department.business_hours = BusinessHours::always_open();
        department
    }

    fn inbound(call_id: CallId, utterance: Option<&str>) -> InboundCall {
        InboundCall {
            call_id,
            dialed_number: PhoneNumber::new(TENANT_NUMBER),
            caller_number: PhoneNumber::new(CALLER),
            utterance: utterance.map(str::to_string),
        }
    }

    fn degraded(trail: &[AuditRecord], name: &str) -> bool {
        trail.iter().any(|r| {
            matches!(
                &r.event,
                AuditEventType::CollaboratorDegraded { collaborator, .. } if collaborator == name
            )
        })
    }

    #[tokio::test]
    async fn test_crm_failure_degrades_to_anonymous_caller() {
        let mut crm = MockCrmConnector::new();
        crm.expect_get_contact_by_phone()
            .returning(|_, _| Err(DomainError::collaborator("crm", "connection refused")));

        let mut catalog = MockDepartmentCatalog::new();
        catalog
            .expect_get_departments()
            .returning(|_| Ok(vec![open_billing_department()]));

        let h = harness(Arc::new(crm), Arc::new(catalog)).await;
        let call_id = CallId::new();
        let outcome = h
            .router
            .route_call(inbound(call_id, Some("question about my invoice")))
            .await;

        // the call still routes; the caller is just anonymous
        match outcome {
            RoutingOutcome::Route { department, .. } => assert_eq!(department, "Billing"),
            other => panic!("Expected route, got {:?}", other),
        }

        let context = h.contexts.get(call_id).await.unwrap().unwrap();
        assert!(context.customer.is_none());
        assert!(degraded(&h.audit.for_call(call_id).await.unwrap(), "crm"));
    }

    #[tokio::test]
    async fn test_catalog_failure_falls_back_to_support_label() {
        let mut crm = MockCrmConnector::new();
        crm.expect_get_contact_by_phone().returning(|_, _| Ok(None));

        let mut catalog = MockDepartmentCatalog::new();
        catalog
            .expect_get_departments()
            .returning(|_| Err(DomainError::collaborator("department_catalog", "timeout")));

        let h = harness(Arc::new(crm), Arc::new(catalog)).await;
        let call_id = CallId::new();
        let outcome = h.router.route_call(inbound(call_id, None)).await;

        let department = match outcome {
            RoutingOutcome::Route { department, .. }
            | RoutingOutcome::Announcement { department, .. }
            | RoutingOutcome::Callback { department, .. } => department,
        };
        assert_eq!(department, "Support");

        let context = h.contexts.get(call_id).await.unwrap().unwrap();
        assert_eq!(context.routing_history[0].department, "Support");
        assert!(degraded(
            &h.audit.for_call(call_id).await.unwrap(),
            "department_catalog"
        ));
    }
}
