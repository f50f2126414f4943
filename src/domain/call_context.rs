//! Per-call mutable context
//!
//! One `CallContext` exists per inbound call for the lifetime of the call.
//! It is created when a call is first attributed to a tenant, mutated by the
//! router (appended decisions, escalation increments) and the IVR engine
//! (last utterance), and expires from the store after an inactivity window.

use crate::domain::customer::CustomerContext;
use crate::domain::routing::RoutingDecision;
use crate::domain::shared::value_objects::{CallId, PhoneNumber, SessionId, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallContext {
    pub call_id: CallId,
    pub tenant_id: TenantId,
    pub dialed_number: PhoneNumber,
    pub caller_number: PhoneNumber,
    pub session_id: SessionId,
    pub last_utterance: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Append-only, ordered by decision time
    pub routing_history: Vec<RoutingDecision>,
    pub escalation_level: u32,
    /// Tenant-configured ceiling; `escalation_level` never exceeds this
    pub max_escalation_level: u32,
    pub customer: Option<CustomerContext>,
}

impl CallContext {
    pub fn new(
        call_id: CallId,
        tenant_id: TenantId,
        dialed_number: PhoneNumber,
        caller_number: PhoneNumber,
        max_escalation_level: u32,
    ) -> Self {
        Self {
            call_id,
            tenant_id,
            dialed_number,
            caller_number,
            session_id: SessionId::new(),
            last_utterance: None,
            created_at: Utc::now(),
            routing_history: Vec::new(),
            escalation_level: 0,
            max_escalation_level,
            customer: None,
        }
    }

    pub fn set_utterance(&mut self, utterance: impl Into<String>) {
        self.last_utterance = Some(utterance.into());
    }

    /// Append a routing decision to the history.
    pub fn record_decision(&mut self, decision: RoutingDecision) {
        self.routing_history.push(decision);
    }

    /// Raise the escalation level, saturating at the tenant ceiling.
    /// Returns the new level; at the ceiling this is a no-op, not an error,
    /// and the caller routes to the overflow target instead.
    pub fn escalate(&mut self) -> u32 {
        if self.escalation_level < self.max_escalation_level {
            self.escalation_level += 1;
        }
        self.escalation_level
    }

    pub fn at_escalation_ceiling(&self) -> bool {
        self.escalation_level >= self.max_escalation_level
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn customer_or_default(&self) -> CustomerContext {
        self.customer.clone().unwrap_or_default()
    }
}

/// Typed repository for call contexts, keyed by call id
///
/// Entries expire after a fixed inactivity window so the store's memory is
/// bounded. Within one call id all read-modify-write cycles are serialized
/// by the application layer.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn get(&self, call_id: CallId) -> crate::domain::shared::Result<Option<CallContext>>;

    async fn put(&self, context: CallContext) -> crate::domain::shared::Result<()>;

    async fn remove(&self, call_id: CallId) -> crate::domain::shared::Result<()>;

    /// Drop entries idle longer than the store's TTL. Returns the number
    /// of evicted contexts.
    async fn purge_expired(&self) -> crate::domain::shared::Result<usize>;
}
