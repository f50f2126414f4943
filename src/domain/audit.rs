//! Routing history / audit log
//!
//! Append-only record of routing decisions and IVR state transitions, keyed
//! by call identifier. Consumed later by analytics and CRM sync; write
//! failures are logged, never propagated into call handling.

use crate::domain::routing::RoutingDecision;
use crate::domain::shared::value_objects::{CallId, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of auditable events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// The router selected a department for a call
    RoutingDecided {
        decision: RoutingDecision,
    },
    /// The IVR session changed state
    SessionTransition {
        from: String,
        to: String,
        detail: String,
    },
    /// A call was escalated to a human agent
    Escalated {
        reason: String,
        target: String,
    },
    /// A collaborator failed and the call degraded to a default
    CollaboratorDegraded {
        collaborator: String,
        message: String,
    },
}

/// Audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub call_id: CallId,
    pub tenant_id: TenantId,
    pub event: AuditEventType,
}

impl AuditRecord {
    pub fn new(call_id: CallId, tenant_id: TenantId, event: AuditEventType) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            call_id,
            tenant_id,
            event,
        }
    }
}

/// Append-only audit sink
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> crate::domain::shared::Result<()>;

    /// All records for one call, in append order.
    async fn for_call(&self, call_id: CallId) -> crate::domain::shared::Result<Vec<AuditRecord>>;
}
