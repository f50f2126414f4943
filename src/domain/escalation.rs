//! Escalation policy
//!
//! Shared predicate deciding when a call must reach a human agent regardless
//! of normal routing. Evaluated by the router before a transfer and by the
//! IVR engine when retries are exhausted.

use crate::domain::shared::value_objects::{CallId, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a call was escalated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    UserRequestedTransfer,
    MaxRetriesReached,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRequestedTransfer => "user_requested_transfer",
            Self::MaxRetriesReached => "max_retries_reached",
        }
    }
}

/// Inputs to the escalation predicate
#[derive(Debug, Clone)]
pub struct EscalationSignals<'a> {
    /// Current sentiment, if any utterance has been analyzed
    pub sentiment: Option<f64>,
    /// Accumulated transcript of the call so far
    pub transcript: &'a str,
    pub started_at: DateTime<Utc>,
}

/// Deterministic escalation predicate
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub sentiment_floor: f64,
    pub human_request_keywords: Vec<&'static str>,
    pub max_call_duration: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            sentiment_floor: 0.3,
            human_request_keywords: vec!["human", "agent", "representative", "manager", "supervisor"],
            max_call_duration: Duration::from_secs(300),
        }
    }
}

impl EscalationPolicy {
    /// True when any trigger fires: low sentiment, an explicit request for a
    /// human, or a call running past the duration ceiling.
    pub fn needs_escalation(&self, signals: &EscalationSignals<'_>, now: DateTime<Utc>) -> bool {
        if let Some(sentiment) = signals.sentiment {
            if sentiment < self.sentiment_floor {
                return true;
            }
        }

        let transcript = signals.transcript.to_lowercase();
        if self
            .human_request_keywords
            .iter()
            .any(|k| transcript.contains(k))
        {
            return true;
        }

        let elapsed = (now - signals.started_at).to_std().unwrap_or(Duration::ZERO);
        elapsed > self.max_call_duration
    }
}

/// Resolved escalation target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationTarget {
    pub target_number: crate::domain::shared::value_objects::PhoneNumber,
}

/// Port to the human-in-the-loop collaborator that resolves where escalated
/// calls land (on-call number, ring group, etc.)
#[async_trait]
pub trait HumanHandoff: Send + Sync {
    async fn escalate(
        &self,
        call_id: CallId,
        tenant_id: TenantId,
        reason: EscalationReason,
        transcript: &str,
    ) -> crate::domain::shared::Result<EscalationTarget>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(sentiment: Option<f64>, transcript: &str) -> EscalationSignals<'_> {
        EscalationSignals {
            sentiment,
            transcript,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_sentiment_triggers() {
        let policy = EscalationPolicy::default();
        let now = Utc::now();
        assert!(policy.needs_escalation(&signals(Some(0.29), "my bill is wrong"), now));
        // the floor itself is not below the floor
        assert!(!policy.needs_escalation(&signals(Some(0.3), "my bill is wrong"), now));
    }

    #[test]
    fn test_human_request_keyword_triggers_regardless_of_sentiment() {
        let policy = EscalationPolicy::default();
        let now = Utc::now();
        // positive sentiment, but the caller asked for a supervisor
        assert!(policy.needs_escalation(
            &signals(Some(0.7), "everything is great but get me a Supervisor"),
            now
        ));
        assert!(policy.needs_escalation(&signals(None, "I want to talk to an agent"), now));
    }

    #[test]
    fn test_duration_ceiling_triggers() {
        let policy = EscalationPolicy::default();
        let started = Utc::now() - chrono::Duration::seconds(301);
        let signals = EscalationSignals {
            sentiment: Some(0.5),
            transcript: "still going",
            started_at: started,
        };
        assert!(policy.needs_escalation(&signals, Utc::now()));
    }

    #[test]
    fn test_quiet_call_does_not_trigger() {
        let policy = EscalationPolicy::default();
        assert!(!policy.needs_escalation(
            &signals(Some(0.5), "checking on my order status"),
            Utc::now()
        ));
    }
}
