//! Rule-based routing decision engine
//!
//! Scores every active department for a call and always produces a decision:
//! if nothing scores above zero the first active department wins, and an
//! empty catalog falls back to a literal "Support" label. The engine is a
//! pure function of its inputs and safe to run concurrently across calls.

use crate::domain::analysis::{CallAnalysis, Intent};
use crate::domain::call_context::CallContext;
use crate::domain::customer::CustomerTier;
use crate::domain::department::{Availability, BusinessHours, Department};
use crate::domain::shared::value_objects::PhoneNumber;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Score contributed by a rule hit, per unit of rule priority
const RULE_WEIGHT: u32 = 10;
/// Flat score for a department whose type matches the analyzed intent
const INTENT_MATCH_BONUS: u32 = 50;
/// Flat score for routing enterprise customers toward technical teams
const ENTERPRISE_TECHNICAL_BONUS: u32 = 30;
/// Flat score for VIP callers
const VIP_BONUS: u32 = 20;

/// Immutable audit record of one routing decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub department: String,
    pub department_id: Option<Uuid>,
    /// Concatenation of matched rule descriptions
    pub reason: String,
    /// score / 100; values above 1.0 mean "very confident"
    pub confidence: f64,
    pub intent: Intent,
    pub sentiment: f64,
    pub customer_tier: CustomerTier,
    pub escalation_level: u32,
}

/// What the telephony layer should do with the call after routing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutingOutcome {
    /// Transfer toward the department (or hand off into the IVR)
    Route {
        department: String,
        message: String,
        target: PhoneNumber,
    },
    /// Outside business hours: play an announcement, offer a callback slot
    Announcement {
        department: String,
        message: String,
        /// Tenant-local callback time
        callback_at: NaiveDateTime,
    },
    /// No agent available: offer a callback with an estimated wait
    Callback {
        department: String,
        message: String,
        estimated_wait_secs: u64,
    },
}

impl RoutingOutcome {
    /// Safe response for configuration errors and invariant violations.
    pub fn technical_difficulties() -> Self {
        Self::Announcement {
            department: "Support".to_string(),
            message: "We apologize, but we are experiencing technical difficulties. \
                      Please try again later."
                .to_string(),
            callback_at: BusinessHours::default().next_callback_at(Utc::now().naive_utc()),
        }
    }

    pub fn enters_ivr(&self) -> bool {
        matches!(self, Self::Route { .. })
    }
}

/// Pure routing engine
#[derive(Debug, Clone, Default)]
pub struct RoutingEngine;

impl RoutingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score all departments and pick one. Total function: always returns a
    /// decision. Departments are scored in catalog order and only a strictly
    /// higher score displaces the current best, so the first-seen department
    /// wins ties (the catalog's configured order is the tie-break contract).
    pub fn route(
        &self,
        context: &CallContext,
        analysis: &CallAnalysis,
        departments: &[Department],
        local_hour: u32,
    ) -> RoutingDecision {
        let customer = context.customer_or_default();

        let mut best: Option<&Department> = None;
        let mut best_score: u32 = 0;
        let mut best_reason = String::new();

        for department in departments.iter().filter(|d| d.active) {
            let mut score: u32 = 0;
            let mut reason = String::new();

            for rule in &department.routing_rules {
                let matched = rule.condition.evaluate(
                    analysis,
                    customer.tier,
                    &context.caller_number,
                    local_hour,
                );
                if matched {
                    score += RULE_WEIGHT * rule.priority;
                    reason.push_str(&rule.description);
                    reason.push_str("; ");
                }
            }

            if department.department_type == analysis.intent {
                score += INTENT_MATCH_BONUS;
                reason.push_str(&format!("Intent match ({}); ", analysis.intent.as_str()));
            }

            if customer.tier == CustomerTier::Enterprise
                && department.department_type == Intent::Technical
            {
                score += ENTERPRISE_TECHNICAL_BONUS;
                reason.push_str("Enterprise customer to technical; ");
            }

            if customer.is_vip {
                score += VIP_BONUS;
                reason.push_str("VIP customer priority; ");
            }

            if score > best_score {
                best_score = score;
                best = Some(department);
                best_reason = reason;
            }
        }

        // Guaranteed fallback: first active department, then a bare label.
        if best.is_none() {
            best = departments.iter().find(|d| d.active);
            if best.is_some() {
                best_reason = "Default department routing".to_string();
            }
        }

        RoutingDecision {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            department: best.map(|d| d.name.clone()).unwrap_or_else(|| "Support".to_string()),
            department_id: best.map(|d| d.id),
            reason: best_reason,
            confidence: best_score as f64 / 100.0,
            intent: analysis.intent,
            sentiment: analysis.sentiment,
            customer_tier: customer.tier,
            escalation_level: context.escalation_level,
        }
    }

    /// Apply the post-routing availability checks. Business hours and agent
    /// availability are evaluated after department selection; a closed or
    /// unstaffed department produces a non-routing outcome and the IVR state
    /// machine is never entered.
    pub fn outcome(
        &self,
        decision: &RoutingDecision,
        department: Option<&Department>,
        availability: &Availability,
        local_now: NaiveDateTime,
    ) -> RoutingOutcome {
        let hours = department
            .map(|d| d.business_hours.clone())
            .unwrap_or_default();

        if !hours.is_open_at(local_now) {
            return RoutingOutcome::Announcement {
                department: decision.department.clone(),
                message: "Thank you for calling. We are currently closed. \
                          Please leave a message and we will call you back."
                    .to_string(),
                callback_at: hours.next_callback_at(local_now),
            };
        }

        if !availability.agent_available {
            return RoutingOutcome::Callback {
                department: decision.department.clone(),
                message: "Thank you for calling. All agents are currently busy. \
                          We will call you back shortly."
                    .to_string(),
                estimated_wait_secs: availability.estimated_wait.as_secs(),
            };
        }

        let target = department
            .map(|d| d.phone_number.clone())
            .unwrap_or_else(|| PhoneNumber::new(""));
        let message = department
            .map(|d| d.greeting.clone())
            .unwrap_or_else(|| format!("Connecting you to {}. Please hold.", decision.department));

        RoutingOutcome::Route {
            department: decision.department.clone(),
            message,
            target,
        }
    }
}

/// Estimated callback wait offered when no agent is free
pub const DEFAULT_CALLBACK_WAIT: Duration = Duration::from_secs(15 * 60);
