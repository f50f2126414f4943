//! Departments and routing rules
//!
//! A department is a tenant-scoped routing target: it declares an intent
//! category, an ordered rule list, business hours, and a transfer number.
//! The catalog is owned by tenant configuration and is read-only here.

use crate::domain::analysis::{CallAnalysis, Intent};
use crate::domain::customer::CustomerTier;
use crate::domain::shared::value_objects::{PhoneNumber, TenantId};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Field a routing condition is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Intent,
    Sentiment,
    CustomerTier,
    Keyword,
    TimeOfDay,
    CallerId,
}

/// Comparison operator for routing conditions
///
/// Unrecognized operators deserialize to `Unknown` and evaluate to false
/// rather than failing the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    Between,
    In,
    NotIn,
    #[serde(other)]
    Unknown,
}

/// Value extracted from the call for condition evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Text(String),
    Number(f64),
}

impl ConditionValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_member_matches(value: &ConditionValue, member: &Value) -> bool {
    match (value, member) {
        (ConditionValue::Number(n), Value::Number(m)) => m.as_f64() == Some(*n),
        _ => value.as_text() == json_text(member),
    }
}

/// Evaluate a single condition. Total: shape mismatches and unknown
/// operators are false, never errors.
pub fn evaluate_condition(value: &ConditionValue, operator: Operator, rule_value: &Value) -> bool {
    match operator {
        Operator::Equals => match (value, rule_value) {
            (ConditionValue::Number(n), Value::Number(m)) => m.as_f64() == Some(*n),
            _ => value.as_text() == json_text(rule_value),
        },
        Operator::Contains => value
            .as_text()
            .to_lowercase()
            .contains(&json_text(rule_value).to_lowercase()),
        Operator::GreaterThan => match (value.as_number(), json_number(rule_value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        Operator::LessThan => match (value.as_number(), json_number(rule_value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        Operator::Between => match (value.as_number(), rule_value.as_array()) {
            (Some(n), Some(bounds)) if bounds.len() == 2 => {
                match (json_number(&bounds[0]), json_number(&bounds[1])) {
                    (Some(low), Some(high)) => n >= low && n <= high,
                    _ => false,
                }
            }
            _ => false,
        },
        Operator::In => rule_value
            .as_array()
            .map(|members| members.iter().any(|m| json_member_matches(value, m)))
            .unwrap_or(false),
        Operator::NotIn => rule_value
            .as_array()
            .map(|members| !members.iter().any(|m| json_member_matches(value, m)))
            .unwrap_or(false),
        Operator::Unknown => false,
    }
}

/// Condition side of a routing rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: ConditionField,
    pub operator: Operator,
    pub value: Value,
}

impl RuleCondition {
    pub fn new(field: ConditionField, operator: Operator, value: Value) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    /// Extract this condition's field from the call and evaluate it.
    pub fn evaluate(
        &self,
        analysis: &CallAnalysis,
        customer_tier: CustomerTier,
        caller_number: &PhoneNumber,
        local_hour: u32,
    ) -> bool {
        let value = match self.field {
            ConditionField::Intent => ConditionValue::Text(analysis.intent.as_str().to_string()),
            ConditionField::Sentiment => ConditionValue::Number(analysis.sentiment),
            ConditionField::CustomerTier => {
                ConditionValue::Text(customer_tier.as_str().to_string())
            }
            ConditionField::Keyword => ConditionValue::Text(analysis.keywords.join(" ")),
            ConditionField::TimeOfDay => ConditionValue::Number(local_hour as f64),
            ConditionField::CallerId => ConditionValue::Text(caller_number.as_str().to_string()),
        };

        evaluate_condition(&value, self.operator, &self.value)
    }
}

/// Condition/action pair scored during routing
///
/// A matching rule contributes `10 x priority` to its department's score and
/// appends its description to the decision reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub condition: RuleCondition,
    /// Positive weight; higher priority contributes more score
    pub priority: u32,
    pub description: String,
}

impl RoutingRule {
    pub fn new(condition: RuleCondition, priority: u32, description: impl Into<String>) -> Self {
        Self {
            condition,
            priority: priority.max(1),
            description: description.into(),
        }
    }
}

/// Opening hours for one part of the week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Weekly business hours, evaluated in tenant-local time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHours {
    pub weekdays: DaySchedule,
    pub weekends: DaySchedule,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            weekdays: DaySchedule {
                enabled: true,
                start_hour: 9,
                end_hour: 17,
            },
            weekends: DaySchedule {
                enabled: false,
                start_hour: 9,
                end_hour: 17,
            },
        }
    }
}

impl BusinessHours {
    /// Always-open schedule, used when a tenant opts out of hours gating.
    pub fn always_open() -> Self {
        Self {
            weekdays: DaySchedule {
                enabled: true,
                start_hour: 0,
                end_hour: 24,
            },
            weekends: DaySchedule {
                enabled: true,
                start_hour: 0,
                end_hour: 24,
            },
        }
    }

    pub fn is_open_at(&self, local: NaiveDateTime) -> bool {
        let weekday = local.weekday();
        let is_weekend = weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun;
        let schedule = if is_weekend {
            &self.weekends
        } else {
            &self.weekdays
        };

        if !schedule.enabled {
            return false;
        }

        let hour = local.hour();
        hour >= schedule.start_hour && hour < schedule.end_hour
    }

    /// Callback slot offered to after-hours callers: 09:00 the next day.
    pub fn next_callback_at(&self, local: NaiveDateTime) -> NaiveDateTime {
        let tomorrow = local.date() + chrono::Duration::days(1);
        tomorrow.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
    }
}

/// Tenant-scoped routing target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    /// Intent category this department serves
    pub department_type: Intent,
    pub active: bool,
    /// Position in the tenant's configured order; the catalog returns
    /// departments sorted by this (ascending, stable), which fixes the
    /// router's first-seen-wins tie-break.
    pub priority: u32,
    pub phone_number: PhoneNumber,
    pub greeting: String,
    pub routing_rules: Vec<RoutingRule>,
    pub business_hours: BusinessHours,
}

impl Department {
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        department_type: Intent,
        phone_number: PhoneNumber,
    ) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.clone(),
            department_type,
            active: true,
            priority: 0,
            phone_number,
            greeting: format!("Connecting you to {}. Please hold.", name),
            routing_rules: Vec::new(),
            business_hours: BusinessHours::default(),
        }
    }

    pub fn with_rule(mut self, rule: RoutingRule) -> Self {
        self.routing_rules.push(rule);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Agent availability snapshot for a department
#[derive(Debug, Clone)]
pub struct Availability {
    pub agent_available: bool,
    pub estimated_wait: Duration,
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            agent_available: true,
            estimated_wait: Duration::from_secs(0),
        }
    }
}

/// Read-path port to the department/rule catalog
///
/// Contract: departments are returned in the tenant's configured order
/// (sorted by `priority` ascending, stable). Writes belong to out-of-scope
/// configuration management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepartmentCatalog: Send + Sync {
    async fn get_departments(
        &self,
        tenant_id: TenantId,
    ) -> crate::domain::shared::Result<Vec<Department>>;
}

/// Port to the externally managed agent roster
#[async_trait]
pub trait AgentAvailability: Send + Sync {
    async fn check(
        &self,
        tenant_id: TenantId,
        department_id: Uuid,
    ) -> crate::domain::shared::Result<Availability>;
}
