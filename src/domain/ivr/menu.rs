//! IVR menu model
//!
//! A menu is a tenant-scoped dialog node: a greeting, an ordered option
//! list, and retry limits. Options are matched against caller input in a
//! strict order: exact key, then text substring, then condition lists.

use crate::domain::analysis::CallAnalysis;
use crate::domain::customer::CustomerTier;
use crate::domain::department::RuleCondition;
use crate::domain::shared::value_objects::{PhoneNumber, TenantId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Action taken when a menu option is selected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OptionAction {
    /// Speak a prompt and stay in the current menu
    Speak { text: String },
    /// Request further input with a timeout and digit limit
    Gather {
        prompt: String,
        timeout_secs: u32,
        max_digits: u32,
    },
    /// Transfer toward a configured number (escalation policy permitting)
    Transfer { target: PhoneNumber },
    /// Descend into another menu
    Submenu { menu_id: String },
    /// End the call with a closing message
    Hangup { message: Option<String> },
}

/// One selectable menu entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvrOption {
    /// DTMF digit or phrase
    pub key: String,
    /// Matching/display text
    pub text: String,
    /// Optional guards, evaluated against the session's analysis context.
    /// Only options with a non-empty condition list participate in the
    /// condition-match phase.
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    pub action: OptionAction,
}

impl IvrOption {
    pub fn new(key: impl Into<String>, text: impl Into<String>, action: OptionAction) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            conditions: Vec::new(),
            action,
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// IVR menu configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvrMenu {
    pub id: String,
    pub tenant_id: TenantId,
    pub name: String,
    pub greeting: String,
    pub options: Vec<IvrOption>,
    pub timeout_secs: u32,
    pub max_retries: u32,
    pub language: String,
    pub voice: String,
}

impl IvrMenu {
    pub fn new(
        id: impl Into<String>,
        tenant_id: TenantId,
        name: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id,
            name: name.into(),
            greeting: greeting.into(),
            options: Vec::new(),
            timeout_secs: 10,
            max_retries: 3,
            language: "en-US".to_string(),
            voice: "alice".to_string(),
        }
    }

    /// Match caller input to an option. Strict order, first match wins:
    /// exact case-insensitive key, substring either direction against the
    /// option text, then the first option whose conditions all hold.
    pub fn find_option(
        &self,
        input: &str,
        analysis: &CallAnalysis,
        customer_tier: CustomerTier,
        caller_number: &PhoneNumber,
        local_hour: u32,
    ) -> Option<&IvrOption> {
        let input_lower = input.trim().to_lowercase();
        if input_lower.is_empty() {
            return None;
        }

        if let Some(exact) = self
            .options
            .iter()
            .find(|o| o.key.to_lowercase() == input_lower)
        {
            return Some(exact);
        }

        if let Some(text_match) = self.options.iter().find(|o| {
            let text = o.text.to_lowercase();
            text.contains(&input_lower) || input_lower.contains(&text)
        }) {
            return Some(text_match);
        }

        self.options.iter().find(|o| {
            !o.conditions.is_empty()
                && o.conditions
                    .iter()
                    .all(|c| c.evaluate(analysis, customer_tier, caller_number, local_hour))
        })
    }
}

/// Builder for menu construction
pub struct IvrMenuBuilder {
    menu: IvrMenu,
}

impl IvrMenuBuilder {
    pub fn new(
        id: impl Into<String>,
        tenant_id: TenantId,
        name: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            menu: IvrMenu::new(id, tenant_id, name, greeting),
        }
    }

    pub fn timeout(mut self, seconds: u32) -> Self {
        self.menu.timeout_secs = seconds;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.menu.max_retries = retries;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.menu.language = language.into();
        self
    }

    pub fn option(mut self, option: IvrOption) -> Self {
        self.menu.options.push(option);
        self
    }

    pub fn build(self) -> IvrMenu {
        self.menu
    }
}

/// Read-path port to tenant menu configuration
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn get_menu(
        &self,
        tenant_id: TenantId,
        menu_id: &str,
    ) -> crate::domain::shared::Result<Option<IvrMenu>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::department::{ConditionField, Operator};
    use serde_json::json;

    fn caller() -> PhoneNumber {
        PhoneNumber::new("+12125550123")
    }

    fn test_menu() -> IvrMenu {
        IvrMenuBuilder::new("main", TenantId::new(), "Main Menu", "Welcome to Acme.")
            .timeout(10)
            .max_retries(3)
            .option(IvrOption::new(
                "1",
                "Sales",
                OptionAction::Transfer {
                    target: PhoneNumber::new("+15550001"),
                },
            ))
            .option(IvrOption::new(
                "2",
                "Billing questions",
                OptionAction::Submenu {
                    menu_id: "billing".to_string(),
                },
            ))
            .option(
                IvrOption::new(
                    "9",
                    "Priority line",
                    OptionAction::Transfer {
                        target: PhoneNumber::new("+15550009"),
                    },
                )
                .with_condition(RuleCondition::new(
                    ConditionField::CustomerTier,
                    Operator::In,
                    json!(["premium", "enterprise"]),
                )),
            )
            .build()
    }

    #[test]
    fn test_exact_key_match_wins() {
        let menu = test_menu();
        let analysis = CallAnalysis::default();
        let option = menu
            .find_option("1", &analysis, CustomerTier::Basic, &caller(), 10)
            .unwrap();
        assert_eq!(option.key, "1");
    }

    #[test]
    fn test_text_substring_match_both_directions() {
        let menu = test_menu();
        let analysis = CallAnalysis::default();

        // input contained in option text
        let option = menu
            .find_option("billing", &analysis, CustomerTier::Basic, &caller(), 10)
            .unwrap();
        assert_eq!(option.key, "2");

        // option text contained in input
        let option = menu
            .find_option(
                "I have some billing questions about my invoice",
                &analysis,
                CustomerTier::Basic,
                &caller(),
                10,
            )
            .unwrap();
        assert_eq!(option.key, "2");
    }

    #[test]
    fn test_condition_match_requires_conditions() {
        let menu = test_menu();
        let analysis = CallAnalysis::default();

        // no key/text match, but the premium guard passes for premium tier
        let option = menu.find_option("xyz", &analysis, CustomerTier::Premium, &caller(), 10);
        assert_eq!(option.map(|o| o.key.as_str()), Some("9"));

        // basic tier fails the guard; unguarded options never condition-match
        let option = menu.find_option("xyz", &analysis, CustomerTier::Basic, &caller(), 10);
        assert!(option.is_none());
    }

    #[test]
    fn test_empty_input_never_matches() {
        let menu = test_menu();
        let analysis = CallAnalysis::default();
        assert!(menu
            .find_option("   ", &analysis, CustomerTier::Enterprise, &caller(), 10)
            .is_none());
    }

    #[test]
    fn test_menu_serde_round_trip() {
        let menu = test_menu();
        let json = serde_json::to_string(&menu).unwrap();
        let parsed: IvrMenu = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, menu.id);
        assert_eq!(parsed.options.len(), menu.options.len());
    }
}
