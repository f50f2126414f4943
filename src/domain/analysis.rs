//! Heuristic call analysis
//!
//! Turns a raw caller utterance into a structured classification (intent,
//! sentiment, urgency, language, keywords, confidence). This is a deliberate
//! keyword/heuristic scorer, not a trained model: every score is explainable
//! and deterministic. The keyword tables live in [`Lexicon`] so they can be
//! tuned without touching the scoring code.

use crate::domain::customer::CustomerContext;
use serde::{Deserialize, Serialize};

/// Caller intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Sales,
    Support,
    Billing,
    Technical,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Support => "support",
            Self::Billing => "billing",
            Self::Technical => "technical",
        }
    }
}

/// Call urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Contribution to overall analysis confidence.
    pub fn confidence_weight(&self) -> f64 {
        match self {
            Self::Critical => 0.9,
            Self::High => 0.7,
            Self::Medium => 0.5,
            Self::Low => 0.3,
        }
    }
}

/// Structured classification of a single utterance
///
/// Produced fresh on every turn; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnalysis {
    pub intent: Intent,
    /// Three-valued in practice (0.3 / 0.5 / 0.7) despite the continuous
    /// type. Downstream escalation thresholds are tuned against this.
    pub sentiment: f64,
    pub urgency: Urgency,
    /// BCP-47-style language tag
    pub language: String,
    pub keywords: Vec<String>,
    pub confidence: f64,
}

impl Default for CallAnalysis {
    /// Lowest-confidence default returned for empty input.
    fn default() -> Self {
        Self {
            intent: Intent::Support,
            sentiment: 0.5,
            urgency: Urgency::Low,
            language: "en-US".to_string(),
            keywords: Vec::new(),
            confidence: 0.5,
        }
    }
}

/// Keyword tables driving the analyzer
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub sales: Vec<&'static str>,
    pub support: Vec<&'static str>,
    pub billing: Vec<&'static str>,
    pub technical: Vec<&'static str>,
    pub positive: Vec<&'static str>,
    pub negative: Vec<&'static str>,
    pub urgent: Vec<&'static str>,
    /// Domain vocabulary surfaced as extracted keywords
    pub vocabulary: Vec<&'static str>,
    /// (language tag, common function words)
    pub languages: Vec<(&'static str, Vec<&'static str>)>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            sales: vec!["buy", "purchase", "price", "cost", "plan", "subscription", "order"],
            support: vec!["help", "problem", "issue", "not working", "broken", "error", "fix"],
            billing: vec!["bill", "payment", "charge", "refund", "invoice", "billing", "money"],
            technical: vec!["technical", "setup", "install", "api", "integration", "webhook"],
            positive: vec!["good", "great", "excellent", "happy", "satisfied", "love", "amazing"],
            negative: vec!["bad", "terrible", "awful", "angry", "frustrated", "disappointed", "hate"],
            urgent: vec!["urgent", "emergency", "critical", "asap", "immediately", "now", "broken"],
            vocabulary: vec![
                "esim", "data", "phone", "number", "sms", "voice", "calling",
                "activate", "connection", "network", "error", "problem", "issue",
                "payment", "bill", "charge", "refund", "invoice", "subscription",
                "technical", "setup", "install", "api", "integration", "webhook",
            ],
            languages: vec![
                (
                    "en-US",
                    vec!["the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by"],
                ),
                (
                    "es-ES",
                    vec!["el", "la", "de", "que", "y", "a", "en", "un", "es", "se", "no", "te", "lo"],
                ),
                (
                    "fr-FR",
                    vec!["le", "la", "de", "et", "à", "un", "il", "que", "ne", "se", "ce", "pas", "tout"],
                ),
            ],
        }
    }
}

/// Deterministic utterance classifier
#[derive(Debug, Clone, Default)]
pub struct CallAnalyzer {
    lexicon: Lexicon,
}

impl CallAnalyzer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Classify an utterance. Never fails; empty input yields the
    /// lowest-confidence default.
    pub fn analyze(&self, utterance: &str, customer: Option<&CustomerContext>) -> CallAnalysis {
        let trimmed = utterance.trim();
        if trimmed.is_empty() {
            return CallAnalysis::default();
        }

        let lower = trimmed.to_lowercase();
        let intent = self.classify_intent(&lower);
        let sentiment = self.score_sentiment(&lower);
        let urgency = self.score_urgency(&lower, customer);
        let language = self.detect_language(&lower);
        let keywords = self.extract_keywords(&lower);
        let confidence = self.confidence(sentiment, urgency, customer);

        CallAnalysis {
            intent,
            sentiment,
            urgency,
            language,
            keywords,
            confidence,
        }
    }

    /// Fraction of a keyword set present in the input (substring match).
    fn keyword_score(input: &str, keywords: &[&str]) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }
        let matched = keywords.iter().filter(|k| input.contains(*k)).count();
        matched as f64 / keywords.len() as f64
    }

    /// Intent selection cascade. The comparison order (sales, then billing,
    /// then technical, with support as the default) is a fixed contract;
    /// tie behavior depends on it and must not be reordered.
    fn classify_intent(&self, input: &str) -> Intent {
        let sales = Self::keyword_score(input, &self.lexicon.sales);
        let support = Self::keyword_score(input, &self.lexicon.support);
        let billing = Self::keyword_score(input, &self.lexicon.billing);
        let technical = Self::keyword_score(input, &self.lexicon.technical);

        if sales > support && sales > billing && sales > technical {
            Intent::Sales
        } else if billing > support && billing > technical {
            Intent::Billing
        } else if technical > support {
            Intent::Technical
        } else {
            Intent::Support
        }
    }

    /// Three-valued sentiment: 0.7 positive, 0.3 negative, 0.5 neutral.
    fn score_sentiment(&self, input: &str) -> f64 {
        let positive = Self::keyword_score(input, &self.lexicon.positive);
        let negative = Self::keyword_score(input, &self.lexicon.negative);

        if positive > negative {
            0.7
        } else if negative > positive {
            0.3
        } else {
            0.5
        }
    }

    fn score_urgency(&self, input: &str, customer: Option<&CustomerContext>) -> Urgency {
        let base = Self::keyword_score(input, &self.lexicon.urgent);
        let vip_multiplier = match customer {
            Some(c) if c.is_vip => 1.5,
            _ => 1.0,
        };
        let tier_multiplier = customer
            .map(|c| c.tier.urgency_multiplier())
            .unwrap_or(1.0);

        let score = base * vip_multiplier * tier_multiplier;
        if score > 0.7 {
            Urgency::Critical
        } else if score > 0.5 {
            Urgency::High
        } else if score > 0.3 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }

    /// Compare function-word hit rates across the configured languages.
    /// Highest strictly-winning rate wins; English is the default.
    fn detect_language(&self, input: &str) -> String {
        let mut best = "en-US";
        let mut best_score = self
            .lexicon
            .languages
            .iter()
            .find(|(tag, _)| *tag == "en-US")
            .map(|(_, words)| Self::keyword_score(input, words))
            .unwrap_or(0.0);

        for (tag, words) in &self.lexicon.languages {
            if *tag == "en-US" {
                continue;
            }
            let score = Self::keyword_score(input, words);
            if score > best_score {
                best = tag;
                best_score = score;
            }
        }

        best.to_string()
    }

    fn extract_keywords(&self, input: &str) -> Vec<String> {
        self.lexicon
            .vocabulary
            .iter()
            .filter(|k| input.contains(*k))
            .map(|k| k.to_string())
            .collect()
    }

    fn confidence(
        &self,
        sentiment: f64,
        urgency: Urgency,
        customer: Option<&CustomerContext>,
    ) -> f64 {
        let mut confidence = 0.5;
        confidence += 0.3;
        confidence += (sentiment - 0.5).abs() * 0.2;
        confidence += urgency.confidence_weight() * 0.2;
        if let Some(customer) = customer {
            confidence += customer.tier.confidence_weight() * 0.2;
        }
        confidence.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::CustomerTier;

    fn enterprise_vip() -> CustomerContext {
        CustomerContext {
            customer_id: Some("cust-1".to_string()),
            name: Some("Acme Holdings".to_string()),
            tier: CustomerTier::Enterprise,
            is_vip: true,
            ..CustomerContext::anonymous()
        }
    }

    #[test]
    fn test_empty_input_returns_default() {
        let analyzer = CallAnalyzer::default();
        let analysis = analyzer.analyze("   ", None);
        assert_eq!(analysis.intent, Intent::Support);
        assert_eq!(analysis.sentiment, 0.5);
        assert_eq!(analysis.urgency, Urgency::Low);
        assert!(analysis.keywords.is_empty());
        assert_eq!(analysis.confidence, 0.5);
    }

    #[test]
    fn test_no_intent_keywords_defaults_to_support() {
        let analyzer = CallAnalyzer::default();
        let analysis = analyzer.analyze("hello there, lovely weather today", None);
        assert_eq!(analysis.intent, Intent::Support);
    }

    #[test]
    fn test_sales_intent() {
        let analyzer = CallAnalyzer::default();
        let analysis = analyzer.analyze("I want to buy a new plan, what is the price?", None);
        assert_eq!(analysis.intent, Intent::Sales);
    }

    #[test]
    fn test_billing_intent_beats_support_on_higher_score() {
        let analyzer = CallAnalyzer::default();
        // billing matches bill/billing/payment; support matches only help
        let analysis = analyzer.analyze("I need help with my billing payment", None);
        assert_eq!(analysis.intent, Intent::Billing);
    }

    #[test]
    fn test_technical_intent() {
        let analyzer = CallAnalyzer::default();
        let analysis = analyzer.analyze("the api integration webhook setup", None);
        assert_eq!(analysis.intent, Intent::Technical);
    }

    #[test]
    fn test_sentiment_is_three_valued() {
        let analyzer = CallAnalyzer::default();
        assert_eq!(analyzer.analyze("this is great, I am happy", None).sentiment, 0.7);
        assert_eq!(analyzer.analyze("this is terrible, I am angry", None).sentiment, 0.3);
        assert_eq!(analyzer.analyze("calling about my account", None).sentiment, 0.5);
        // balanced positive and negative collapses to neutral
        assert_eq!(analyzer.analyze("great service but terrible app", None).sentiment, 0.5);
    }

    #[test]
    fn test_urgency_multipliers_for_enterprise_vip() {
        let analyzer = CallAnalyzer::default();
        let customer = enterprise_vip();

        // urgent + emergency + immediately = 3/7; x1.5 x1.3 = 0.836 -> critical
        let analysis = analyzer.analyze(
            "urgent emergency, please respond immediately",
            Some(&customer),
        );
        assert_eq!(analysis.urgency, Urgency::Critical);

        // same utterance without a profile: 3/7 = 0.43 -> medium
        let analysis = analyzer.analyze("urgent emergency, please respond immediately", None);
        assert_eq!(analysis.urgency, Urgency::Medium);
    }

    #[test]
    fn test_scenario_enterprise_vip_billing_escalation() {
        let analyzer = CallAnalyzer::default();
        let customer = enterprise_vip();
        let analysis = analyzer.analyze(
            "I need help with my billing payment, it's urgent, this is an emergency, respond immediately",
            Some(&customer),
        );
        assert_eq!(analysis.intent, Intent::Billing);
        assert_eq!(analysis.urgency, Urgency::Critical);
    }

    #[test]
    fn test_language_detection() {
        let analyzer = CallAnalyzer::default();
        assert_eq!(
            analyzer.analyze("the phone and the network", None).language,
            "en-US"
        );
        assert_eq!(
            analyzer
                .analyze("hola, no se puede activar el servicio que tengo en un telefono", None)
                .language,
            "es-ES"
        );
        assert_eq!(
            analyzer
                .analyze("bonjour, je ne comprends pas ce que fait le service et il ne marche pas du tout", None)
                .language,
            "fr-FR"
        );
    }

    #[test]
    fn test_keyword_extraction_subset() {
        let analyzer = CallAnalyzer::default();
        let analysis = analyzer.analyze("my esim has a connection problem", None);
        assert!(analysis.keywords.contains(&"esim".to_string()));
        assert!(analysis.keywords.contains(&"connection".to_string()));
        assert!(analysis.keywords.contains(&"problem".to_string()));
        assert!(!analysis.keywords.contains(&"refund".to_string()));
    }

    #[test]
    fn test_confidence_capped_at_one() {
        let analyzer = CallAnalyzer::default();
        let customer = enterprise_vip();
        let analysis = analyzer.analyze(
            "terrible awful urgent emergency critical asap immediately now broken",
            Some(&customer),
        );
        assert!(analysis.confidence <= 1.0);
        assert!(analysis.confidence > 0.9);
    }
}
