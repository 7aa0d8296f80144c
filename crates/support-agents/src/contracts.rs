//! Structured output contracts for the five pipeline stages.
//!
//! Each stage's generation call must return a value conforming to one of
//! these shapes. The JSON schema derived via `schemars` is handed to the
//! generation client verbatim; deserializing the response back through
//! `serde` is the conformance check (fail-closed).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Priority assigned to a ticket by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// Accessors shared by every stage contract.
///
/// `TARGET` names the shape in logs and errors. `confidence` feeds the
/// bound check at the generation boundary and the escalation aggregator.
pub trait StageOutput {
    const TARGET: &'static str;
    fn confidence(&self) -> f64;
}

/// Output of the triage stage: intent classification and priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TriageOutput {
    /// Short lowercase-with-underscore category, e.g. `refund_request`.
    /// Not validated beyond non-empty; downstream must tolerate anything.
    pub intent: String,
    pub priority: TicketPriority,
    pub confidence: f64,
    /// Explanation of the classification.
    pub reasoning: String,
    /// Whether the policy stage should look the order up.
    #[serde(default)]
    pub requires_order_lookup: bool,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
}

impl StageOutput for TriageOutput {
    const TARGET: &'static str = "triage";
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// A knowledge-base article retained in a research result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KbArticle {
    pub source: String,
    pub content: String,
}

/// Output of the research stage.
///
/// `relevant_articles` and `search_queries_used` are overwritten by the
/// stage with locally computed values; the generation call contributes
/// only `summary` and `confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchOutput {
    #[serde(default)]
    pub relevant_articles: Vec<KbArticle>,
    #[serde(default)]
    pub search_queries_used: Vec<String>,
    pub confidence: f64,
    pub summary: String,
}

impl StageOutput for ResearchOutput {
    const TARGET: &'static str = "research";
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Output of the policy stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyCheckOutput {
    pub is_eligible: bool,
    /// Explanation of the eligibility decision.
    pub reason: String,
    /// Snapshot of the looked-up order; overwritten with the local lookup result.
    #[serde(default)]
    pub order_details: Option<serde_json::Value>,
    /// Set only when an eligibility check ran and reported eligible.
    #[serde(default)]
    pub refund_amount: Option<f64>,
    /// Tool names invoked, in invocation order; overwritten locally.
    #[serde(default)]
    pub actions_taken: Vec<String>,
    pub confidence: f64,
}

impl StageOutput for PolicyCheckOutput {
    const TARGET: &'static str = "policy_check";
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

fn default_tone() -> String {
    "professional".into()
}

/// Output of the response stage: the customer-facing draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseOutput {
    pub response_text: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub includes_apology: bool,
    #[serde(default)]
    pub includes_action_items: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub requires_human_review: bool,
}

impl StageOutput for ResponseOutput {
    const TARGET: &'static str = "response";
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Output of the escalation stage: the terminal verdict.
///
/// `overall_confidence` is overwritten with the locally computed mean of
/// the upstream stage confidences; the generation call contributes only
/// the verdict and the reason list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EscalationDecision {
    pub should_escalate: bool,
    pub reasons: Vec<String>,
    pub overall_confidence: f64,
    #[serde(default)]
    pub recommended_specialist: Option<String>,
}

impl StageOutput for EscalationDecision {
    const TARGET: &'static str = "escalation";
    fn confidence(&self) -> f64 {
        self.overall_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serde_snake_case() {
        let json = serde_json::to_string(&TicketPriority::Urgent).unwrap();
        assert_eq!(json, "\"urgent\"");
        let parsed: TicketPriority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, TicketPriority::Medium);
    }

    #[test]
    fn test_priority_rejects_unknown_level() {
        let result = serde_json::from_str::<TicketPriority>("\"critical\"");
        assert!(result.is_err(), "priority is a closed enum of four levels");
    }

    #[test]
    fn test_triage_defaults_for_optional_fields() {
        let parsed: TriageOutput = serde_json::from_value(serde_json::json!({
            "intent": "shipping_inquiry",
            "priority": "low",
            "confidence": 0.8,
            "reasoning": "asks where the package is",
        }))
        .unwrap();
        assert!(!parsed.requires_order_lookup);
        assert!(parsed.suggested_tags.is_empty());
    }

    #[test]
    fn test_stage_output_targets_are_distinct() {
        let targets = [
            TriageOutput::TARGET,
            ResearchOutput::TARGET,
            PolicyCheckOutput::TARGET,
            ResponseOutput::TARGET,
            EscalationDecision::TARGET,
        ];
        let unique: std::collections::HashSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), targets.len());
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = schemars::schema_for!(TriageOutput);
        let value = serde_json::to_value(schema).unwrap();
        let required = value["required"].as_array().unwrap();
        assert!(required.iter().any(|f| f == "intent"));
        assert!(required.iter().any(|f| f == "priority"));
        assert!(required.iter().any(|f| f == "confidence"));
        // Defaulted fields must not be required, or strict backends would
        // reject responses that omit them.
        assert!(!required.iter().any(|f| f == "suggested_tags"));
    }

    #[test]
    fn test_response_tone_defaults_to_professional() {
        let parsed: ResponseOutput = serde_json::from_value(serde_json::json!({
            "response_text": "Hello",
            "confidence": 0.9,
        }))
        .unwrap();
        assert_eq!(parsed.tone, "professional");
    }
}
