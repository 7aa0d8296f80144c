//! Escalation stage: aggregate confidence and decide on human handoff.
//!
//! The overall confidence is the arithmetic mean of the populated upstream
//! slot confidences, computed locally. The generation call supplies only
//! the verdict and the reason list; whatever number it returns for
//! `overall_confidence` is overwritten with the mean.

use async_trait::async_trait;
use serde_json::json;

use super::{output_json, Stage, StageContext, StageError, StageOutcome};
use crate::contracts::EscalationDecision;
use crate::generation;
use crate::prompts;
use crate::state::{ProcessingState, StageName, TraceDraft};

pub struct EscalationStage;

/// Arithmetic mean of the populated upstream confidences, 0.0 when none.
pub fn aggregate_confidence(state: &ProcessingState) -> f64 {
    let components = state.confidence_components();
    if components.is_empty() {
        return 0.0;
    }
    components.iter().sum::<f64>() / components.len() as f64
}

#[async_trait]
impl Stage for EscalationStage {
    fn name(&self) -> StageName {
        StageName::Escalation
    }

    async fn run(
        &self,
        ctx: &StageContext,
        state: &mut ProcessingState,
    ) -> Result<StageOutcome, StageError> {
        let avg_confidence = aggregate_confidence(state);
        let threshold = ctx.config.confidence_threshold;
        let requires_review = state
            .response
            .as_ref()
            .is_some_and(|r| r.requires_human_review);
        let priority = state.triage.as_ref().map(|t| t.priority);

        let prompt = prompts::escalation(avg_confidence, threshold, requires_review, priority);
        let mut decision: EscalationDecision =
            generation::generate(ctx.generator.as_ref(), &prompt).await?;

        // The number is ours, not the model's.
        decision.overall_confidence = avg_confidence;

        let draft = TraceDraft {
            stage: StageName::Escalation,
            input_data: json!({
                "avg_confidence": avg_confidence,
                "threshold": threshold,
            }),
            output_data: output_json(&decision),
            reasoning: decision.reasons.join(", "),
            confidence: avg_confidence,
            tools_used: Vec::new(),
        };
        state.requires_human = decision.should_escalate;
        state.overall_confidence = avg_confidence;
        state.escalation = Some(decision);
        Ok(StageOutcome::Completed(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ResponseOutput, TicketPriority, TriageOutput};
    use crate::state::TicketInput;

    fn state() -> ProcessingState {
        ProcessingState::new(TicketInput {
            ticket_id: 1,
            customer_email: "a@example.com".into(),
            customer_name: "A".into(),
            subject: "s".into(),
            message: "m".into(),
            order_id: None,
        })
    }

    #[test]
    fn test_aggregate_is_zero_with_no_populated_slots() {
        assert_eq!(aggregate_confidence(&state()), 0.0);
    }

    #[test]
    fn test_aggregate_means_only_populated_slots() {
        let mut state = state();
        state.triage = Some(TriageOutput {
            intent: "refund_request".into(),
            priority: TicketPriority::High,
            confidence: 0.9,
            reasoning: String::new(),
            requires_order_lookup: false,
            suggested_tags: Vec::new(),
        });
        state.response = Some(ResponseOutput {
            response_text: "Hi".into(),
            tone: "professional".into(),
            includes_apology: false,
            includes_action_items: Vec::new(),
            confidence: 0.5,
            requires_human_review: false,
        });
        let avg = aggregate_confidence(&state);
        assert!((avg - 0.7).abs() < 1e-9);
    }
}
