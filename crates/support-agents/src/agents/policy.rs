//! Policy stage: conditional order lookup, refund eligibility, decision.
//!
//! Tool use is gated twice: the order is looked up only when the ticket
//! carries an order id AND triage asked for the lookup, and eligibility is
//! checked only when the intent mentions a refund. Every tool invoked is
//! recorded, in order, in `actions_taken`.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{output_json, Stage, StageContext, StageError, StageOutcome};
use crate::contracts::PolicyCheckOutput;
use crate::generation;
use crate::prompts;
use crate::state::{ProcessingState, StageName, TraceDraft};
use crate::tools::{self, OrderRecord, RefundEligibility};

pub struct PolicyStage;

#[async_trait]
impl Stage for PolicyStage {
    fn name(&self) -> StageName {
        StageName::Policy
    }

    async fn run(
        &self,
        ctx: &StageContext,
        state: &mut ProcessingState,
    ) -> Result<StageOutcome, StageError> {
        let Some(triage) = state.triage.clone() else {
            debug!(
                ticket_id = state.ticket.ticket_id,
                "no triage result, skipping policy check"
            );
            return Ok(StageOutcome::Skipped);
        };

        let mut order_details: Option<OrderRecord> = None;
        let mut refund_check: Option<RefundEligibility> = None;
        let mut actions_taken: Vec<String> = Vec::new();

        let order_id = state
            .ticket
            .order_id
            .clone()
            .filter(|_| triage.requires_order_lookup);
        if let Some(order_id) = order_id {
            // Not-found is a normal outcome; only transport failures propagate.
            order_details = ctx.orders.get_order(&order_id).await?;
            actions_taken.push(tools::GET_ORDER_DETAILS.to_string());

            if triage.intent.to_lowercase().contains("refund") {
                refund_check = Some(ctx.orders.check_refund_eligibility(&order_id).await?);
                actions_taken.push(tools::CHECK_REFUND_ELIGIBILITY.to_string());
            }
        }

        let prompt = prompts::policy(&triage.intent, order_details.as_ref(), refund_check.as_ref());
        let mut output: PolicyCheckOutput =
            generation::generate(ctx.generator.as_ref(), &prompt).await?;

        // Local tool results are authoritative; the generation call
        // contributes only the verdict and its reasoning.
        output.order_details = order_details.as_ref().map(output_json);
        output.actions_taken = actions_taken.clone();
        output.refund_amount = refund_check
            .as_ref()
            .filter(|check| check.eligible)
            .and_then(|check| check.refund_amount);

        let draft = TraceDraft {
            stage: StageName::Policy,
            input_data: json!({
                "intent": triage.intent,
                "has_order": output.order_details.is_some(),
            }),
            output_data: output_json(&output),
            reasoning: output.reason.clone(),
            confidence: output.confidence,
            tools_used: actions_taken,
        };
        state.policy_check = Some(output);
        Ok(StageOutcome::Completed(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::config::SupportConfig;
    use crate::contracts::{TicketPriority, TriageOutput};
    use crate::generation::MockStructuredGenerator;
    use crate::state::TicketInput;
    use crate::tools::{MockKnowledgeSearch, MockOrderService};

    fn policy_json() -> serde_json::Value {
        json!({
            "is_eligible": true,
            "reason": "no policy constraints apply",
            "confidence": 0.8,
        })
    }

    fn state_with_triage(
        order_id: Option<&str>,
        requires_lookup: bool,
        intent: &str,
    ) -> ProcessingState {
        let mut state = ProcessingState::new(TicketInput {
            ticket_id: 1,
            customer_email: "a@example.com".into(),
            customer_name: "A".into(),
            subject: "s".into(),
            message: "m".into(),
            order_id: order_id.map(Into::into),
        });
        state.triage = Some(TriageOutput {
            intent: intent.into(),
            priority: TicketPriority::Medium,
            confidence: 0.8,
            reasoning: String::new(),
            requires_order_lookup: requires_lookup,
            suggested_tags: Vec::new(),
        });
        state
    }

    fn ctx(generator: MockStructuredGenerator, orders: MockOrderService) -> StageContext {
        StageContext {
            generator: Arc::new(generator),
            knowledge: Arc::new(MockKnowledgeSearch::new()),
            orders: Arc::new(orders),
            config: SupportConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_no_lookup_when_triage_does_not_require_it() {
        let mut generator = MockStructuredGenerator::new();
        generator
            .expect_generate_value()
            .returning(|_, _, _| Ok(policy_json()));
        // No expectations on the order service: any call fails the test.
        let ctx = ctx(generator, MockOrderService::new());

        let mut state = state_with_triage(Some("ORD-001"), false, "refund_request");
        let outcome = PolicyStage.run(&ctx, &mut state).await.unwrap();

        assert!(matches!(outcome, StageOutcome::Completed(_)));
        let policy = state.policy_check.unwrap();
        assert!(policy.actions_taken.is_empty());
        assert!(policy.order_details.is_none());
        assert!(policy.refund_amount.is_none());
    }

    #[tokio::test]
    async fn test_eligibility_check_requires_refund_intent() {
        let mut orders = MockOrderService::new();
        orders.expect_get_order().returning(|_| Ok(None));
        let mut generator = MockStructuredGenerator::new();
        generator
            .expect_generate_value()
            .returning(|_, _, _| Ok(policy_json()));
        let ctx = ctx(generator, orders);

        let mut state = state_with_triage(Some("ORD-001"), true, "shipping_inquiry");
        PolicyStage.run(&ctx, &mut state).await.unwrap();

        let policy = state.policy_check.unwrap();
        assert_eq!(policy.actions_taken, vec![tools::GET_ORDER_DETAILS]);
        assert!(policy.refund_amount.is_none());
    }
}
