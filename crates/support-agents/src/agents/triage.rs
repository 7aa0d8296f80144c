//! Triage stage: classify intent, priority, and order-lookup need.
//!
//! Every downstream stage depends on the classification, so a generation
//! failure here is fatal; no default triage is fabricated.

use async_trait::async_trait;
use serde_json::json;

use super::{output_json, truncate_chars, Stage, StageContext, StageError, StageOutcome};
use crate::contracts::TriageOutput;
use crate::generation;
use crate::prompts;
use crate::state::{ProcessingState, StageName, TraceDraft};

/// Characters of the customer message echoed into the trace snapshot.
const TRACE_MESSAGE_CHARS: usize = 200;

pub struct TriageStage;

#[async_trait]
impl Stage for TriageStage {
    fn name(&self) -> StageName {
        StageName::Triage
    }

    async fn run(
        &self,
        ctx: &StageContext,
        state: &mut ProcessingState,
    ) -> Result<StageOutcome, StageError> {
        if state.ticket.subject.trim().is_empty() {
            return Err(StageError::EmptyField("subject"));
        }
        if state.ticket.message.trim().is_empty() {
            return Err(StageError::EmptyField("message"));
        }

        let prompt = prompts::triage(&state.ticket);
        let output: TriageOutput = generation::generate(ctx.generator.as_ref(), &prompt).await?;

        let draft = TraceDraft {
            stage: StageName::Triage,
            input_data: json!({
                "subject": state.ticket.subject.clone(),
                "message": truncate_chars(&state.ticket.message, TRACE_MESSAGE_CHARS),
            }),
            output_data: output_json(&output),
            reasoning: output.reasoning.clone(),
            confidence: output.confidence,
            tools_used: Vec::new(),
        };
        state.triage = Some(output);
        Ok(StageOutcome::Completed(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::SupportConfig;
    use crate::generation::MockStructuredGenerator;
    use crate::state::TicketInput;
    use crate::tools::{MockKnowledgeSearch, MockOrderService};

    fn ctx() -> StageContext {
        StageContext {
            generator: Arc::new(MockStructuredGenerator::new()),
            knowledge: Arc::new(MockKnowledgeSearch::new()),
            orders: Arc::new(MockOrderService::new()),
            config: SupportConfig::default(),
        }
    }

    fn ticket(subject: &str, message: &str) -> TicketInput {
        TicketInput {
            ticket_id: 1,
            customer_email: "a@example.com".into(),
            customer_name: "A".into(),
            subject: subject.into(),
            message: message.into(),
            order_id: None,
        }
    }

    #[tokio::test]
    async fn test_blank_subject_is_rejected_before_generation() {
        let mut state = ProcessingState::new(ticket("   ", "please help"));
        let err = TriageStage.run(&ctx(), &mut state).await.unwrap_err();
        assert!(matches!(err, StageError::EmptyField("subject")));
        assert!(state.triage.is_none());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected_before_generation() {
        let mut state = ProcessingState::new(ticket("help", ""));
        let err = TriageStage.run(&ctx(), &mut state).await.unwrap_err();
        assert!(matches!(err, StageError::EmptyField("message")));
    }
}
