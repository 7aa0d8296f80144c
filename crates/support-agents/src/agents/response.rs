//! Response stage: draft the customer-facing reply.
//!
//! The only stage that tolerates missing upstream slots; every absent
//! input is replaced with an explicit marker in the prompt, because a
//! reply must always be drafted.

use async_trait::async_trait;
use serde_json::json;

use super::{output_json, Stage, StageContext, StageError, StageOutcome};
use crate::contracts::ResponseOutput;
use crate::generation;
use crate::prompts;
use crate::state::{ProcessingState, StageName, TraceDraft};

pub struct ResponseStage;

#[async_trait]
impl Stage for ResponseStage {
    fn name(&self) -> StageName {
        StageName::Response
    }

    async fn run(
        &self,
        ctx: &StageContext,
        state: &mut ProcessingState,
    ) -> Result<StageOutcome, StageError> {
        let prompt = prompts::response(
            &state.ticket.customer_name,
            state.triage.as_ref(),
            state.research.as_ref(),
            state.policy_check.as_ref(),
        );
        let output: ResponseOutput = generation::generate(ctx.generator.as_ref(), &prompt).await?;

        let draft = TraceDraft {
            stage: StageName::Response,
            input_data: json!({
                "intent": state.triage.as_ref().map(|t| t.intent.clone()),
                "research_available": state.research.is_some(),
                "policy_decision": state.policy_check.as_ref().map(|p| p.is_eligible),
            }),
            output_data: output_json(&output),
            reasoning: format!(
                "Tone: {}, requires review: {}",
                output.tone, output.requires_human_review
            ),
            confidence: output.confidence,
            tools_used: Vec::new(),
        };
        state.final_response = Some(output.response_text.clone());
        state.response = Some(output);
        Ok(StageOutcome::Completed(draft))
    }
}
