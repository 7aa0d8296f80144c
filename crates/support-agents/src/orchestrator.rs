//! Pipeline driver: five stages in strict order over one ticket.
//!
//! The driver owns the [`ProcessingState`] for the pipeline's lifetime.
//! Each stage runs through the [`Pipeline::run_stage`] harness, which
//! times the call and appends exactly one trace record per completed
//! stage. The first stage failure aborts the run; the caller decides how
//! to surface the failed ticket (mandatory human review, error detail),
//! the pipeline never fabricates a partial result.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::agents::escalation::EscalationStage;
use crate::agents::policy::PolicyStage;
use crate::agents::research::ResearchStage;
use crate::agents::response::ResponseStage;
use crate::agents::triage::TriageStage;
use crate::agents::{Stage, StageContext, StageError, StageOutcome};
use crate::config::SupportConfig;
use crate::generation::StructuredGenerator;
use crate::prompts;
use crate::state::{PipelineOutcome, ProcessingState, StageName, TicketInput};
use crate::tools::{KnowledgeSearch, OrderService};

/// Fatal pipeline failure: the named stage could not produce its output.
///
/// Distinct from a successful run that escalates; `should_escalate = true`
/// is a normal outcome, not an error.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: StageName,
    #[source]
    pub source: StageError,
}

/// Sequences the five stages over a shared per-ticket state.
///
/// One `Pipeline` serves concurrent tickets; each `run` call owns its own
/// state and the collaborator handles are shared behind `Arc`.
pub struct Pipeline {
    ctx: StageContext,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        knowledge: Arc<dyn KnowledgeSearch>,
        orders: Arc<dyn OrderService>,
        config: SupportConfig,
    ) -> Self {
        Self {
            ctx: StageContext {
                generator,
                knowledge,
                orders,
                config,
            },
            stages: vec![
                Box::new(TriageStage),
                Box::new(ResearchStage),
                Box::new(PolicyStage),
                Box::new(ResponseStage),
                Box::new(EscalationStage),
            ],
        }
    }

    /// Process one ticket to completion or first fatal failure.
    pub async fn run(&self, ticket: TicketInput) -> Result<PipelineOutcome, PipelineError> {
        info!(
            ticket_id = ticket.ticket_id,
            subject = %ticket.subject,
            prompt_version = prompts::PROMPT_VERSION,
            "starting support pipeline"
        );
        let mut state = ProcessingState::new(ticket);

        for stage in &self.stages {
            self.run_stage(stage.as_ref(), &mut state).await?;
        }

        let outcome = state.into_outcome();
        info!(
            requires_human = outcome.requires_human,
            overall_confidence = outcome.overall_confidence,
            steps = outcome.traces.len(),
            "pipeline complete"
        );
        Ok(outcome)
    }

    /// Stage harness: time the stage, append exactly one trace on
    /// completion, none on a skip, and propagate failures without
    /// appending anything.
    async fn run_stage(
        &self,
        stage: &dyn Stage,
        state: &mut ProcessingState,
    ) -> Result<(), PipelineError> {
        let name = stage.name();
        let started = Instant::now();
        let outcome = stage
            .run(&self.ctx, state)
            .await
            .map_err(|source| PipelineError {
                stage: name,
                source,
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            StageOutcome::Completed(draft) => {
                debug!(stage = %name, elapsed_ms, "stage completed");
                state.append_trace(draft, elapsed_ms);
            }
            StageOutcome::Skipped => {
                debug!(stage = %name, "stage skipped");
            }
        }
        Ok(())
    }
}
