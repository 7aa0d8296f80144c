//! The shared processing record threaded through the pipeline.
//!
//! One [`ProcessingState`] is created per ticket and owned exclusively by
//! the driver for the pipeline's lifetime. Each stage populates its own
//! output slot exactly once; the trace sequence is append-only and is only
//! extended through [`ProcessingState::append_trace`], which assigns the
//! 1-based step number from the insertion position.

use serde::{Deserialize, Serialize};

use crate::contracts::{
    EscalationDecision, PolicyCheckOutput, ResearchOutput, ResponseOutput, TriageOutput,
};

/// Immutable ticket input the pipeline was started with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketInput {
    pub ticket_id: i64,
    pub customer_email: String,
    pub customer_name: String,
    pub subject: String,
    pub message: String,
    pub order_id: Option<String>,
}

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Triage,
    Research,
    Policy,
    Response,
    Escalation,
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Triage => write!(f, "triage"),
            Self::Research => write!(f, "research"),
            Self::Policy => write!(f, "policy"),
            Self::Response => write!(f, "response"),
            Self::Escalation => write!(f, "escalation"),
        }
    }
}

/// Append-only audit entry for one executed stage.
///
/// Write-once: never mutated or reordered after append. Ownership passes to
/// the storage layer once the pipeline returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub stage: StageName,
    /// 1-based position in the trace sequence.
    pub step_number: u32,
    /// Snapshot of the stage's salient inputs.
    pub input_data: serde_json::Value,
    /// The stage's full structured output.
    pub output_data: serde_json::Value,
    pub reasoning: String,
    /// The stage's confidence, or the aggregate for the escalation stage.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
    pub execution_time_ms: u64,
}

/// Trace fields a stage fills in. The harness injects the step number and
/// the elapsed time when appending.
#[derive(Debug, Clone)]
pub struct TraceDraft {
    pub stage: StageName,
    pub input_data: serde_json::Value,
    pub output_data: serde_json::Value,
    pub reasoning: String,
    pub confidence: f64,
    pub tools_used: Vec<String>,
}

/// Per-ticket pipeline state.
#[derive(Debug, Clone)]
pub struct ProcessingState {
    pub ticket: TicketInput,

    // Stage output slots, each populated at most once, in stage order.
    pub triage: Option<TriageOutput>,
    pub research: Option<ResearchOutput>,
    pub policy_check: Option<PolicyCheckOutput>,
    pub response: Option<ResponseOutput>,
    pub escalation: Option<EscalationDecision>,

    // Terminal fields, populated on the way out of the pipeline.
    pub final_response: Option<String>,
    pub requires_human: bool,
    pub overall_confidence: f64,

    traces: Vec<TraceRecord>,
}

impl ProcessingState {
    pub fn new(ticket: TicketInput) -> Self {
        Self {
            ticket,
            triage: None,
            research: None,
            policy_check: None,
            response: None,
            escalation: None,
            final_response: None,
            requires_human: false,
            overall_confidence: 0.0,
            traces: Vec::new(),
        }
    }

    /// The trace sequence in execution order.
    pub fn traces(&self) -> &[TraceRecord] {
        &self.traces
    }

    /// Append a completed stage's trace. The step number is the record's
    /// position in the sequence; callers never choose it.
    pub fn append_trace(&mut self, draft: TraceDraft, execution_time_ms: u64) {
        let step_number = self.traces.len() as u32 + 1;
        self.traces.push(TraceRecord {
            stage: draft.stage,
            step_number,
            input_data: draft.input_data,
            output_data: draft.output_data,
            reasoning: draft.reasoning,
            confidence: draft.confidence,
            tools_used: draft.tools_used,
            execution_time_ms,
        });
    }

    /// Confidence scores of the populated upstream slots, in fixed stage
    /// order (triage, research, policy, response). Feeds the escalation
    /// aggregator.
    pub fn confidence_components(&self) -> Vec<f64> {
        let mut components = Vec::new();
        if let Some(triage) = &self.triage {
            components.push(triage.confidence);
        }
        if let Some(research) = &self.research {
            components.push(research.confidence);
        }
        if let Some(policy) = &self.policy_check {
            components.push(policy.confidence);
        }
        if let Some(response) = &self.response {
            components.push(response.confidence);
        }
        components
    }

    /// Project the terminal fields and the trace sequence for the caller.
    pub fn into_outcome(self) -> PipelineOutcome {
        PipelineOutcome {
            final_response: self.final_response.unwrap_or_default(),
            requires_human: self.requires_human,
            overall_confidence: self.overall_confidence,
            traces: self.traces,
        }
    }
}

/// What the pipeline hands back to the ticket-handling layer.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub final_response: String,
    pub requires_human: bool,
    pub overall_confidence: f64,
    pub traces: Vec<TraceRecord>,
}
