//! Pipeline stages and the contract they share.
//!
//! Each of the five stages implements [`Stage`]. A stage receives the
//! shared [`ProcessingState`], may read any slot an earlier stage
//! populated, writes exactly its own slot, and hands back a
//! [`TraceDraft`] for the harness to append. A stage that finds its
//! prerequisites absent reports [`StageOutcome::Skipped`] and leaves the
//! state untouched; no trace is recorded for a skip.

pub mod escalation;
pub mod policy;
pub mod research;
pub mod response;
pub mod triage;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::SupportConfig;
use crate::generation::{GenerationError, StructuredGenerator};
use crate::state::{ProcessingState, StageName, TraceDraft};
use crate::tools::{KnowledgeSearch, OrderService, ToolError};

/// Collaborators and configuration shared by every stage.
///
/// All handles are `Arc` so one context can serve concurrent tickets.
#[derive(Clone)]
pub struct StageContext {
    pub generator: Arc<dyn StructuredGenerator>,
    pub knowledge: Arc<dyn KnowledgeSearch>,
    pub orders: Arc<dyn OrderService>,
    pub config: SupportConfig,
}

/// Why a stage could not produce its output.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Triage requires a non-empty subject and message.
    #[error("ticket field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Result of one stage invocation.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage ran and produced a trace to append.
    Completed(TraceDraft),
    /// A prerequisite slot was absent; state unchanged, no trace.
    Skipped,
}

/// One pipeline stage.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    async fn run(
        &self,
        ctx: &StageContext,
        state: &mut ProcessingState,
    ) -> Result<StageOutcome, StageError>;
}

/// Serialize a stage output for its trace record.
pub(crate) fn output_json<T: Serialize>(output: &T) -> serde_json::Value {
    serde_json::to_value(output).unwrap_or_default()
}

/// Char-boundary-safe prefix, for trace snapshots and prompt embedding.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
