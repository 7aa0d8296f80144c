//! Research stage: knowledge-base lookup plus summarization.
//!
//! Two queries at most, merged and deduplicated by source in first-seen
//! order, capped at three unique articles. The generation call contributes
//! only the summary and confidence; the article and query lists stored in
//! the result are the locally computed ones.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{output_json, truncate_chars, Stage, StageContext, StageError, StageOutcome};
use crate::contracts::{KbArticle, ResearchOutput};
use crate::generation;
use crate::prompts;
use crate::state::{ProcessingState, StageName, TraceDraft};
use crate::tools::{self, KbHit};

/// Hits requested per query.
const RESULTS_PER_QUERY: usize = 2;
/// Unique articles retained after cross-query dedup.
const MAX_ARTICLES: usize = 3;
/// Article characters kept in the stored result.
const STORED_CONTENT_CHARS: usize = 300;

pub struct ResearchStage;

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> StageName {
        StageName::Research
    }

    async fn run(
        &self,
        ctx: &StageContext,
        state: &mut ProcessingState,
    ) -> Result<StageOutcome, StageError> {
        let Some(triage) = state.triage.clone() else {
            debug!(
                ticket_id = state.ticket.ticket_id,
                "no triage result, skipping research"
            );
            return Ok(StageOutcome::Skipped);
        };

        let queries = vec![
            state.ticket.subject.clone(),
            triage.intent.replace('_', " "),
        ];

        let mut hits: Vec<KbHit> = Vec::new();
        for query in &queries {
            hits.extend(ctx.knowledge.search(query, RESULTS_PER_QUERY).await?);
        }

        // First-seen source wins; per-query relevance ordering is preserved,
        // results are never re-sorted across queries.
        let mut seen = HashSet::new();
        let mut unique: Vec<KbHit> = Vec::new();
        for hit in hits {
            if seen.insert(hit.source.clone()) {
                unique.push(hit);
            }
        }
        unique.truncate(MAX_ARTICLES);

        let prompt = prompts::research(&triage.intent, &unique);
        let mut output: ResearchOutput =
            generation::generate(ctx.generator.as_ref(), &prompt).await?;

        output.relevant_articles = unique
            .iter()
            .map(|hit| KbArticle {
                source: hit.source.clone(),
                content: truncate_chars(&hit.content, STORED_CONTENT_CHARS),
            })
            .collect();
        output.search_queries_used = queries.clone();

        let draft = TraceDraft {
            stage: StageName::Research,
            input_data: json!({ "intent": triage.intent, "queries": queries }),
            output_data: output_json(&output),
            reasoning: output.summary.clone(),
            confidence: output.confidence,
            tools_used: vec![tools::SEARCH_KNOWLEDGE_BASE.to_string()],
        };
        state.research = Some(output);
        Ok(StageOutcome::Completed(draft))
    }
}
