//! In-memory knowledge base with keyword-overlap relevance ranking.
//!
//! Stands in for a vector store: good enough for the pipeline's contract
//! (relevance-descending, possibly empty) and fully deterministic for
//! tests. Articles live in memory; loading and indexing pipelines belong
//! to a real backend.

use async_trait::async_trait;

use super::{KbHit, KnowledgeSearch, ToolError};

/// A stored article.
#[derive(Debug, Clone)]
pub struct KbDocument {
    pub source: String,
    pub content: String,
}

/// Keyword-ranked article store.
pub struct InMemoryKnowledgeBase {
    documents: Vec<KbDocument>,
}

impl InMemoryKnowledgeBase {
    pub fn new(documents: Vec<KbDocument>) -> Self {
        Self { documents }
    }

    /// Store seeded with the standard support policy articles.
    pub fn with_default_articles() -> Self {
        let articles = [
            (
                "refund-policy.md",
                "Refunds are available within 30 days of the order date for \
                 orders that have been delivered or shipped. Refunds are issued \
                 to the original payment method and typically settle within 5 \
                 to 10 business days. Orders outside the 30-day window are not \
                 eligible for a refund but may qualify for store credit.",
            ),
            (
                "shipping-policy.md",
                "Standard shipping takes 3 to 5 business days within the \
                 continental US. Expedited shipping arrives in 1 to 2 business \
                 days. Tracking numbers are emailed when the order leaves the \
                 warehouse. Shipments delayed more than 7 business days qualify \
                 for a shipping fee refund.",
            ),
            (
                "returns-process.md",
                "To return an item, request a return label from the support \
                 team, pack the item in its original packaging, and drop it at \
                 any carrier location. Returns are inspected on arrival; the \
                 refund is released after inspection passes.",
            ),
            (
                "account-help.md",
                "Password resets are self-service from the sign-in page. If the \
                 reset email does not arrive within 10 minutes, check the spam \
                 folder or contact support to verify the address on file. \
                 Account deletion requests are processed within 30 days.",
            ),
            (
                "product-care.md",
                "Electronics carry a 12-month limited warranty covering \
                 manufacturing defects. Water damage and accidental drops are \
                 not covered. Warranty claims require the order number and a \
                 photo of the defect.",
            ),
        ];
        Self::new(
            articles
                .into_iter()
                .map(|(source, content)| KbDocument {
                    source: source.into(),
                    content: content.into(),
                })
                .collect(),
        )
    }

    /// Fraction of query terms present in the document, case-insensitive.
    fn score(document: &KbDocument, terms: &[String]) -> f64 {
        if terms.is_empty() {
            return 0.0;
        }
        let haystack = document.content.to_lowercase();
        let source = document.source.to_lowercase();
        let matched = terms
            .iter()
            .filter(|term| haystack.contains(*term) || source.contains(*term))
            .count();
        matched as f64 / terms.len() as f64
    }
}

#[async_trait]
impl KnowledgeSearch for InMemoryKnowledgeBase {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<KbHit>, ToolError> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(str::to_string)
            .collect();

        let mut hits: Vec<KbHit> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let score = Self::score(doc, &terms);
                (score > 0.0).then(|| KbHit {
                    content: doc.content.clone(),
                    source: doc.source.clone(),
                    relevance_score: score,
                })
            })
            .collect();

        // Descending by score; insertion order breaks ties (stable sort).
        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_ranks_by_relevance_descending() {
        let kb = InMemoryKnowledgeBase::with_default_articles();
        let hits = kb.search("refund within 30 days", 5).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].source, "refund-policy.md");
        for pair in hits.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
    }

    #[tokio::test]
    async fn test_search_respects_max_results() {
        let kb = InMemoryKnowledgeBase::with_default_articles();
        let hits = kb.search("refund shipping return account", 2).await.unwrap();
        assert!(hits.len() <= 2);
    }

    #[tokio::test]
    async fn test_search_returns_empty_for_no_match() {
        let kb = InMemoryKnowledgeBase::with_default_articles();
        let hits = kb.search("zxqv wvut", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_short_terms_are_ignored() {
        let kb = InMemoryKnowledgeBase::with_default_articles();
        // "to" and "of" appear everywhere but are below the term length floor.
        let hits = kb.search("to of", 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
